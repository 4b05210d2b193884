// HTTP surface for the scan pipeline
// Authentication happens upstream; handlers trust the x-user-id header the
// gateway injects. Pipeline failures surface to clients as one generic
// message, detail lives in the audit trail keyed by correlation id.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::Engine;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::database::models::{Category, TransactionKind};
use crate::scan::committer::{BatchCommitter, CommitDecision};
use crate::scan::matcher::{match_item, rematch_pending};
use crate::scan::service::{ScanError, ScanRequest, ScanService};
use crate::scan::stores::CategoryStore;
use crate::scan::types::{AnalysisResult, MatchedItem};
use crate::state::AppState;

const GENERIC_FAILURE: &str = "Erro ao processar imagem.";
const QUOTA_MESSAGE: &str = "Limite de análises atingido. Tente novamente mais tarde.";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ai/analyze", post(analyze))
        .route("/ai/commit", post(commit))
        .route("/ai/categories", post(create_category))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct AnalyzeBody {
    #[serde(rename = "base64Image")]
    base64_image: String,
}

/// POST /ai/analyze - run one image through the scan pipeline and return the
/// decoded result with server-side category matches for review
async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeBody>,
) -> impl IntoResponse {
    let user_id = match user_id_from(&headers) {
        Some(id) => id,
        None => return unauthorized(),
    };

    let image = match decode_image_payload(&body.base64_image) {
        Ok(image) => image,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": GENERIC_FAILURE })))
                .into_response();
        }
    };

    let request = ScanRequest::new(user_id, image);
    let correlation_id = request.correlation_id.clone();

    let result = match run_scan(state.scanner.clone(), request).await {
        Ok(result) => result,
        Err(ScanError::QuotaExceeded) => {
            return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": QUOTA_MESSAGE })))
                .into_response();
        }
        Err(err) => {
            log::warn!("[{}] scan failed: {}", correlation_id, err);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": GENERIC_FAILURE })))
                .into_response();
        }
    };

    // Reconcile against the user's categories while still server-side, so
    // the client reviews items already carrying a categoria or the
    // precisaNovaCategoria flag
    let mut matched = Vec::with_capacity(result.items.len());
    for item in &result.items {
        let candidates = state
            .db
            .list_categories_by_kind(user_id, item.kind)
            .unwrap_or_else(|err| {
                log::error!("[{}] failed to list categories: {:#}", correlation_id, err);
                Vec::new()
            });
        matched.push(match_item(item, &candidates));
    }

    let itens: Vec<_> = matched
        .iter()
        .map(|m| {
            json!({
                "descricao": m.item.description,
                "valor": m.item.amount,
                "tipo": m.item.kind,
                "categoriaSugerida": m.item.suggested_category,
                "categoriaId": m.category.as_ref().map(|c| c.id),
                "matchFound": m.category.is_some(),
                "categoria": m.category,
                "precisaNovaCategoria": m.needs_new_category,
            })
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "correlationId": correlation_id,
            "nomeLista": result.list_name,
            "data": result.date,
            "totalEstimado": result.estimated_total,
            "itens": itens,
        })),
    )
        .into_response()
}

/// Run the scan in its own task, guarded against request abandonment.
///
/// When the client disconnects axum drops the handler future mid-await; the
/// drop guard then cancels the in-flight attempt so the pipeline still seals
/// its status-Error audit record instead of leaving the attempt unaccounted.
async fn run_scan(
    scanner: Arc<ScanService>,
    request: ScanRequest,
) -> Result<AnalysisResult, ScanError> {
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let task = tokio::spawn(async move { scanner.analyze(request, &cancel).await });
    match task.await {
        Ok(result) => result,
        Err(err) => {
            log::error!("scan task failed: {}", err);
            Err(ScanError::UpstreamUnavailable("scan task failed".to_string()))
        }
    }
}

#[derive(Deserialize)]
struct CommitBody {
    #[serde(rename = "data")]
    date: Option<NaiveDate>,
    #[serde(rename = "itens")]
    items: Vec<MatchedItem>,
}

/// POST /ai/commit - persist reviewed items (or hand back a draft when the
/// batch is a single item)
async fn commit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CommitBody>,
) -> impl IntoResponse {
    let user_id = match user_id_from(&headers) {
        Some(id) => id,
        None => return unauthorized(),
    };

    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    let committer = BatchCommitter::new(state.db.as_ref());

    match committer.commit(user_id, &body.items, date, &CancellationToken::new()) {
        Ok(CommitDecision::Draft(draft)) => (
            StatusCode::OK,
            Json(json!({ "draft": draft })),
        )
            .into_response(),
        Ok(CommitDecision::Committed(outcome)) => (
            StatusCode::OK,
            Json(json!({
                "attempted": outcome.results.len(),
                "succeeded": outcome.succeeded,
                "results": outcome
                    .results
                    .iter()
                    .map(|r| json!({
                        "descricao": r.description,
                        "transactionId": r.transaction_id,
                        "error": r.error,
                    }))
                    .collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(err) => {
            log::warn!("commit rejected for user {}: {:#}", user_id, err);
            (StatusCode::BAD_REQUEST, Json(json!({ "error": GENERIC_FAILURE }))).into_response()
        }
    }
}

#[derive(Deserialize)]
struct CreateCategoryBody {
    #[serde(rename = "nome")]
    name: String,
    #[serde(rename = "tipo")]
    kind: String,
    #[serde(rename = "itens", default)]
    items: Vec<MatchedItem>,
}

/// POST /ai/categories - create a category the review flagged as missing and
/// re-match the still-unmatched items against the updated set, without
/// another model call
async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateCategoryBody>,
) -> impl IntoResponse {
    let user_id = match user_id_from(&headers) {
        Some(id) => id,
        None => return unauthorized(),
    };

    let name = body.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": GENERIC_FAILURE })))
            .into_response();
    }

    let kind = TransactionKind::parse(&body.kind);
    let mut items = body.items;

    match create_and_rematch(state.db.as_ref(), user_id, name, kind, &mut items) {
        Ok(category) => (
            StatusCode::OK,
            Json(json!({ "categoria": category, "itens": items })),
        )
            .into_response(),
        Err(err) => {
            log::error!("failed to create category for user {}: {:#}", user_id, err);
            (StatusCode::BAD_REQUEST, Json(json!({ "error": GENERIC_FAILURE }))).into_response()
        }
    }
}

fn create_and_rematch(
    store: &dyn CategoryStore,
    user_id: i64,
    name: &str,
    kind: TransactionKind,
    items: &mut [MatchedItem],
) -> anyhow::Result<Category> {
    let category = store.create(user_id, name, kind)?;
    let candidates = store.list_by_user_and_kind(user_id, kind)?;
    rematch_pending(items, &candidates);
    Ok(category)
}

fn user_id_from(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn unauthorized() -> axum::response::Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
}

/// Accept both a bare base64 string and a `data:image/...;base64,` URI
fn decode_image_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = payload.trim();
    let encoded = match trimmed.split_once(',') {
        Some((prefix, rest)) if prefix.contains("base64") => rest,
        _ => trimmed,
    };
    base64::engine::general_purpose::STANDARD.decode(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::database::models::{ScanAuditRecord, ScanStatus};
    use crate::database::DatabaseManager;
    use crate::rate_limit::{InMemoryCounterStore, RateLimiter};
    use crate::scan::stores::AuditStore;
    use crate::scan::types::ExtractedItem;
    use crate::vision::{VisionError, VisionProvider};

    #[test]
    fn test_user_id_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id_from(&headers), None);

        headers.insert("x-user-id", "42".parse().unwrap());
        assert_eq!(user_id_from(&headers), Some(42));

        headers.insert("x-user-id", "abc".parse().unwrap());
        assert_eq!(user_id_from(&headers), None);
    }

    #[test]
    fn test_data_uri_prefix_is_stripped() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"img");
        let uri = format!("data:image/png;base64,{}", encoded);
        assert_eq!(decode_image_payload(&uri).unwrap(), b"img");
        assert_eq!(decode_image_payload(&encoded).unwrap(), b"img");
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        assert!(decode_image_payload("not base64 at all!!!").is_err());
    }

    #[test]
    fn test_create_and_rematch_resolves_pending_items() {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseManager::new(dir.path().join("test.db")).unwrap();

        let item = ExtractedItem {
            description: "Remédio".to_string(),
            amount: 30.0,
            suggested_category: "Farmácia".to_string(),
            kind: TransactionKind::Expense,
        };
        let mut items = vec![match_item(&item, &[])];
        assert!(items[0].needs_new_category);

        let category =
            create_and_rematch(&db, 1, "Farmácia", TransactionKind::Expense, &mut items).unwrap();

        assert_eq!(items[0].category.as_ref().map(|c| c.id), Some(category.id));
        assert!(!items[0].needs_new_category);
    }

    /// Provider that never answers; stands in for a slow upstream call
    struct HangingProvider;

    #[async_trait]
    impl VisionProvider for HangingProvider {
        async fn analyze_image(&self, _: &[u8], _: &str) -> Result<String, VisionError> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        records: Mutex<Vec<ScanAuditRecord>>,
    }

    impl AuditStore for RecordingAudit {
        fn append(&self, record: &ScanAuditRecord) -> anyhow::Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_abandoned_request_cancels_and_audits_the_attempt() {
        let audit = Arc::new(RecordingAudit::default());
        let scanner = Arc::new(ScanService::new(
            Arc::new(HangingProvider),
            RateLimiter::new(Box::new(InMemoryCounterStore::new()), 5, 25),
            audit.clone(),
        ));

        let request_future = tokio::spawn(run_scan(scanner, ScanRequest::new(1, vec![0xFF])));
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Client disconnect: the handler future is dropped mid-await
        request_future.abort();

        // The detached pipeline task observes the cancellation and seals
        // the audit record
        let mut recorded = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let records = audit.records.lock().unwrap();
            if let Some(record) = records.first() {
                assert_eq!(record.status, ScanStatus::Error);
                recorded = true;
                break;
            }
        }
        assert!(recorded, "no audit record written after abandonment");
    }
}
