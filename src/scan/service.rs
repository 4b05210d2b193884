// Scan orchestration
// Quota gate first (a rejection never reaches the provider), then the vision
// call under a cancellation token, then JSON recovery, decode and validation.
// Every attempt that reaches the provider leaves exactly one audit record.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::database::models::{ScanAuditRecord, ScanStatus};
use crate::rate_limit::RateLimiter;
use crate::scan::decode::decode_analysis;
use crate::scan::sanitizer::extract_json;
use crate::scan::stores::AuditStore;
use crate::scan::types::AnalysisResult;
use crate::scan::validator::has_monetary_signal;
use crate::vision::{VisionError, VisionProvider};

/// Error types for one scan attempt
#[derive(Debug)]
pub enum ScanError {
    /// Per-minute or per-day quota exhausted; no upstream call was made
    QuotaExceeded,
    /// Transport failure after retries, or an unusable provider envelope
    UpstreamUnavailable(String),
    /// Non-2xx provider response; never retried
    UpstreamRejected { status: u16 },
    /// Provider text did not decode into a usable result
    MalformedOutput(String),
    /// Decoded result carries no positive monetary signal
    EmptyResult,
    /// Caller abandoned the attempt mid-flight
    Cancelled,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::QuotaExceeded => write!(f, "Scan quota exceeded"),
            ScanError::UpstreamUnavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            ScanError::UpstreamRejected { status } => {
                write!(f, "Provider rejected request with status {}", status)
            }
            ScanError::MalformedOutput(msg) => write!(f, "Unusable model output: {}", msg),
            ScanError::EmptyResult => write!(f, "No financial data found in image"),
            ScanError::Cancelled => write!(f, "Scan cancelled"),
        }
    }
}

impl std::error::Error for ScanError {}

/// One scan attempt
#[derive(Debug)]
pub struct ScanRequest {
    pub user_id: i64,
    pub image: Vec<u8>,
    /// Traces the attempt through logs and the audit trail
    pub correlation_id: String,
}

impl ScanRequest {
    pub fn new(user_id: i64, image: Vec<u8>) -> Self {
        Self {
            user_id,
            image,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

pub struct ScanService {
    provider: Arc<dyn VisionProvider>,
    limiter: RateLimiter,
    audit: Arc<dyn AuditStore>,
}

impl ScanService {
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        limiter: RateLimiter,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            provider,
            limiter,
            audit,
        }
    }

    /// Run one image through the pipeline.
    ///
    /// Quota rejections return before any upstream call and leave no audit
    /// record. Every other outcome, success or not, is audited once.
    pub async fn analyze(
        &self,
        request: ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, ScanError> {
        if !self.limiter.allow(request.user_id) {
            log::warn!(
                "[{}] scan rejected by quota for user {}",
                request.correlation_id,
                request.user_id
            );
            return Err(ScanError::QuotaExceeded);
        }

        log::info!(
            "[{}] starting scan for user {} ({} bytes)",
            request.correlation_id,
            request.user_id,
            request.image.len()
        );
        let started = Instant::now();

        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.record(&request, started, ScanStatus::Error, None, Some("cancelled"));
                return Err(ScanError::Cancelled);
            }
            result = self.provider.analyze_image(&request.image, &request.correlation_id) => {
                match result {
                    Ok(raw) => raw,
                    Err(err) => return Err(self.fail_upstream(&request, started, err)),
                }
            }
        };

        let candidate = extract_json(&raw);
        let result = match decode_analysis(candidate, Utc::now().date_naive()) {
            Ok(result) => result,
            Err(err) => {
                let detail = format!("{:#}", err);
                self.record(
                    &request,
                    started,
                    ScanStatus::Failed,
                    Some(&raw),
                    Some(&detail),
                );
                return Err(ScanError::MalformedOutput(detail));
            }
        };

        if !has_monetary_signal(&result) {
            self.record(
                &request,
                started,
                ScanStatus::Failed,
                Some(&raw),
                Some("no monetary signal in decoded result"),
            );
            return Err(ScanError::EmptyResult);
        }

        self.record(&request, started, ScanStatus::Success, Some(&raw), None);
        log::info!(
            "[{}] scan succeeded: {} items, estimated total {:.2}",
            request.correlation_id,
            result.items.len(),
            result.estimated_total
        );
        Ok(result)
    }

    fn fail_upstream(
        &self,
        request: &ScanRequest,
        started: Instant,
        err: VisionError,
    ) -> ScanError {
        let detail = err.to_string();
        match err {
            VisionError::Rejected { status, .. } => {
                self.record(request, started, ScanStatus::Failed, None, Some(&detail));
                ScanError::UpstreamRejected { status }
            }
            // Transport failures and unusable envelopes both mean the
            // provider gave us nothing to parse
            VisionError::Unavailable(_) | VisionError::BadPayload(_) => {
                self.record(request, started, ScanStatus::Error, None, Some(&detail));
                ScanError::UpstreamUnavailable(detail)
            }
        }
    }

    /// Audit write failures are logged, never surfaced: the scan outcome
    /// already belongs to the caller at this point.
    fn record(
        &self,
        request: &ScanRequest,
        started: Instant,
        status: ScanStatus,
        raw_output: Option<&str>,
        parse_error: Option<&str>,
    ) {
        let record = ScanAuditRecord {
            correlation_id: request.correlation_id.clone(),
            user_id: request.user_id,
            status,
            latency_ms: started.elapsed().as_millis() as i64,
            raw_output: raw_output.map(str::to_string),
            parse_error: parse_error.map(str::to_string),
            processed_at: Utc::now(),
        };
        if let Err(err) = self.audit.append(&record) {
            log::error!(
                "[{}] failed to append scan audit record: {:#}",
                request.correlation_id,
                err
            );
        }
    }
}
