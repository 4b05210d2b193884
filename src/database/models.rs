// Database models - categories, transactions, and scan audit records
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Whether money flows in or out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "Entrada")]
    Income,
    #[serde(rename = "Saida")]
    Expense,
}

impl TransactionKind {
    /// Wire/storage label, kept from the original Portuguese contract
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Entrada",
            TransactionKind::Expense => "Saida",
        }
    }

    /// Parse a model- or client-supplied label. Anything mentioning
    /// "entrada" or "receita" is income; everything else is an expense.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("entrada") || lowered.contains("receita") {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }
}

/// A user-owned category, read-only to the scan pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: TransactionKind,
}

/// A transaction derived from a confirmed scan item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: i64,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub category_id: i64,
}

/// Terminal status of one scan attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    /// Model output decoded and validated
    Success,
    /// Upstream rejection, malformed output, or empty result
    Failed,
    /// Transport failure, cancellation, or unexpected error
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Success => "Success",
            ScanStatus::Failed => "Failed",
            ScanStatus::Error => "Error",
        }
    }
}

/// Append-only audit record, written exactly once per scan attempt.
/// Quota rejections are the only exempt case (no upstream cost incurred).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditRecord {
    pub correlation_id: String,
    pub user_id: i64,
    pub status: ScanStatus,
    pub latency_ms: i64,
    /// Raw model text, kept so failures are diagnosable without re-querying
    pub raw_output: Option<String>,
    pub parse_error: Option<String>,
    pub processed_at: DateTime<Utc>,
}
