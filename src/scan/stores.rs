// Collaborator interfaces consumed by the scan pipeline
// The pipeline treats category/transaction/audit persistence as external
// collaborators performing atomic single-record operations

use anyhow::Result;

use crate::database::models::{Category, NewTransaction, ScanAuditRecord, TransactionKind};
use crate::database::DatabaseManager;

/// Read/create access to the user's categories
pub trait CategoryStore: Send + Sync {
    fn list_by_user_and_kind(&self, user_id: i64, kind: TransactionKind) -> Result<Vec<Category>>;
    fn create(&self, user_id: i64, name: &str, kind: TransactionKind) -> Result<Category>;
}

/// Persistence for derived transactions
pub trait TransactionStore: Send + Sync {
    fn create(&self, new: &NewTransaction) -> Result<i64>;
}

/// Append-only audit trail for scan attempts
pub trait AuditStore: Send + Sync {
    fn append(&self, record: &ScanAuditRecord) -> Result<()>;
}

impl CategoryStore for DatabaseManager {
    fn list_by_user_and_kind(&self, user_id: i64, kind: TransactionKind) -> Result<Vec<Category>> {
        self.list_categories_by_kind(user_id, kind)
    }

    fn create(&self, user_id: i64, name: &str, kind: TransactionKind) -> Result<Category> {
        self.create_category(user_id, name, kind)
    }
}

impl TransactionStore for DatabaseManager {
    fn create(&self, new: &NewTransaction) -> Result<i64> {
        self.create_transaction(new)
    }
}

impl AuditStore for DatabaseManager {
    fn append(&self, record: &ScanAuditRecord) -> Result<()> {
        self.append_scan_record(record)
    }
}
