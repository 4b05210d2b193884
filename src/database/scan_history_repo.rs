// Scan history repository for Recibo
// Append-only audit trail: one row per scan attempt, sealed at creation

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{ScanAuditRecord, ScanStatus};
use super::DatabaseManager;

impl DatabaseManager {
    /// Append one audit record. Records are never updated or deleted.
    pub fn append_scan_record(&self, record: &ScanAuditRecord) -> Result<()> {
        self.with_connection(|conn| append_scan_record_impl(conn, record))
    }

    /// Fetch a user's scan history, newest first
    pub fn get_scan_history(&self, user_id: i64) -> Result<Vec<ScanAuditRecord>> {
        self.with_connection(|conn| get_scan_history_impl(conn, user_id))
    }
}

fn append_scan_record_impl(conn: &Connection, record: &ScanAuditRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_history (correlation_id, user_id, status, latency_ms, raw_output, parse_error, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.correlation_id,
            record.user_id,
            record.status.as_str(),
            record.latency_ms,
            record.raw_output,
            record.parse_error,
            record.processed_at.to_rfc3339(),
        ],
    ).context("Failed to append scan record")?;

    Ok(())
}

fn get_scan_history_impl(conn: &Connection, user_id: i64) -> Result<Vec<ScanAuditRecord>> {
    let mut stmt = conn.prepare(
        "SELECT correlation_id, user_id, status, latency_ms, raw_output, parse_error, processed_at
         FROM scan_history WHERE user_id = ?1 ORDER BY processed_at DESC"
    ).context("Failed to prepare get_scan_history query")?;

    let records = stmt.query_map(params![user_id], |row| {
        let status: String = row.get(2)?;
        let processed_at: String = row.get(6)?;
        Ok(ScanAuditRecord {
            correlation_id: row.get(0)?,
            user_id: row.get(1)?,
            status: parse_status(&status),
            latency_ms: row.get(3)?,
            raw_output: row.get(4)?,
            parse_error: row.get(5)?,
            processed_at: chrono::DateTime::parse_from_rfc3339(&processed_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }).context("Failed to query scan history")?;

    records.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect scan history")
}

fn parse_status(raw: &str) -> ScanStatus {
    match raw {
        "Success" => ScanStatus::Success,
        "Failed" => ScanStatus::Failed,
        _ => ScanStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::{tempdir, TempDir};

    // The TempDir guard must outlive the open connection
    fn create_test_db() -> (TempDir, DatabaseManager) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = DatabaseManager::new(db_path).unwrap();
        (dir, db)
    }

    fn record(status: ScanStatus) -> ScanAuditRecord {
        ScanAuditRecord {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            user_id: 1,
            status,
            latency_ms: 1200,
            raw_output: Some("{\"itens\":[]}".to_string()),
            parse_error: None,
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let (_dir, db) = create_test_db();

        db.append_scan_record(&record(ScanStatus::Success)).unwrap();
        db.append_scan_record(&ScanAuditRecord {
            parse_error: Some("Empty or zero value receipt detected".to_string()),
            ..record(ScanStatus::Failed)
        }).unwrap();

        let history = db.get_scan_history(1).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|r| r.status == ScanStatus::Failed
            && r.parse_error.as_deref() == Some("Empty or zero value receipt detected")));
    }

    #[test]
    fn test_history_is_scoped_per_user() {
        let (_dir, db) = create_test_db();

        db.append_scan_record(&record(ScanStatus::Success)).unwrap();
        let history = db.get_scan_history(2).unwrap();
        assert!(history.is_empty());
    }
}
