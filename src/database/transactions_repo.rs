// Transactions repository for Recibo
// Single-record inserts used by the batch committer; treated as atomic

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::NewTransaction;
use super::DatabaseManager;

impl DatabaseManager {
    /// Persist one transaction and return its assigned id
    pub fn create_transaction(&self, new: &NewTransaction) -> Result<i64> {
        self.with_connection(|conn| create_transaction_impl(conn, new))
    }

    /// Count a user's transactions (used by tests and summaries)
    pub fn count_transactions(&self, user_id: i64) -> Result<i64> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .context("Failed to count transactions")
        })
    }
}

fn create_transaction_impl(conn: &Connection, new: &NewTransaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (user_id, description, amount, date, kind, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.user_id,
            new.description,
            new.amount,
            new.date.format("%Y-%m-%d").to_string(),
            new.kind.as_str(),
            new.category_id,
        ],
    ).context("Failed to create transaction")?;

    Ok(conn.last_insert_rowid())
}
