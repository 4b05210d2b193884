// Categories repository for Recibo
// Read/create access used by the scan review flow; CRUD beyond this lives
// with the ordinary persistence collaborators

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{Category, TransactionKind};
use super::DatabaseManager;

impl DatabaseManager {
    /// Get all categories of one flow direction owned by a user
    pub fn list_categories_by_kind(
        &self,
        user_id: i64,
        kind: TransactionKind,
    ) -> Result<Vec<Category>> {
        self.with_connection(|conn| list_categories_by_kind_impl(conn, user_id, kind))
    }

    /// Create a new category and return it with its assigned id
    pub fn create_category(
        &self,
        user_id: i64,
        name: &str,
        kind: TransactionKind,
    ) -> Result<Category> {
        self.with_connection(|conn| create_category_impl(conn, user_id, name, kind))
    }
}

fn list_categories_by_kind_impl(
    conn: &Connection,
    user_id: i64,
    kind: TransactionKind,
) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, kind FROM categories WHERE user_id = ?1 AND kind = ?2 ORDER BY name ASC"
    ).context("Failed to prepare list_categories_by_kind query")?;

    let categories = stmt.query_map(params![user_id, kind.as_str()], |row| {
        Ok(Category {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            kind: TransactionKind::parse(&row.get::<_, String>(3)?),
        })
    }).context("Failed to query categories")?;

    categories.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect categories")
}

fn create_category_impl(
    conn: &Connection,
    user_id: i64,
    name: &str,
    kind: TransactionKind,
) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (user_id, name, kind) VALUES (?1, ?2, ?3)",
        params![user_id, name, kind.as_str()],
    ).context("Failed to create category")?;

    Ok(Category {
        id: conn.last_insert_rowid(),
        user_id,
        name: name.to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    // The TempDir guard must outlive the open connection
    fn create_test_db() -> (TempDir, DatabaseManager) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = DatabaseManager::new(db_path).unwrap();
        (dir, db)
    }

    #[test]
    fn test_create_and_list_by_kind() {
        let (_dir, db) = create_test_db();

        db.create_category(1, "Mercado", TransactionKind::Expense).unwrap();
        db.create_category(1, "Salário", TransactionKind::Income).unwrap();
        db.create_category(2, "Farmácia", TransactionKind::Expense).unwrap();

        let expenses = db.list_categories_by_kind(1, TransactionKind::Expense).unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].name, "Mercado");

        let income = db.list_categories_by_kind(1, TransactionKind::Income).unwrap();
        assert_eq!(income.len(), 1);
        assert_eq!(income[0].name, "Salário");
    }

    #[test]
    fn test_created_category_carries_assigned_id() {
        let (_dir, db) = create_test_db();

        let category = db.create_category(1, "Restaurante", TransactionKind::Expense).unwrap();
        assert!(category.id > 0);
        assert_eq!(category.user_id, 1);
    }
}
