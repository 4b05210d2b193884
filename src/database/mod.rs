// Database module for Recibo
// Provides SQLite persistence for categories, transactions, and scan history

pub mod manager;
pub mod migrations;
pub mod models;
pub mod categories_repo;
pub mod transactions_repo;
pub mod scan_history_repo;

pub use manager::DatabaseManager;
pub use models::*;
