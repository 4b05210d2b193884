// Shared state for the HTTP layer

use std::sync::Arc;

use crate::database::DatabaseManager;
use crate::scan::ScanService;

/// Shared application state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// Database manager for SQLite persistence
    pub db: Arc<DatabaseManager>,
    /// Scan pipeline (quota gate, vision transport, decode, audit)
    pub scanner: Arc<ScanService>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseManager>, scanner: Arc<ScanService>) -> Self {
        Self { db, scanner }
    }
}
