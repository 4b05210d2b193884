// Recibo - receipt scan backend
//
// Converts a photo of a receipt or handwritten expense list into structured
// financial transactions using an external vision-capable LLM:
// - Per-user quota gate before any external call
// - Resilient chat-completion transport (retry + circuit breaker)
// - Best-effort JSON recovery from untrusted model output
// - Category reconciliation against the user's own categories
// - Sequential, partial-failure-tolerant transaction commit

pub mod config;
pub mod rate_limit;
pub mod vision;
pub mod scan;
pub mod database;
pub mod server;
pub mod state;

pub use config::ScanConfig;
pub use rate_limit::{CounterStore, InMemoryCounterStore, RateLimiter};
pub use vision::provider::{VisionError, VisionProvider};
pub use vision::groq::GroqVisionProvider;
pub use vision::resilience::ResilientVision;
pub use scan::service::{ScanError, ScanRequest, ScanService};
pub use scan::types::{AnalysisResult, ExtractedItem, MatchedItem};
pub use scan::committer::{BatchCommitter, CommitDecision, CommitOutcome};
pub use database::DatabaseManager;
