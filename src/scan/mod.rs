// Receipt scan pipeline
// Quota gate -> vision call -> JSON recovery -> decode -> validation -> audit,
// then category matching during review and a sequential batch commit

pub mod types;
pub mod stores;
pub mod sanitizer;
pub mod decode;
pub mod validator;
pub mod matcher;
pub mod committer;
pub mod service;

pub use service::{ScanError, ScanRequest, ScanService};
pub use types::{AnalysisResult, ExtractedItem, MatchedItem};
