// Vision model transport
// Provider trait, the Groq chat-completions implementation, and the
// retry/circuit-breaker wrapper applied in front of it

pub mod provider;
pub mod prompt;
pub mod groq;
pub mod resilience;

pub use provider::{VisionError, VisionProvider};
pub use groq::GroqVisionProvider;
pub use resilience::ResilientVision;
