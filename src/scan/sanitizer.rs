// Best-effort recovery of a JSON object from free-form model text
// Extraction only - no repair of invalid JSON syntax happens here

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    // Dot matches newlines: fenced payloads span lines
    Regex::new(r"(?s)```json\s*(\{.*\})\s*```").expect("fenced JSON pattern is valid")
});

/// Extract the JSON candidate from raw model output.
///
/// Three ordered attempts: the interior of a ```json fenced block, the
/// substring between the first `{` and the last `}`, or the text unchanged.
/// The unchanged fallback fails decoding downstream and surfaces as a
/// malformed-output error rather than being silently dropped.
pub fn extract_json(raw: &str) -> &str {
    if let Some(captures) = FENCED_JSON.captures(raw) {
        if let Some(interior) = captures.get(1) {
            return interior.as_str();
        }
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            return &raw[start..=end];
        }
    }

    raw
}
