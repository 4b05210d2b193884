// Decoding and field normalization for model output
// The upstream model is not bound to exact field casing, so every object key
// is lowercased through one adapter before typed deserialization - never
// per-field guessing. Missing required fields fail closed as a decode error.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::TransactionKind;
use crate::scan::types::{AnalysisResult, ExtractedItem};

/// Raw shape after key normalization (all-lowercase field names)
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    nomelista: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    totalestimado: Option<f64>,
    #[serde(default)]
    itens: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    descricao: String,
    valor: f64,
    #[serde(default)]
    categoriasugerida: String,
    #[serde(default)]
    tipo: String,
}

/// Decode a sanitized JSON candidate into an [`AnalysisResult`].
///
/// `today` is the fallback for absent or unparseable dates, matching the
/// date the instruction prompt embedded for the model.
pub fn decode_analysis(candidate: &str, today: NaiveDate) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_str(candidate)
        .context("Model output is not valid JSON")?;

    let normalized = normalize_keys(value);
    let raw: RawAnalysis = serde_json::from_value(normalized)
        .map_err(|e| anyhow!("Required fields missing after normalization: {}", e))?;

    let mut items = Vec::with_capacity(raw.itens.len());
    for item in raw.itens {
        if item.valor < 0.0 {
            // A negative amount is an extraction failure, not a refund signal
            bail!("Item '{}' has a negative amount", item.descricao);
        }
        items.push(ExtractedItem {
            description: item.descricao,
            amount: item.valor,
            suggested_category: item.categoriasugerida,
            kind: TransactionKind::parse(&item.tipo),
        });
    }

    Ok(AnalysisResult {
        list_name: raw
            .nomelista
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Nova Lista".to_string()),
        date: parse_date(raw.data.as_deref(), today),
        items,
        estimated_total: raw.totalestimado.unwrap_or(0.0),
    })
}

/// Recursively lowercase every object key
fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), normalize_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Accept `YYYY-MM-DD` (also as a prefix of a longer timestamp) and the
/// Brazilian `DD/MM/YYYY`; anything else falls back to today's date.
fn parse_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return today,
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return date;
    }

    // get() instead of indexing: the prefix cut must not land inside a
    // multibyte character of free-form model text
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date;
        }
    }

    log::warn!("Unrecognized date '{}' in model output, using today", raw);
    today
}
