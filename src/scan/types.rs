// Scan pipeline types
// Wire field names keep the original Portuguese contract the web client and
// the model prompt already speak (descricao/valor/categoriaSugerida/tipo)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::database::models::{Category, TransactionKind};

/// One line extracted from the image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedItem {
    #[serde(rename = "descricao")]
    pub description: String,
    /// Non-negative; negative amounts are rejected at decode time
    #[serde(rename = "valor")]
    pub amount: f64,
    /// Free-text category suggestion from the model, possibly empty
    #[serde(rename = "categoriaSugerida")]
    pub suggested_category: String,
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
}

/// Structured result of one successful scan, held only for user review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "nomeLista")]
    pub list_name: String,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "itens")]
    pub items: Vec<ExtractedItem>,
    #[serde(rename = "totalEstimado")]
    pub estimated_total: f64,
}

impl AnalysisResult {
    pub fn item_sum(&self) -> f64 {
        self.items.iter().map(|item| item.amount).sum()
    }
}

/// An extracted item after reconciliation against the user's categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedItem {
    #[serde(flatten)]
    pub item: ExtractedItem,
    /// The reconciled category, when one was found
    #[serde(rename = "categoria")]
    pub category: Option<Category>,
    /// Set when no candidate matched; cleared by a later re-match pass
    #[serde(rename = "precisaNovaCategoria")]
    pub needs_new_category: bool,
}
