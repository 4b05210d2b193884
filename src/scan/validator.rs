// Economic-sanity check on a decoded result
// A result with no positive monetary signal anywhere is the usual symptom of
// a blank or unreadable photo and is rejected as empty

use crate::scan::types::AnalysisResult;

/// Accept a result iff the estimated total or the item amount sum is
/// strictly positive.
pub fn has_monetary_signal(result: &AnalysisResult) -> bool {
    result.estimated_total > 0.0 || result.item_sum() > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::TransactionKind;
    use crate::scan::types::ExtractedItem;
    use chrono::NaiveDate;

    fn result(estimated_total: f64, amounts: &[f64]) -> AnalysisResult {
        AnalysisResult {
            list_name: "Lista".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 8, 23).unwrap(),
            items: amounts
                .iter()
                .map(|&amount| ExtractedItem {
                    description: "Item".to_string(),
                    amount,
                    suggested_category: String::new(),
                    kind: TransactionKind::Expense,
                })
                .collect(),
            estimated_total,
        }
    }

    #[test]
    fn test_zero_total_with_no_items_is_rejected() {
        assert!(!has_monetary_signal(&result(0.0, &[])));
    }

    #[test]
    fn test_zero_total_with_zero_items_is_rejected() {
        assert!(!has_monetary_signal(&result(0.0, &[0.0, 0.0])));
    }

    #[test]
    fn test_positive_item_sum_is_accepted() {
        assert!(has_monetary_signal(&result(0.0, &[10.0])));
    }

    #[test]
    fn test_positive_total_alone_is_accepted() {
        assert!(has_monetary_signal(&result(42.0, &[])));
    }
}
