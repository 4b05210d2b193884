// Category reconciliation
// Matches each extracted item's suggested label against the user's real
// categories. Pure and re-runnable: when the user creates a missing category
// mid-review, unmatched items are re-evaluated without another model call.

use crate::database::models::Category;
use crate::scan::types::{ExtractedItem, MatchedItem};

/// Reconcile one item against the candidate categories.
///
/// Candidates are filtered to the item's flow direction first. Matching
/// order: case-insensitive exact name equality, then case-insensitive
/// bidirectional substring containment. No match flags the item as needing
/// a new category.
///
/// The containment rule can false-positive on short names ("Casa" matching
/// "Casamento"); kept as-is, there is no word-boundary contract to honor.
pub fn match_item(item: &ExtractedItem, candidates: &[Category]) -> MatchedItem {
    let category = find_category(item, candidates);
    MatchedItem {
        needs_new_category: category.is_none() && !item.suggested_category.trim().is_empty(),
        category,
        item: item.clone(),
    }
}

/// Re-evaluate still-unmatched items against an updated candidate set
pub fn rematch_pending(items: &mut [MatchedItem], candidates: &[Category]) {
    for matched in items.iter_mut() {
        if matched.category.is_some() {
            continue;
        }
        if let Some(category) = find_category(&matched.item, candidates) {
            matched.category = Some(category);
            matched.needs_new_category = false;
        }
    }
}

fn find_category(item: &ExtractedItem, candidates: &[Category]) -> Option<Category> {
    let suggestion = item.suggested_category.trim().to_lowercase();
    if suggestion.is_empty() {
        return None;
    }

    let scoped: Vec<&Category> = candidates
        .iter()
        .filter(|candidate| candidate.kind == item.kind)
        .collect();

    if let Some(exact) = scoped
        .iter()
        .find(|candidate| candidate.name.to_lowercase() == suggestion)
    {
        return Some((*exact).clone());
    }

    scoped
        .iter()
        .find(|candidate| {
            let name = candidate.name.to_lowercase();
            name.contains(&suggestion) || suggestion.contains(&name)
        })
        .map(|candidate| (*candidate).clone())
}
