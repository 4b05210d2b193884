// Batch commit of reviewed scan items
// One reviewed item becomes an editable draft for the caller; two or more are
// persisted sequentially, and one bad item never rolls back its siblings

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::database::models::NewTransaction;
use crate::scan::stores::TransactionStore;
use crate::scan::types::MatchedItem;

/// What the commit step decided to do with the reviewed items
#[derive(Debug)]
pub enum CommitDecision {
    /// Single item: handed back prefilled for manual confirmation,
    /// nothing persisted
    Draft(NewTransaction),
    /// Two or more items: persisted one by one
    Committed(CommitOutcome),
}

/// Per-item record of a batch commit
#[derive(Debug)]
pub struct ItemCommitResult {
    pub description: String,
    pub transaction_id: Option<i64>,
    pub error: Option<String>,
}

/// Aggregate outcome of a batch commit.
///
/// `results` covers attempted items only; a cancellation mid-batch leaves the
/// remaining items untouched and unlisted.
#[derive(Debug)]
pub struct CommitOutcome {
    pub results: Vec<ItemCommitResult>,
    pub succeeded: usize,
    pub cancelled: bool,
}

impl CommitOutcome {
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded
    }
}

pub struct BatchCommitter<'a> {
    store: &'a dyn TransactionStore,
}

impl<'a> BatchCommitter<'a> {
    pub fn new(store: &'a dyn TransactionStore) -> Self {
        Self { store }
    }

    /// Commit reviewed items dated `date` for `user_id`.
    ///
    /// Every item must carry a reconciled category. An empty batch is an
    /// error; callers should not reach this point without items.
    pub fn commit(
        &self,
        user_id: i64,
        items: &[MatchedItem],
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<CommitDecision> {
        match items {
            [] => Err(anyhow!("Nothing to commit")),
            [single] => Ok(CommitDecision::Draft(to_new_transaction(
                user_id, date, single,
            )?)),
            many => Ok(CommitDecision::Committed(
                self.commit_batch(user_id, many, date, cancel),
            )),
        }
    }

    fn commit_batch(
        &self,
        user_id: i64,
        items: &[MatchedItem],
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> CommitOutcome {
        let mut results = Vec::with_capacity(items.len());
        let mut succeeded = 0;
        let mut cancelled = false;

        for matched in items {
            if cancel.is_cancelled() {
                log::warn!(
                    "batch commit cancelled for user {} after {} of {} items",
                    user_id,
                    results.len(),
                    items.len()
                );
                cancelled = true;
                break;
            }

            let attempt = to_new_transaction(user_id, date, matched)
                .and_then(|new| self.store.create(&new));

            match attempt {
                Ok(id) => {
                    succeeded += 1;
                    results.push(ItemCommitResult {
                        description: matched.item.description.clone(),
                        transaction_id: Some(id),
                        error: None,
                    });
                }
                Err(err) => {
                    log::error!(
                        "failed to commit item '{}' for user {}: {:#}",
                        matched.item.description,
                        user_id,
                        err
                    );
                    results.push(ItemCommitResult {
                        description: matched.item.description.clone(),
                        transaction_id: None,
                        error: Some(format!("{:#}", err)),
                    });
                }
            }
        }

        if succeeded < results.len() {
            log::warn!(
                "batch commit for user {} finished partially: {} of {} persisted",
                user_id,
                succeeded,
                results.len()
            );
        }

        CommitOutcome {
            results,
            succeeded,
            cancelled,
        }
    }
}

fn to_new_transaction(
    user_id: i64,
    date: NaiveDate,
    matched: &MatchedItem,
) -> Result<NewTransaction> {
    let category = matched
        .category
        .as_ref()
        .ok_or_else(|| anyhow!("Item '{}' has no category", matched.item.description))?;

    Ok(NewTransaction {
        user_id,
        description: matched.item.description.clone(),
        amount: matched.item.amount,
        date,
        kind: matched.item.kind,
        category_id: category.id,
    })
}
