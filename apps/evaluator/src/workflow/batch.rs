//! Batch Controller: runs independent work items behind a counting gate.
//!
//! At most `limit` workers are in flight; the rest wait on the semaphore.
//! Each worker runs in its own task, so a panic is recorded as a failed item
//! instead of tearing down its siblings. The report always covers every
//! input item, in input order.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome<T> {
    Success { value: T },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub outcomes: Vec<ItemOutcome<T>>,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl<T> BatchReport<T> {
    fn from_outcomes(outcomes: Vec<ItemOutcome<T>>) -> Self {
        let mut report = Self {
            succeeded: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
        };
        for outcome in &outcomes {
            match outcome {
                ItemOutcome::Success { .. } => report.succeeded += 1,
                ItemOutcome::Skipped { .. } => report.skipped += 1,
                ItemOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchController {
    limit: usize,
}

impl BatchController {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, worker: F) -> BatchReport<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ItemOutcome<T>> + Send + 'static,
    {
        let total = items.len();
        let gate = Arc::new(Semaphore::new(self.limit));
        let worker = Arc::new(worker);
        let mut tasks = JoinSet::new();

        info!("Batch of {total} items starting (limit {})", self.limit);

        for (index, item) in items.into_iter().enumerate() {
            let gate = gate.clone();
            let worker = worker.clone();
            tasks.spawn(async move {
                let Ok(_permit) = gate.acquire_owned().await else {
                    return (
                        index,
                        ItemOutcome::Failed {
                            reason: "batch gate closed".to_string(),
                        },
                    );
                };
                let outcome = match tokio::spawn(worker(item)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Batch item {index} aborted: {e}");
                        ItemOutcome::Failed {
                            reason: format!("worker aborted: {e}"),
                        }
                    }
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ItemOutcome<T>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!("Batch task lost: {e}"),
            }
        }

        let outcomes = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| ItemOutcome::Failed {
                    reason: "worker aborted".to_string(),
                })
            })
            .collect();
        let report = BatchReport::from_outcomes(outcomes);
        info!(
            "Batch finished: {} succeeded, {} skipped, {} failed",
            report.succeeded, report.skipped, report.failed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_never_exceeds_limit() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (c, p) = (current.clone(), peak.clone());
        let report = BatchController::new(5)
            .run((0..12).collect::<Vec<u64>>(), move |i| {
                let (c, p) = (c.clone(), p.clone());
                async move {
                    let now = c.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50 + i * 7)).await;
                    c.fetch_sub(1, Ordering::SeqCst);
                    ItemOutcome::Success { value: i }
                }
            })
            .await;

        assert_eq!(report.total(), 12);
        assert_eq!(report.succeeded, 12);
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(peak.load(Ordering::SeqCst), 5);
        let values: Vec<u64> = report
            .outcomes
            .iter()
            .filter_map(|o| match o {
                ItemOutcome::Success { value } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(values, (0..12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failures_and_panics_do_not_cancel_siblings() {
        let report = BatchController::new(2)
            .run(vec![1, 2, 3, 4, 5], |i: i32| async move {
                match i {
                    2 => ItemOutcome::Skipped {
                        reason: "no postings".into(),
                    },
                    3 => panic!("worker blew up"),
                    4 => ItemOutcome::Failed {
                        reason: "judge unavailable".into(),
                    },
                    _ => ItemOutcome::Success { value: i * 10 },
                }
            })
            .await;

        assert_eq!(report.total(), 5);
        assert_eq!((report.succeeded, report.skipped, report.failed), (2, 1, 2));
        assert_eq!(report.outcomes[0], ItemOutcome::Success { value: 10 });
        assert!(matches!(report.outcomes[2], ItemOutcome::Failed { .. }));
        assert_eq!(
            report.outcomes[3],
            ItemOutcome::Failed {
                reason: "judge unavailable".into()
            }
        );
        assert_eq!(report.outcomes[4], ItemOutcome::Success { value: 50 });
    }

    #[tokio::test]
    async fn test_empty_batch_and_zero_limit() {
        let empty = BatchController::new(3)
            .run(Vec::<u8>::new(), |i| async move { ItemOutcome::Success { value: i } })
            .await;
        assert_eq!(empty.total(), 0);

        let report = BatchController::new(0)
            .run(vec![1u8, 2], |i| async move { ItemOutcome::Success { value: i } })
            .await;
        assert_eq!(report.succeeded, 2);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ItemOutcome::<u8>::Skipped {
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "x");
    }
}
