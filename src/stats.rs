//! Operational statistics aggregation.
//!
//! Increments are in-memory and synchronous so the request path never
//! blocks on persistence; a background task flushes accumulated deltas
//! to the database on an interval and once more on shutdown. Snapshots
//! merge the durable counters with the unflushed deltas, giving a
//! point-in-time view with eventual inclusion of concurrent increments.

use crate::db::stats_store::{ChatCounts, StatsStore};
use crate::error::BotError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Classification of one download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    Failure,
    /// User cancelled or the global timeout elapsed; distinct from failure.
    Cancelled,
    /// The chat had the matching extractor disabled.
    SkippedDisabled,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::SkippedDisabled => "skipped_disabled",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "cancelled" => Some(Self::Cancelled),
            "skipped_disabled" => Some(Self::SkippedDisabled),
            _ => None,
        }
    }
}

/// One `(extractor, outcome)` counter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatBucket {
    pub extractor_id: String,
    pub outcome: Outcome,
    pub count: u64,
}

/// Global counters reported alongside the per-extractor buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsTotals {
    /// All download requests seen by this process plus prior flushes.
    pub total_requests: u64,
    pub chats: ChatCounts,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Sorted by extractor id, then outcome.
    pub buckets: Vec<StatBucket>,
    pub totals: StatsTotals,
}

/// In-memory counter accumulator with batched persistence.
pub struct StatsAggregator {
    pending: Mutex<HashMap<(String, Outcome), u64>>,
    process_increments: AtomicU64,
    store: StatsStore,
}

impl StatsAggregator {
    #[must_use]
    pub fn new(store: StatsStore) -> Self {
        describe_metrics();
        Self {
            pending: Mutex::new(HashMap::new()),
            process_increments: AtomicU64::new(0),
            store,
        }
    }

    /// Record one outcome. Never blocks on persistence and never awaits;
    /// safe to call from the hottest request path.
    pub fn increment(&self, extractor_id: &str, outcome: Outcome) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending
                .entry((extractor_id.to_string(), outcome))
                .or_insert(0) += 1;
        }
        self.process_increments.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "grabbot_downloads_total",
            "extractor" => extractor_id.to_string(),
            "outcome" => outcome.as_str(),
        )
        .increment(1);
    }

    /// Outcomes recorded by this process since startup.
    #[must_use]
    pub fn process_increments(&self) -> u64 {
        self.process_increments.load(Ordering::Relaxed)
    }

    /// Merge durable counters with unflushed deltas into a snapshot.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if the durable side cannot be read.
    pub async fn snapshot(&self) -> Result<StatsSnapshot, BotError> {
        let durable = self.store.load_counts().await?;
        let chats = self.store.chat_counts().await?;

        let mut merged: HashMap<(String, Outcome), u64> = durable
            .into_iter()
            .map(|b| ((b.extractor_id, b.outcome), b.count))
            .collect();
        if let Ok(pending) = self.pending.lock() {
            for (key, count) in pending.iter() {
                *merged.entry(key.clone()).or_insert(0) += count;
            }
        }

        let mut buckets: Vec<StatBucket> = merged
            .into_iter()
            .map(|((extractor_id, outcome), count)| StatBucket {
                extractor_id,
                outcome,
                count,
            })
            .collect();
        buckets.sort_by(|a, b| {
            (a.extractor_id.as_str(), a.outcome).cmp(&(b.extractor_id.as_str(), b.outcome))
        });

        let total_requests = buckets.iter().map(|b| b.count).sum();
        Ok(StatsSnapshot {
            buckets,
            totals: StatsTotals {
                total_requests,
                chats,
            },
        })
    }

    /// Drain pending deltas into the durable counters.
    ///
    /// On persistence failure the drained deltas are merged back so no
    /// count is lost; the flush will be retried on the next tick.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if the flush could not be persisted.
    pub async fn flush(&self) -> Result<(), BotError> {
        let drained: Vec<StatBucket> = {
            let Ok(mut pending) = self.pending.lock() else {
                return Ok(());
            };
            pending
                .drain()
                .map(|((extractor_id, outcome), count)| StatBucket {
                    extractor_id,
                    outcome,
                    count,
                })
                .collect()
        };
        if drained.is_empty() {
            return Ok(());
        }

        let n = drained.len();
        match self.store.add_counts(drained.clone()).await {
            Ok(()) => {
                debug!("flushed {n} stat buckets");
                Ok(())
            }
            Err(e) => {
                if let Ok(mut pending) = self.pending.lock() {
                    for bucket in drained {
                        *pending
                            .entry((bucket.extractor_id, bucket.outcome))
                            .or_insert(0) += bucket.count;
                    }
                }
                Err(e)
            }
        }
    }

    /// Start the periodic flush task. Cancelling the token triggers one
    /// final flush before the task exits.
    pub fn spawn_flush(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let aggregator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = aggregator.flush().await {
                            warn!("stats flush failed, keeping deltas: {e}");
                        }
                    }
                    () = cancel.cancelled() => {
                        if let Err(e) = aggregator.flush().await {
                            warn!("final stats flush failed: {e}");
                        }
                        return;
                    }
                }
            }
        })
    }
}

fn describe_metrics() {
    metrics::describe_counter!(
        "grabbot_downloads_total",
        "Download attempts by extractor and outcome"
    );
}
