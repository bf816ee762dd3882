//! Durable counter storage backing the in-memory stats aggregator.

use crate::db::Database;
use crate::error::BotError;
use crate::stats::{Outcome, StatBucket};
use rusqlite::params;

/// Chat totals by kind, reported by `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatCounts {
    pub private: u64,
    pub group: u64,
}

/// Upsert-based persistence for `(extractor, outcome)` counters.
#[derive(Clone)]
pub struct StatsStore {
    db: Database,
}

impl StatsStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add deltas into the durable counters. Addition is commutative, so
    /// flush order across processes does not matter.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if persistence is unreachable.
    pub async fn add_counts(&self, deltas: Vec<StatBucket>) -> Result<(), BotError> {
        if deltas.is_empty() {
            return Ok(());
        }
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for bucket in &deltas {
                    tx.execute(
                        "INSERT INTO stat_counters (extractor_id, outcome, count)
                         VALUES (?1, ?2, ?3)
                         ON CONFLICT (extractor_id, outcome)
                         DO UPDATE SET count = count + excluded.count",
                        params![
                            bucket.extractor_id,
                            bucket.outcome.as_str(),
                            i64::try_from(bucket.count).unwrap_or(i64::MAX)
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Load all durable counters.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if persistence is unreachable.
    pub async fn load_counts(&self) -> Result<Vec<StatBucket>, BotError> {
        let buckets = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT extractor_id, outcome, count FROM stat_counters
                     ORDER BY extractor_id, outcome",
                )?;
                let rows = stmt.query_map([], |row| {
                    let outcome_raw: String = row.get(1)?;
                    let count: i64 = row.get(2)?;
                    Ok((row.get::<_, String>(0)?, outcome_raw, count))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    let (extractor_id, outcome_raw, count) = row?;
                    // Rows written by a future version with unknown outcomes
                    // are skipped rather than failing the whole read.
                    if let Some(outcome) = Outcome::from_str(&outcome_raw) {
                        out.push(StatBucket {
                            extractor_id,
                            outcome,
                            count: count.max(0).cast_unsigned(),
                        });
                    }
                }
                Ok(out)
            })
            .await?;
        Ok(buckets)
    }

    /// Count known chats by kind.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if persistence is unreachable.
    pub async fn chat_counts(&self) -> Result<ChatCounts, BotError> {
        let counts = self
            .db
            .connection()
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT kind, COUNT(*) FROM chats GROUP BY kind")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                let mut counts = ChatCounts::default();
                for row in rows {
                    let (kind, n) = row?;
                    let n = n.max(0).cast_unsigned();
                    if kind == "group" {
                        counts.group += n;
                    } else {
                        counts.private += n;
                    }
                }
                Ok(counts)
            })
            .await?;
        Ok(counts)
    }
}
