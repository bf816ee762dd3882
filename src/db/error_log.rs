//! Append-only failure log with admin lookup by id.
//!
//! Ids are assigned by the database at insertion and are monotonically
//! increasing across the process; gaps are allowed. Records are never
//! mutated. Only admin-gated command handling reads raw records; regular
//! users only ever see the assigned id.

use crate::db::Database;
use crate::error::BotError;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::Value;
use tracing::warn;

/// One stored failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub id: i64,
    pub chat_id: i64,
    pub extractor_id: Option<String>,
    pub message: String,
    /// Opaque context blob (request URL, extractor output, ...).
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only store of failure records.
#[derive(Clone)]
pub struct ErrorLog {
    db: Database,
}

impl ErrorLog {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a failure and return its assigned id.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if persistence is unreachable.
    pub async fn record(
        &self,
        chat_id: i64,
        extractor_id: Option<&str>,
        message: &str,
        context: &Value,
    ) -> Result<i64, BotError> {
        let extractor_id = extractor_id.map(str::to_string);
        let message = message.to_string();
        let context = context.to_string();
        let created_at = Utc::now();
        let id = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO error_log (chat_id, extractor_id, message, context, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![chat_id, extractor_id, message, context, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Store a failure without letting a logging failure cascade into the
    /// request path; returns `None` when the store itself is down, after
    /// noting that in the operational log.
    pub async fn record_best_effort(
        &self,
        chat_id: i64,
        extractor_id: Option<&str>,
        message: &str,
        context: &Value,
    ) -> Option<i64> {
        match self.record(chat_id, extractor_id, message, context).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("failed to persist error record for chat {chat_id}: {e}");
                None
            }
        }
    }

    /// Fetch a record by exact id.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if persistence is unreachable.
    pub async fn get(&self, id: i64) -> Result<Option<ErrorRecord>, BotError> {
        let record = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, chat_id, extractor_id, message, context, created_at
                     FROM error_log WHERE id = ?1",
                )?;
                let result = stmt.query_row(params![id], |row| {
                    let context_raw: String = row.get(4)?;
                    Ok(ErrorRecord {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        extractor_id: row.get(2)?,
                        message: row.get(3)?,
                        context: serde_json::from_str(&context_raw).unwrap_or(Value::Null),
                        created_at: row.get(5)?,
                    })
                });
                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        Ok(record)
    }
}
