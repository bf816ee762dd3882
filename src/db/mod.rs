//! SQLite persistence layer.
//!
//! All access goes through tokio-rusqlite's single background thread, which
//! serializes writes; multi-statement operations run inside one closure and
//! are therefore atomic with respect to other callers.
//!
//! SQL migrations are compiled into the binary via refinery's
//! `embed_migrations!` and applied idempotently on open; re-running an
//! already-applied migration is a no-op tracked in refinery's history table.

pub mod error_log;
pub mod settings_store;
pub mod stats_store;

use crate::error::BotError;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::info;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::StoreUnavailable`] if the file cannot be opened
    /// or a migration fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(tokio_rusqlite::Error::from)?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            embedded::migrations::runner()
                .run(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await?;
        info!("database ready at {}", path.as_ref().display());
        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
