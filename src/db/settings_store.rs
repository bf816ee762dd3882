//! Per-chat configuration store.
//!
//! A chat has at most one settings row; reading a chat that has none
//! materializes the default record. Mutations are field-level single
//! statements (`SET x = NOT x`), so concurrent toggles of unrelated
//! fields never lose updates. Rows are never deleted.

use crate::db::Database;
use crate::error::BotError;
use rusqlite::params;
use std::collections::BTreeSet;

/// Conversation kind, used for stats breakdown and panel wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

impl ChatKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }

    fn from_db(s: &str) -> Self {
        if s == "group" {
            Self::Group
        } else {
            Self::Private
        }
    }
}

/// Boolean settings fields toggled from the panel root screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleField {
    Captions,
    Silent,
    Nsfw,
    DeleteLinks,
}

impl ToggleField {
    /// Column name; the closed enum keeps field names out of caller input.
    const fn column(self) -> &'static str {
        match self {
            Self::Captions => "captions",
            Self::Silent => "silent",
            Self::Nsfw => "nsfw",
            Self::DeleteLinks => "delete_links",
        }
    }

    /// Stable token used in callback data.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Captions => "captions",
            Self::Silent => "silent",
            Self::Nsfw => "nsfw",
            Self::DeleteLinks => "delete_links",
        }
    }

    /// Parse a callback token back into a field.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "captions" => Some(Self::Captions),
            "silent" => Some(Self::Silent),
            "nsfw" => Some(Self::Nsfw),
            "delete_links" => Some(Self::DeleteLinks),
            _ => None,
        }
    }
}

/// One chat's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub chat_id: i64,
    pub kind: ChatKind,
    pub captions: bool,
    pub silent: bool,
    pub nsfw: bool,
    pub delete_links: bool,
    pub language: String,
    pub media_album_limit: u8,
    /// Extractor ids disabled for this chat. Ids without a catalog entry
    /// are retained as inert references.
    pub disabled_extractors: BTreeSet<String>,
}

impl ChatSettings {
    /// Whether downloads from the given extractor are disabled here.
    #[must_use]
    pub fn is_extractor_disabled(&self, extractor_id: &str) -> bool {
        self.disabled_extractors.contains(extractor_id)
    }

    #[must_use]
    pub const fn flag(&self, field: ToggleField) -> bool {
        match field {
            ToggleField::Captions => self.captions,
            ToggleField::Silent => self.silent,
            ToggleField::Nsfw => self.nsfw,
            ToggleField::DeleteLinks => self.delete_links,
        }
    }
}

/// Defaults applied when a chat is seen for the first time.
#[derive(Debug, Clone)]
pub struct SettingsDefaults {
    pub language: String,
    pub album_limit: u8,
}

const SELECT_ROW: &str = "SELECT c.chat_id, c.kind, s.captions, s.silent, s.nsfw, s.delete_links,
            s.language, s.media_album_limit, s.disabled_extractors
     FROM chats c JOIN chat_settings s ON s.chat_id = c.chat_id
     WHERE c.chat_id = ?1";

fn row_to_settings(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSettings> {
    let kind: String = row.get(1)?;
    let limit: i64 = row.get(7)?;
    let disabled_raw: String = row.get(8)?;
    let disabled = serde_json::from_str::<BTreeSet<String>>(&disabled_raw).unwrap_or_default();
    Ok(ChatSettings {
        chat_id: row.get(0)?,
        kind: ChatKind::from_db(&kind),
        captions: row.get(2)?,
        silent: row.get(3)?,
        nsfw: row.get(4)?,
        delete_links: row.get(5)?,
        language: row.get(6)?,
        media_album_limit: u8::try_from(limit.clamp(1, 255)).unwrap_or(1),
        disabled_extractors: disabled,
    })
}

fn ensure_row(
    conn: &rusqlite::Connection,
    chat_id: i64,
    kind: ChatKind,
    defaults: &SettingsDefaults,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO chats (chat_id, kind) VALUES (?1, ?2)",
        params![chat_id, kind.as_str()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO chat_settings (chat_id, language, media_album_limit)
         VALUES (?1, ?2, ?3)",
        params![chat_id, defaults.language, i64::from(defaults.album_limit)],
    )?;
    Ok(())
}

fn fetch_row(conn: &rusqlite::Connection, chat_id: i64) -> rusqlite::Result<ChatSettings> {
    conn.query_row(SELECT_ROW, params![chat_id], row_to_settings)
}

/// Persisted per-chat settings with field-level update semantics.
#[derive(Clone)]
pub struct ChatSettingsStore {
    db: Database,
    defaults: SettingsDefaults,
}

impl ChatSettingsStore {
    #[must_use]
    pub fn new(db: Database, defaults: SettingsDefaults) -> Self {
        Self { db, defaults }
    }

    /// Fetch a chat's settings, materializing the default record if absent.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] if persistence is unreachable;
    /// callers must not treat that as "default settings".
    pub async fn get(&self, chat_id: i64, kind: ChatKind) -> Result<ChatSettings, BotError> {
        let defaults = self.defaults.clone();
        let settings = self
            .db
            .connection()
            .call(move |conn| {
                ensure_row(conn, chat_id, kind, &defaults)?;
                Ok(fetch_row(conn, chat_id)?)
            })
            .await?;
        Ok(settings)
    }

    /// Flip one boolean field and return the fresh record.
    ///
    /// The toggle is a single SQL statement, so a concurrent toggle of a
    /// different field is never lost.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] on persistence failure.
    pub async fn toggle_flag(
        &self,
        chat_id: i64,
        field: ToggleField,
    ) -> Result<ChatSettings, BotError> {
        let defaults = self.defaults.clone();
        let col = field.column();
        let sql = format!(
            "UPDATE chat_settings SET {col} = NOT {col}, updated_at = CURRENT_TIMESTAMP
             WHERE chat_id = ?1"
        );
        let settings = self
            .db
            .connection()
            .call(move |conn| {
                ensure_row(conn, chat_id, ChatKind::Private, &defaults)?;
                conn.execute(&sql, params![chat_id])?;
                Ok(fetch_row(conn, chat_id)?)
            })
            .await?;
        Ok(settings)
    }

    /// Set the chat language.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] on persistence failure.
    pub async fn set_language(
        &self,
        chat_id: i64,
        language: &str,
    ) -> Result<ChatSettings, BotError> {
        let defaults = self.defaults.clone();
        let language = language.to_string();
        let settings = self
            .db
            .connection()
            .call(move |conn| {
                ensure_row(conn, chat_id, ChatKind::Private, &defaults)?;
                conn.execute(
                    "UPDATE chat_settings SET language = ?1, updated_at = CURRENT_TIMESTAMP
                     WHERE chat_id = ?2",
                    params![language, chat_id],
                )?;
                Ok(fetch_row(conn, chat_id)?)
            })
            .await?;
        Ok(settings)
    }

    /// Set the album item limit. The value is clamped to `1..=255` here;
    /// the instance-wide cap is applied by the caller.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] on persistence failure.
    pub async fn set_album_limit(&self, chat_id: i64, limit: u8) -> Result<ChatSettings, BotError> {
        let defaults = self.defaults.clone();
        let limit = i64::from(limit.max(1));
        let settings = self
            .db
            .connection()
            .call(move |conn| {
                ensure_row(conn, chat_id, ChatKind::Private, &defaults)?;
                conn.execute(
                    "UPDATE chat_settings SET media_album_limit = ?1, updated_at = CURRENT_TIMESTAMP
                     WHERE chat_id = ?2",
                    params![limit, chat_id],
                )?;
                Ok(fetch_row(conn, chat_id)?)
            })
            .await?;
        Ok(settings)
    }

    /// Flip membership of an extractor id in the disabled set and return
    /// the fresh record.
    ///
    /// The read-modify-write runs inside one closure on the serialized
    /// writer thread, so two rapid toggles cannot interleave.
    ///
    /// # Errors
    ///
    /// [`BotError::StoreUnavailable`] on persistence failure.
    pub async fn toggle_extractor(
        &self,
        chat_id: i64,
        extractor_id: &str,
    ) -> Result<ChatSettings, BotError> {
        let defaults = self.defaults.clone();
        let extractor_id = extractor_id.to_string();
        let settings = self
            .db
            .connection()
            .call(move |conn| {
                ensure_row(conn, chat_id, ChatKind::Private, &defaults)?;
                let raw: String = conn.query_row(
                    "SELECT disabled_extractors FROM chat_settings WHERE chat_id = ?1",
                    params![chat_id],
                    |row| row.get(0),
                )?;
                let mut set = serde_json::from_str::<BTreeSet<String>>(&raw).unwrap_or_default();
                if !set.remove(&extractor_id) {
                    set.insert(extractor_id);
                }
                let encoded = serde_json::to_string(&set)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                conn.execute(
                    "UPDATE chat_settings
                     SET disabled_extractors = ?1, updated_at = CURRENT_TIMESTAMP
                     WHERE chat_id = ?2",
                    params![encoded, chat_id],
                )?;
                Ok(fetch_row(conn, chat_id)?)
            })
            .await?;
        Ok(settings)
    }
}
