//! At-most-one open settings panel per chat.
//!
//! Opening a panel supersedes any previous one: the registry keeps only
//! the latest panel message id, and callbacks arriving from an older
//! message fail the `is_current` check and become no-ops. Entries expire
//! on a TTL, matching Telegram's own expiry of old inline keyboards.

use crate::bot::panel::Screen;
use moka::future::Cache;
use std::time::Duration;
use teloxide::types::MessageId;

/// Live panel state for one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSession {
    pub message_id: MessageId,
    pub screen: Screen,
}

/// Cache of chat id -> open panel session.
#[derive(Clone)]
pub struct PanelRegistry {
    sessions: Cache<i64, PanelSession>,
}

impl PanelRegistry {
    #[must_use]
    pub fn new(ttl_secs: u64, max_capacity: u64) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { sessions }
    }

    /// Register a freshly sent panel, superseding any previous one.
    pub async fn open(&self, chat_id: i64, message_id: MessageId) {
        self.sessions
            .insert(
                chat_id,
                PanelSession {
                    message_id,
                    screen: Screen::Root,
                },
            )
            .await;
    }

    pub async fn get(&self, chat_id: i64) -> Option<PanelSession> {
        self.sessions.get(&chat_id).await
    }

    /// Whether the callback's source message is the chat's current panel.
    pub async fn is_current(&self, chat_id: i64, message_id: MessageId) -> bool {
        self.sessions
            .get(&chat_id)
            .await
            .is_some_and(|s| s.message_id == message_id)
    }

    /// Record the screen the current panel now shows.
    pub async fn set_screen(&self, chat_id: i64, message_id: MessageId, screen: Screen) {
        self.sessions
            .insert(
                chat_id,
                PanelSession { message_id, screen },
            )
            .await;
    }

    /// Drop the panel state, e.g. after the message was deleted.
    pub async fn close(&self, chat_id: i64) {
        self.sessions.invalidate(&chat_id).await;
    }
}
