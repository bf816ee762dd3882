//! grabbot: a Telegram bot that fetches media from links posted in chat.
//!
//! The crate is split into a transport-facing `bot` layer (commands,
//! inline settings panel, message handling), a persistence layer under
//! `db`, the static extractor catalog and download collaborator under
//! `extractors`, and cross-cutting stats, i18n and metrics modules.

pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod i18n;
pub mod metrics;
pub mod stats;
pub mod utils;
