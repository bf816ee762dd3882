//! Telegram command, callback and message handlers.
//!
//! Routing decisions (`route_download`, `parse_error_id`) are pure
//! functions kept separate from transport so they are unit-testable.
//! The per-chat lock from [`ChatGate`] covers settings mutations only;
//! it is dropped before any Telegram I/O and never held across a
//! download dispatch.

use crate::bot::chat_gate::ChatGate;
use crate::bot::panel::{self, Action, Effect, Screen};
use crate::bot::panel_registry::PanelRegistry;
use crate::bot::resilient::{
    delete_message_best_effort, edit_message_safe_resilient, send_message_resilient,
};
use crate::config::Settings;
use crate::db::error_log::{ErrorLog, ErrorRecord};
use crate::db::settings_store::{ChatKind, ChatSettings, ChatSettingsStore};
use crate::error::BotError;
use crate::extractors::downloader::{
    resolve_redirect, DownloadError, DownloadOptions, DownloadResult, MediaDownloader,
};
use crate::extractors::registry::{self, ExtractorDescriptor};
use crate::i18n::t;
use crate::stats::{Outcome, StatsAggregator, StatsSnapshot};
use crate::utils::escape_html;
use anyhow::Result;
use lazy_regex::lazy_regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{
    Chat, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MaybeInaccessibleMessage,
};
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[allow(clippy::non_std_lazy_statics)]
static URL_RE: lazy_regex::Lazy<lazy_regex::regex::Regex> = lazy_regex!(r"https?://\S+");

/// Shared handler dependencies, injected through the dispatcher.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: ChatSettingsStore,
    pub errors: ErrorLog,
    pub stats: Arc<StatsAggregator>,
    pub panels: PanelRegistry,
    pub gate: ChatGate,
    pub downloader: Arc<dyn MediaDownloader>,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "open the settings panel")]
    Settings,
    #[command(description = "usage statistics (admin)")]
    Stats,
    #[command(description = "look up an error record by id (admin)")]
    Derr(String),
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Group
    }
}

/// All URLs found in the message text or caption, in order.
#[must_use]
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| c == ')' || c == ']' || c == '.' || c == ',')
                .to_string()
        })
        .collect()
}

/// How an incoming URL should be handled for a given chat.
#[derive(Debug)]
pub enum DownloadDecision {
    /// No extractor claims the URL; the message is ignored.
    NoMatch,
    /// A matching extractor exists but the chat disabled it.
    Disabled(&'static ExtractorDescriptor),
    /// Dispatch to the matching extractor.
    Dispatch(&'static ExtractorDescriptor),
}

/// Route a URL against the catalog and the chat's disabled set.
#[must_use]
pub fn route_download(settings: &ChatSettings, url: &str) -> DownloadDecision {
    match registry::match_url(url) {
        None => DownloadDecision::NoMatch,
        Some(ex) if settings.is_extractor_disabled(ex.id) => DownloadDecision::Disabled(ex),
        Some(ex) => DownloadDecision::Dispatch(ex),
    }
}

/// Parse the `/derr` argument into a record id.
///
/// # Errors
///
/// [`BotError::InvalidArgument`] on empty or non-numeric input.
pub fn parse_error_id(arg: &str) -> Result<i64, BotError> {
    let arg = arg.trim();
    arg.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| BotError::InvalidArgument(format!("not an error id: {arg:?}")))
}

fn main_menu_keyboard(lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback(t("SettingsButton", lang), "menu.settings"),
            InlineKeyboardButton::callback(t("ExtractorsButton", lang), "extractors"),
        ],
        vec![InlineKeyboardButton::callback(t("CloseButton", lang), "close")],
    ])
}

fn extractors_text(lang: &str) -> String {
    let mut out = t("ExtractorsMessage", lang);
    for ex in registry::visible() {
        out.push_str(&format!("\n• {} ({})", ex.display_name, ex.hosts.join(", ")));
    }
    out
}

fn back_to_menu_keyboard(lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t("BackButton", lang),
        "start",
    )]])
}

async fn chat_language(state: &AppState, chat: &Chat) -> String {
    match state.store.get(chat.id.0, chat_kind(chat)).await {
        Ok(s) => s.language,
        Err(_) => state.settings.default_language.clone(),
    }
}

/// Entry point for all commands.
///
/// # Errors
///
/// Propagates transport errors after retries are exhausted.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let user_id = user.id.0.cast_signed();
    if !state.settings.is_whitelisted(user_id) {
        debug!("ignoring command from non-whitelisted user {user_id}");
        return Ok(());
    }

    match cmd {
        Command::Start => cmd_start(&bot, &msg, &state).await,
        Command::Settings => cmd_settings(&bot, &msg, &state).await,
        Command::Stats => cmd_stats(&bot, &msg, user_id, &state).await,
        Command::Derr(arg) => cmd_derr(&bot, &msg, user_id, &arg, &state).await,
    }
}

async fn cmd_start(bot: &Bot, msg: &Message, state: &Arc<AppState>) -> Result<()> {
    let lang = chat_language(state, &msg.chat).await;
    send_message_resilient(
        bot,
        msg.chat.id,
        t("StartMessage", &lang),
        Some(main_menu_keyboard(&lang)),
    )
    .await?;
    Ok(())
}

async fn cmd_settings(bot: &Bot, msg: &Message, state: &Arc<AppState>) -> Result<()> {
    let settings = match state.store.get(msg.chat.id.0, chat_kind(&msg.chat)).await {
        Ok(s) => s,
        Err(e) => return send_store_unavailable(bot, msg.chat.id, state, &e).await,
    };
    let view = panel::render(&settings, Screen::Root);
    let sent =
        send_message_resilient(bot, msg.chat.id, view.text.clone(), Some(view.keyboard())).await?;
    state.panels.open(msg.chat.id.0, sent.id).await;
    Ok(())
}

fn format_stats(snapshot: &StatsSnapshot) -> String {
    let mut out = format!(
        "<b>Stats</b>\nRequests: {}\nChats: {} private, {} group\n",
        snapshot.totals.total_requests, snapshot.totals.chats.private, snapshot.totals.chats.group
    );
    let mut current: Option<&str> = None;
    for bucket in &snapshot.buckets {
        if current != Some(bucket.extractor_id.as_str()) {
            current = Some(bucket.extractor_id.as_str());
            out.push_str(&format!("\n<b>{}</b>", escape_html(&bucket.extractor_id)));
        }
        out.push_str(&format!("\n  {}: {}", bucket.outcome.as_str(), bucket.count));
    }
    out
}

async fn cmd_stats(bot: &Bot, msg: &Message, user_id: i64, state: &Arc<AppState>) -> Result<()> {
    let lang = chat_language(state, &msg.chat).await;
    if !state.settings.is_admin(user_id) {
        send_message_resilient(bot, msg.chat.id, t("PermissionDeniedMessage", &lang), None).await?;
        return Ok(());
    }
    match state.stats.snapshot().await {
        Ok(snapshot) => {
            send_message_resilient(bot, msg.chat.id, format_stats(&snapshot), None).await?;
        }
        Err(e) => return send_store_unavailable(bot, msg.chat.id, state, &e).await,
    }
    Ok(())
}

fn format_error_record(record: &ErrorRecord) -> String {
    let extractor = record.extractor_id.as_deref().unwrap_or("-");
    format!(
        "<b>Error #{}</b>\nChat: <code>{}</code>\nExtractor: <code>{}</code>\nAt: {}\n\n{}\n\n<pre>{}</pre>",
        record.id,
        record.chat_id,
        escape_html(extractor),
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(&record.message),
        escape_html(&record.context.to_string()),
    )
}

async fn cmd_derr(
    bot: &Bot,
    msg: &Message,
    user_id: i64,
    arg: &str,
    state: &Arc<AppState>,
) -> Result<()> {
    let lang = chat_language(state, &msg.chat).await;
    if !state.settings.is_admin(user_id) {
        send_message_resilient(bot, msg.chat.id, t("PermissionDeniedMessage", &lang), None).await?;
        return Ok(());
    }
    let id = match parse_error_id(arg) {
        Ok(id) => id,
        Err(_) => {
            send_message_resilient(bot, msg.chat.id, t("DerrUsageMessage", &lang), None).await?;
            return Ok(());
        }
    };
    match state.errors.get(id).await {
        Ok(Some(record)) => {
            send_message_resilient(bot, msg.chat.id, format_error_record(&record), None).await?;
        }
        Ok(None) => {
            send_message_resilient(bot, msg.chat.id, t("ErrorNotFoundMessage", &lang), None)
                .await?;
        }
        Err(e) => return send_store_unavailable(bot, msg.chat.id, state, &e).await,
    }
    Ok(())
}

async fn send_store_unavailable(
    bot: &Bot,
    chat_id: ChatId,
    state: &Arc<AppState>,
    e: &BotError,
) -> Result<()> {
    warn!("settings store unavailable: {e}");
    let lang = state.settings.default_language.clone();
    send_message_resilient(bot, chat_id, t("StoreUnavailableMessage", &lang), None).await?;
    Ok(())
}

async fn answer_callback(bot: &Bot, q: &CallbackQuery) {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        debug!("failed to answer callback query: {e}");
    }
}

async fn answer_callback_text(bot: &Bot, q: &CallbackQuery, text: &str) {
    if let Err(e) = bot
        .answer_callback_query(q.id.clone())
        .text(text.to_string())
        .await
    {
        debug!("failed to answer callback query: {e}");
    }
}

/// Entry point for inline keyboard callbacks.
///
/// # Errors
///
/// Propagates transport errors after retries are exhausted.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    if !state.settings.is_whitelisted(user_id) {
        answer_callback(&bot, &q).await;
        return Ok(());
    }
    let Some(data) = q.data.clone() else {
        answer_callback(&bot, &q).await;
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        answer_callback(&bot, &q).await;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let msg_id = message.id();

    // Main menu navigation, outside the panel state machine
    if data == "start" || data == "extractors" || data == "menu.settings" {
        if let Err(e) = handle_menu_nav(&bot, &state, message, &data).await {
            warn!("menu navigation failed: {e}");
            let lang = state.settings.default_language.clone();
            answer_callback_text(&bot, &q, &t("StoreUnavailableMessage", &lang)).await;
            return Ok(());
        }
        answer_callback(&bot, &q).await;
        return Ok(());
    }

    let Some(action) = Action::parse(&data) else {
        debug!("unrecognized callback payload: {data}");
        answer_callback(&bot, &q).await;
        return Ok(());
    };

    if matches!(action, Action::Close) {
        if state.panels.is_current(chat_id.0, msg_id).await {
            state.panels.close(chat_id.0).await;
        }
        delete_message_best_effort(&bot, chat_id, msg_id).await;
        answer_callback(&bot, &q).await;
        return Ok(());
    }

    // Only the chat's current panel message may drive the state machine;
    // anything else is stale and does nothing.
    let screen = match state.panels.get(chat_id.0).await {
        Some(session) if session.message_id == msg_id => session.screen,
        _ => {
            debug!(
                "dropping callback from stale panel message {} in chat {chat_id}",
                msg_id.0
            );
            answer_callback(&bot, &q).await;
            return Ok(());
        }
    };

    let view = {
        let guard = state.gate.acquire(chat_id.0).await;
        let transition = panel::apply(screen, action);
        let settings = match run_effect(&state, message, transition.effect).await {
            Ok(s) => s,
            Err(e) => {
                drop(guard);
                warn!("panel mutation failed: {e}");
                let lang = state.settings.default_language.clone();
                answer_callback_text(&bot, &q, &t("StoreUnavailableMessage", &lang)).await;
                return Ok(());
            }
        };
        state
            .panels
            .set_screen(chat_id.0, msg_id, transition.screen)
            .await;
        drop(guard);
        panel::render(&settings, transition.screen)
    };

    edit_message_safe_resilient(&bot, chat_id, msg_id, &view.text, Some(view.keyboard())).await;
    answer_callback(&bot, &q).await;
    Ok(())
}

async fn handle_menu_nav(
    bot: &Bot,
    state: &Arc<AppState>,
    message: &MaybeInaccessibleMessage,
    data: &str,
) -> Result<(), BotError> {
    let chat_id = message.chat().id;
    if data == "menu.settings" {
        // Turn this menu message into the chat's panel, superseding any
        // previous one.
        let settings = state.store.get(chat_id.0, chat_kind(message.chat())).await?;
        let view = panel::render(&settings, Screen::Root);
        edit_message_safe_resilient(bot, chat_id, message.id(), &view.text, Some(view.keyboard()))
            .await;
        state.panels.open(chat_id.0, message.id()).await;
        return Ok(());
    }

    let lang = chat_language(state, message.chat()).await;
    let (text, keyboard) = if data == "extractors" {
        (extractors_text(&lang), back_to_menu_keyboard(&lang))
    } else {
        state.panels.close(chat_id.0).await;
        (t("StartMessage", &lang), main_menu_keyboard(&lang))
    };
    edit_message_safe_resilient(bot, chat_id, message.id(), &text, Some(keyboard)).await;
    Ok(())
}

async fn run_effect(
    state: &Arc<AppState>,
    message: &MaybeInaccessibleMessage,
    effect: Effect,
) -> Result<ChatSettings, BotError> {
    let chat = message.chat();
    let chat_id = chat.id.0;
    match effect {
        Effect::None | Effect::ClosePanel => state.store.get(chat_id, chat_kind(chat)).await,
        Effect::Toggle(field) => state.store.toggle_flag(chat_id, field).await,
        Effect::SetLanguage(code) => {
            if crate::i18n::is_supported(&code) {
                state.store.set_language(chat_id, &code).await
            } else {
                state.store.get(chat_id, chat_kind(chat)).await
            }
        }
        Effect::SetAlbumLimit(n) => {
            let limit = state.settings.clamp_album_limit(n);
            state.store.set_album_limit(chat_id, limit).await
        }
        Effect::ToggleExtractor(id) => {
            if registry::get(&id).is_some() {
                state.store.toggle_extractor(chat_id, &id).await
            } else {
                // Stale button for an extractor that left the catalog
                state.store.get(chat_id, chat_kind(chat)).await
            }
        }
    }
}

/// Entry point for plain messages: extract a URL and run the download flow.
///
/// # Errors
///
/// Propagates transport errors after retries are exhausted.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let user_id = user.id.0.cast_signed();
    if !state.settings.is_whitelisted(user_id) {
        return Ok(());
    }
    let urls = msg
        .text()
        .or_else(|| msg.caption())
        .map(extract_urls)
        .unwrap_or_default();
    if urls.is_empty() {
        return Ok(());
    }

    let settings = match state.store.get(msg.chat.id.0, chat_kind(&msg.chat)).await {
        Ok(s) => s,
        Err(e) => return send_store_unavailable(&bot, msg.chat.id, &state, &e).await,
    };

    // Every URL in the message gets its own routing decision and dispatch.
    for url in &urls {
        match route_download(&settings, url) {
            DownloadDecision::NoMatch => {}
            DownloadDecision::Disabled(ex) => {
                state.stats.increment(ex.id, Outcome::SkippedDisabled);
                send_message_resilient(
                    &bot,
                    msg.chat.id,
                    t("SkippedDisabledMessage", &settings.language),
                    None,
                )
                .await?;
            }
            DownloadDecision::Dispatch(ex) => {
                run_download(&bot, &msg, &state, &settings, ex, url).await?;
            }
        }
    }
    Ok(())
}

async fn run_download(
    bot: &Bot,
    msg: &Message,
    state: &Arc<AppState>,
    settings: &ChatSettings,
    extractor: &'static ExtractorDescriptor,
    url: &str,
) -> Result<()> {
    let lang = settings.language.as_str();
    let progress = send_message_resilient(
        bot,
        msg.chat.id,
        t("ProcessingMessage", lang),
        None,
    )
    .await?;

    let final_url = if extractor.redirect {
        match resolve_redirect(url).await {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("redirect resolution failed for {url}: {e}");
                url.to_string()
            }
        }
    } else {
        url.to_string()
    };

    let opts = DownloadOptions {
        out_dir: PathBuf::from(&state.settings.downloads_dir).join(msg.chat.id.0.to_string()),
        max_items: state.settings.clamp_album_limit(settings.media_album_limit),
        max_file_size: state.settings.max_file_size,
    };
    let cancel = CancellationToken::new();
    let timeout = Duration::from_secs(state.settings.download_timeout_secs);

    info!("downloading {final_url} via {} for chat {}", extractor.id, msg.chat.id);
    let outcome = match tokio::time::timeout(
        timeout,
        state.downloader.download(&final_url, &opts, &cancel),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            Err(DownloadError::Timeout)
        }
    };

    match outcome {
        Ok(result) => {
            deliver_files(bot, msg, settings, &result).await?;
            delete_message_best_effort(bot, msg.chat.id, progress.id).await;
            if settings.delete_links {
                delete_message_best_effort(bot, msg.chat.id, msg.id).await;
            }
            state.stats.increment(extractor.id, Outcome::Success);
            cleanup_files(&result).await;
            Ok(())
        }
        Err(DownloadError::Cancelled | DownloadError::Timeout) => {
            state.stats.increment(extractor.id, Outcome::Cancelled);
            edit_message_safe_resilient(
                bot,
                msg.chat.id,
                progress.id,
                &t("CancelledMessage", lang),
                None,
            )
            .await;
            Ok(())
        }
        Err(e) => {
            state.stats.increment(extractor.id, Outcome::Failure);
            let record_id = log_failure(state, msg.chat.id.0, extractor.id, url, &e).await;
            let text = match record_id {
                Some(id) => format!("{} (#{id})", t("ErrorMessage", lang)),
                None => t("ErrorMessage", lang),
            };
            edit_message_safe_resilient(bot, msg.chat.id, progress.id, &text, None).await;
            Ok(())
        }
    }
}

async fn log_failure(
    state: &Arc<AppState>,
    chat_id: i64,
    extractor_id: &str,
    url: &str,
    error: &DownloadError,
) -> Option<i64> {
    let context = serde_json::json!({
        "url": url,
        "kind": match error {
            DownloadError::Fatal(_) => "fatal",
            _ => "retryable",
        },
    });
    state
        .errors
        .record_best_effort(chat_id, Some(extractor_id), &error.to_string(), &context)
        .await
}

fn media_caption(settings: &ChatSettings, result: &DownloadResult) -> Option<String> {
    if !settings.captions {
        return None;
    }
    let title = escape_html(&result.title);
    let uploader = escape_html(&result.uploader);
    let caption = match (title.is_empty(), uploader.is_empty()) {
        (true, true) => return None,
        (false, true) => format!("<b>{title}</b>"),
        (true, false) => format!("<i>{uploader}</i>"),
        (false, false) => format!("<b>{title}</b>\n<i>{uploader}</i>"),
    };
    Some(crate::utils::truncate_str(caption, 1000))
}

async fn deliver_files(
    bot: &Bot,
    msg: &Message,
    settings: &ChatSettings,
    result: &DownloadResult,
) -> Result<()> {
    use teloxide::types::ParseMode;

    let caption = media_caption(settings, result);
    for (index, file) in result.files.iter().enumerate() {
        let input = InputFile::file(file.path.clone());
        // Caption only the first item of an album
        let caption = caption.as_ref().filter(|_| index == 0);
        match file.media_type.as_str() {
            "video" => {
                let mut req = bot
                    .send_video(msg.chat.id, input)
                    .disable_notification(settings.silent);
                if let Some(c) = caption {
                    req = req.caption(c.clone()).parse_mode(ParseMode::Html);
                }
                req.await?;
            }
            "audio" => {
                let mut req = bot
                    .send_audio(msg.chat.id, input)
                    .disable_notification(settings.silent);
                if let Some(c) = caption {
                    req = req.caption(c.clone()).parse_mode(ParseMode::Html);
                }
                req.await?;
            }
            _ => {
                let mut req = bot
                    .send_document(msg.chat.id, input)
                    .disable_notification(settings.silent);
                if let Some(c) = caption {
                    req = req.caption(c.clone()).parse_mode(ParseMode::Html);
                }
                req.await?;
            }
        }
    }
    Ok(())
}

async fn cleanup_files(result: &DownloadResult) {
    for file in &result.files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            debug!("cannot remove {}: {e}", file.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_settings() -> ChatSettings {
        ChatSettings {
            chat_id: 1,
            kind: ChatKind::Private,
            captions: true,
            silent: false,
            nsfw: false,
            delete_links: false,
            language: "en".to_string(),
            media_album_limit: 10,
            disabled_extractors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_extract_urls() {
        assert_eq!(
            extract_urls("check https://youtu.be/abc out"),
            vec!["https://youtu.be/abc".to_string()]
        );
        assert_eq!(
            extract_urls("(https://youtu.be/abc)"),
            vec!["https://youtu.be/abc".to_string()]
        );
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_extract_urls_returns_every_link() {
        let urls = extract_urls(
            "first https://youtu.be/abc then https://www.tiktok.com/@u/video/2 done",
        );
        assert_eq!(
            urls,
            vec![
                "https://youtu.be/abc".to_string(),
                "https://www.tiktok.com/@u/video/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_route_download() {
        let mut settings = sample_settings();
        let url = "https://www.youtube.com/watch?v=abc";

        match route_download(&settings, url) {
            DownloadDecision::Dispatch(ex) => assert_eq!(ex.id, "youtube"),
            other => panic!("expected dispatch, got {other:?}"),
        }

        settings.disabled_extractors.insert("youtube".to_string());
        match route_download(&settings, url) {
            DownloadDecision::Disabled(ex) => assert_eq!(ex.id, "youtube"),
            other => panic!("expected disabled, got {other:?}"),
        }

        assert!(matches!(
            route_download(&settings, "https://example.com/x"),
            DownloadDecision::NoMatch
        ));
    }

    #[test]
    fn test_parse_error_id() {
        assert_eq!(parse_error_id("42").ok(), Some(42));
        assert_eq!(parse_error_id("  7 ").ok(), Some(7));
        assert!(parse_error_id("").is_err());
        assert!(parse_error_id("abc").is_err());
        assert!(parse_error_id("-3").is_err());
        assert!(parse_error_id("0").is_err());
    }

    #[test]
    fn test_media_caption_respects_settings() {
        let mut settings = sample_settings();
        let result = DownloadResult {
            content_id: "x".to_string(),
            title: "A <b>clip</b>".to_string(),
            uploader: "someone".to_string(),
            description: String::new(),
            files: Vec::new(),
        };
        let caption = media_caption(&settings, &result).expect("caption present");
        assert!(caption.contains("&lt;b&gt;"));
        assert!(caption.contains("someone"));

        settings.captions = false;
        assert_eq!(media_caption(&settings, &result), None);
    }
}
