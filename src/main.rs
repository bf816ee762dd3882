use dotenvy::dotenv;
use grabbot::bot::handlers::{self, AppState, Command};
use grabbot::bot::{ChatGate, PanelRegistry};
use grabbot::config::Settings;
use grabbot::db::error_log::ErrorLog;
use grabbot::db::settings_store::{ChatSettingsStore, SettingsDefaults};
use grabbot::db::stats_store::StatsStore;
use grabbot::db::Database;
use grabbot::extractors::downloader::YtDlpDownloader;
use grabbot::stats::StatsAggregator;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Panel sessions expire after this long without interaction.
const PANEL_TTL_SECS: u64 = 6 * 60 * 60;
const PANEL_MAX_SESSIONS: u64 = 10_000;

/// Regex patterns for redacting the bot token from log output
struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_url
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting grabbot...");

    let settings = init_settings();

    let db = match Database::open(&settings.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database at {}: {e}", settings.database_path);
            std::process::exit(1);
        }
    };
    let store = ChatSettingsStore::new(
        db.clone(),
        SettingsDefaults {
            language: settings.default_language.clone(),
            album_limit: settings.default_album_limit,
        },
    );
    let errors = ErrorLog::new(db.clone());

    let metrics_handle = if settings.metrics_port > 0 {
        match grabbot::metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to install metrics recorder: {e}");
                None
            }
        }
    } else {
        None
    };

    let stats = Arc::new(StatsAggregator::new(StatsStore::new(db.clone())));
    let shutdown = CancellationToken::new();
    let flush_task = stats.spawn_flush(
        Duration::from_secs(settings.stats_flush_secs.max(1)),
        shutdown.clone(),
    );

    if let Some(handle) = metrics_handle {
        let port = settings.metrics_port;
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = grabbot::metrics::serve(handle, port, cancel).await {
                error!("Metrics server error: {e}");
            }
        });
    }

    let bot = Bot::new(settings.bot_token.clone());
    let state = Arc::new(AppState {
        settings: Arc::clone(&settings),
        store,
        errors,
        stats: Arc::clone(&stats),
        panels: PanelRegistry::new(PANEL_TTL_SECS, PANEL_MAX_SESSIONS),
        gate: ChatGate::new(),
        downloader: Arc::new(YtDlpDownloader::default()),
    });

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, flushing stats...");
    shutdown.cancel();
    if let Err(e) = flush_task.await {
        error!("Stats flush task failed: {e}");
    }

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(callback_entry))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(command_entry),
                )
                .branch(
                    dptree::filter(|msg: Message| {
                        msg.text().is_some() || msg.caption().is_some()
                    })
                    .endpoint(message_entry),
                ),
        )
}

async fn command_entry(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_command(bot, msg, cmd, state).await {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn callback_entry(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_callback(bot, q, state).await {
        error!("Callback error: {}", e);
    }
    respond(())
}

async fn message_entry(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(handlers::handle_message(bot, msg, state)).await {
        error!("Message handler error: {}", e);
    }
    respond(())
}
