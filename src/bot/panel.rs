//! Inline settings panel: screens, actions, transitions and rendering.
//!
//! Callback payloads are dotted tokens (`settings.toggle.captions`,
//! `settings.extractor.tiktok`, ...) parsed into a closed [`Action`] enum;
//! anything unrecognized, and any action not valid for the current screen,
//! degrades to a no-op that re-renders the screen unchanged. That makes
//! duplicate or stale callback delivery harmless.
//!
//! Rendering is a pure function of `(ChatSettings, Screen)` plus the static
//! extractor catalog and locale tables, so re-rendering after any mutation
//! is deterministic.

use crate::config::ALBUM_LIMIT_CHOICES;
use crate::db::settings_store::{ChatKind, ChatSettings, ToggleField};
use crate::extractors::registry;
use crate::i18n::{available_languages, t};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Extractor rows shown per page of the extractor list.
pub const EXTRACTORS_PER_PAGE: usize = 8;

/// Panel screens. Every non-root screen has a single "back" transition
/// to [`Screen::Root`]; there is no deeper nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Root,
    ExtractorList { page: usize },
    LanguagePicker,
    AlbumLimitPicker,
}

/// The closed set of panel actions carried in callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Flip a boolean settings field (valid on the root screen).
    Toggle(ToggleField),
    OpenLanguages,
    OpenAlbumLimit,
    OpenExtractors,
    SetLanguage(String),
    SetAlbumLimit(u8),
    ToggleExtractor(String),
    /// Jump to a page of the extractor list.
    Page(usize),
    /// Return to the root screen.
    Back,
    /// Dismiss the panel message.
    Close,
}

impl Action {
    /// Serialize into callback data. `parse` inverts this exactly.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Toggle(field) => format!("settings.toggle.{}", field.token()),
            Self::OpenLanguages => "settings.select.language".to_string(),
            Self::OpenAlbumLimit => "settings.select.album_limit".to_string(),
            Self::OpenExtractors => "settings.select.disabled_extractors".to_string(),
            Self::SetLanguage(code) => format!("settings.language.{code}"),
            Self::SetAlbumLimit(n) => format!("settings.album.{n}"),
            Self::ToggleExtractor(id) => format!("settings.extractor.{id}"),
            Self::Page(n) => format!("settings.page.{n}"),
            Self::Back => "settings".to_string(),
            Self::Close => "close".to_string(),
        }
    }

    /// Parse callback data. Unknown payloads yield `None`, which callers
    /// map to the no-op policy.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "settings" => return Some(Self::Back),
            "close" => return Some(Self::Close),
            "settings.select.language" => return Some(Self::OpenLanguages),
            "settings.select.album_limit" => return Some(Self::OpenAlbumLimit),
            "settings.select.disabled_extractors" => return Some(Self::OpenExtractors),
            _ => {}
        }
        let rest = data.strip_prefix("settings.")?;
        let (kind, param) = rest.split_once('.')?;
        match kind {
            "toggle" => ToggleField::from_token(param).map(Self::Toggle),
            "language" if !param.is_empty() => Some(Self::SetLanguage(param.to_string())),
            "album" => param.parse::<u8>().ok().map(Self::SetAlbumLimit),
            "extractor" if !param.is_empty() => Some(Self::ToggleExtractor(param.to_string())),
            "page" => param.parse::<usize>().ok().map(Self::Page),
            _ => None,
        }
    }
}

/// Store mutation requested by a transition, executed by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Toggle(ToggleField),
    SetLanguage(String),
    SetAlbumLimit(u8),
    ToggleExtractor(String),
    /// Delete the panel message and drop the panel state.
    ClosePanel,
}

/// Result of applying an action to a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub screen: Screen,
    pub effect: Effect,
}

const fn noop(screen: Screen) -> Transition {
    Transition {
        screen,
        effect: Effect::None,
    }
}

/// Advance the panel state machine.
///
/// Actions outside the current screen's closed set are no-ops that keep
/// the screen unchanged, which absorbs double-taps and replayed callbacks.
#[must_use]
pub fn apply(screen: Screen, action: Action) -> Transition {
    if matches!(action, Action::Close) {
        return Transition {
            screen,
            effect: Effect::ClosePanel,
        };
    }
    match screen {
        Screen::Root => match action {
            Action::Toggle(field) => Transition {
                screen: Screen::Root,
                effect: Effect::Toggle(field),
            },
            Action::OpenLanguages => noop(Screen::LanguagePicker),
            Action::OpenAlbumLimit => noop(Screen::AlbumLimitPicker),
            Action::OpenExtractors => noop(Screen::ExtractorList { page: 0 }),
            _ => noop(screen),
        },
        Screen::LanguagePicker => match action {
            Action::SetLanguage(code) => Transition {
                screen: Screen::Root,
                effect: Effect::SetLanguage(code),
            },
            Action::Back => noop(Screen::Root),
            _ => noop(screen),
        },
        Screen::AlbumLimitPicker => match action {
            Action::SetAlbumLimit(n) => Transition {
                screen: Screen::Root,
                effect: Effect::SetAlbumLimit(n),
            },
            Action::Back => noop(Screen::Root),
            _ => noop(screen),
        },
        Screen::ExtractorList { page } => match action {
            Action::ToggleExtractor(id) => Transition {
                screen: Screen::ExtractorList { page },
                effect: Effect::ToggleExtractor(id),
            },
            Action::Page(n) => noop(Screen::ExtractorList { page: n }),
            Action::Back => noop(Screen::Root),
            _ => noop(screen),
        },
    }
}

/// One actionable option of a rendered screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelButton {
    pub label: String,
    pub callback: String,
}

impl PanelButton {
    fn new(label: impl Into<String>, action: &Action) -> Self {
        Self {
            label: label.into(),
            callback: action.encode(),
        }
    }
}

/// Rendered screen: display text plus labeled option rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub text: String,
    pub rows: Vec<Vec<PanelButton>>,
}

impl PanelView {
    /// Adapt the abstract rows into a Telegram inline keyboard.
    #[must_use]
    pub fn keyboard(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(self.rows.iter().map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.callback.clone()))
                .collect::<Vec<_>>()
        }))
    }
}

fn onoff(value: bool, lang: &str) -> String {
    if value {
        t("EnabledButton", lang)
    } else {
        t("DisabledButton", lang)
    }
}

/// Render a screen for the given settings. Pure: identical inputs yield
/// identical views.
#[must_use]
pub fn render(settings: &ChatSettings, screen: Screen) -> PanelView {
    match screen {
        Screen::Root => render_root(settings),
        Screen::LanguagePicker => render_languages(settings),
        Screen::AlbumLimitPicker => render_album_limit(settings),
        Screen::ExtractorList { page } => render_extractors(settings, page),
    }
}

fn back_row(lang: &str) -> Vec<PanelButton> {
    vec![PanelButton::new(t("BackButton", lang), &Action::Back)]
}

fn render_root(settings: &ChatSettings) -> PanelView {
    let lang = settings.language.as_str();
    let language_name = available_languages()
        .get(lang)
        .cloned()
        .unwrap_or_else(|| lang.to_string());

    let text_key = match settings.kind {
        ChatKind::Group => "GroupSettingsMessage",
        ChatKind::Private => "PrivateSettingsMessage",
    };

    let rows = vec![
        vec![PanelButton::new(
            format!("{}: {language_name}", t("LanguageButton", lang)),
            &Action::OpenLanguages,
        )],
        vec![
            PanelButton::new(
                format!(
                    "{}: {}",
                    t("CaptionsButton", lang),
                    onoff(settings.captions, lang)
                ),
                &Action::Toggle(ToggleField::Captions),
            ),
            PanelButton::new(
                format!(
                    "{}: {}",
                    t("SilentButton", lang),
                    onoff(settings.silent, lang)
                ),
                &Action::Toggle(ToggleField::Silent),
            ),
        ],
        vec![
            PanelButton::new(
                format!("{}: {}", t("NsfwButton", lang), onoff(settings.nsfw, lang)),
                &Action::Toggle(ToggleField::Nsfw),
            ),
            PanelButton::new(
                format!(
                    "{}: {}",
                    t("DeleteProcessedButton", lang),
                    onoff(settings.delete_links, lang)
                ),
                &Action::Toggle(ToggleField::DeleteLinks),
            ),
        ],
        vec![PanelButton::new(
            format!(
                "{}: {}",
                t("MediaAlbumButton", lang),
                settings.media_album_limit
            ),
            &Action::OpenAlbumLimit,
        )],
        vec![PanelButton::new(
            t("DisabledExtractorsButton", lang),
            &Action::OpenExtractors,
        )],
        vec![PanelButton::new(t("CloseButton", lang), &Action::Close)],
    ];

    PanelView {
        text: t(text_key, lang),
        rows,
    }
}

fn render_languages(settings: &ChatSettings) -> PanelView {
    let lang = settings.language.as_str();
    let mut rows: Vec<Vec<PanelButton>> = available_languages()
        .iter()
        .map(|(code, name)| {
            let mark = if *code == lang { " ✅" } else { "" };
            vec![PanelButton::new(
                format!("{name}{mark}"),
                &Action::SetLanguage((*code).to_string()),
            )]
        })
        .collect();
    rows.push(back_row(lang));

    PanelView {
        text: t("LanguageSettingsMessage", lang),
        rows,
    }
}

fn render_album_limit(settings: &ChatSettings) -> PanelView {
    let lang = settings.language.as_str();
    let mut rows: Vec<Vec<PanelButton>> = ALBUM_LIMIT_CHOICES
        .iter()
        .map(|n| {
            let mark = if *n == settings.media_album_limit {
                " ✅"
            } else {
                ""
            };
            vec![PanelButton::new(
                format!("{n}{mark}"),
                &Action::SetAlbumLimit(*n),
            )]
        })
        .collect();
    rows.push(back_row(lang));

    PanelView {
        text: t("MediaAlbumSettingsMessage", lang),
        rows,
    }
}

fn render_extractors(settings: &ChatSettings, page: usize) -> PanelView {
    let lang = settings.language.as_str();
    let visible: Vec<_> = registry::visible().collect();
    let page_count = visible.len().div_ceil(EXTRACTORS_PER_PAGE).max(1);
    let page = page.min(page_count - 1);

    let mut rows: Vec<Vec<PanelButton>> = visible
        .iter()
        .skip(page * EXTRACTORS_PER_PAGE)
        .take(EXTRACTORS_PER_PAGE)
        .map(|ex| {
            let mark = if settings.is_extractor_disabled(ex.id) {
                format!(" ({})", t("DisabledButton", lang))
            } else {
                String::new()
            };
            vec![PanelButton::new(
                format!("{}{mark}", ex.display_name),
                &Action::ToggleExtractor(ex.id.to_string()),
            )]
        })
        .collect();

    if page_count > 1 {
        let mut nav = Vec::new();
        if page > 0 {
            nav.push(PanelButton::new(
                t("PrevPageButton", lang),
                &Action::Page(page - 1),
            ));
        }
        if page + 1 < page_count {
            nav.push(PanelButton::new(
                t("NextPageButton", lang),
                &Action::Page(page + 1),
            ));
        }
        rows.push(nav);
    }
    rows.push(back_row(lang));

    PanelView {
        text: t("DisabledExtractorsSettingsMessage", lang),
        rows,
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
    fn test_action_round_trip() {
        let actions = [
            Action::Toggle(ToggleField::Captions),
            Action::Toggle(ToggleField::DeleteLinks),
            Action::OpenLanguages,
            Action::OpenAlbumLimit,
            Action::OpenExtractors,
            Action::SetLanguage("ru".to_string()),
            Action::SetAlbumLimit(5),
            Action::ToggleExtractor("tiktok".to_string()),
            Action::Page(2),
            Action::Back,
            Action::Close,
        ];
        for action in actions {
            let encoded = action.encode();
            assert_eq!(Action::parse(&encoded), Some(action), "token {encoded}");
        }
    }

    #[test]
    fn test_parse_rejects_unknown_tokens() {
        assert_eq!(Action::parse(""), None);
        assert_eq!(Action::parse("bogus"), None);
        assert_eq!(Action::parse("settings.unknown.x"), None);
        assert_eq!(Action::parse("settings.album.notanumber"), None);
        assert_eq!(Action::parse("settings.language."), None);
    }

    #[test]
    fn test_root_toggle_stays_on_root() {
        let tr = apply(Screen::Root, Action::Toggle(ToggleField::Silent));
        assert_eq!(tr.screen, Screen::Root);
        assert_eq!(tr.effect, Effect::Toggle(ToggleField::Silent));
    }

    #[test]
    fn test_navigation_and_back() {
        let tr = apply(Screen::Root, Action::OpenExtractors);
        assert_eq!(tr.screen, Screen::ExtractorList { page: 0 });
        assert_eq!(tr.effect, Effect::None);

        let tr = apply(Screen::ExtractorList { page: 0 }, Action::Back);
        assert_eq!(tr.screen, Screen::Root);

        let tr = apply(Screen::LanguagePicker, Action::Back);
        assert_eq!(tr.screen, Screen::Root);
    }

    #[test]
    fn test_invalid_action_is_noop() {
        // A language pick delivered while the panel shows the extractor
        // list (stale duplicate) changes nothing.
        let screen = Screen::ExtractorList { page: 1 };
        let tr = apply(screen, Action::SetLanguage("ru".to_string()));
        assert_eq!(tr.screen, screen);
        assert_eq!(tr.effect, Effect::None);

        let tr = apply(Screen::Root, Action::SetAlbumLimit(5));
        assert_eq!(tr.screen, Screen::Root);
        assert_eq!(tr.effect, Effect::None);
    }

    #[test]
    fn test_close_valid_everywhere() {
        for screen in [
            Screen::Root,
            Screen::LanguagePicker,
            Screen::AlbumLimitPicker,
            Screen::ExtractorList { page: 0 },
        ] {
            assert_eq!(apply(screen, Action::Close).effect, Effect::ClosePanel);
        }
    }

    #[test]
    fn test_render_is_pure() {
        let settings = sample_settings();
        for screen in [
            Screen::Root,
            Screen::LanguagePicker,
            Screen::AlbumLimitPicker,
            Screen::ExtractorList { page: 0 },
        ] {
            assert_eq!(render(&settings, screen), render(&settings, screen));
        }
    }

    #[test]
    fn test_render_marks_disabled_extractor() {
        let mut settings = sample_settings();
        settings.disabled_extractors.insert("youtube".to_string());
        let view = render(&settings, Screen::ExtractorList { page: 0 });
        let all_labels: Vec<String> = view
            .rows
            .iter()
            .flatten()
            .map(|b| b.label.clone())
            .collect();
        assert!(all_labels.iter().any(|l| l.starts_with("YouTube") && l.contains("off")));
    }

    #[test]
    fn test_render_clamps_out_of_range_page() {
        let settings = sample_settings();
        let view = render(&settings, Screen::ExtractorList { page: 99 });
        // Same content as the last real page
        let visible = crate::extractors::registry::visible().count();
        let last = visible.div_ceil(EXTRACTORS_PER_PAGE).max(1) - 1;
        assert_eq!(view, render(&settings, Screen::ExtractorList { page: last }));
    }

    #[test]
    fn test_root_reflects_settings_values() {
        let mut settings = sample_settings();
        let view_on = render(&settings, Screen::Root);
        settings.captions = false;
        let view_off = render(&settings, Screen::Root);
        assert_ne!(view_on, view_off);
    }
}
