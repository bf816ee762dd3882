//! Localization tables for user-facing text.
//!
//! Locale files are TOML key/value tables embedded at compile time.
//! Lookup falls back to English, then to the key itself, so a missing
//! translation never breaks rendering.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;

/// Embedded locale tables, `(code, TOML source)`.
const EMBEDDED_LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/active.en.toml")),
    ("ru", include_str!("../locales/active.ru.toml")),
];

static LOCALES: LazyLock<BTreeMap<&'static str, BTreeMap<String, String>>> =
    LazyLock::new(load_locales);

fn load_locales() -> BTreeMap<&'static str, BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for (code, source) in EMBEDDED_LOCALES {
        match toml::from_str::<toml::Table>(source) {
            Ok(table) => {
                let entries = table
                    .into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                    .collect();
                out.insert(*code, entries);
            }
            Err(e) => warn!("failed to parse locale {code}: {e}"),
        }
    }
    out
}

/// Look up a phrase for the given language, falling back to English
/// and then to the key itself.
#[must_use]
pub fn t(key: &str, lang: &str) -> String {
    LOCALES
        .get(lang)
        .and_then(|table| table.get(key))
        .or_else(|| LOCALES.get("en").and_then(|table| table.get(key)))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Mapping of locale code to its self-declared language name.
///
/// Drives the language picker; a locale without a `Language` key falls
/// back to its code.
#[must_use]
pub fn available_languages() -> BTreeMap<&'static str, String> {
    LOCALES
        .iter()
        .map(|(code, table)| {
            let name = table
                .get("Language")
                .cloned()
                .unwrap_or_else(|| (*code).to_string());
            (*code, name)
        })
        .collect()
}

/// Whether the given locale code is shipped with the bot.
#[must_use]
pub fn is_supported(lang: &str) -> bool {
    LOCALES.contains_key(lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_key() {
        assert_eq!(t("CloseButton", "en"), "Close");
        assert_eq!(t("CloseButton", "ru"), "Закрыть");
    }

    #[test]
    fn test_fallback_to_english_then_key() {
        // Unknown language falls back to English
        assert_eq!(t("CloseButton", "xx"), "Close");
        // Unknown key falls back to the key itself
        assert_eq!(t("NoSuchKey", "en"), "NoSuchKey");
    }

    #[test]
    fn test_available_languages() {
        let langs = available_languages();
        assert_eq!(langs.get("en").map(String::as_str), Some("English"));
        assert!(langs.contains_key("ru"));
        assert!(is_supported("en"));
        assert!(!is_supported("xx"));
    }
}
