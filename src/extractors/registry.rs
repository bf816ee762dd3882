//! Static catalog of supported content extractors.
//!
//! The catalog is immutable after startup: descriptors carry a stable id,
//! a display name, host patterns and capability flags. Chats reference
//! extractor ids by value, so an id that no longer matches a descriptor
//! is tolerated and simply never matches a request.
//!
//! URL patterns use the `lazy-regex` crate so they are validated at
//! compile time and initialized on first use.

// lazy_regex! uses once_cell internally; patterns are compile-time checked
#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// What kind of content an extractor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Video,
    Audio,
    Album,
    Livestream,
}

/// One entry of the extractor catalog.
#[derive(Debug)]
pub struct ExtractorDescriptor {
    /// Stable string key; referenced by per-chat disabled sets.
    pub id: &'static str,
    /// Human-readable name shown in the settings panel.
    pub display_name: &'static str,
    /// Hosts this extractor covers, for display purposes.
    pub hosts: &'static [&'static str],
    /// URL pattern deciding whether a link belongs to this extractor.
    pattern: &'static lazy_regex::Lazy<lazy_regex::regex::Regex>,
    /// Content kinds this extractor can produce.
    pub capabilities: &'static [Capability],
    /// Hidden entries (short-link aliases) are matched but not listed.
    pub hidden: bool,
    /// Short-link hosts whose URLs must be redirect-resolved first.
    pub redirect: bool,
}

impl ExtractorDescriptor {
    /// Whether the given URL belongs to this extractor.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    #[must_use]
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

static RE_TIKTOK: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?tiktok\.com/.*");
static RE_TIKTOK_VM: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://vm\.tiktok\.com/.*");
static RE_SOUNDCLOUD: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?soundcloud\.com/.*");
static RE_SOUNDCLOUD_SHORT: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://on\.soundcloud\.com/.*");
static RE_TWITTER: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?(x|twitter)\.com/.*");
static RE_TWITTER_SHORT: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://t\.co/.*");
static RE_INSTAGRAM: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?instagram\.com/.*");
static RE_INSTAGRAM_STORIES: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?instagram\.com/stories/.*");
static RE_INSTAGRAM_SHARE: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?instagram\.com/share/.*");
static RE_NINEGAG: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?9gag\.com/.*");
static RE_YOUTUBE: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?(youtube\.com|youtu\.be)/.*");
static RE_PINTEREST: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?pinterest\.com/.*");
static RE_PINTEREST_SHORT: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://pin\.it/.*");
static RE_REDDIT: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?reddit\.com/.*");
static RE_REDDIT_SHORT: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://redd\.it/.*");
static RE_THREADS: lazy_regex::Lazy<lazy_regex::regex::Regex> =
    lazy_regex!(r"(?i)https?://(www\.)?threads\.net/.*");

use Capability::{Album, Audio, Livestream, Video};

/// The extractor catalog, in declaration order.
///
/// More specific patterns (stories, share links) come before their
/// generic host so first-match routing picks them up.
static EXTRACTORS: &[ExtractorDescriptor] = &[
    ExtractorDescriptor {
        id: "tiktok",
        display_name: "TikTok",
        hosts: &["tiktok.com"],
        pattern: &RE_TIKTOK,
        capabilities: &[Video, Album],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "tiktok_vm",
        display_name: "TikTok (vm)",
        hosts: &["vm.tiktok.com"],
        pattern: &RE_TIKTOK_VM,
        capabilities: &[Video, Album],
        hidden: true,
        redirect: true,
    },
    ExtractorDescriptor {
        id: "soundcloud",
        display_name: "SoundCloud",
        hosts: &["soundcloud.com"],
        pattern: &RE_SOUNDCLOUD,
        capabilities: &[Audio],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "soundcloud_short",
        display_name: "SoundCloud (on.soundcloud)",
        hosts: &["on.soundcloud.com"],
        pattern: &RE_SOUNDCLOUD_SHORT,
        capabilities: &[Audio],
        hidden: true,
        redirect: true,
    },
    ExtractorDescriptor {
        id: "twitter",
        display_name: "X / Twitter",
        hosts: &["x.com", "twitter.com"],
        pattern: &RE_TWITTER,
        capabilities: &[Video, Album],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "twitter_short",
        display_name: "t.co",
        hosts: &["t.co"],
        pattern: &RE_TWITTER_SHORT,
        capabilities: &[Video, Album],
        hidden: true,
        redirect: true,
    },
    ExtractorDescriptor {
        id: "instagram_stories",
        display_name: "Instagram Stories",
        hosts: &["instagram.com"],
        pattern: &RE_INSTAGRAM_STORIES,
        capabilities: &[Video, Album],
        hidden: true,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "instagram_share",
        display_name: "Instagram Share",
        hosts: &["instagram.com"],
        pattern: &RE_INSTAGRAM_SHARE,
        capabilities: &[Video, Album],
        hidden: true,
        redirect: true,
    },
    ExtractorDescriptor {
        id: "instagram",
        display_name: "Instagram",
        hosts: &["instagram.com"],
        pattern: &RE_INSTAGRAM,
        capabilities: &[Video, Album],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "ninegag",
        display_name: "9GAG",
        hosts: &["9gag.com"],
        pattern: &RE_NINEGAG,
        capabilities: &[Video],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "youtube",
        display_name: "YouTube",
        hosts: &["youtube.com", "youtu.be"],
        pattern: &RE_YOUTUBE,
        capabilities: &[Video, Audio, Livestream],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "pinterest",
        display_name: "Pinterest",
        hosts: &["pinterest.com"],
        pattern: &RE_PINTEREST,
        capabilities: &[Video, Album],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "pinterest_short",
        display_name: "Pinterest (pin.it)",
        hosts: &["pin.it"],
        pattern: &RE_PINTEREST_SHORT,
        capabilities: &[Video, Album],
        hidden: true,
        redirect: true,
    },
    ExtractorDescriptor {
        id: "reddit",
        display_name: "Reddit",
        hosts: &["reddit.com"],
        pattern: &RE_REDDIT,
        capabilities: &[Video, Album],
        hidden: false,
        redirect: false,
    },
    ExtractorDescriptor {
        id: "reddit_short",
        display_name: "Reddit (redd.it)",
        hosts: &["redd.it"],
        pattern: &RE_REDDIT_SHORT,
        capabilities: &[Video, Album],
        hidden: true,
        redirect: true,
    },
    ExtractorDescriptor {
        id: "threads",
        display_name: "Threads",
        hosts: &["threads.net"],
        pattern: &RE_THREADS,
        capabilities: &[Video, Album],
        hidden: false,
        redirect: false,
    },
];

/// All catalog entries in stable declaration order.
#[must_use]
pub fn all() -> &'static [ExtractorDescriptor] {
    EXTRACTORS
}

/// Entries shown in the settings panel and source list.
pub fn visible() -> impl Iterator<Item = &'static ExtractorDescriptor> {
    EXTRACTORS.iter().filter(|e| !e.hidden)
}

/// Look up a descriptor by its stable id.
#[must_use]
pub fn get(id: &str) -> Option<&'static ExtractorDescriptor> {
    EXTRACTORS.iter().find(|e| e.id == id)
}

/// First descriptor whose pattern matches the URL, if any.
#[must_use]
pub fn match_url(url: &str) -> Option<&'static ExtractorDescriptor> {
    EXTRACTORS.iter().find(|e| e.matches(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique() {
        let mut seen = HashSet::new();
        for e in all() {
            assert!(seen.insert(e.id), "duplicate extractor id {}", e.id);
        }
    }

    #[test]
    fn test_match_url() {
        let ex = match_url("https://www.youtube.com/watch?v=abc");
        assert_eq!(ex.map(|e| e.id), Some("youtube"));

        let ex = match_url("https://youtu.be/abc");
        assert_eq!(ex.map(|e| e.id), Some("youtube"));

        assert!(match_url("https://example.com/video").is_none());
    }

    #[test]
    fn test_specific_match_wins_over_generic() {
        let ex = match_url("https://www.instagram.com/stories/user/123/");
        assert_eq!(ex.map(|e| e.id), Some("instagram_stories"));

        let ex = match_url("https://www.instagram.com/p/abc/");
        assert_eq!(ex.map(|e| e.id), Some("instagram"));
    }

    #[test]
    fn test_short_links_are_hidden_and_redirect() {
        let ex = match_url("https://vm.tiktok.com/ZM123/");
        let ex = ex.expect("vm.tiktok.com should match");
        assert!(ex.hidden);
        assert!(ex.redirect);
        assert!(visible().all(|e| !e.hidden));
    }

    #[test]
    fn test_get_by_id() {
        assert!(get("youtube").is_some());
        assert!(get("nope").is_none());
        assert!(get("youtube").is_some_and(|e| e.has_capability(Capability::Audio)));
    }
}
