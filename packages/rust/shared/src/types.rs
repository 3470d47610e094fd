//! Core domain types for the translation catalog.

use url::Url;

// ---------------------------------------------------------------------------
// CatalogEntry
// ---------------------------------------------------------------------------

/// One discoverable essay: where it lives and what the listing calls it.
///
/// Identity is the source URL; two entries with the same URL are the same item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Absolute URL of the essay page.
    pub source_url: Url,
    /// Title as shown on the listing page.
    pub display_title: String,
}

impl CatalogEntry {
    /// Build an entry from an already-resolved URL and title.
    pub fn new(source_url: Url, display_title: impl Into<String>) -> Self {
        Self {
            source_url,
            display_title: display_title.into(),
        }
    }

    /// The artifact key for this entry.
    pub fn key(&self) -> ItemKey {
        ItemKey::from_url(&self.source_url)
    }
}

// ---------------------------------------------------------------------------
// ItemKey
// ---------------------------------------------------------------------------

/// Filesystem-safe identifier derived from a source URL.
///
/// The key is the final path segment with its extension removed, so
/// `https://www.paulgraham.com/greatwork.html` becomes `greatwork`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(String);

impl ItemKey {
    /// Derive the key for a URL. Pure: same URL, same key.
    pub fn from_url(url: &Url) -> Self {
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("");

        let stem = match segment.rfind('.') {
            Some(dot) if dot > 0 => &segment[..dot],
            _ => segment,
        };

        let sanitized: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();

        if sanitized.is_empty() {
            Self("index".to_string())
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the artifact holding this item's translation.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.0)
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ResumePolicy
// ---------------------------------------------------------------------------

/// Whether a run reprocesses everything or only items lacking a complete artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Skip items that already have a complete translation.
    #[default]
    Normal,
    /// Retranslate every item regardless of what is on disk.
    ForceAll,
}

impl ResumePolicy {
    /// Map the CLI `--all` flag to a policy.
    pub fn from_force_flag(force_all: bool) -> Self {
        if force_all { Self::ForceAll } else { Self::Normal }
    }
}
