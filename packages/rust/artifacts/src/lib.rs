//! On-disk translation artifacts.
//!
//! Each essay has at most one artifact, `<dir>/<ItemKey>.md`. The file alone
//! records progress; there is no index. Its content puts it in one of three
//! states:
//!
//! - **absent**: never attempted
//! - **error-marked**: starts with [`ERROR_BANNER`] (or an older tool's
//!   banner), followed by diagnostics
//! - **complete**: the translated Markdown, title heading on the first line
//!
//! Writes go to a uniquely named temp file in the same directory and are then
//! renamed over the target, so readers see either the old or the new file.
//! Two runs writing the same key at once are not coordinated; the last rename wins.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use essaybridge_shared::{EssayBridgeError, ItemKey, Result};

/// First line of every error-marked artifact.
pub const ERROR_BANNER: &str = "TRANSLATION FAILED";

/// Banner of failure records left by the earlier Korean-only tooling.
/// Still recognised so those essays get retried.
const LEGACY_ERROR_BANNERS: &[&str] = &["번역 중 오류 발생"];

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// What the artifact for one key currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Absent,
    ErrorMarked,
    Complete,
}

impl ArtifactState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::ErrorMarked => "error",
            Self::Complete => "complete",
        }
    }
}

/// Classify existing artifact content.
///
/// Whitespace-only files count as failed attempts.
pub fn classify(content: &str) -> ArtifactState {
    let body = content.trim_start();
    if body.is_empty()
        || body.starts_with(ERROR_BANNER)
        || LEGACY_ERROR_BANNERS.iter().any(|b| body.starts_with(b))
    {
        ArtifactState::ErrorMarked
    } else {
        ArtifactState::Complete
    }
}

/// Render the body of an error-marked artifact.
pub fn render_error_record(title: &str, description: &str, at: DateTime<Utc>) -> String {
    format!(
        "{ERROR_BANNER}\n\nOccurred at: {}\nEssay: {title}\nError: {description}\n",
        at.to_rfc3339()
    )
}

/// Title override carried by a completed artifact: its first line, if that
/// line is a Markdown heading.
pub fn heading_title(content: &str) -> Option<String> {
    let first = content.lines().next()?.trim();
    if !first.starts_with('#') {
        return None;
    }
    let title = first.trim_start_matches('#').trim();
    if title.is_empty() { None } else { Some(title.to_string()) }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Directory of per-essay artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) the artifact directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| EssayBridgeError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `key`.
    pub fn path_for(&self, key: &ItemKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn exists(&self, key: &ItemKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Read the artifact for `key`; `None` when there is none.
    pub fn read(&self, key: &ItemKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EssayBridgeError::io(path, e)),
        }
    }

    /// Current state of the artifact for `key`.
    ///
    /// An artifact that exists but cannot be read is treated as error-marked,
    /// so the item gets retranslated rather than silently skipped.
    pub fn state(&self, key: &ItemKey) -> ArtifactState {
        match self.read(key) {
            Ok(None) => ArtifactState::Absent,
            Ok(Some(content)) => classify(&content),
            Err(e) => {
                warn!(%key, error = %e, "unreadable artifact, treating as failed");
                ArtifactState::ErrorMarked
            }
        }
    }

    /// Replace the artifact for `key` with `content` in one step.
    pub fn write(&self, key: &ItemKey, content: &str) -> Result<()> {
        let target = self.path_for(key);
        let temp = self.dir.join(format!(".{key}.{}.tmp", Uuid::now_v7()));

        std::fs::write(&temp, content).map_err(|e| EssayBridgeError::io(&temp, e))?;

        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(EssayBridgeError::io(&target, e));
        }

        debug!(path = %target.display(), bytes = content.len(), "artifact written");
        Ok(())
    }

    /// Write an error-marked artifact describing a failed translation.
    pub fn write_error(&self, key: &ItemKey, title: &str, description: &str) -> Result<()> {
        self.write(key, &render_error_record(title, description, Utc::now()))
    }

    /// Translated title of a completed artifact, if it has one.
    pub fn translated_title(&self, key: &ItemKey) -> Option<String> {
        match self.read(key) {
            Ok(Some(content)) if classify(&content) == ArtifactState::Complete => {
                heading_title(&content)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn temp_store() -> ArtifactStore {
        let dir = std::env::temp_dir().join(format!("eb-artifacts-test-{}", Uuid::now_v7()));
        ArtifactStore::open(dir).unwrap()
    }

    fn key(name: &str) -> ItemKey {
        ItemKey::from_url(&Url::parse(&format!("https://example.com/{name}.html")).unwrap())
    }

    #[test]
    fn classify_states() {
        assert_eq!(classify("# 제목 (Title)\n\n본문"), ArtifactState::Complete);
        assert_eq!(classify(""), ArtifactState::ErrorMarked);
        assert_eq!(classify("  \n\t"), ArtifactState::ErrorMarked);
        assert_eq!(
            classify(&render_error_record("T", "boom", Utc::now())),
            ArtifactState::ErrorMarked
        );
    }

    #[test]
    fn legacy_failure_record_is_error_marked() {
        let legacy = "번역 중 오류 발생\n\n시간: 2024-05-01 12:00:00\n에세이: Having Kids\n오류: 429";
        assert_eq!(classify(legacy), ArtifactState::ErrorMarked);
        assert_eq!(heading_title(legacy), None);
    }

    #[test]
    fn legacy_failure_record_is_retried_from_store() {
        let store = temp_store();
        let k = key("kids");

        store.write(&k, "번역 중 오류 발생\n\n오류: quota").unwrap();

        assert_eq!(store.state(&k), ArtifactState::ErrorMarked);
        assert_eq!(store.translated_title(&k), None);

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn error_record_has_diagnostics() {
        let record = render_error_record("Having Kids", "HTTP 500", Utc::now());
        assert!(record.starts_with(ERROR_BANNER));
        assert!(record.contains("Occurred at: "));
        assert!(record.contains("Essay: Having Kids"));
        assert!(record.contains("Error: HTTP 500"));
        assert!(heading_title(&record).is_none());
    }

    #[test]
    fn heading_title_reads_first_line() {
        assert_eq!(
            heading_title("# 아이 갖기 (Having Kids)\n\nBody"),
            Some("아이 갖기 (Having Kids)".into())
        );
        assert_eq!(heading_title("## Sub\nBody"), Some("Sub".into()));
        assert_eq!(heading_title("Body first\n# Late heading"), None);
        assert_eq!(heading_title("#\nBody"), None);
    }

    #[test]
    fn absent_then_written() {
        let store = temp_store();
        let k = key("kids");

        assert!(!store.exists(&k));
        assert_eq!(store.state(&k), ArtifactState::Absent);
        assert_eq!(store.read(&k).unwrap(), None);

        store.write(&k, "# Kids\n\nText").unwrap();

        assert!(store.exists(&k));
        assert_eq!(store.state(&k), ArtifactState::Complete);
        assert_eq!(store.read(&k).unwrap().as_deref(), Some("# Kids\n\nText"));
        assert_eq!(store.translated_title(&k), Some("Kids".into()));

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn write_replaces_whole_file_and_leaves_no_temp() {
        let store = temp_store();
        let k = key("greatwork");

        store.write(&k, "a much longer first version of the artifact").unwrap();
        store.write(&k, "short").unwrap();

        assert_eq!(store.read(&k).unwrap().as_deref(), Some("short"));

        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn write_error_marks_artifact() {
        let store = temp_store();
        let k = key("superlinear");

        store.write_error(&k, "Superlinear Returns", "gave up after 3 attempts").unwrap();

        assert_eq!(store.state(&k), ArtifactState::ErrorMarked);
        assert_eq!(store.translated_title(&k), None);
        let content = store.read(&k).unwrap().unwrap();
        assert!(content.contains("Essay: Superlinear Returns"));

        let _ = std::fs::remove_dir_all(store.dir());
    }
}
