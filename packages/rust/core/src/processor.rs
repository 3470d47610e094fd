//! Per-essay processing: decide, fetch, translate, persist.

use tracing::{debug, error, info, instrument, warn};

use essaybridge_artifacts::{ArtifactState, ArtifactStore};
use essaybridge_shared::{CatalogEntry, ResumePolicy};

use crate::ports::{ArticleSource, Translate};
use crate::retry::{RetryError, RetryPolicy, Sleeper, TokioSleeper};

/// Why one item did not end up with a fresh translation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemFailure {
    #[error("empty source: no essay text found on the page")]
    EmptySource,

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("translation failed: {0}")]
    Transform(String),

    #[error("gave up after {attempts} attempts: {message}")]
    ExhaustedRetries { attempts: u32, message: String },

    #[error("could not write artifact: {0}")]
    Persistence(String),
}

/// Result of processing one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Skipped,
    Translated(String),
    Failed(ItemFailure),
}

/// Whether an item must be (re)translated.
///
/// | on disk        | ForceAll  | Normal    |
/// |----------------|-----------|-----------|
/// | absent         | translate | translate |
/// | error-marked   | translate | translate |
/// | complete       | translate | skip      |
pub fn should_translate(existing: ArtifactState, policy: ResumePolicy) -> bool {
    match (policy, existing) {
        (ResumePolicy::ForceAll, _) => true,
        (ResumePolicy::Normal, ArtifactState::Complete) => false,
        (ResumePolicy::Normal, ArtifactState::Absent | ArtifactState::ErrorMarked) => true,
    }
}

/// Processes one essay at a time against an artifact store.
pub struct ItemProcessor<A, T, S = TokioSleeper> {
    source: A,
    translator: T,
    store: ArtifactStore,
    retry: RetryPolicy<S>,
}

impl<A, T, S> ItemProcessor<A, T, S>
where
    A: ArticleSource,
    T: Translate,
    S: Sleeper,
{
    pub fn new(source: A, translator: T, store: ArtifactStore, retry: RetryPolicy<S>) -> Self {
        Self {
            source,
            translator,
            store,
            retry,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Process `entry` given what is already on disk for it.
    ///
    /// Writes at most one artifact. Empty or unfetchable sources leave the
    /// existing artifact untouched.
    #[instrument(skip_all, fields(key = %entry.key()))]
    pub async fn process(
        &self,
        entry: &CatalogEntry,
        policy: ResumePolicy,
        existing: ArtifactState,
    ) -> ProcessingOutcome {
        if !should_translate(existing, policy) {
            debug!("complete artifact present, skipping");
            return ProcessingOutcome::Skipped;
        }

        let key = entry.key();

        let text = match self.source.fetch_text(&entry.source_url).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(url = %entry.source_url, "no essay text found");
                return ProcessingOutcome::Failed(ItemFailure::EmptySource);
            }
            Err(e) => {
                warn!(url = %entry.source_url, error = %e, "article fetch failed");
                return ProcessingOutcome::Failed(ItemFailure::Fetch(e.to_string()));
            }
        };

        let title = entry.display_title.as_str();
        let result = self
            .retry
            .invoke(|| self.translator.translate(title, &text))
            .await;

        match result {
            Ok(translated) => match self.store.write(&key, &translated) {
                Ok(()) => {
                    info!(chars = translated.chars().count(), "translation saved");
                    ProcessingOutcome::Translated(translated)
                }
                Err(e) => {
                    error!(error = %e, "failed to save translation");
                    ProcessingOutcome::Failed(ItemFailure::Persistence(e.to_string()))
                }
            },
            Err(err) => {
                let failure = match err {
                    RetryError::Exhausted { attempts, last } => ItemFailure::ExhaustedRetries {
                        attempts,
                        message: last.to_string(),
                    },
                    RetryError::Permanent(e) => ItemFailure::Transform(e.to_string()),
                };
                warn!(error = %failure, "translation failed, writing error record");

                if let Err(e) = self.store.write_error(&key, title, &failure.to_string()) {
                    error!(error = %e, "failed to write error record");
                    return ProcessingOutcome::Failed(ItemFailure::Persistence(format!(
                        "{failure}; error record not written: {e}"
                    )));
                }
                ProcessingOutcome::Failed(failure)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use url::Url;
    use uuid::Uuid;

    use essaybridge_shared::EssayBridgeError;

    use super::fakes::{FakeSource, FakeTranslator};
    use super::*;
    use crate::retry::testing::RecordingSleeper;

    const URL: &str = "https://example.com/kids.html";

    fn temp_store() -> ArtifactStore {
        let dir = std::env::temp_dir().join(format!("eb-processor-test-{}", Uuid::now_v7()));
        ArtifactStore::open(dir).unwrap()
    }

    fn entry() -> CatalogEntry {
        CatalogEntry::new(Url::parse(URL).unwrap(), "Having Kids")
    }

    fn processor(
        source: FakeSource,
        translator: FakeTranslator,
        store: ArtifactStore,
    ) -> ItemProcessor<FakeSource, FakeTranslator, RecordingSleeper> {
        let retry = RetryPolicy::new(3, Duration::from_secs(60))
            .with_sleeper(RecordingSleeper::default());
        ItemProcessor::new(source, translator, store, retry)
    }

    #[test]
    fn decision_table() {
        use ArtifactState::*;
        use ResumePolicy::*;

        assert!(should_translate(Absent, Normal));
        assert!(should_translate(ErrorMarked, Normal));
        assert!(!should_translate(Complete, Normal));
        assert!(should_translate(Absent, ForceAll));
        assert!(should_translate(ErrorMarked, ForceAll));
        assert!(should_translate(Complete, ForceAll));
    }

    #[tokio::test]
    async fn complete_artifact_is_skipped_without_fetching() {
        let translator = FakeTranslator::ok();
        let p = processor(FakeSource::default(), translator.clone(), temp_store());

        let outcome = p
            .process(&entry(), ResumePolicy::Normal, ArtifactState::Complete)
            .await;

        assert_eq!(outcome, ProcessingOutcome::Skipped);
        assert_eq!(translator.calls(), 0);
        let _ = std::fs::remove_dir_all(p.store().dir());
    }

    #[tokio::test]
    async fn translation_is_written_verbatim() {
        let translator = FakeTranslator::ok();
        let source = FakeSource::default().with_page(URL, Some("Before I had kids..."));
        let p = processor(source, translator.clone(), temp_store());
        let key = entry().key();

        let outcome = p
            .process(&entry(), ResumePolicy::Normal, ArtifactState::Absent)
            .await;

        let text = match outcome {
            ProcessingOutcome::Translated(text) => text,
            other => panic!("expected Translated, got {other:?}"),
        };
        assert_eq!(p.store().read(&key).unwrap().as_deref(), Some(text.as_str()));
        assert_eq!(p.store().state(&key), ArtifactState::Complete);
        assert_eq!(translator.titles(), vec!["Having Kids".to_string()]);
        let _ = std::fs::remove_dir_all(p.store().dir());
    }

    #[tokio::test]
    async fn empty_source_leaves_existing_artifact_alone() {
        let store = temp_store();
        let key = entry().key();
        store.write(&key, "# 이전 번역\n\n본문").unwrap();

        let translator = FakeTranslator::ok();
        let source = FakeSource::default().with_page(URL, None);
        let p = processor(source, translator.clone(), store);

        let outcome = p
            .process(&entry(), ResumePolicy::ForceAll, ArtifactState::Complete)
            .await;

        assert_eq!(outcome, ProcessingOutcome::Failed(ItemFailure::EmptySource));
        assert_eq!(translator.calls(), 0);
        assert_eq!(
            p.store().read(&key).unwrap().as_deref(),
            Some("# 이전 번역\n\n본문")
        );
        let _ = std::fs::remove_dir_all(p.store().dir());
    }

    #[tokio::test]
    async fn fetch_error_writes_nothing() {
        let p = processor(FakeSource::default(), FakeTranslator::ok(), temp_store());

        let outcome = p
            .process(&entry(), ResumePolicy::Normal, ArtifactState::Absent)
            .await;

        assert!(matches!(outcome, ProcessingOutcome::Failed(ItemFailure::Fetch(_))));
        assert!(!p.store().exists(&entry().key()));
        let _ = std::fs::remove_dir_all(p.store().dir());
    }

    #[tokio::test]
    async fn exhausted_retries_write_error_record() {
        let translator = FakeTranslator::new(|_| {
            Err(EssayBridgeError::RateLimited {
                message: "HTTP 429: RESOURCE_EXHAUSTED".into(),
            })
        });
        let source = FakeSource::default().with_page(URL, Some("text"));
        let p = processor(source, translator.clone(), temp_store());
        let key = entry().key();

        let outcome = p
            .process(&entry(), ResumePolicy::Normal, ArtifactState::Absent)
            .await;

        assert!(matches!(
            outcome,
            ProcessingOutcome::Failed(ItemFailure::ExhaustedRetries { attempts: 3, .. })
        ));
        assert_eq!(translator.calls(), 3);
        assert_eq!(p.store().state(&key), ArtifactState::ErrorMarked);
        let record = p.store().read(&key).unwrap().unwrap();
        assert!(record.contains("Essay: Having Kids"));
        assert!(record.contains("RESOURCE_EXHAUSTED"));
        let _ = std::fs::remove_dir_all(p.store().dir());
    }

    #[tokio::test]
    async fn permanent_failure_writes_error_record_after_one_call() {
        let translator = FakeTranslator::new(|_| Err(EssayBridgeError::EmptyResponse));
        let source = FakeSource::default().with_page(URL, Some("text"));
        let p = processor(source, translator.clone(), temp_store());

        let outcome = p
            .process(&entry(), ResumePolicy::Normal, ArtifactState::Absent)
            .await;

        assert!(matches!(outcome, ProcessingOutcome::Failed(ItemFailure::Transform(_))));
        assert_eq!(translator.calls(), 1);
        assert_eq!(p.store().state(&entry().key()), ArtifactState::ErrorMarked);
        let _ = std::fs::remove_dir_all(p.store().dir());
    }
}
