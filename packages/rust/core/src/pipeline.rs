//! End-to-end `translate` pipeline: listing → catalog → per-essay processing → report.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use url::Url;

use essaybridge_artifacts::ArtifactStore;
use essaybridge_crawler::ArticleFetcher;
use essaybridge_discovery::DiscoveryOptions;
use essaybridge_shared::{
    AppConfig, CatalogEntry, EssayBridgeError, ResumePolicy, Result, resolve_api_key,
};
use essaybridge_translator::{GeminiClient, GeminiSettings};

use crate::ports::{ArticleSource, Translate};
use crate::processor::{ItemFailure, ItemProcessor, ProcessingOutcome};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// A catalog entry that did not get translated this run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub entry: CatalogEntry,
    pub reason: ItemFailure,
}

/// Summary of one pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub skipped: usize,
    pub translated: usize,
    pub failed: usize,
    /// Failed entries in catalog order.
    pub failures: Vec<FailedItem>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.skipped + self.translated + self.failed
    }

    fn record(&mut self, entry: &CatalogEntry, outcome: ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Skipped => self.skipped += 1,
            ProcessingOutcome::Translated(_) => self.translated += 1,
            ProcessingOutcome::Failed(reason) => {
                self.failed += 1;
                self.failures.push(FailedItem {
                    entry: entry.clone(),
                    reason,
                });
            }
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an entry is processed.
    fn item_started(&self, entry: &CatalogEntry, current: usize, total: usize);
    /// Called once an entry has an outcome.
    fn item_finished(&self, entry: &CatalogEntry, outcome: &ProcessingOutcome);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_started(&self, _entry: &CatalogEntry, _current: usize, _total: usize) {}
    fn item_finished(&self, _entry: &CatalogEntry, _outcome: &ProcessingOutcome) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Sequential driver over a catalog.
pub struct Pipeline<A, T, S = TokioSleeper> {
    processor: ItemProcessor<A, T, S>,
    sleeper: S,
}

impl<A, T, S> Pipeline<A, T, S>
where
    A: ArticleSource,
    T: Translate,
    S: Sleeper + Clone,
{
    /// Pacing sleeps use the same sleeper as the retry policy.
    pub fn new(source: A, translator: T, store: ArtifactStore, retry: RetryPolicy<S>) -> Self {
        let sleeper = retry.sleeper().clone();
        Self {
            processor: ItemProcessor::new(source, translator, store, retry),
            sleeper,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        self.processor.store()
    }

    /// Process every entry in catalog order, one at a time.
    ///
    /// Waits `pacing` after each entry that was not skipped. Item failures are
    /// recorded in the report and never stop the run.
    #[instrument(skip_all, fields(entries = catalog.len(), ?policy))]
    pub async fn run(
        &self,
        catalog: &[CatalogEntry],
        policy: ResumePolicy,
        pacing: Duration,
        progress: &dyn ProgressReporter,
    ) -> RunReport {
        let start = Instant::now();
        let total = catalog.len();
        let mut report = RunReport::default();

        info!(total, "starting translation run");
        progress.phase("Translating essays");

        for (i, entry) in catalog.iter().enumerate() {
            progress.item_started(entry, i + 1, total);

            let existing = self.store().state(&entry.key());
            let outcome = self.processor.process(entry, policy, existing).await;
            progress.item_finished(entry, &outcome);

            let processed = outcome != ProcessingOutcome::Skipped;
            report.record(entry, outcome);

            if processed && !pacing.is_zero() {
                self.sleeper.sleep(pacing).await;
            }
        }

        report.elapsed = start.elapsed();
        progress.done(&report);

        info!(
            skipped = report.skipped,
            translated = report.translated,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis(),
            "translation run complete"
        );

        report
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Fetch and parse the essay listing named in `config`.
///
/// An empty catalog is an error: there is nothing to do and it usually means
/// the listing page changed shape.
pub async fn discover_catalog(config: &AppConfig) -> Result<Vec<CatalogEntry>> {
    let listing_url = Url::parse(&config.source.listing_url).map_err(|e| {
        EssayBridgeError::config(format!(
            "invalid listing_url '{}': {e}",
            config.source.listing_url
        ))
    })?;

    let opts = DiscoveryOptions {
        timeout_secs: config.source.timeout_secs,
    };
    let catalog = essaybridge_discovery::discover(&listing_url, &opts).await?;

    if catalog.is_empty() {
        return Err(EssayBridgeError::validation(format!(
            "no essays found on {listing_url}"
        )));
    }
    Ok(catalog)
}

/// Run the full `translate` pipeline against the real services.
///
/// 1. Resolve the API key (fails before any network traffic)
/// 2. Discover the catalog
/// 3. Translate each essay into `artifacts_dir`
#[instrument(skip_all, fields(listing = %config.source.listing_url))]
pub async fn translate_essays(
    config: &AppConfig,
    artifacts_dir: &Path,
    policy: ResumePolicy,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let api_key = resolve_api_key(config)?;
    let settings =
        GeminiSettings::from_config(&config.gemini, api_key, &config.translation.target_language);
    let translator = GeminiClient::new(settings)?;
    let fetcher = ArticleFetcher::new(Duration::from_secs(config.source.timeout_secs))?;
    let store = ArtifactStore::open(artifacts_dir)?;

    progress.phase("Fetching essay list");
    let catalog = discover_catalog(config).await?;
    info!(entries = catalog.len(), model = translator.model(), "catalog ready");

    let pipeline = Pipeline::new(fetcher, translator, store, RetryPolicy::from_config(&config.retry));
    Ok(pipeline
        .run(&catalog, policy, config.run.pacing(), progress)
        .await)
}
