//! Essay catalog discovery.
//!
//! Fetches the site's listing page and turns it into an ordered,
//! de-duplicated list of [`CatalogEntry`] values. A listing that cannot be
//! fetched is a hard error; a listing that parses to nothing is not (the
//! caller decides what an empty catalog means).

mod parser;

use essaybridge_shared::{CatalogEntry, EssayBridgeError, Result};
use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

pub use parser::extract_catalog;

/// Maximum number of redirects to follow when fetching the listing.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching the listing.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("EssayBridge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry points
// ---------------------------------------------------------------------------

/// Fetch the listing page at `listing_url` and extract the essay catalog.
#[instrument(skip_all, fields(url = %listing_url))]
pub async fn discover(listing_url: &Url, opts: &DiscoveryOptions) -> Result<Vec<CatalogEntry>> {
    info!("fetching essay listing");

    let client = build_client(opts)?;
    let raw = fetch_listing(&client, listing_url).await?;

    Ok(extract_catalog(&raw, listing_url))
}

/// Fetch the raw listing document.
pub async fn fetch_listing(client: &Client, listing_url: &Url) -> Result<String> {
    let response = client
        .get(listing_url.as_str())
        .send()
        .await
        .map_err(|e| EssayBridgeError::Network(format!("{listing_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EssayBridgeError::Network(format!(
            "{listing_url}: HTTP {status}"
        )));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(EssayBridgeError::validation(format!(
                "{listing_url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| EssayBridgeError::Network(format!("{listing_url}: failed to read body: {e}")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &DiscoveryOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| EssayBridgeError::Network(format!("failed to build HTTP client: {e}")))
}
