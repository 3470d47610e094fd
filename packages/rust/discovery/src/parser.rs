//! Essay listing parser.
//!
//! The listing page is a table of links, one per essay, in the site's
//! canonical order. A handful of "start here" recommendations are repeated
//! near the top, and the table also links back to the home page and the RSS
//! feed. This module turns that page into an ordered, duplicate-free catalog.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use essaybridge_shared::CatalogEntry;

// ---------------------------------------------------------------------------
// Selectors (compiled once)
// ---------------------------------------------------------------------------

/// Links to HTML pages inside the listing table.
static ESSAY_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"table a[href$=".html"]"#).expect("essay link selector")
});

/// Links that point at the site itself rather than at an essay.
const RESERVED_SUFFIXES: [&str; 2] = ["index.html", "rss.html"];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Turn a raw listing page into the ordered essay catalog.
///
/// Never fails: markup without any usable links yields an empty catalog and a
/// warning. When a URL appears more than once, its *last* appearance decides
/// both the title and the position.
pub fn extract_catalog(raw_listing: &str, listing_url: &Url) -> Vec<CatalogEntry> {
    let doc = Html::parse_document(raw_listing);

    let candidates: Vec<CatalogEntry> = doc
        .select(&ESSAY_LINK_SEL)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            match listing_url.join(href) {
                Ok(url) => Some(CatalogEntry::new(url, normalize_title(el.text()))),
                Err(e) => {
                    debug!(href, error = %e, "skipping unresolvable link");
                    None
                }
            }
        })
        .filter(|entry| !is_reserved(&entry.source_url))
        .collect();

    let catalog = dedup_keep_last(candidates);

    if catalog.is_empty() {
        warn!(%listing_url, "no essay links found on listing page");
    } else {
        info!(entries = catalog.len(), "catalog extracted");
    }

    catalog
}

/// Whether a URL is the home page or the feed rather than an essay.
fn is_reserved(url: &Url) -> bool {
    RESERVED_SUFFIXES
        .iter()
        .any(|suffix| url.as_str().ends_with(suffix))
}

/// Drop earlier occurrences of repeated URLs, keeping relative order.
fn dedup_keep_last(candidates: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    let mut kept: Vec<CatalogEntry> = candidates
        .into_iter()
        .rev()
        .filter(|entry| seen.insert(entry.source_url.as_str().to_owned()))
        .collect();
    kept.reverse();
    kept
}

/// Join an element's text nodes and collapse runs of whitespace.
fn normalize_title<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
