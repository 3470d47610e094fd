//! Essay body extraction.
//!
//! Essay pages are old-school table layouts: the body text sits in the first
//! `<font>` element, with paragraphs separated by `<br>` pairs. Navigation
//! images and the page chrome live outside it.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("font").expect("body selector"));

/// Extract the essay body as plain text, one text node per line.
///
/// Returns `None` when the page has no body element or the body holds no text.
pub fn extract_body_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let body = doc.select(&BODY_SEL).next()?;

    let text = body
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() { None } else { Some(text) }
}
