//! Essay page fetching and body text extraction.
//!
//! This crate provides:
//! - [`ArticleFetcher`]: HTTP client for individual essay pages
//! - [`extract_body_text`]: pulls the plain-text body out of essay markup

pub mod engine;
pub mod extract;

pub use engine::ArticleFetcher;
pub use extract::extract_body_text;
