//! Core pipeline orchestration for EssayBridge.
//!
//! This crate ties together catalog discovery, article fetching, translation
//! and artifact storage into the `translate` workflow, with bounded retry
//! around the translation call and per-item resumability.

pub mod pipeline;
pub mod ports;
pub mod processor;
pub mod retry;
pub mod status;
