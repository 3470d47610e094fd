//! Shared types, error model, and configuration for EssayBridge.
//!
//! This crate is the foundation depended on by all other EssayBridge crates.
//! It provides:
//! - [`EssayBridgeError`]: the unified error type
//! - Domain types ([`CatalogEntry`], [`ItemKey`], [`ResumePolicy`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ARTIFACTS_DIR, AppConfig, GeminiConfig, RetryConfig, RunConfig, SourceConfig,
    TranslationConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{EssayBridgeError, Result};
pub use types::{CatalogEntry, ItemKey, ResumePolicy};
