//! Application configuration for EssayBridge.
//!
//! User config lives at `~/.essaybridge/essaybridge.toml`.
//! A `--config` path overrides the default location; missing files fall back
//! to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EssayBridgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "essaybridge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".essaybridge";

/// Directory (relative to the working directory) holding one artifact per essay.
pub const ARTIFACTS_DIR: &str = "essays";

// ---------------------------------------------------------------------------
// Config structs (matching essaybridge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the catalog comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Gemini settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Translation target.
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Retry behavior around the translation call.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Run pacing.
    #[serde(default)]
    pub run: RunConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page enumerating every essay.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// HTTP timeout for listing and article fetches.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_listing_url() -> String {
    "https://www.paulgraham.com/articles.html".into()
}
fn default_fetch_timeout() -> u64 {
    30
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for translation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Thinking token budget; `-1` lets the model decide.
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: i32,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout. Long essays take a while to translate.
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            thinking_budget: default_thinking_budget(),
            endpoint: default_endpoint(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "gemini-2.5-flash-lite".into()
}
fn default_thinking_budget() -> i32 {
    -1
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_gemini_timeout() -> u64 {
    600
}

/// `[translation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Language the essays are translated into.
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
        }
    }
}

fn default_target_language() -> String {
    "Korean".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts allowed while the service keeps reporting quota exhaustion.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait used when the service does not suggest one.
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,

    /// Treat connection/timeout failures as transient instead of permanent.
    #[serde(default)]
    pub retry_network_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay(),
            retry_network_errors: false,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    60
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Pause after each processed essay.
    #[serde(default = "default_pacing")]
    pub pacing_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pacing_secs: default_pacing(),
        }
    }
}

fn default_pacing() -> u64 {
    2
}

impl RunConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.essaybridge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EssayBridgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.essaybridge/essaybridge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EssayBridgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        EssayBridgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EssayBridgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EssayBridgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EssayBridgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Gemini API key from the configured env var; fails if unset or empty.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.gemini.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(EssayBridgeError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        ))),
    }
}
