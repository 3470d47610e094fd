//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use essaybridge_artifacts::{ArtifactState, ArtifactStore};
use essaybridge_core::pipeline::{self, ProgressReporter, RunReport};
use essaybridge_core::processor::ProcessingOutcome;
use essaybridge_core::status::status_rows;
use essaybridge_shared::{
    ARTIFACTS_DIR, AppConfig, CatalogEntry, ResumePolicy, init_config, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// EssayBridge: translate an essay archive, one essay at a time.
#[derive(Parser)]
#[command(
    name = "essaybridge",
    version,
    about = "Incrementally translate an online essay archive into Markdown files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.essaybridge/essaybridge.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Translate every essay that lacks a complete translation.
    Translate {
        /// Retranslate all essays, including ones already translated.
        #[arg(long)]
        all: bool,
    },

    /// Show the translation state of every essay in the catalog.
    Status,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "essaybridge=info",
        1 => "essaybridge=debug",
        _ => "essaybridge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Translate { all } => cmd_translate(config_path, all).await,
        Command::Status => cmd_status(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_translate(config_path: Option<&Path>, all: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let policy = ResumePolicy::from_force_flag(all);

    info!(
        listing = %config.source.listing_url,
        model = %config.gemini.model,
        ?policy,
        "starting translation"
    );

    let reporter = CliProgress::new();
    let report = pipeline::translate_essays(&config, Path::new(ARTIFACTS_DIR), policy, &reporter)
        .await
        .inspect_err(|_| reporter.spinner.finish_and_clear())?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("  Translation run finished.");
    println!("  Translated: {}", report.translated);
    println!("  Skipped:    {}", report.skipped);
    println!("  Failed:     {}", report.failed);
    println!("  Output:     ./{ARTIFACTS_DIR}");
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        println!();
        println!("  Failures:");
        for failed in &report.failures {
            println!(
                "    {} ({}): {}",
                failed.entry.display_title,
                failed.entry.key(),
                failed.reason
            );
        }
    }
    println!();
}

async fn cmd_status(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let catalog = pipeline::discover_catalog(&config).await?;
    let store = ArtifactStore::open(ARTIFACTS_DIR)?;

    let rows = status_rows(&catalog, &store);
    let width = rows.iter().map(|r| r.key.as_str().len()).max().unwrap_or(0);

    for row in &rows {
        println!(
            "{:<8}  {:<width$}  {}",
            row.state.as_str(),
            row.key.as_str(),
            row.title
        );
    }

    let complete = rows
        .iter()
        .filter(|r| r.state == ArtifactState::Complete)
        .count();
    let errors = rows
        .iter()
        .filter(|r| r.state == ArtifactState::ErrorMarked)
        .count();
    println!();
    println!(
        "  {complete} complete, {errors} failed, {} pending ({} total)",
        rows.len() - complete - errors,
        rows.len()
    );

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_started(&self, entry: &CatalogEntry, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {}", entry.display_title));
    }

    fn item_finished(&self, entry: &CatalogEntry, outcome: &ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Skipped => {}
            ProcessingOutcome::Translated(_) => {
                self.spinner
                    .println(format!("  ✓ {}", entry.display_title));
            }
            ProcessingOutcome::Failed(reason) => {
                self.spinner
                    .println(format!("  ✗ {}: {reason}", entry.display_title));
            }
        }
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_flag_parses() {
        let cli = Cli::try_parse_from(["essaybridge", "translate", "--all"]).unwrap();
        assert!(matches!(cli.command, Command::Translate { all: true }));

        let cli = Cli::try_parse_from(["essaybridge", "-vv", "translate"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Translate { all: false }));
    }

    #[test]
    fn global_config_flag_parses() {
        let cli =
            Cli::try_parse_from(["essaybridge", "status", "--config", "/tmp/eb.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/eb.toml")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["essaybridge", "publish"]).is_err());
    }
}
