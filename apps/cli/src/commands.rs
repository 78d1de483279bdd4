//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use parldata_shared::{AppConfig, RecordKind, init_config, load_config};
use parldata_storage::Store;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// parldata — parliamentary document ingestion.
#[derive(Parser)]
#[command(
    name = "parldata",
    version,
    about = "Scrape parliamentary document listings into a merged local record database.",
    long_about = None,
)]
pub(crate) struct Cli {
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
    /// Show record counts per collection.
    Stats {
        /// Restrict to one collection (e.g. bills, mps, plenary_sittings).
        #[arg(long)]
        kind: Option<String>,
    },

    /// Fetch cache maintenance.
    Cache {
        /// Cache subcommand.
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Drop every cached text page so the next run refetches them.
    /// Cached binary documents are kept.
    Clear,
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
        0 => "parldata=info",
        1 => "parldata=debug",
        _ => "parldata=trace",
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
    match cli.command {
        Command::Stats { kind } => cmd_stats(kind.as_deref()).await,
        Command::Cache { action } => match action {
            CacheAction::Clear => cmd_cache_clear().await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Resolve the database path under the configured data directory,
/// expanding a leading `~`.
fn database_path(config: &AppConfig) -> Result<PathBuf> {
    let data_dir = &config.defaults.data_dir;
    let resolved = match data_dir.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .ok_or_else(|| eyre!("could not determine home directory"))?
            .join(rest),
        None => PathBuf::from(data_dir),
    };
    Ok(resolved.join("parldata.db"))
}

async fn open_store() -> Result<Store> {
    let config = load_config()?;
    let path = database_path(&config)?;
    info!(path = %path.display(), "opening database");
    Ok(Store::open(&path).await?)
}

async fn cmd_stats(kind: Option<&str>) -> Result<()> {
    let store = open_store().await?;
    let kinds: Vec<RecordKind> = match kind {
        Some(name) => vec![name.parse().map_err(|e: String| eyre!(e))?],
        None => RecordKind::all().to_vec(),
    };

    for kind in kinds {
        let count = store.count_records(kind).await?;
        println!("{:<20} {count}", kind.collection());
    }
    Ok(())
}

async fn cmd_cache_clear() -> Result<()> {
    let store = open_store().await?;
    let dropped = store.clear_text_cache().await?;
    println!("dropped {dropped} cached pages");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
