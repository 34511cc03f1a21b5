use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, ValueEnum};
use datepick_core::config::PickerFile;
use datepick_core::date;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

pub const CONFIG_ENV_VAR: &str = "DATEPICK_CONFIG";
const DEFAULT_CONFIG_NAME: &str = ".datepick.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "datepick",
    version,
    about = "Headless date picker driver",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Picker file to load.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Pin "today" instead of reading the clock.
    #[arg(long = "today", value_parser = parse_date_arg)]
    pub today: Option<NaiveDate>,

    /// File with one command per line.
    #[arg(long = "script")]
    pub script: Option<PathBuf>,

    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Commands separated by `;`, run after the script.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    date::parse_iso_date(raw).map_err(|e| e.to_string())
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Where the picker file comes from, and whether the user asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Default(PathBuf),
}

/// `--config`, then `DATEPICK_CONFIG`, then `~/.datepick.toml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> anyhow::Result<ConfigSource> {
    if let Some(path) = explicit {
        return Ok(ConfigSource::Explicit(path.to_path_buf()));
    }
    if let Ok(from_env) = std::env::var(CONFIG_ENV_VAR)
        && !from_env.trim().is_empty()
    {
        return Ok(ConfigSource::Explicit(PathBuf::from(from_env)));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(ConfigSource::Default(home.join(DEFAULT_CONFIG_NAME)))
}

/// Loads the picker file. A missing default file falls back to an empty
/// page; a missing explicit one is an error.
#[tracing::instrument]
pub fn load_picker_file(source: &ConfigSource) -> anyhow::Result<PickerFile> {
    match source {
        ConfigSource::Explicit(path) => PickerFile::load(path)
            .with_context(|| format!("failed to load picker file {}", path.display())),
        ConfigSource::Default(path) if path.exists() => {
            info!(file = %path.display(), "loading default picker file");
            PickerFile::load(path)
        }
        ConfigSource::Default(path) => {
            warn!(file = %path.display(), "no picker file found, using defaults");
            Ok(PickerFile::default())
        }
    }
}
