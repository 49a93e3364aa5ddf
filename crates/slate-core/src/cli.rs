use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "slate",
    version,
    about = "Slate: weekly schedule grid for the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render the weekly grid.
    Week {
        /// Overlay the toggled-on comparison schedules.
        #[arg(long)]
        compare: bool,
    },

    /// Render the exam-date grid for pinned sections.
    Finals,

    /// List pinned sections and custom events.
    List,

    /// Pin a section from the catalog by CRN.
    Pin {
        crn: String,

        /// Catalog file; defaults to catalog.location from the config.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Unpin a section by CRN.
    Unpin { crn: String },

    /// Manage custom recurring events.
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// Manage comparison overlay schedules.
    Compare {
        #[command(subcommand)]
        action: CompareAction,
    },

    /// Resolve a one-off draft block and print its grid rectangle.
    Preview {
        /// Day letter (M, T, W, R, F, S, U).
        day: String,

        /// Period, e.g. 14:00-15:30.
        period: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum EventAction {
    /// Add a recurring event, e.g.: slate event add Gym MWF 17:00-18:00
    Add {
        name: String,
        days: String,
        period: String,
    },

    /// Remove an event by id prefix.
    Rm { id: String },

    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CompareAction {
    /// Import a schedule JSON file as a named overlay.
    Import { id: String, file: PathBuf },

    /// Delete an overlay.
    Rm { id: String },

    /// Toggle an overlay on for comparison mode.
    On { id: String },

    /// Toggle an overlay off.
    Off { id: String },

    List,
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
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
