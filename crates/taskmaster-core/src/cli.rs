use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::Status;

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
    name = "taskmaster",
    version,
    about = "Personal task tracker with list and calendar views",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// One-off config override, e.g. --set color=off.
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    /// Path to the rc file (default: TASKMASTER_RC, then ~/.taskmasterrc).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory, overriding data.location.
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a new task
    Add {
        /// Task title; must not be blank
        title: String,

        /// Free-text details
        #[arg(long)]
        description: Option<String>,

        /// Due date as YYYY-MM-DD
        #[arg(long, value_parser = parse_plain_date)]
        due: Option<NaiveDate>,

        /// Initial status (defaults to new)
        #[arg(long, value_enum)]
        status: Option<Status>,
    },

    /// Edit an existing task
    Modify(ModifyArgs),

    /// Delete a task by id or unique id prefix
    Delete {
        id: String,
    },

    /// Show tasks as a sorted list
    List {
        /// Only show tasks with this status
        #[arg(long, value_enum)]
        status: Option<Status>,
    },

    /// Show tasks due on a specific date
    Day {
        /// Date as YYYY-MM-DD
        #[arg(value_parser = parse_plain_date)]
        date: NaiveDate,
    },

    /// Render a month as a calendar grid
    Cal {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(value_parser = parse_month)]
        month: Option<NaiveDate>,

        /// Highlight a day and list its tasks
        #[arg(long, value_parser = parse_plain_date)]
        select: Option<NaiveDate>,
    },

    /// Mark the session as logged in
    Login,

    /// Clear the session flag
    Logout,

    /// Print every task as a JSON array
    Export,
}

#[derive(Args, Debug, Clone)]
pub struct ModifyArgs {
    /// Task id or unique id prefix
    pub id: String,

    /// Replacement title
    #[arg(long)]
    pub title: Option<String>,

    /// Replacement description
    #[arg(long, conflicts_with = "no_description")]
    pub description: Option<String>,

    /// Clear the description
    #[arg(long)]
    pub no_description: bool,

    /// Replacement due date as YYYY-MM-DD
    #[arg(long, value_parser = parse_plain_date, conflicts_with = "no_due")]
    pub due: Option<NaiveDate>,

    /// Clear the due date
    #[arg(long)]
    pub no_due: bool,

    /// New status
    #[arg(long, value_enum)]
    pub status: Option<Status>,
}

pub fn parse_plain_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD, got '{raw}': {err}"))
}

fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM, got '{raw}': {err}"))
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
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
