use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::config::{NotifyMethod, Settings};
use crate::core::error::AppError;
use crate::core::filter::EvaluationFilter;
use crate::core::tracker::TrackingMode;

#[derive(Debug, Parser)]
#[command(name = "jobwatch", version, about = "Terminal dashboard for a job posting feed")]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the live dashboard (default)
    Watch,
    /// Fetch the feed once and print the job cards
    List(ListArgs),
    /// Fetch the feed once and mark every job as seen
    MarkSeen,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Ignore evaluation and title filters
    #[arg(long)]
    pub all: bool,
    /// Only print jobs that have not been seen yet
    #[arg(long = "new", conflicts_with = "all")]
    pub only_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Highlight,
    AutoMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifyArg {
    Desktop,
    Bell,
    Off,
}

#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// Job feed URL
    #[arg(long, env = "JOBWATCH_FEED_URL", global = true)]
    pub url: Option<String>,
    /// Poll interval in seconds
    #[arg(long, env = "JOBWATCH_INTERVAL", value_name = "SECONDS", global = true)]
    pub interval: Option<u64>,
    /// HTTP timeout in seconds
    #[arg(long, env = "JOBWATCH_TIMEOUT", value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,
    /// Path of the seen jobs store
    #[arg(long, env = "JOBWATCH_STORE", global = true)]
    pub store: Option<PathBuf>,
    /// Keep the seen jobs in memory only
    #[arg(long, global = true, conflicts_with = "store")]
    pub ephemeral: bool,
    /// How jobs become seen
    #[arg(long, value_enum, env = "JOBWATCH_MODE", global = true)]
    pub mode: Option<ModeArg>,
    /// How to announce new jobs
    #[arg(long, value_enum, env = "JOBWATCH_NOTIFY", global = true)]
    pub notify: Option<NotifyArg>,
    /// Only show design roles (keyword title filter)
    #[arg(long, global = true)]
    pub titles: bool,
    /// Log file used while the dashboard owns the terminal
    #[arg(long, env = "JOBWATCH_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn into_settings(self) -> Result<Settings, AppError> {
        let mut settings = Settings::default();

        if let Some(url) = self.url {
            reqwest::Url::parse(&url).map_err(|e| AppError::Config {
                message: format!("feed url '{url}': {e}"),
            })?;
            settings.feed_url = url;
        }
        if let Some(secs) = self.interval {
            if secs == 0 {
                return Err(AppError::Config {
                    message: "interval must be at least 1 second".to_string(),
                });
            }
            settings.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(AppError::Config {
                    message: "timeout must be at least 1 second".to_string(),
                });
            }
            settings.timeout = Duration::from_secs(secs);
        }
        if self.ephemeral {
            settings.store_path = None;
        } else if let Some(path) = self.store {
            settings.store_path = Some(path);
        }
        if let Some(path) = self.log_file {
            settings.log_path = path;
        }
        if let Some(mode) = self.mode {
            settings.tracking = match mode {
                ModeArg::Highlight => TrackingMode::Highlight,
                ModeArg::AutoMark => TrackingMode::AutoMark,
            };
        }
        if let Some(notify) = self.notify {
            settings.notify = match notify {
                NotifyArg::Desktop => NotifyMethod::Desktop,
                NotifyArg::Bell => NotifyMethod::Bell,
                NotifyArg::Off => NotifyMethod::Off,
            };
        }
        settings.title_filter = self.titles;

        Ok(settings)
    }
}

/// Commands typed into the dashboard input line.
#[derive(Debug, Parser)]
#[command(name = "jobwatch", disable_help_subcommand = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ConsoleCommand {
    Refresh,
    Seen,
    Filter {
        #[arg(value_parser = parse_filter_key)]
        key: EvaluationFilter,
    },
    Titles,
    Expand {
        index: usize,
    },
    Collapse,
    Help,
    Clear,
    #[command(alias = "exit")]
    Quit,
}

fn parse_filter_key(value: &str) -> Result<EvaluationFilter, String> {
    EvaluationFilter::parse(value)
        .ok_or_else(|| format!("unknown filter '{value}' (none, perfect, good, maybe, skip)"))
}

pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let mut argv = Vec::new();
    argv.push("jobwatch".to_string());

    let tokens = shell_words::split(line).map_err(|err| err.to_string())?;
    argv.extend(tokens.into_iter().map(|t| t.to_ascii_lowercase()));

    let parsed = ConsoleLine::try_parse_from(argv).map_err(|err| err.to_string())?;
    Ok(parsed.command)
}

pub const CONSOLE_HELP: [&str; 9] = [
    "Commands:",
    "  refresh               fetch the feed now (also F5)",
    "  seen                  mark all current jobs as seen",
    "  filter <key>          toggle none | perfect | good | maybe | skip",
    "  titles                toggle the design-role title filter",
    "  expand <n> / collapse show the full description of card n",
    "  clear                 clear the session log",
    "  help                  show this list",
    "  quit / exit           leave the dashboard",
];
