mod cli;
mod core;
mod oneshot;
mod tui;
mod util;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::core::error::AppError;

fn main() {
    if let Err(err) = run() {
        tracing::error!(error = %err, "jobwatch exited with an error");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = cli.options.into_settings()?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => {
            util::init_file_logging(&settings.log_path)?;
            tracing::info!(url = %settings.feed_url, "Starting dashboard");
            tui::run(&settings)
        }
        Commands::List(args) => {
            util::init_stderr_logging()?;
            oneshot::list(&settings, &args)
        }
        Commands::MarkSeen => {
            util::init_stderr_logging()?;
            oneshot::mark_seen(&settings)
        }
    }
}
