use clap::Parser;
use colored::Colorize;

use kubetriage_cli::cli::Cli;
use kubetriage_cli::commands;
use kubetriage_cli::logging::{DEFAULT_LOG_LEVEL, init_tracing};
use kubetriage_cli::output::OutputWriter;

/// Exit code when logging cannot be set up (bad `--log-format`).
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    if let Err(e) = init_tracing(level, &cli.log_format) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(EXIT_CONFIG);
    }

    kubetriage_core::metrics::describe_all();

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = commands::dispatch(cli, &writer).await {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}
