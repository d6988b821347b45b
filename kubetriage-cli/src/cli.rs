//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// kubetriage -- failure artifacts and namespace cleanup for Kubernetes e2e runs.
///
/// Use `kubetriage <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "kubetriage", version, about, long_about = None)]
pub struct Cli {
    /// Path to the kubeconfig passed to every kubectl call.
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// kubeconfig context to use.
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format written to stderr (pretty, json).
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: String,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete a test namespace, escalating past stuck finalizers.
    Reclaim(ReclaimArgs),

    /// Collect failure artifacts for one test into a fresh run directory.
    Collect(CollectArgs),

    /// Summarize a recorded run directory.
    Summary(SummaryArgs),

    /// Keep only the last N lines of a log file.
    Truncate(TruncateArgs),

    /// Inspect configuration.
    Config(ConfigArgs),

    /// Rank namespaces by how well they match a test path.
    #[command(name = "match")]
    Match(MatchArgs),
}

// ---- reclaim ----

/// Delete a namespace with the escalation ladder.
#[derive(Args, Debug)]
pub struct ReclaimArgs {
    /// Namespace to delete.
    pub namespace: String,

    /// Graceful delete timeout (e.g. 2m0s, 90s, 1h30m). Defaults to the
    /// namespace delete timeout from the environment.
    #[arg(long)]
    pub timeout: Option<String>,
}

// ---- collect ----

/// One-shot collection: initialize a run, collect one test, close the run.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Namespace the test ran in.
    #[arg(short, long)]
    pub namespace: String,

    /// Full test title.
    #[arg(long)]
    pub name: String,

    /// Mark the test as failed.
    #[arg(long)]
    pub failed: bool,

    /// Failure message recorded in metadata (implies --failed).
    #[arg(long)]
    pub message: Option<String>,

    /// Test label (repeatable).
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Run identifier (default: current UTC timestamp).
    #[arg(long)]
    pub run_id: Option<String>,

    /// Reclaim the namespace after collection.
    #[arg(long)]
    pub reclaim: bool,
}

// ---- summary ----

/// Read the metadata of a recorded run.
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Run directory (contains metadata.json and one directory per test).
    pub run_dir: PathBuf,

    /// Show only failed tests.
    #[arg(long)]
    pub failed_only: bool,
}

// ---- truncate ----

/// Print the tail of a log file with a truncation marker.
#[derive(Args, Debug)]
pub struct TruncateArgs {
    /// Log file to read.
    pub file: PathBuf,

    /// Maximum number of lines to keep (0 or negative keeps everything).
    #[arg(long, allow_negative_numbers = true)]
    pub max_lines: i64,
}

// ---- config ----

/// Inspect kubetriage configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (defaults + environment overrides).
    Show {
        /// Show only a specific section (artifacts, timeouts).
        #[arg(long)]
        section: Option<String>,
    },
}

// ---- match ----

/// Score candidate namespaces against a test path.
#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Test path text (container descriptions + leaf name).
    pub test_path: String,

    /// Candidate namespace (repeatable).
    #[arg(short, long = "namespace", required = true)]
    pub namespaces: Vec<String>,
}
