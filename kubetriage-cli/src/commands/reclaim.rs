//! `kubetriage reclaim` command handler

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::info;

use kubetriage_core::cluster::ClusterClient;
use kubetriage_core::config::TimeoutConfig;
use kubetriage_core::duration::{format_duration, parse_timeout};
use kubetriage_reclaimer::{NamespaceReclaimer, Outcome, ReclaimerConfig};

use crate::cli::ReclaimArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `reclaim` command.
pub async fn execute<C: ClusterClient>(
    args: ReclaimArgs,
    cluster: Arc<C>,
    timeouts: &TimeoutConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run(args, cluster, timeouts).await?;
    writer.render(&report)?;
    Ok(())
}

/// Run the escalation ladder and build the report.
///
/// Only a malformed timeout or namespace is an error. A namespace that
/// survives every stage is reported as `abandoned`.
pub async fn run<C: ClusterClient>(
    args: ReclaimArgs,
    cluster: Arc<C>,
    timeouts: &TimeoutConfig,
) -> Result<ReclaimReport, CliError> {
    let timeout = match &args.timeout {
        Some(raw) => parse_timeout(raw)?,
        None => timeouts.namespace_delete,
    };
    info!(namespace = %args.namespace, timeout = %format_duration(timeout), "reclaiming namespace");

    let reclaimer =
        NamespaceReclaimer::with_config(cluster, ReclaimerConfig::from_timeouts(timeouts));
    let started = Instant::now();
    let outcome = reclaimer.reclaim(&args.namespace, timeout).await?;

    Ok(ReclaimReport::new(args.namespace, timeout, outcome, started.elapsed()))
}

/// Namespace reclaim result.
#[derive(Serialize)]
pub struct ReclaimReport {
    pub namespace: String,
    /// Graceful timeout as passed to the delete call
    pub timeout: String,
    /// graceful, forced or abandoned
    pub outcome: String,
    pub elapsed_ms: u64,
}

impl ReclaimReport {
    pub fn new(namespace: String, timeout: Duration, outcome: Outcome, elapsed: Duration) -> Self {
        Self {
            namespace,
            timeout: format_duration(timeout),
            outcome: outcome.as_str().to_owned(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Render for ReclaimReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let outcome_colored = match self.outcome.as_str() {
            "graceful" => self.outcome.green(),
            "forced" => self.outcome.yellow(),
            _ => self.outcome.red(),
        };
        writeln!(
            w,
            "Namespace {}: {} (timeout {}, {}ms)",
            self.namespace.bold(),
            outcome_colored,
            self.timeout,
            self.elapsed_ms
        )?;
        if self.outcome == "abandoned" {
            writeln!(w, "  namespace is still present; later runs may see leftovers")?;
        }
        Ok(())
    }
}
