//! `kubetriage collect` command handler
//!
//! Runs a whole collection lifecycle for a single test: initialize the run,
//! collect the test's artifacts, write the run summary, and optionally
//! reclaim the test namespace afterwards.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kubetriage_artifacts::{ArtifactInventory, Collector, RunAnnotations, TestContext, load_run};
use kubetriage_core::cluster::ClusterClient;
use kubetriage_core::config::{ArtifactConfig, ENV_ENABLED, TimeoutConfig};
use kubetriage_reclaimer::{NamespaceReclaimer, ReclaimerConfig};

use crate::cli::CollectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `collect` command.
///
/// Ctrl-C cancels the in-flight collection; whatever was already captured
/// is still recorded in metadata.
pub async fn execute<C: ClusterClient>(
    args: CollectArgs,
    cluster: Arc<C>,
    config: ArtifactConfig,
    timeouts: &TimeoutConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling collection");
                cancel.cancel();
            }
        })
    };

    let result = run(
        args,
        cluster,
        config,
        RunAnnotations::from_env(),
        timeouts,
        cancel,
    )
    .await;
    watcher.abort();

    writer.render(&result?)?;
    Ok(())
}

/// Run initialize, collect and close, then build the report.
pub async fn run<C: ClusterClient>(
    args: CollectArgs,
    cluster: Arc<C>,
    config: ArtifactConfig,
    annotations: RunAnnotations,
    timeouts: &TimeoutConfig,
    cancel: CancellationToken,
) -> Result<CollectReport, CliError> {
    if !config.enabled {
        return Err(CliError::Config(format!(
            "artifact collection is disabled ({ENV_ENABLED}=false)"
        )));
    }
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let run_id = args
        .run_id
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y%m%d-%H%M%S").to_string());

    let mut ctx = TestContext::new(args.name.as_str(), args.namespace.as_str())
        .with_labels(args.labels.clone())
        .with_cancellation(cancel);
    if args.failed || args.message.is_some() {
        ctx = ctx.failed(args.message.clone().unwrap_or_default());
    }
    ctx.finish();

    let mut collector =
        Collector::new(config, Arc::clone(&cluster)).with_annotations(annotations);
    collector.initialize(&run_id).await?;
    let test_dir = collector.collect_for_test(&ctx).await?;
    let record = collector
        .close()?
        .ok_or_else(|| CliError::Command("collection run was not initialized".to_owned()))?;

    let artifacts = match &test_dir {
        Some(dir) => load_run(&record.artifacts_dir)?
            .tests
            .into_iter()
            .find(|t| t.name == args.name && t.namespace == args.namespace)
            .map(|t| t.artifacts)
            .or_else(|| {
                warn!(test_dir = %dir, "test metadata not found after collection");
                None
            }),
        None => None,
    };

    let reclaim = if args.reclaim {
        let reclaimer = NamespaceReclaimer::with_config(
            Arc::clone(&cluster),
            ReclaimerConfig::from_timeouts(timeouts),
        );
        let outcome = reclaimer
            .reclaim(&args.namespace, timeouts.namespace_delete)
            .await?;
        Some(outcome.as_str().to_owned())
    } else {
        None
    };

    info!(
        run_id = %record.run_id,
        test_dir = test_dir.as_deref().unwrap_or("-"),
        "collect command finished"
    );

    Ok(CollectReport {
        run_id: record.run_id,
        run_dir: record.artifacts_dir,
        test_name: args.name,
        namespace: args.namespace,
        failed: ctx.is_failed(),
        test_dir,
        artifacts,
        reclaim,
    })
}

/// Single-test collection result.
#[derive(Serialize)]
pub struct CollectReport {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub test_name: String,
    pub namespace: String,
    pub failed: bool,
    /// Test directory under the run directory (None = skipped)
    pub test_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactInventory>,
    /// Reclaim outcome when `--reclaim` was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reclaim: Option<String>,
}

impl Render for CollectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Run {} ({})", self.run_id.bold(), self.run_dir.display())?;
        let status = if self.failed {
            "FAILED".red().bold()
        } else {
            "PASSED".green().bold()
        };
        writeln!(w, "Test: {} [{}] in {}", self.test_name, status, self.namespace)?;

        match &self.test_dir {
            Some(dir) => {
                writeln!(w, "  Directory: {}", dir)?;
                if let Some(artifacts) = &self.artifacts {
                    writeln!(
                        w,
                        "  Files: {} ({} logs, {} resources, {} events), {} bytes in {}",
                        artifacts.file_count(),
                        artifacts.log_files.len(),
                        artifacts.resource_files.len(),
                        artifacts.event_files.len(),
                        artifacts.total_size_bytes,
                        artifacts.collection_time
                    )?;
                }
            }
            None => writeln!(w, "  {}", "skipped (collecting failures only)".yellow())?,
        }

        if let Some(outcome) = &self.reclaim {
            writeln!(w, "  Reclaim: {}", outcome)?;
        }
        Ok(())
    }
}
