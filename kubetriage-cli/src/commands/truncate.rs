//! `kubetriage truncate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::debug;

use kubetriage_artifacts::truncate_log_lines;

use crate::cli::TruncateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `truncate` command.
pub async fn execute(args: TruncateArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let report = run(args).await?;
    writer.render(&report)?;
    Ok(())
}

/// Read the file and keep its last `max_lines` lines.
pub async fn run(args: TruncateArgs) -> Result<TruncateReport, CliError> {
    let raw = tokio::fs::read(&args.file).await?;
    let content = String::from_utf8_lossy(&raw);

    let truncated = truncate_log_lines(&content, args.max_lines);
    debug!(
        file = %args.file.display(),
        input_bytes = raw.len(),
        output_bytes = truncated.len(),
        "log truncated"
    );

    Ok(TruncateReport {
        file: args.file.display().to_string(),
        max_lines: args.max_lines,
        input_lines: content.lines().count(),
        truncated: truncated != content,
        content: truncated.into_owned(),
    })
}

/// Truncation result.
#[derive(Serialize)]
pub struct TruncateReport {
    pub file: String,
    pub max_lines: i64,
    pub input_lines: usize,
    /// Whether any line was dropped
    pub truncated: bool,
    pub content: String,
}

impl Render for TruncateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(self.content.as_bytes())?;
        if !self.content.is_empty() && !self.content.ends_with('\n') {
            writeln!(w)?;
        }
        Ok(())
    }
}
