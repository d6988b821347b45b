//! `kubetriage summary` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use kubetriage_artifacts::{RunSummary, TestRecord, load_run};

use crate::cli::SummaryArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `summary` command.
pub async fn execute(args: SummaryArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let report = run(args)?;
    writer.render(&report)?;
    Ok(())
}

/// Read every `metadata.json` of a run directory.
///
/// A directory with neither a run summary nor any test metadata is an error.
pub fn run(args: SummaryArgs) -> Result<SummaryReport, CliError> {
    info!(run_dir = %args.run_dir.display(), "loading run metadata");

    let summary = load_run(&args.run_dir)?;
    if summary.run.is_none() && summary.tests.is_empty() {
        return Err(CliError::Command(format!(
            "no metadata found in {}",
            args.run_dir.display()
        )));
    }

    Ok(SummaryReport::from_summary(
        args.run_dir.display().to_string(),
        summary,
        args.failed_only,
    ))
}

/// Run summary report.
#[derive(Serialize)]
pub struct SummaryReport {
    pub run_dir: String,
    /// Run id (None when the run was never closed)
    pub run_id: Option<String>,
    pub closed: bool,
    pub total_tests: usize,
    pub failed_tests: usize,
    pub passed_tests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tests: Vec<TestRow>,
}

/// One test in the summary table.
#[derive(Serialize)]
pub struct TestRow {
    pub sequence: u32,
    pub name: String,
    pub namespace: String,
    pub failed: bool,
    pub duration_ms: u64,
    pub files: usize,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub failure_message: String,
}

impl From<TestRecord> for TestRow {
    fn from(record: TestRecord) -> Self {
        Self {
            sequence: record.test_sequence_number,
            files: record.artifacts.file_count(),
            size_bytes: record.artifacts.total_size_bytes,
            name: record.name,
            namespace: record.namespace,
            failed: record.failed,
            duration_ms: record.duration_ms,
            failure_message: record.failure_message,
        }
    }
}

impl SummaryReport {
    /// Counts come from the run summary when it exists, otherwise from
    /// the test records found on disk.
    pub fn from_summary(run_dir: String, summary: RunSummary, failed_only: bool) -> Self {
        let found_failed = summary.failed_tests().count();
        let found_total = summary.tests.len();

        let (run_id, closed, total, failed, git_commit, description) = match &summary.run {
            Some(run) => (
                Some(run.run_id.clone()),
                true,
                run.total_tests as usize,
                run.failed_tests as usize,
                (!run.git_commit.is_empty()).then(|| run.git_commit.clone()),
                (!run.description.is_empty()).then(|| run.description.clone()),
            ),
            None => (None, false, found_total, found_failed, None, None),
        };

        let tests = summary
            .tests
            .into_iter()
            .filter(|t| !failed_only || t.failed)
            .map(TestRow::from)
            .collect();

        Self {
            run_dir,
            run_id,
            closed,
            total_tests: total,
            failed_tests: failed,
            passed_tests: total.saturating_sub(failed),
            git_commit,
            description,
            tests,
        }
    }
}

impl Render for SummaryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let run_label = self.run_id.as_deref().unwrap_or("(not closed)");
        writeln!(w, "Run: {} ({})", run_label.bold(), self.run_dir)?;
        if let Some(description) = &self.description {
            writeln!(w, "Description: {}", description)?;
        }
        if let Some(commit) = &self.git_commit {
            writeln!(w, "Commit: {}", commit)?;
        }
        writeln!(
            w,
            "Tests: {} total, {} failed, {} passed",
            self.total_tests.to_string().bold(),
            self.failed_tests.to_string().red(),
            self.passed_tests.to_string().green()
        )?;

        if self.tests.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<5} {:<8} {:<40} {:<30} {:>6} {:>10}",
            "Seq", "Result", "Name", "Namespace", "Files", "Bytes"
        )?;
        writeln!(w, "{}", "-".repeat(104))?;

        for t in &self.tests {
            let result = if t.failed {
                "FAILED".red()
            } else {
                "passed".green()
            };
            writeln!(
                w,
                "{:<5} {:<8} {:<40} {:<30} {:>6} {:>10}",
                t.sequence,
                result,
                truncate_cell(&t.name, 40),
                truncate_cell(&t.namespace, 30),
                t.files,
                t.size_bytes
            )?;
            if !t.failure_message.is_empty() {
                writeln!(w, "      {}", t.failure_message.lines().next().unwrap_or(""))?;
            }
        }
        Ok(())
    }
}

/// Shorten a table cell to `width` characters.
fn truncate_cell(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_owned();
    }
    let mut cell: String = value.chars().take(width.saturating_sub(3)).collect();
    cell.push_str("...");
    cell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("short", 10), "short");
        assert_eq!(truncate_cell("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_summary_report_without_run_record_counts_tests() {
        let report = SummaryReport::from_summary(
            "/tmp/run".to_owned(),
            RunSummary::default(),
            false,
        );
        assert!(!report.closed);
        assert_eq!(report.total_tests, 0);

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("(not closed)"));
    }
}
