//! `kubetriage match` command handler

use std::io::Write;

use serde::Serialize;

use kubetriage_core::matching::{best_match, score_namespace};

use crate::cli::MatchArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `match` command.
pub async fn execute(args: MatchArgs, writer: &OutputWriter) -> Result<(), CliError> {
    writer.render(&run(args))?;
    Ok(())
}

/// Score every candidate, highest first. Ties keep the order given on
/// the command line.
pub fn run(args: MatchArgs) -> MatchReport {
    let best = best_match(args.namespaces.iter().map(String::as_str), &args.test_path)
        .map(|(namespace, _)| namespace.to_owned());

    let mut candidates: Vec<Candidate> = args
        .namespaces
        .iter()
        .map(|namespace| Candidate {
            score: score_namespace(namespace, &args.test_path),
            namespace: namespace.clone(),
        })
        .collect();
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    MatchReport {
        test_path: args.test_path,
        best,
        candidates,
    }
}

/// Namespace ranking for one test path.
#[derive(Serialize)]
pub struct MatchReport {
    pub test_path: String,
    /// Highest scoring namespace (None when every score is 0)
    pub best: Option<String>,
    pub candidates: Vec<Candidate>,
}

#[derive(Serialize)]
pub struct Candidate {
    pub namespace: String,
    pub score: u32,
}

impl Render for MatchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.best {
            Some(best) => writeln!(w, "Best match: {}", best.green().bold())?,
            None => writeln!(w, "Best match: {}", "none".yellow())?,
        }
        writeln!(w)?;
        writeln!(w, "{:<50} {:>6}", "Namespace", "Score")?;
        writeln!(w, "{}", "-".repeat(57))?;
        for c in &self.candidates {
            writeln!(w, "{:<50} {:>6}", c.namespace, c.score)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(test_path: &str, namespaces: &[&str]) -> MatchArgs {
        MatchArgs {
            test_path: test_path.to_owned(),
            namespaces: namespaces.iter().map(|n| (*n).to_owned()).collect(),
        }
    }

    #[test]
    fn test_match_ranks_candidates() {
        let report = run(args(
            "Dataflow suite test-dataflow should route events",
            &["test-unrelated", "test-dataflow-1763129228782243000"],
        ));

        assert_eq!(
            report.best.as_deref(),
            Some("test-dataflow-1763129228782243000")
        );
        assert_eq!(
            report.candidates[0].namespace,
            "test-dataflow-1763129228782243000"
        );
        assert!(report.candidates[0].score >= 500);
        assert_eq!(report.candidates[1].score, 0);
    }

    #[test]
    fn test_match_without_any_hit() {
        let report = run(args("Aggregator scales out", &["test-pipeline"]));
        assert!(report.best.is_none());

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("none"));
        assert!(output.contains("test-pipeline"));
    }
}
