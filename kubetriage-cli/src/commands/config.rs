//! `kubetriage config` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use kubetriage_core::config::{ArtifactConfig, TimeoutConfig};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
pub const SECTIONS: [&str; 2] = ["artifacts", "timeouts"];

/// Execute the `config` command.
pub async fn execute(args: ConfigArgs, writer: &OutputWriter) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Show { section } => {
            let report = show(section, |key| std::env::var(key).ok())?;
            writer.render(&report)?;
            Ok(())
        }
    }
}

/// Build the effective configuration from defaults plus overrides read
/// through `lookup`.
///
/// Unparsable override values keep their defaults, the same way the
/// collector loads them.
///
/// # Errors
///
/// Returns `CliError::Config` if the section name is unknown.
pub fn show(
    section: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigReport, CliError> {
    info!("resolving effective configuration");

    let mut artifacts = ArtifactConfig::default();
    artifacts.apply_overrides_from(&lookup);
    let mut timeouts = TimeoutConfig::default();
    timeouts.apply_overrides_from(&lookup);

    let problems = match artifacts.validate() {
        Ok(()) => Vec::new(),
        Err(e) => vec![e.to_string()],
    };

    let effective = EffectiveConfig {
        artifacts,
        timeouts,
    };

    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(&effective)?,
        Some("artifacts") => toml::to_string_pretty(&effective.artifacts)?,
        Some("timeouts") => toml::to_string_pretty(&effective.timeouts)?,
        Some(other) => {
            return Err(CliError::Config(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: "defaults + environment".to_owned(),
        section,
        problems,
        config: effective,
        config_toml,
    })
}

/// Every configuration section.
#[derive(Serialize)]
pub struct EffectiveConfig {
    pub artifacts: ArtifactConfig,
    pub timeouts: TimeoutConfig,
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering; JSON output carries
/// the structured `config` instead.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Validation problems of the effective values
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
    pub config: EffectiveConfig,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }
        for problem in &self.problems {
            writeln!(w, "  Warning: {}", problem.yellow())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_show_defaults() {
        let report = show(None, lookup(&[])).expect("show should succeed");

        assert!(report.problems.is_empty());
        assert!(report.config_toml.contains("max_log_lines"));
        assert!(report.config_toml.contains("namespace_delete"));
        assert_eq!(report.config.timeouts, TimeoutConfig::default());
    }

    #[test]
    fn test_config_show_applies_overrides() {
        let report = show(
            Some("artifacts".to_owned()),
            lookup(&[
                ("E2E_ARTIFACTS_MAX_LOG_LINES", "50"),
                ("E2E_ARTIFACTS_ON_FAILURE_ONLY", "false"),
            ]),
        )
        .expect("show should succeed");

        assert_eq!(report.config.artifacts.max_log_lines, 50);
        assert!(!report.config.artifacts.collect_on_failure_only);
        assert!(report.config_toml.contains("max_log_lines = 50"));
        assert!(!report.config_toml.contains("namespace_delete"));
    }

    #[test]
    fn test_config_show_timeouts_section() {
        let report = show(
            Some("timeouts".to_owned()),
            lookup(&[("E2E_NAMESPACE_DELETE_TIMEOUT", "5m")]),
        )
        .expect("show should succeed");

        assert_eq!(
            report.config.timeouts.namespace_delete,
            std::time::Duration::from_secs(300)
        );
        assert!(!report.config_toml.contains("max_log_lines"));
    }

    #[test]
    fn test_config_show_unknown_section() {
        let err = show(Some("ebpf".to_owned()), lookup(&[]))
            .err()
            .expect("unknown section should fail");
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("artifacts, timeouts"));
    }

    #[test]
    fn test_config_report_render_text_specific_section() {
        let report = show(Some("timeouts".to_owned()), lookup(&[])).expect("show should succeed");

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("[timeouts]"), "should show section name");
        assert!(output.contains("namespace_delete"), "should show config content");
    }

    #[test]
    fn test_config_report_json_skips_toml_text() {
        let report = show(None, lookup(&[])).expect("show should succeed");

        let json = serde_json::to_string(&report).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert!(parsed.get("config_toml").is_none());
        assert_eq!(parsed["config"]["timeouts"]["namespace_delete"], "2m0s");
    }
}
