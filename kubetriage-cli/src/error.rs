//! CLI-specific error types and exit code mapping

use kubetriage_artifacts::ArtifactError;
use kubetriage_core::error::InputError;
use kubetriage_reclaimer::ReclaimError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Invalid argument value (timeout, namespace, size).
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// TOML serialisation failed during `config show`.
    #[error("toml output error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact collection or metadata error.
    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

impl From<ReclaimError> for CliError {
    fn from(e: ReclaimError) -> Self {
        match e {
            ReclaimError::Input(input) => Self::Input(input),
        }
    }
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | General / command error              |
    /// | 2    | Configuration or input error         |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Input(_) => 2,
            Self::Io(_) => 10,
            Self::Artifact(e) => match e {
                ArtifactError::Input(_) | ArtifactError::MissingInput(_) => 2,
                ArtifactError::Read { .. } | ArtifactError::Storage(_) => 10,
                _ => 1,
            },
            Self::JsonSerialize(_) | Self::TomlSerialize(_) | Self::Command(_) => 1,
        }
    }
}
