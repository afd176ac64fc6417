use std::fmt;
use thiserror::Error;

pub use crate::types::ScratchFileError;
pub use scratchrun_runner::RunnerError;

/// Library-level error type for everything outside a single run.
///
/// Failures *inside* a run never surface as `ScratchError`; they are reported
/// to listeners and summarised in the run result. `ScratchError` covers the
/// surrounding work: loading configuration, reading snippet files, building
/// the scratch file.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum ScratchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Invalid scratch file: {0}")]
    ScratchFile(#[from] ScratchFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for errors that can render themselves for end users.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get additional context about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;

    /// Render message, context and suggestions as a multi-line report.
    fn display_for_user(&self) -> String {
        let mut report = format!("error: {}", self.user_message());
        if let Some(context) = self.context() {
            report.push_str(&format!("\n  {context}"));
        }
        for suggestion in self.suggestions() {
            report.push_str(&format!("\n  - {suggestion}"));
        }
        report
    }
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ProcessExecution,
    FileSystem,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::ProcessExecution => write!(f, "Process Execution"),
            Self::FileSystem => write!(f, "File System"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Launcher '{program}' not found on PATH")]
    LauncherNotFound { program: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::LauncherNotFound { program } => {
                format!("Cannot find the program launcher '{program}'")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [defaults], [launch] and [toolchain] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } => None,
            Self::LauncherNotFound { .. } => Some(
                "Compiled scratch programs are started with the configured launcher (java by default)."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) | Self::InvalidValue { .. } => vec![
                "Check .scratchrun/config.toml for typos".to_string(),
                "Run 'scratchrun config' to see the effective configuration".to_string(),
            ],
            Self::NotFound { .. } => vec![
                "Pass an existing file to --config or drop the flag to use discovery".to_string(),
            ],
            Self::LauncherNotFound { .. } => vec![
                "Install a JDK and make sure 'java' is on PATH".to_string(),
                "Set [launch] program to an absolute path, or pass --java".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        match self {
            Self::LaunchFailed { program, reason } => {
                format!("Could not start '{program}': {reason}")
            }
            Self::ExecutionFailed { reason } => format!("The scratch program failed: {reason}"),
            Self::Timeout { timeout_seconds } => {
                format!("The scratch program did not finish within {timeout_seconds} seconds")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Timeout { .. } => Some(
                "Output is only decoded after the program exits, so infinite loops produce no results."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LaunchFailed { .. } => {
                vec!["Check the [launch] program setting".to_string()]
            }
            Self::ExecutionFailed { .. } => Vec::new(),
            Self::Timeout { .. } => vec![
                "Increase [launch] timeout_secs or pass --timeout".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::ProcessExecution
    }
}

impl UserFriendlyError for ScratchError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Runner(err) => err.user_message(),
            Self::ScratchFile(err) => format!("The snippet could not be split into expressions: {err}"),
            Self::Io(err) => format!("File system operation failed: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Runner(err) => err.context(),
            Self::ScratchFile(_) | Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Runner(err) => err.suggestions(),
            Self::ScratchFile(_) => vec!["Check the expression line ranges".to_string()],
            Self::Io(_) => vec!["Check that the file exists and is readable".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Runner(_) => ErrorCategory::ProcessExecution,
            Self::ScratchFile(_) => ErrorCategory::Validation,
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}
