//! Error types for runner module

use thiserror::Error;

/// Failures while launching or waiting on a child process
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to launch '{program}': {reason}")]
    LaunchFailed { program: String, reason: String },

    #[error("Process execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}

impl RunnerError {
    /// True when the child never started.
    #[must_use]
    pub const fn is_launch_failure(&self) -> bool {
        matches!(self, Self::LaunchFailed { .. })
    }
}
