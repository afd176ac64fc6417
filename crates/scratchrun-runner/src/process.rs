use crate::error::RunnerError;
use std::time::Duration;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - Synchronous Capture Interface
// ============================================================================

/// Captured output of a finished child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Standard output from the process
    pub stdout: Vec<u8>,
    /// Standard error from the process
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Convenience constructor for canned text output.
    #[must_use]
    pub fn from_text(stdout: &str, stderr: &str, exit_code: Option<i32>) -> Self {
        Self::new(
            stdout.as_bytes().to_vec(),
            stderr.as_bytes().to_vec(),
            exit_code,
        )
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation)
/// and MUST block until the child exits, returning the complete capture.
/// A child killed from outside still yields `Ok` with whatever was captured
/// and `exit_code == None`.
pub trait ProcessRunner: Send + Sync {
    /// Execute a command, waiting at most `timeout` for it to exit.
    ///
    /// * `Ok(ProcessOutput)` - the process completed (possibly with non-zero exit code)
    /// * `Err(RunnerError::LaunchFailed)` - the process could not be started
    /// * `Err(RunnerError::Timeout)` - the process was killed after `timeout`
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}
