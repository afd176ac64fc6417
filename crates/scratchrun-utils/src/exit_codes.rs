//! Exit code constants and error mapping for scratchrun.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Run completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `RUN_FAILED` | The scratch run reached its failed state |

use crate::error::ScratchError;

/// Process exit code.
///
/// ```rust
/// use scratchrun_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::RUN_FAILED.as_i32(), 3);
/// assert_eq!(ExitCode::SUCCESS, ExitCode::from_i32(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    pub const INTERNAL: ExitCode = ExitCode(1);

    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// A stage failed; listeners already received the error.
    pub const RUN_FAILED: ExitCode = ExitCode(3);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ScratchError {
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::ScratchFile(_) => ExitCode::CLI_ARGS,
            Self::Runner(_) | Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}
