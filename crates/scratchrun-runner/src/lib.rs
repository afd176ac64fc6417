//! Child process execution for scratch runs
//!
//! The orchestrator launches the compiled scratch program through the
//! [`ProcessRunner`] trait and blocks until the child exits, capturing stdout
//! and stderr in full.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements rather than shell strings, so a
//! classpath entry or entry point containing shell metacharacters is never
//! interpreted.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
