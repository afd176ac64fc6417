//! scratchrun - run scratch snippets expression by expression
//!
//! A scratch snippet is a short script of top-level expressions. scratchrun
//! instruments it, compiles it with an external toolchain, runs it on the JVM
//! and maps every value or printed line back to the expression that produced
//! it.
//!
//! scratchrun can be used in two ways:
//! - **CLI**: `scratchrun run demo.kts`
//! - **Library**: build a [`ScratchExecutor`] and register your own
//!   [`ScratchListener`]
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scratchrun::{
//!     Config, NativeRunner, ProcessRunner, ScratchExecutor, ScratchFile, ToolCommand,
//!     TracingListener, command_toolchain,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder()
//!     .instrumenter(ToolCommand::new("scratch-instrument", ["{input}"]))
//!     .analyzer(ToolCommand::new("scratch-analyze", ["{input}", "{unit}"]))
//!     .compiler(ToolCommand::new("scratch-compile", ["{input}", "-d", "{out_dir}"]))
//!     .build()?;
//!
//! let runner: Arc<dyn ProcessRunner> = Arc::new(NativeRunner::new());
//! let toolchain = command_toolchain(&config.toolchain, Arc::clone(&runner), config.launch.timeout())?;
//! let executor = ScratchExecutor::from_config(toolchain, runner, &config)
//!     .with_listener(Arc::new(TracingListener));
//!
//! let summary = executor.execute(&ScratchFile::from_source("demo.kts", "1 + 1\n"));
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! # Stable Public API
//!
//! - [`ScratchFile`], [`SourceExpression`] and [`LineRange`] - the snippet model
//! - [`ScratchExecutor`], [`ScratchListener`] and [`RunSummary`] - running
//! - [`demux`] and [`demux_with`] - decoding captured program output
//! - [`Config`] and [`ConfigBuilder`] - configuration
//! - [`ScratchError`] and [`ExitCode`] - errors and CLI exit codes

pub mod cli;
pub mod render;

pub use scratchrun_config::{
    CliArgs, ClasspathConfig, Config, ConfigBuilder, ConfigSource, LaunchConfig, ToolCommand,
    ToolchainConfig,
};
pub use scratchrun_engine::{
    Analyzer, Backend, ClosureResolver, Instrumenter, ListenerSet, PassthroughResolver,
    RunFailure, RunStatus, RunSummary, ScratchExecutor, ScratchListener, ScratchRun,
    Toolchain, TracingListener, command_toolchain,
};
pub use scratchrun_protocol::{DemuxError, ScratchOutputEvent, demux, demux_with};
pub use scratchrun_runner::{CommandSpec, NativeRunner, ProcessOutput, ProcessRunner, RunnerError};
pub use scratchrun_utils::error::{ConfigError, ScratchError, UserFriendlyError};
pub use scratchrun_utils::exit_codes::ExitCode;
pub use scratchrun_utils::types::{
    LineRange, OutputKind, ScratchFile, ScratchOutput, SourceExpression, Stage,
};
