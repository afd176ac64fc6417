//! Orchestration of scratch runs
//!
//! [`ScratchExecutor`] sequences the stages of a run over the collaborator
//! traits in [`toolchain`] and reports to [`ScratchListener`]s. The
//! [`command_toolchain`] module backs every collaborator with an external
//! program.

pub mod artifacts;
pub mod command_toolchain;
pub mod launch;
pub mod listener;
pub mod orchestrator;
pub mod run;
pub mod stages;
pub mod toolchain;

pub use command_toolchain::command_toolchain;
pub use listener::{ListenerEvent, ListenerSet, RecordingListener, ScratchListener, TracingListener};
pub use orchestrator::ScratchExecutor;
pub use run::{RunStatus, RunSummary, ScratchRun};
pub use stages::{
    Analysis, AnalyzerFault, BackendError, COMPILATION_ERROR, Diagnostic, ExecutionOutput,
    ExpandedContext, GenerationFilter, InstrumentationResult, InstrumentedUnit, ModuleContext,
    RunFailure, Severity, SourceUnit, StageOutcome, UnitRef, UnitSource,
};
pub use toolchain::{Analyzer, Backend, ClosureResolver, Instrumenter, PassthroughResolver, Toolchain};
