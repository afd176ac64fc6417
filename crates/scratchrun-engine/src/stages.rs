//! Stage result types
//!
//! Values passed between the stages of one run, plus [`RunFailure`], the
//! single failure type every stage converts its errors into.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use scratchrun_protocol::DemuxError;
use scratchrun_runner::RunnerError;
use scratchrun_utils::types::{LineRange, ScratchFile, Stage};

/// Message surfaced for any error-severity diagnostic.
pub const COMPILATION_ERROR: &str = "Compilation Error";

/// What the instrumenter made of a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentationResult {
    Ok { code: String, entry_point: String },
    Error { message: String },
}

/// Instrumented source with a back-link to the snippet it came from.
///
/// Line numbers in diagnostics reported against this unit are read in the
/// original snippet's coordinates.
#[derive(Debug, Clone)]
pub struct InstrumentedUnit<'f> {
    original: &'f ScratchFile,
    code: String,
    entry_point: String,
}

impl<'f> InstrumentedUnit<'f> {
    #[must_use]
    pub fn new(original: &'f ScratchFile, code: String, entry_point: String) -> Self {
        Self {
            original,
            code,
            entry_point,
        }
    }

    #[must_use]
    pub fn original(&self) -> &'f ScratchFile {
        self.original
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Instrumented units keep the snippet's file name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.original.name()
    }
}

/// A unit handed to the analyzer or closure resolver.
#[derive(Debug, Clone, Copy)]
pub enum SourceUnit<'a> {
    Original(&'a ScratchFile),
    Instrumented(&'a InstrumentedUnit<'a>),
}

impl SourceUnit<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Original(file) => file.name(),
            Self::Instrumented(unit) => unit.name(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Original(file) => file.text(),
            Self::Instrumented(unit) => unit.code(),
        }
    }

    #[must_use]
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Original(file) => file.module(),
            Self::Instrumented(unit) => unit.original().module(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> UnitRef {
        match self {
            Self::Original(_) => UnitRef::Original,
            Self::Instrumented(_) => UnitRef::Instrumented,
        }
    }
}

/// Which unit a diagnostic points into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitRef {
    Original,
    Instrumented,
    /// Some other file of the module
    Other(String),
}

impl UnitRef {
    /// Parse the wire form used by external analyzers.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "original" => Self::Original,
            "instrumented" => Self::Instrumented,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub unit: UnitRef,
    pub range: Option<LineRange>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(unit: UnitRef, range: Option<LineRange>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            unit,
            range,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range {
            Some(range) => write!(f, "{range}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Runtime context of the snippet's module as seen by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContext {
    pub module: Option<String>,
    pub dependency_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub diagnostics: Vec<Diagnostic>,
    pub context: ModuleContext,
}

impl Analysis {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// One source handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSource {
    pub name: String,
    pub code: String,
}

/// Everything code generation needs: sources plus the dependency closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedContext {
    pub module: Option<String>,
    pub sources: Vec<UnitSource>,
    pub dependency_files: Vec<PathBuf>,
}

/// Restricts generation to the named units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFilter {
    units: Vec<String>,
}

impl GenerationFilter {
    #[must_use]
    pub fn only(unit: impl Into<String>) -> Self {
        Self {
            units: vec![unit.into()],
        }
    }

    #[must_use]
    pub fn accepts(&self, unit: &str) -> bool {
        self.units.iter().any(|u| u == unit)
    }
}

/// Captured output of the scratch program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// What the last stage that got anywhere produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutcome {
    AnalysisError { diagnostics: Vec<Diagnostic> },
    CompileArtifact { dir: PathBuf, files: Vec<PathBuf> },
    ExecutionOutput(ExecutionOutput),
}

/// Analyzer could not produce diagnostics at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AnalyzerFault {
    pub message: String,
}

impl AnalyzerFault {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Code generation failed: {message}")]
    Generation { message: String },

    #[error("Compiler could not be run: {0}")]
    Tool(#[from] RunnerError),

    #[error("IO error during code generation: {0}")]
    Io(#[from] std::io::Error),
}

/// The one reason a run stopped early.
#[derive(Error, Debug)]
pub enum RunFailure {
    #[error("{message}")]
    StaticAnalysis { stage: Stage, message: String },

    #[error("Analyzer failed during {stage}: {cause}")]
    AnalyzerFault { stage: Stage, cause: AnalyzerFault },

    #[error("Instrumentation failed: {message}")]
    Instrumentation { message: String },

    #[error("Couldn't compile {file}: {cause}")]
    Backend { file: String, cause: BackendError },

    #[error("Couldn't start '{program}': {reason}")]
    ProcessLaunch { program: String, reason: String },

    #[error("Scratch program failed: {reason}")]
    ProcessExecution { reason: String },

    #[error(transparent)]
    UnknownRange(#[from] DemuxError),

    #[error("IO error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl RunFailure {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::StaticAnalysis { stage, .. }
            | Self::AnalyzerFault { stage, .. }
            | Self::Io { stage, .. } => *stage,
            Self::Instrumentation { .. } => Stage::Instrument,
            Self::Backend { .. } => Stage::Compile,
            Self::ProcessLaunch { .. } | Self::ProcessExecution { .. } => Stage::Run,
            Self::UnknownRange(_) => Stage::Parse,
        }
    }

    /// Message shown to listeners. Backend causes stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::StaticAnalysis { message, .. } | Self::Instrumentation { message } => {
                message.clone()
            }
            Self::AnalyzerFault { cause, .. } => cause.message.clone(),
            Self::Backend { file, .. } => format!("Couldn't compile {file}"),
            _ => self.to_string(),
        }
    }
}

impl From<RunnerError> for RunFailure {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::LaunchFailed { program, reason } => Self::ProcessLaunch { program, reason },
            other => Self::ProcessExecution {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failure_message_is_generic() {
        let failure = RunFailure::Backend {
            file: "scratch.kts".to_string(),
            cause: BackendError::Generation {
                message: "internal error: NPE in codegen".to_string(),
            },
        };
        assert_eq!(failure.user_message(), "Couldn't compile scratch.kts");
        assert!(failure.to_string().contains("NPE"));
        assert_eq!(failure.stage(), Stage::Compile);
    }

    #[test]
    fn test_runner_errors_split_by_phase() {
        let launch: RunFailure = RunnerError::LaunchFailed {
            program: "java".to_string(),
            reason: "No such file".to_string(),
        }
        .into();
        assert!(matches!(launch, RunFailure::ProcessLaunch { .. }));
        assert_eq!(launch.stage(), Stage::Run);

        let timeout: RunFailure = RunnerError::Timeout { timeout_seconds: 5 }.into();
        assert!(matches!(timeout, RunFailure::ProcessExecution { .. }));
        assert!(timeout.user_message().contains('5'));
    }

    #[test]
    fn test_unknown_range_is_parse_failure() {
        let failure: RunFailure = DemuxError::UnknownRange {
            range: LineRange::new(4, 4),
        }
        .into();
        assert_eq!(failure.stage(), Stage::Parse);
        assert!(failure.user_message().contains("4..4"));
    }

    #[test]
    fn test_unit_ref_wire_form() {
        assert_eq!(UnitRef::from_wire("original"), UnitRef::Original);
        assert_eq!(UnitRef::from_wire("instrumented"), UnitRef::Instrumented);
        assert_eq!(
            UnitRef::from_wire("Other.kt"),
            UnitRef::Other("Other.kt".to_string())
        );
    }

    #[test]
    fn test_source_unit_views() {
        let file = ScratchFile::from_source("s.kts", "val x = 1\nx").with_module("app");
        let unit = InstrumentedUnit::new(&file, "instrumented".to_string(), "SKt".to_string());

        let original = SourceUnit::Original(&file);
        let instrumented = SourceUnit::Instrumented(&unit);
        assert_eq!(original.text(), "val x = 1\nx");
        assert_eq!(instrumented.text(), "instrumented");
        assert_eq!(instrumented.name(), "s.kts");
        assert_eq!(instrumented.module(), Some("app"));
        assert_eq!(instrumented.kind(), UnitRef::Instrumented);
    }

    #[test]
    fn test_generation_filter() {
        let filter = GenerationFilter::only("s.kts");
        assert!(filter.accepts("s.kts"));
        assert!(!filter.accepts("Other.kt"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(UnitRef::Original, Some(LineRange::single(2)), "Unresolved reference: foo");
        assert_eq!(diag.to_string(), "2..2: Unresolved reference: foo");
        assert!(diag.is_error());
    }
}
