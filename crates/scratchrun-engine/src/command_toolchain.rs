//! Collaborators backed by external programs
//!
//! Each tool is a configured [`ToolCommand`]. Before a call, placeholders in
//! its arguments are substituted:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{input}` | path of a temporary file holding the unit's source |
//! | `{unit}` | `original` or `instrumented` (analyzer only) |
//! | `{out_dir}` | artifact directory (backend only) |
//! | `{classpath}` | dependency files joined with the platform separator (backend only) |
//!
//! Instrumenter and analyzer answer with one JSON document on stdout.

use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scratchrun_config::{ToolCommand, ToolchainConfig};
use scratchrun_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use scratchrun_utils::error::ConfigError;
use scratchrun_utils::types::{LineRange, ScratchFile};

use crate::stages::{
    Analysis, AnalyzerFault, BackendError, Diagnostic, ExpandedContext, GenerationFilter,
    InstrumentationResult, ModuleContext, Severity, SourceUnit, UnitRef,
};
use crate::toolchain::{Analyzer, Backend, Instrumenter, PassthroughResolver, Toolchain};

const FALLBACK_FILE_NAME: &str = "scratch.kts";

/// Shared plumbing: the command, the runner and the per-call timeout.
#[derive(Clone)]
struct ToolInvoker {
    command: ToolCommand,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

/// A source file written for one tool call, removed on drop.
struct StagedInput {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl StagedInput {
    fn write(name: &str, text: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("scratch-input").tempdir()?;
        let file_name = Path::new(name)
            .file_name()
            .map_or_else(|| OsString::from(FALLBACK_FILE_NAME), ToOwned::to_owned);
        let path = dir.path().join(file_name);
        std::fs::write(&path, text)?;
        Ok(Self { _dir: dir, path })
    }
}

impl ToolInvoker {
    fn spec(&self, substitutions: &[(&str, String)]) -> CommandSpec {
        let args = self.command.args.iter().map(|arg| {
            substitutions
                .iter()
                .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
        });
        CommandSpec::new(&self.command.program).args(args)
    }

    fn invoke(&self, substitutions: &[(&str, String)]) -> Result<ProcessOutput, RunnerError> {
        let spec = self.spec(substitutions);
        tracing::debug!(command = %spec.display_line(), "Invoking toolchain command");
        self.runner.run(&spec, self.timeout)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn tool_failure(tool: &str, output: &ProcessOutput) -> String {
    let stderr = output.stderr_string();
    let stderr = stderr.trim();
    match output.exit_code {
        Some(code) if !stderr.is_empty() => format!("{tool} exited with status {code}: {stderr}"),
        Some(code) => format!("{tool} exited with status {code}"),
        None if !stderr.is_empty() => format!("{tool} was terminated: {stderr}"),
        None => format!("{tool} was terminated"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum InstrumenterReply {
    Ok { code: String, entry_point: String },
    Error { message: String },
}

pub struct CommandInstrumenter {
    invoker: ToolInvoker,
}

impl Instrumenter for CommandInstrumenter {
    fn process(&self, file: &ScratchFile) -> InstrumentationResult {
        let error = |message: String| InstrumentationResult::Error { message };

        let input = match StagedInput::write(file.name(), file.text()) {
            Ok(input) => input,
            Err(e) => return error(format!("Could not stage snippet for instrumentation: {e}")),
        };
        let output = match self.invoker.invoke(&[("{input}", path_arg(&input.path))]) {
            Ok(output) => output,
            Err(e) => return error(format!("Instrumenter could not be run: {e}")),
        };
        if !output.success() {
            return error(tool_failure("Instrumenter", &output));
        }

        match serde_json::from_slice::<InstrumenterReply>(&output.stdout) {
            Ok(InstrumenterReply::Ok { code, entry_point }) => {
                InstrumentationResult::Ok { code, entry_point }
            }
            Ok(InstrumenterReply::Error { message }) => error(message),
            Err(e) => error(format!("Instrumenter reply is not valid JSON: {e}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzerReply {
    module: Option<String>,
    fatal: Option<String>,
    #[serde(default)]
    dependency_files: Vec<PathBuf>,
    #[serde(default)]
    diagnostics: Vec<WireDiagnostic>,
}

#[derive(Debug, Deserialize)]
struct WireDiagnostic {
    severity: Severity,
    unit: String,
    start_line: Option<u32>,
    end_line: Option<u32>,
    message: String,
}

impl WireDiagnostic {
    fn into_diagnostic(self) -> Diagnostic {
        let range = match (self.start_line, self.end_line) {
            (Some(start), Some(end)) if start <= end => Some(LineRange::new(start, end)),
            (Some(line), None) => Some(LineRange::single(line)),
            _ => None,
        };
        Diagnostic {
            severity: self.severity,
            unit: UnitRef::from_wire(&self.unit),
            range,
            message: self.message,
        }
    }
}

pub struct CommandAnalyzer {
    invoker: ToolInvoker,
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&self, unit: &SourceUnit<'_>) -> Result<Analysis, AnalyzerFault> {
        let input = StagedInput::write(unit.name(), unit.text())
            .map_err(|e| AnalyzerFault::new(format!("Could not stage unit for analysis: {e}")))?;
        let unit_kind = match unit.kind() {
            UnitRef::Original => "original",
            _ => "instrumented",
        };
        let output = self
            .invoker
            .invoke(&[
                ("{input}", path_arg(&input.path)),
                ("{unit}", unit_kind.to_string()),
            ])
            .map_err(|e| AnalyzerFault::new(format!("Analyzer could not be run: {e}")))?;

        // Diagnostics may come with a non-zero status; only unreadable output is fatal.
        let reply: AnalyzerReply = serde_json::from_slice(&output.stdout).map_err(|e| {
            if output.success() {
                AnalyzerFault::new(format!("Analyzer reply is not valid JSON: {e}"))
            } else {
                AnalyzerFault::new(tool_failure("Analyzer", &output))
            }
        })?;

        if let Some(fatal) = reply.fatal {
            return Err(AnalyzerFault::new(fatal));
        }

        Ok(Analysis {
            diagnostics: reply
                .diagnostics
                .into_iter()
                .map(WireDiagnostic::into_diagnostic)
                .collect(),
            context: ModuleContext {
                module: reply.module.or_else(|| unit.module().map(str::to_string)),
                dependency_files: reply.dependency_files,
            },
        })
    }
}

pub struct CommandBackend {
    invoker: ToolInvoker,
}

impl Backend for CommandBackend {
    fn generate(
        &self,
        context: &ExpandedContext,
        filter: &GenerationFilter,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, BackendError> {
        let classpath = std::env::join_paths(&context.dependency_files)
            .map_err(|e| BackendError::Generation {
                message: format!("invalid dependency path: {e}"),
            })?
            .to_string_lossy()
            .into_owned();

        for source in context.sources.iter().filter(|s| filter.accepts(&s.name)) {
            let input = StagedInput::write(&source.name, &source.code)?;
            let output = self.invoker.invoke(&[
                ("{input}", path_arg(&input.path)),
                ("{out_dir}", path_arg(out_dir)),
                ("{classpath}", classpath.clone()),
            ])?;
            if !output.success() {
                return Err(BackendError::Generation {
                    message: tool_failure("Compiler", &output),
                });
            }
        }

        let mut produced = Vec::new();
        collect_files(out_dir, &mut produced)?;
        produced.sort();
        Ok(produced)
    }
}

fn collect_files(dir: &Path, into: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, into)?;
        } else {
            into.push(path);
        }
    }
    Ok(())
}

/// Build a [`Toolchain`] from the `[toolchain]` section.
///
/// Every collaborator must be configured; the closure is taken from the
/// analyzer's `dependency_files`.
pub fn command_toolchain(
    config: &ToolchainConfig,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
) -> Result<Toolchain, ConfigError> {
    let (Some(instrumenter), Some(analyzer), Some(compiler)) =
        (&config.instrumenter, &config.analyzer, &config.compiler)
    else {
        return Err(ConfigError::InvalidValue {
            key: "toolchain".to_string(),
            value: format!("missing commands for: {}", config.missing().join(", ")),
        });
    };

    let invoker = |command: &ToolCommand| ToolInvoker {
        command: command.clone(),
        runner: Arc::clone(&runner),
        timeout,
    };

    Ok(Toolchain {
        instrumenter: Box::new(CommandInstrumenter {
            invoker: invoker(instrumenter),
        }),
        analyzer: Box::new(CommandAnalyzer {
            invoker: invoker(analyzer),
        }),
        resolver: Box::new(PassthroughResolver),
        backend: Box::new(CommandBackend {
            invoker: invoker(compiler),
        }),
    })
}
