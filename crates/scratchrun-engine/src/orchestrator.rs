//! Execution orchestrator for scratch runs
//!
//! Drives one snippet through PRECHECK, INSTRUMENT, ANALYZE, COMPILE, RUN and
//! PARSE. Each stage returns `Result<_, RunFailure>`; the first failure skips
//! the remaining stages and is reported once to every listener.
//!
//! FINISH is structural: [`RunScope`] owns the artifact directory and its
//! `Drop` removes the directory and then calls `on_finish`, so both happen
//! on every exit path, unwinding included.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use scratchrun_config::{ClasspathConfig, Config, LaunchConfig};
use scratchrun_protocol::demux_with;
use scratchrun_runner::ProcessRunner;
use scratchrun_utils::logging::{log_stage_complete, log_stage_failure, log_stage_start, run_span};
use scratchrun_utils::types::{ScratchFile, ScratchOutput, Stage};

use crate::artifacts::ArtifactDir;
use crate::launch::build_launch_command;
use crate::listener::{ListenerSet, ScratchListener};
use crate::run::{RunStatus, RunSummary, ScratchRun};
use crate::stages::{
    COMPILATION_ERROR, Diagnostic, ExecutionOutput, ExpandedContext, GenerationFilter,
    InstrumentationResult, InstrumentedUnit, RunFailure, SourceUnit, StageOutcome, UnitRef,
};
use crate::toolchain::Toolchain;

/// Runs snippets. Holds no per-run state, so one executor can serve
/// concurrent runs from several threads.
pub struct ScratchExecutor {
    toolchain: Toolchain,
    runner: Arc<dyn ProcessRunner>,
    launch: LaunchConfig,
    classpath: ClasspathConfig,
    listeners: ListenerSet,
}

impl std::fmt::Debug for ScratchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchExecutor")
            .field("launch", &self.launch)
            .field("classpath", &self.classpath)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Per-run resources released at FINISH.
struct RunScope<'a> {
    run: &'a ScratchRun,
    listeners: &'a ListenerSet,
    artifacts: Option<ArtifactDir>,
    events_emitted: usize,
    outcome: Option<StageOutcome>,
}

impl<'a> RunScope<'a> {
    fn open(run: &'a ScratchRun, listeners: &'a ListenerSet) -> Self {
        log_stage_start(&run.id, Stage::Start);
        listeners.on_start(run);
        Self {
            run,
            listeners,
            artifacts: None,
            events_emitted: 0,
            outcome: None,
        }
    }
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        if let Some(artifacts) = self.artifacts.take() {
            artifacts.close();
        }
        log_stage_start(&self.run.id, Stage::Finish);
        self.listeners.on_finish(self.run);
    }
}

fn timed<T>(
    run_id: &str,
    stage: Stage,
    f: impl FnOnce() -> Result<T, RunFailure>,
) -> Result<T, RunFailure> {
    log_stage_start(run_id, stage);
    let started = Instant::now();
    let result = f();
    if result.is_ok() {
        log_stage_complete(run_id, stage, started.elapsed().as_millis());
    }
    result
}

impl ScratchExecutor {
    #[must_use]
    pub fn new(
        toolchain: Toolchain,
        runner: Arc<dyn ProcessRunner>,
        launch: LaunchConfig,
        classpath: ClasspathConfig,
    ) -> Self {
        Self {
            toolchain,
            runner,
            launch,
            classpath,
            listeners: ListenerSet::new(),
        }
    }

    /// Executor using the launch and classpath sections of `config`.
    #[must_use]
    pub fn from_config(toolchain: Toolchain, runner: Arc<dyn ProcessRunner>, config: &Config) -> Self {
        Self::new(
            toolchain,
            runner,
            config.launch.clone(),
            config.classpath.clone(),
        )
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ScratchListener>) -> Self {
        self.listeners.add(listener);
        self
    }

    /// Run `file` end to end. Never fails: failures are reported to the
    /// listeners and summarised in the returned [`RunSummary`].
    pub fn execute(&self, file: &ScratchFile) -> RunSummary {
        let run = ScratchRun::new(file);
        let span = run_span(&run.id, file.name());
        let _enter = span.enter();
        let started = Instant::now();
        if self.listeners.is_empty() {
            tracing::debug!("No listeners registered; events are only logged");
        } else {
            tracing::debug!(listeners = self.listeners.len(), "Starting scratch run");
        }

        let mut scope = RunScope::open(&run, &self.listeners);
        let status = match self.run_stages(file, &mut scope) {
            Ok(()) => RunStatus::Succeeded,
            Err(failure) => {
                let stage = failure.stage();
                let message = failure.user_message();
                log_stage_failure(
                    &run.id,
                    stage,
                    &failure.to_string(),
                    started.elapsed().as_millis(),
                );
                self.listeners.error(&run, &message);
                RunStatus::Failed { stage, message }
            }
        };

        let events_emitted = scope.events_emitted;
        let outcome = scope.outcome.take();
        drop(scope);

        RunSummary {
            run,
            status,
            events_emitted,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcome,
        }
    }

    fn run_stages(&self, file: &ScratchFile, scope: &mut RunScope<'_>) -> Result<(), RunFailure> {
        let run_id = scope.run.id.clone();

        timed(&run_id, Stage::Precheck, || self.precheck(file, scope))?;
        let unit = timed(&run_id, Stage::Instrument, || self.instrument(file))?;
        let context = timed(&run_id, Stage::Analyze, || self.analyze(&unit, scope))?;
        let artifact_dir = timed(&run_id, Stage::Compile, || {
            self.compile(&unit, &context, scope)
        })?;
        let output = timed(&run_id, Stage::Run, || {
            self.run_program(&unit, &context, &artifact_dir)
        })?;

        let parsed = timed(&run_id, Stage::Parse, || self.parse(file, &output, scope));
        scope.outcome = Some(StageOutcome::ExecutionOutput(output));
        parsed
    }

    fn precheck(&self, file: &ScratchFile, scope: &mut RunScope<'_>) -> Result<(), RunFailure> {
        let analysis = self
            .toolchain
            .analyzer
            .analyze(&SourceUnit::Original(file))
            .map_err(|cause| RunFailure::AnalyzerFault {
                stage: Stage::Precheck,
                cause,
            })?;
        self.report_diagnostics(
            file,
            &analysis.diagnostics,
            &UnitRef::Original,
            Stage::Precheck,
            scope,
        )
    }

    fn instrument<'f>(&self, file: &'f ScratchFile) -> Result<InstrumentedUnit<'f>, RunFailure> {
        match self.toolchain.instrumenter.process(file) {
            InstrumentationResult::Ok { code, entry_point } => {
                tracing::debug!(entry_point = %entry_point, "Snippet instrumented");
                Ok(InstrumentedUnit::new(file, code, entry_point))
            }
            InstrumentationResult::Error { message } => {
                Err(RunFailure::Instrumentation { message })
            }
        }
    }

    fn analyze(
        &self,
        unit: &InstrumentedUnit<'_>,
        scope: &mut RunScope<'_>,
    ) -> Result<ExpandedContext, RunFailure> {
        let source = SourceUnit::Instrumented(unit);
        let fault = |cause| RunFailure::AnalyzerFault {
            stage: Stage::Analyze,
            cause,
        };

        let analysis = self.toolchain.analyzer.analyze(&source).map_err(fault)?;
        self.report_diagnostics(
            unit.original(),
            &analysis.diagnostics,
            &UnitRef::Instrumented,
            Stage::Analyze,
            scope,
        )?;

        self.toolchain
            .resolver
            .resolve(analysis.context, &source)
            .map_err(fault)
    }

    /// Emit resolvable error diagnostics as per-expression `Error` events and
    /// fail with [`COMPILATION_ERROR`] if any error was reported.
    fn report_diagnostics(
        &self,
        file: &ScratchFile,
        diagnostics: &[Diagnostic],
        unit: &UnitRef,
        stage: Stage,
        scope: &mut RunScope<'_>,
    ) -> Result<(), RunFailure> {
        let errors: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_error()).collect();
        if errors.is_empty() {
            return Ok(());
        }

        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for diagnostic in &errors {
            let expression = diagnostic
                .range
                .filter(|_| &diagnostic.unit == unit)
                .and_then(|range| file.expression_containing(range));
            match expression {
                Some(expression) => resolved.push((expression, *diagnostic)),
                None => unresolved.push(diagnostic.to_string()),
            }
        }

        // Keep every expression's events contiguous.
        resolved.sort_by_key(|(expression, _)| expression.range);
        for (expression, diagnostic) in resolved {
            let output = ScratchOutput::error(diagnostic.message.clone());
            self.listeners.handle(scope.run, expression, &output);
            scope.events_emitted += 1;
        }

        scope.outcome = Some(StageOutcome::AnalysisError {
            diagnostics: errors.into_iter().cloned().collect(),
        });

        // PRECHECK surfaces the bare message; unattributed diagnostics go to the log.
        let message = if unresolved.is_empty() || stage == Stage::Precheck {
            for diagnostic in &unresolved {
                tracing::warn!(stage = %stage, diagnostic = %diagnostic, "Unattributed diagnostic");
            }
            COMPILATION_ERROR.to_string()
        } else {
            format!("{COMPILATION_ERROR}\n{}", unresolved.join("\n"))
        };
        Err(RunFailure::StaticAnalysis { stage, message })
    }

    fn compile(
        &self,
        unit: &InstrumentedUnit<'_>,
        context: &ExpandedContext,
        scope: &mut RunScope<'_>,
    ) -> Result<PathBuf, RunFailure> {
        let dir = ArtifactDir::create().map_err(|source| RunFailure::Io {
            stage: Stage::Compile,
            source,
        })?;
        let path = dir.path().to_path_buf();
        scope.artifacts = Some(dir);

        let filter = GenerationFilter::only(unit.name());
        match self.toolchain.backend.generate(context, &filter, &path) {
            Ok(files) => {
                tracing::debug!(files = files.len(), "Backend produced artifacts");
                scope.outcome = Some(StageOutcome::CompileArtifact {
                    dir: path.clone(),
                    files,
                });
                Ok(path)
            }
            Err(cause) => {
                tracing::error!(file = unit.name(), error = %cause, "Backend failed");
                Err(RunFailure::Backend {
                    file: unit.name().to_string(),
                    cause,
                })
            }
        }
    }

    fn run_program(
        &self,
        unit: &InstrumentedUnit<'_>,
        context: &ExpandedContext,
        artifact_dir: &std::path::Path,
    ) -> Result<ExecutionOutput, RunFailure> {
        let command = build_launch_command(
            &self.launch,
            &self.classpath,
            artifact_dir,
            context,
            unit.entry_point(),
        )?;
        tracing::debug!(command = %command.display_line(), "Launching scratch program");

        let output = self.runner.run(&command, self.launch.timeout())?;
        if !output.success() {
            tracing::warn!(exit_code = ?output.exit_code, "Scratch program exited with non-zero status");
        }

        Ok(ExecutionOutput {
            stdout: output.stdout_string(),
            stderr: output.stderr_string(),
            exit_code: output.exit_code,
        })
    }

    /// stderr first, then stdout events as they are decoded.
    fn parse(
        &self,
        file: &ScratchFile,
        output: &ExecutionOutput,
        scope: &mut RunScope<'_>,
    ) -> Result<(), RunFailure> {
        if !output.stderr.trim().is_empty() {
            self.listeners.error(scope.run, output.stderr.trim_end());
        }
        if output.stdout.trim().is_empty() {
            return Ok(());
        }

        let run = scope.run;
        let listeners = &self.listeners;
        let events = &mut scope.events_emitted;
        demux_with(&output.stdout, file, |event| {
            listeners.handle(run, &event.expression, &event.output);
            *events += 1;
        })?;
        Ok(())
    }
}
