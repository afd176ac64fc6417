//! End-to-end tests of the orchestrator over in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scratchrun_config::{ClasspathConfig, LaunchConfig};
use scratchrun_engine::{
    Analysis, Analyzer, AnalyzerFault, Backend, BackendError, COMPILATION_ERROR, Diagnostic,
    ExpandedContext, GenerationFilter, InstrumentationResult, Instrumenter, ListenerEvent,
    PassthroughResolver, RecordingListener, RunStatus, ScratchExecutor, SourceUnit,
    StageOutcome, Toolchain, UnitRef,
};
use scratchrun_protocol::markers::{END_OUTPUT_MARKER, encode_line_info, encode_value};
use scratchrun_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use scratchrun_utils::types::{
    LineRange, OutputKind, ScratchFile, ScratchOutput, SourceExpression, Stage,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeInstrumenter {
    result: InstrumentationResult,
    calls: Arc<Mutex<usize>>,
}

impl Instrumenter for FakeInstrumenter {
    fn process(&self, _file: &ScratchFile) -> InstrumentationResult {
        *self.calls.lock().unwrap() += 1;
        self.result.clone()
    }
}

#[derive(Default)]
struct FakeAnalyzer {
    original: Vec<Diagnostic>,
    instrumented: Vec<Diagnostic>,
    fault_on_instrumented: Option<String>,
}

impl Analyzer for FakeAnalyzer {
    fn analyze(&self, unit: &SourceUnit<'_>) -> Result<Analysis, AnalyzerFault> {
        let diagnostics = match unit.kind() {
            UnitRef::Original => self.original.clone(),
            _ => {
                if let Some(message) = &self.fault_on_instrumented {
                    return Err(AnalyzerFault::new(message.clone()));
                }
                self.instrumented.clone()
            }
        };
        Ok(Analysis {
            diagnostics,
            ..Analysis::default()
        })
    }
}

/// Writes one class file, remembers where, optionally fails or panics.
#[derive(Default)]
struct FakeBackend {
    out_dirs: Arc<Mutex<Vec<PathBuf>>>,
    fail_with: Option<String>,
    panic: bool,
}

impl Backend for FakeBackend {
    fn generate(
        &self,
        _context: &ExpandedContext,
        filter: &GenerationFilter,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, BackendError> {
        self.out_dirs.lock().unwrap().push(out_dir.to_path_buf());
        assert!(filter.accepts("s.kts"));
        if self.panic {
            panic!("backend exploded");
        }
        if let Some(message) = &self.fail_with {
            return Err(BackendError::Generation {
                message: message.clone(),
            });
        }
        let class = out_dir.join("ScratchKt.class");
        std::fs::write(&class, b"\xca\xfe\xba\xbe")?;
        Ok(vec![class])
    }
}

enum RunnerReply {
    Output(ProcessOutput),
    Error(fn() -> RunnerError),
}

/// Returns a canned reply and records every command it was asked to run.
struct FakeRunner {
    reply: RunnerReply,
    commands: Arc<Mutex<Vec<CommandSpec>>>,
}

impl ProcessRunner for FakeRunner {
    fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        self.commands.lock().unwrap().push(cmd.clone());
        match &self.reply {
            RunnerReply::Output(output) => Ok(output.clone()),
            RunnerReply::Error(make) => Err(make()),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    analyzer: FakeAnalyzer,
    instrumentation: InstrumentationResult,
    backend: FakeBackend,
    reply: RunnerReply,
}

struct Fixture {
    executor: ScratchExecutor,
    recorder: Arc<RecordingListener>,
    out_dirs: Arc<Mutex<Vec<PathBuf>>>,
    commands: Arc<Mutex<Vec<CommandSpec>>>,
    instrument_calls: Arc<Mutex<usize>>,
}

impl Harness {
    fn with_stdout(stdout: String) -> Self {
        Self {
            analyzer: FakeAnalyzer::default(),
            instrumentation: InstrumentationResult::Ok {
                code: "instrumented".to_string(),
                entry_point: "ScratchKt".to_string(),
            },
            backend: FakeBackend::default(),
            reply: RunnerReply::Output(ProcessOutput::from_text(&stdout, "", Some(0))),
        }
    }

    fn build(self) -> Fixture {
        let recorder = Arc::new(RecordingListener::new());
        let out_dirs = Arc::clone(&self.backend.out_dirs);
        let commands = Arc::new(Mutex::new(Vec::new()));
        let instrument_calls = Arc::new(Mutex::new(0));

        let toolchain = Toolchain {
            instrumenter: Box::new(FakeInstrumenter {
                result: self.instrumentation,
                calls: Arc::clone(&instrument_calls),
            }),
            analyzer: Box::new(self.analyzer),
            resolver: Box::new(PassthroughResolver),
            backend: Box::new(self.backend),
        };
        let runner = Arc::new(FakeRunner {
            reply: self.reply,
            commands: Arc::clone(&commands),
        });
        let classpath = ClasspathConfig {
            module_output: vec!["out/main".into()],
            dependencies: vec!["lib/stdlib.jar".into()],
        };

        let executor = ScratchExecutor::new(toolchain, runner, LaunchConfig::default(), classpath)
            .with_listener(recorder.clone());

        Fixture {
            executor,
            recorder,
            out_dirs,
            commands,
            instrument_calls,
        }
    }
}

impl Fixture {
    fn assert_artifacts_removed(&self) {
        for dir in self.out_dirs.lock().unwrap().iter() {
            assert!(!dir.exists(), "artifact dir {} still exists", dir.display());
        }
    }
}

fn three_expressions() -> ScratchFile {
    ScratchFile::new(
        "s.kts",
        "val a = 1\nval b = 2\na + b",
        vec![
            SourceExpression::new(LineRange::single(0), "val a = 1"),
            SourceExpression::new(LineRange::single(1), "val b = 2"),
            SourceExpression::new(LineRange::single(2), "a + b"),
        ],
    )
    .unwrap()
}

fn three_results() -> String {
    [
        encode_value("1"),
        encode_line_info(LineRange::single(0)),
        encode_value("2"),
        encode_line_info(LineRange::single(1)),
        encode_value("3"),
        encode_line_info(LineRange::single(2)),
        END_OUTPUT_MARKER.to_string(),
    ]
    .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_full_success_finishes_once() {
    let fixture = Harness::with_stdout(three_results()).build();
    let summary = fixture.executor.execute(&three_expressions());

    assert!(summary.is_success());
    assert_eq!(summary.events_emitted, 3);
    assert_eq!(fixture.recorder.finish_count(), 1);
    assert!(fixture.recorder.errors().is_empty());
    assert_eq!(
        fixture.recorder.handled(),
        vec![
            (LineRange::single(0), ScratchOutput::result("1")),
            (LineRange::single(1), ScratchOutput::result("2")),
            (LineRange::single(2), ScratchOutput::result("3")),
        ]
    );

    let events = fixture.recorder.events();
    assert!(matches!(events.first(), Some(ListenerEvent::Start { .. })));
    assert!(matches!(events.last(), Some(ListenerEvent::Finish { .. })));
    assert!(matches!(
        summary.outcome,
        Some(StageOutcome::ExecutionOutput(_))
    ));
    fixture.assert_artifacts_removed();
    assert_eq!(fixture.out_dirs.lock().unwrap().len(), 1);
}

#[test]
fn test_precheck_failure_is_bare_compilation_error_and_skips_later_stages() {
    let mut harness = Harness::with_stdout(three_results());
    harness.analyzer.original = vec![Diagnostic::error(
        UnitRef::Original,
        None,
        "Expecting an expression",
    )];
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(
        summary.status,
        RunStatus::Failed {
            stage: Stage::Precheck,
            message: COMPILATION_ERROR.to_string(),
        }
    );
    assert!(fixture.recorder.handled().is_empty());
    assert_eq!(fixture.recorder.errors().len(), 1);
    assert_eq!(fixture.recorder.finish_count(), 1);
    assert_eq!(*fixture.instrument_calls.lock().unwrap(), 0);
    assert!(fixture.out_dirs.lock().unwrap().is_empty());
    assert!(fixture.commands.lock().unwrap().is_empty());
}

#[test]
fn test_precheck_diagnostics_attributed_to_expressions() {
    let mut harness = Harness::with_stdout(three_results());
    harness.analyzer.original = vec![
        Diagnostic::error(UnitRef::Original, Some(LineRange::single(2)), "Unresolved reference: c"),
        Diagnostic::error(UnitRef::Original, Some(LineRange::single(0)), "Type mismatch"),
        Diagnostic::error(UnitRef::Original, Some(LineRange::single(2)), "Unresolved reference: d"),
    ];
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(summary.events_emitted, 3);
    assert_eq!(
        fixture.recorder.handled(),
        vec![
            (LineRange::single(0), ScratchOutput::error("Type mismatch")),
            (LineRange::single(2), ScratchOutput::error("Unresolved reference: c")),
            (LineRange::single(2), ScratchOutput::error("Unresolved reference: d")),
        ]
    );
    assert_eq!(fixture.recorder.errors(), vec![COMPILATION_ERROR.to_string()]);
    assert!(matches!(
        summary.outcome,
        Some(StageOutcome::AnalysisError { ref diagnostics }) if diagnostics.len() == 3
    ));
}

#[test]
fn test_warnings_do_not_fail_precheck() {
    let mut harness = Harness::with_stdout(three_results());
    harness.analyzer.original = vec![Diagnostic {
        severity: scratchrun_engine::Severity::Warning,
        unit: UnitRef::Original,
        range: Some(LineRange::single(0)),
        message: "Variable 'a' is never used".to_string(),
    }];
    let fixture = harness.build();

    assert!(fixture.executor.execute(&three_expressions()).is_success());
}

#[test]
fn test_instrumented_diagnostics_resolve_in_original_lines() {
    let mut harness = Harness::with_stdout(three_results());
    harness.analyzer.instrumented = vec![
        Diagnostic::error(UnitRef::Instrumented, Some(LineRange::single(1)), "Val cannot be reassigned"),
        Diagnostic::error(UnitRef::Other("Lib.kt".to_string()), Some(LineRange::single(1)), "broken dependency"),
    ];
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(
        fixture.recorder.handled(),
        vec![(LineRange::single(1), ScratchOutput::error("Val cannot be reassigned"))]
    );
    assert_eq!(
        summary.status,
        RunStatus::Failed {
            stage: Stage::Analyze,
            message: format!("{COMPILATION_ERROR}\n1..1: broken dependency"),
        }
    );
    assert!(fixture.out_dirs.lock().unwrap().is_empty());
}

#[test]
fn test_analyzer_fault_surfaces_cause() {
    let mut harness = Harness::with_stdout(three_results());
    harness.analyzer.fault_on_instrumented = Some("frontend crashed".to_string());
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(fixture.recorder.errors(), vec!["frontend crashed".to_string()]);
    assert!(matches!(summary.status, RunStatus::Failed { stage: Stage::Analyze, .. }));
    assert_eq!(fixture.recorder.finish_count(), 1);
}

#[test]
fn test_instrumentation_error_message_passed_through() {
    let mut harness = Harness::with_stdout(three_results());
    harness.instrumentation = InstrumentationResult::Error {
        message: "Scratch contains a top-level class with the same name".to_string(),
    };
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(
        fixture.recorder.errors(),
        vec!["Scratch contains a top-level class with the same name".to_string()]
    );
    assert!(matches!(summary.status, RunStatus::Failed { stage: Stage::Instrument, .. }));
}

#[test]
fn test_backend_failure_is_generic_and_cleans_up() {
    let mut harness = Harness::with_stdout(three_results());
    harness.backend.fail_with = Some("java.lang.IllegalStateException: codegen".to_string());
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(fixture.recorder.errors(), vec!["Couldn't compile s.kts".to_string()]);
    assert!(matches!(summary.status, RunStatus::Failed { stage: Stage::Compile, .. }));
    assert_eq!(fixture.out_dirs.lock().unwrap().len(), 1);
    fixture.assert_artifacts_removed();
    assert!(fixture.commands.lock().unwrap().is_empty());
}

#[test]
fn test_mid_parse_failure_keeps_earlier_events() {
    let stdout = [
        encode_value("1"),
        encode_line_info(LineRange::single(0)),
        encode_value("2"),
        encode_line_info(LineRange::single(1)),
        encode_value("3"),
        encode_line_info(LineRange::new(7, 9)),
        END_OUTPUT_MARKER.to_string(),
    ]
    .join("\n");
    let fixture = Harness::with_stdout(stdout).build();

    let summary = fixture.executor.execute(&three_expressions());

    assert_eq!(fixture.recorder.handled().len(), 2);
    assert_eq!(summary.events_emitted, 2);
    assert_eq!(fixture.recorder.errors().len(), 1);
    assert!(fixture.recorder.errors()[0].contains("7..9"));
    assert_eq!(fixture.recorder.finish_count(), 1);
    assert!(matches!(summary.status, RunStatus::Failed { stage: Stage::Parse, .. }));
    fixture.assert_artifacts_removed();
}

#[test]
fn test_stderr_reported_before_stdout_events() {
    let mut harness = Harness::with_stdout(String::new());
    harness.reply = RunnerReply::Output(ProcessOutput::from_text(
        &format!("hello\n{}\n{}", encode_value("10"), encode_line_info(LineRange::single(2))),
        "Exception in thread \"main\"\n",
        Some(1),
    ));
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert!(summary.is_success(), "non-zero exit does not fail the run");
    let events = fixture.recorder.events();
    assert_eq!(
        events[1],
        ListenerEvent::Error {
            message: "Exception in thread \"main\"".to_string()
        }
    );
    assert_eq!(
        events[2],
        ListenerEvent::Handle {
            range: LineRange::single(2),
            output: ScratchOutput::new("hello", OutputKind::Output),
        }
    );
    assert_eq!(
        events[3],
        ListenerEvent::Handle {
            range: LineRange::single(2),
            output: ScratchOutput::result("10"),
        }
    );
}

#[test]
fn test_launch_failure_cleans_up() {
    let mut harness = Harness::with_stdout(String::new());
    harness.reply = RunnerReply::Error(|| RunnerError::LaunchFailed {
        program: "java".to_string(),
        reason: "No such file or directory".to_string(),
    });
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    assert!(matches!(summary.status, RunStatus::Failed { stage: Stage::Run, .. }));
    assert!(fixture.recorder.errors()[0].contains("java"));
    assert_eq!(fixture.recorder.finish_count(), 1);
    fixture.assert_artifacts_removed();
}

#[test]
fn test_timeout_is_execution_failure() {
    let mut harness = Harness::with_stdout(String::new());
    harness.reply = RunnerReply::Error(|| RunnerError::Timeout { timeout_seconds: 60 });
    let fixture = harness.build();

    let summary = fixture.executor.execute(&three_expressions());

    match summary.status {
        RunStatus::Failed { stage, message } => {
            assert_eq!(stage, Stage::Run);
            assert!(message.contains("60"));
        }
        RunStatus::Succeeded => panic!("timeout must fail the run"),
    }
    fixture.assert_artifacts_removed();
}

#[test]
fn test_launch_command_classpath_starts_with_artifacts() {
    let fixture = Harness::with_stdout(three_results()).build();
    fixture.executor.execute(&three_expressions());

    let commands = fixture.commands.lock().unwrap();
    let cmd = &commands[0];
    assert_eq!(cmd.program, "java");
    let cp_index = cmd.args.iter().position(|a| a == "-cp").unwrap();
    let entries: Vec<PathBuf> = std::env::split_paths(&cmd.args[cp_index + 1]).collect();
    let out_dir = fixture.out_dirs.lock().unwrap()[0].clone();
    assert_eq!(
        entries,
        vec![out_dir, PathBuf::from("out/main"), PathBuf::from("lib/stdlib.jar")]
    );
    assert_eq!(cmd.args.last().unwrap(), "ScratchKt");
}

#[test]
fn test_panicking_backend_still_finishes_and_cleans_up() {
    let mut harness = Harness::with_stdout(three_results());
    harness.backend.panic = true;
    let fixture = harness.build();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        fixture.executor.execute(&three_expressions())
    }));

    assert!(result.is_err());
    assert_eq!(fixture.recorder.finish_count(), 1);
    fixture.assert_artifacts_removed();
}

#[test]
fn test_concurrent_runs_are_independent() {
    let fixture = Harness::with_stdout(three_results()).build();
    let file = three_expressions();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let summary = fixture.executor.execute(&file);
                assert!(summary.is_success());
                assert_eq!(summary.events_emitted, 3);
            });
        }
    });

    assert_eq!(fixture.recorder.finish_count(), 4);
    assert_eq!(fixture.recorder.handled().len(), 12);
    assert_eq!(fixture.out_dirs.lock().unwrap().len(), 4);
    fixture.assert_artifacts_removed();
}
