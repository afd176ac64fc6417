//! Command implementations
//!
//! Each command returns the exit code for a completed command, or a
//! [`ScratchError`] for failures that happen before a run exists.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::render::{JsonLinesListener, TerminalListener};
use crate::{
    Config, ExitCode, NativeRunner, ProcessRunner, RunSummary, ScratchError, ScratchExecutor,
    ScratchFile, ScratchListener, ScratchRun, TracingListener, command_toolchain, demux_with,
};

fn load_scratch_file(path: &Path) -> Result<ScratchFile, ScratchError> {
    let text = fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(ScratchFile::from_source(name, text))
}

fn renderer(json: bool) -> Arc<dyn ScratchListener> {
    if json {
        Arc::new(JsonLinesListener::stdout())
    } else {
        Arc::new(TerminalListener::stdout())
    }
}

/// Execute the `run` command.
pub(crate) fn execute_run_command(
    file: &Path,
    json: bool,
    config: &Config,
) -> Result<ExitCode, ScratchError> {
    let scratch = load_scratch_file(file)?;
    tracing::debug!(
        file = scratch.name(),
        expressions = scratch.expressions().len(),
        "Loaded scratch file"
    );

    let runner: Arc<dyn ProcessRunner> = Arc::new(NativeRunner::new());
    let toolchain = command_toolchain(
        &config.toolchain,
        Arc::clone(&runner),
        config.launch.timeout(),
    )?;
    let launcher = config.validate_launcher()?;
    tracing::debug!(launcher = %launcher.display(), "Resolved JVM launcher");

    let executor = ScratchExecutor::from_config(toolchain, runner, config)
        .with_listener(Arc::new(TracingListener))
        .with_listener(renderer(json));

    let summary = executor.execute(&scratch);
    tracing::info!(
        run_id = %summary.run.id,
        events = summary.events_emitted,
        duration = ?summary.duration(),
        success = summary.is_success(),
        "Scratch run finished"
    );
    if json {
        print_summary(&summary)?;
    }

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::RUN_FAILED
    })
}

fn print_summary(summary: &RunSummary) -> Result<(), ScratchError> {
    let mut value = serde_json::to_value(summary).map_err(io::Error::from)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("event".to_string(), json!("summary"));
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{value}")?;
    Ok(())
}

/// Execute the `demux` command.
///
/// Replays captured stdout through the same listener sequence a live run
/// produces, without compiling or launching anything.
pub(crate) fn execute_demux_command(
    file: &Path,
    captured: &Path,
    json: bool,
) -> Result<ExitCode, ScratchError> {
    let scratch = load_scratch_file(file)?;
    let raw = fs::read_to_string(captured)?;

    let listener = renderer(json);
    let run = ScratchRun::new(&scratch);
    listener.on_start(&run);

    let result = demux_with(&raw, &scratch, |event| {
        listener.handle(&run, &event.expression, &event.output);
    });
    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!(error = %e, "Captured output could not be decoded");
            listener.error(&run, &e.to_string());
            ExitCode::RUN_FAILED
        }
    };

    listener.on_finish(&run);
    Ok(code)
}

/// Execute the `config` command.
pub(crate) fn execute_config_command(config: &Config, json: bool) -> Result<ExitCode, ScratchError> {
    let effective = config.effective_config();
    let mut stdout = io::stdout().lock();

    if json {
        let settings: serde_json::Map<String, serde_json::Value> = effective
            .iter()
            .map(|(key, (value, source))| {
                (key.clone(), json!({ "value": value, "source": source }))
            })
            .collect();
        let document = json!({
            "config_file": config.config_path.as_ref().map(|p| p.display().to_string()),
            "settings": settings,
        });
        let pretty = serde_json::to_string_pretty(&document).map_err(io::Error::from)?;
        writeln!(stdout, "{pretty}")?;
        return Ok(ExitCode::SUCCESS);
    }

    writeln!(stdout, "Effective configuration:")?;
    match &config.config_path {
        Some(path) => writeln!(stdout, "  config file: {}", path.display())?,
        None => writeln!(stdout, "  config file: (none)")?,
    }
    let width = effective.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in &effective {
        writeln!(stdout, "  {key:<width$} = {value}  [{source}]")?;
    }
    Ok(ExitCode::SUCCESS)
}
