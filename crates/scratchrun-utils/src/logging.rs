//! Logging and observability for scratch runs
//!
//! Structured `tracing` output with one span per run and one event per stage
//! transition. The subscriber honours `RUST_LOG`, falling back to a level
//! chosen by `verbose`.

use std::io::IsTerminal;
use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::types::Stage;

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so stdout stays reserved for run results. Verbose mode
/// adds targets and span close events (which carry span durations).
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("scratchrun=debug,info")
            } else {
                EnvFilter::try_new("scratchrun=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one scratch run.
pub fn run_span(run_id: &str, file_name: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "scratch_run",
        run_id = %run_id,
        file = %file_name,
    )
}

pub fn log_stage_start(run_id: &str, stage: Stage) {
    info!(
        run_id = %run_id,
        stage = %stage,
        "Starting stage"
    );
}

pub fn log_stage_complete(run_id: &str, stage: Stage, duration_ms: u128) {
    info!(
        run_id = %run_id,
        stage = %stage,
        duration_ms = %duration_ms,
        "Stage completed"
    );
}

pub fn log_stage_failure(run_id: &str, stage: Stage, error: &str, duration_ms: u128) {
    error!(
        run_id = %run_id,
        stage = %stage,
        duration_ms = %duration_ms,
        error = %error,
        "Stage failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_is_inert_without_subscriber() {
        let span = run_span("abc123", "scratch.kts");
        let _guard = span.enter();
        log_stage_start("abc123", Stage::Compile);
        log_stage_complete("abc123", Stage::Compile, 12);
        log_stage_failure("abc123", Stage::Run, "boom", 3);
    }
}
