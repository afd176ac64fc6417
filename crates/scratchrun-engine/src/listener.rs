//! Listener contract
//!
//! Every run calls `on_start` once, then any number of `handle` and `error`
//! notifications, then `on_finish` exactly once, whatever stage the run
//! stopped at. All `handle` calls for one expression are contiguous.

use std::sync::{Arc, Mutex, PoisonError};

use scratchrun_utils::types::{LineRange, ScratchOutput, SourceExpression};

use crate::run::ScratchRun;

pub trait ScratchListener: Send + Sync {
    fn on_start(&self, run: &ScratchRun);

    /// Always the last call for a run.
    fn on_finish(&self, run: &ScratchRun);

    /// A run-level message: the failure of a stage, or the program's stderr.
    fn error(&self, run: &ScratchRun, message: &str);

    fn handle(&self, run: &ScratchRun, expression: &SourceExpression, output: &ScratchOutput);
}

/// Listeners of one executor, notified in registration order.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<Arc<dyn ScratchListener>>,
}

impl ListenerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn ScratchListener>) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn on_start(&self, run: &ScratchRun) {
        for listener in &self.listeners {
            listener.on_start(run);
        }
    }

    pub fn on_finish(&self, run: &ScratchRun) {
        for listener in &self.listeners {
            listener.on_finish(run);
        }
    }

    pub fn error(&self, run: &ScratchRun, message: &str) {
        for listener in &self.listeners {
            listener.error(run, message);
        }
    }

    pub fn handle(&self, run: &ScratchRun, expression: &SourceExpression, output: &ScratchOutput) {
        for listener in &self.listeners {
            listener.handle(run, expression, output);
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Log sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ScratchListener for TracingListener {
    fn on_start(&self, run: &ScratchRun) {
        tracing::info!(run_id = %run.id, file = %run.file_name, "Scratch run started");
    }

    fn on_finish(&self, run: &ScratchRun) {
        tracing::info!(run_id = %run.id, "Scratch run finished");
    }

    fn error(&self, run: &ScratchRun, message: &str) {
        tracing::warn!(run_id = %run.id, message = %message, "Scratch run reported an error");
    }

    fn handle(&self, run: &ScratchRun, expression: &SourceExpression, output: &ScratchOutput) {
        tracing::debug!(
            run_id = %run.id,
            lines = %expression.range,
            kind = %output.kind,
            text = %output.text,
            "Expression output"
        );
    }
}

/// A notification as seen by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Start { run_id: String },
    Finish { run_id: String },
    Error { message: String },
    Handle { range: LineRange, output: ScratchOutput },
}

/// Records every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ListenerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    #[must_use]
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn finish_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ListenerEvent::Finish { .. }))
            .count()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ListenerEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn handled(&self) -> Vec<(LineRange, ScratchOutput)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ListenerEvent::Handle { range, output } => Some((range, output)),
                _ => None,
            })
            .collect()
    }
}

impl ScratchListener for RecordingListener {
    fn on_start(&self, run: &ScratchRun) {
        self.push(ListenerEvent::Start {
            run_id: run.id.clone(),
        });
    }

    fn on_finish(&self, run: &ScratchRun) {
        self.push(ListenerEvent::Finish {
            run_id: run.id.clone(),
        });
    }

    fn error(&self, _run: &ScratchRun, message: &str) {
        self.push(ListenerEvent::Error {
            message: message.to_string(),
        });
    }

    fn handle(&self, _run: &ScratchRun, expression: &SourceExpression, output: &ScratchOutput) {
        self.push(ListenerEvent::Handle {
            range: expression.range,
            output: output.clone(),
        });
    }
}
