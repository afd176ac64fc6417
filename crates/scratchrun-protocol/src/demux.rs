//! Reconstruction of per-expression events from merged child stdout
//!
//! Values and user lines are buffered until a line-info marker names the
//! expression they belong to. At that point buffered user output is emitted
//! first, then buffered results, so every event of one expression is
//! contiguous.

use serde::Serialize;
use thiserror::Error;

use scratchrun_utils::types::{LineRange, OutputKind, ScratchFile, ScratchOutput, SourceExpression};

use crate::markers::{ProtocolLine, decode_line};

const SEPARATOR: &str = "; ";

/// One decoded event, attributed to the expression it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScratchOutputEvent {
    pub expression: SourceExpression,
    pub output: ScratchOutput,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DemuxError {
    #[error("Scratch output refers to lines {range}, which match no expression")]
    UnknownRange { range: LineRange },
}

/// Sub-values joined with `"; "`. Blank content counts as empty.
#[derive(Debug, Default)]
struct Accumulator {
    buf: String,
}

impl Accumulator {
    fn push(&mut self, value: &str) {
        if !self.is_blank() {
            self.buf.push_str(SEPARATOR);
        }
        self.buf.push_str(value);
    }

    fn is_blank(&self) -> bool {
        self.buf.trim().is_empty()
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}

/// Streaming decoder for one run's stdout.
///
/// State is owned by the value, so independent runs never share buffers.
#[derive(Debug)]
pub struct Demultiplexer<'f> {
    file: &'f ScratchFile,
    results: Accumulator,
    user_output: Accumulator,
    finished: bool,
}

impl<'f> Demultiplexer<'f> {
    #[must_use]
    pub fn new(file: &'f ScratchFile) -> Self {
        Self {
            file,
            results: Accumulator::default(),
            user_output: Accumulator::default(),
            finished: false,
        }
    }

    /// True once the end-of-output marker was seen.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode one line, passing completed events to `emit`.
    ///
    /// Lines fed after the end marker are ignored.
    pub fn feed_line<F>(&mut self, line: &str, emit: &mut F) -> Result<(), DemuxError>
    where
        F: FnMut(ScratchOutputEvent),
    {
        if self.finished {
            return Ok(());
        }

        match decode_line(line) {
            ProtocolLine::EndOfStream => self.finished = true,
            ProtocolLine::LineInfo(range) => {
                let expression = self
                    .file
                    .find_expression(range)
                    .ok_or(DemuxError::UnknownRange { range })?;

                if !self.user_output.is_blank() {
                    emit(ScratchOutputEvent {
                        expression: expression.clone(),
                        output: ScratchOutput::new(self.user_output.take(), OutputKind::Output),
                    });
                }
                if !self.results.is_blank() {
                    emit(ScratchOutputEvent {
                        expression: expression.clone(),
                        output: ScratchOutput::new(self.results.take(), OutputKind::Result),
                    });
                }
            }
            ProtocolLine::Value(value) => self.results.push(value),
            ProtocolLine::NoValue => {}
            ProtocolLine::User(text) => self.user_output.push(text),
        }

        Ok(())
    }

    /// Drop whatever was never attributed to an expression.
    pub fn finish(self) {
        if !self.results.is_blank() || !self.user_output.is_blank() {
            tracing::debug!(
                file = self.file.name(),
                results = %self.results.buf,
                user_output = %self.user_output.buf,
                "Discarding output with no closing line info"
            );
        }
    }
}

/// Decode `raw` and hand each event to `emit` as soon as it is complete.
///
/// Events emitted before an error has been returned stay delivered.
pub fn demux_with<F>(raw: &str, file: &ScratchFile, mut emit: F) -> Result<(), DemuxError>
where
    F: FnMut(ScratchOutputEvent),
{
    let mut demux = Demultiplexer::new(file);
    for line in raw.split('\n') {
        demux.feed_line(line, &mut emit)?;
        if demux.is_finished() {
            break;
        }
    }
    demux.finish();
    Ok(())
}

/// Decode `raw` into the ordered list of events.
///
/// ```rust
/// use scratchrun_protocol::demux::demux;
/// use scratchrun_protocol::markers::{encode_line_info, encode_value};
/// use scratchrun_utils::types::{LineRange, OutputKind, ScratchFile, SourceExpression};
///
/// let file = ScratchFile::new(
///     "scratch.kts",
///     "1 + 1",
///     vec![SourceExpression::new(LineRange::single(0), "1 + 1")],
/// )
/// .unwrap();
/// let raw = format!("{}\n{}\n", encode_value("2"), encode_line_info(LineRange::single(0)));
///
/// let events = demux(&raw, &file).unwrap();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].output.kind, OutputKind::Result);
/// assert_eq!(events[0].output.text, "2");
/// ```
pub fn demux(raw: &str, file: &ScratchFile) -> Result<Vec<ScratchOutputEvent>, DemuxError> {
    let mut events = Vec::new();
    demux_with(raw, file, |event| events.push(event))?;
    Ok(events)
}
