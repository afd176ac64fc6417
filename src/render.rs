//! Listeners that present a run to the user
//!
//! [`TerminalListener`] prints one human-readable line per event;
//! [`JsonLinesListener`] prints one JSON object per event for editor
//! integrations. Both write through a `Mutex` so they can be shared by
//! concurrent runs. Write failures are logged and otherwise ignored; a closed
//! pipe must not abort the run.

use std::io::{self, Stdout, Write};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use scratchrun_engine::{ScratchListener, ScratchRun};
use scratchrun_utils::types::{LineRange, OutputKind, ScratchOutput, SourceExpression};

/// 1-based label for an expression's lines: `L3` or `L3-5`.
fn line_label(range: LineRange) -> String {
    if range.start == range.end {
        format!("L{}", range.start + 1)
    } else {
        format!("L{}-{}", range.start + 1, range.end + 1)
    }
}

fn kind_marker(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Result => "=",
        OutputKind::Output => ">",
        OutputKind::Error => "!",
    }
}

fn write_logged<W: Write>(out: &Mutex<W>, f: impl FnOnce(&mut W) -> io::Result<()>) {
    let mut guard = out.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = f(&mut guard).and_then(|()| guard.flush()) {
        tracing::debug!(error = %e, "Failed to write run event");
    }
}

/// Human-readable rendering:
///
/// ```text
/// L1 = 2
/// L2-3 > hello
/// error: Compilation Error
/// ```
pub struct TerminalListener<W> {
    out: Mutex<W>,
}

impl TerminalListener<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalListener<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            out: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> ScratchListener for TerminalListener<W> {
    fn on_start(&self, _run: &ScratchRun) {}

    fn on_finish(&self, _run: &ScratchRun) {}

    fn error(&self, _run: &ScratchRun, message: &str) {
        write_logged(&self.out, |out| writeln!(out, "error: {message}"));
    }

    fn handle(&self, _run: &ScratchRun, expression: &SourceExpression, output: &ScratchOutput) {
        let label = line_label(expression.range);
        let marker = kind_marker(output.kind);
        write_logged(&self.out, |out| {
            let mut lines = output.text.lines();
            let first = lines.next().unwrap_or("");
            writeln!(out, "{label} {marker} {first}")?;
            let indent = " ".repeat(label.len() + marker.len() + 2);
            for line in lines {
                writeln!(out, "{indent}{line}")?;
            }
            Ok(())
        });
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonLine<'a> {
    Start {
        run_id: &'a str,
        file: &'a str,
        started_at: String,
    },
    Output {
        run_id: &'a str,
        start_line: u32,
        end_line: u32,
        kind: OutputKind,
        text: &'a str,
    },
    Error {
        run_id: &'a str,
        message: &'a str,
    },
    Finish {
        run_id: &'a str,
    },
}

/// One JSON object per line, tagged by `event`. Line numbers are 0-based.
pub struct JsonLinesListener<W> {
    out: Mutex<W>,
}

impl JsonLinesListener<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesListener<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            out: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, line: &JsonLine<'_>) {
        write_logged(&self.out, |out| {
            serde_json::to_writer(&mut *out, line)?;
            writeln!(out)
        });
    }
}

impl<W: Write + Send> ScratchListener for JsonLinesListener<W> {
    fn on_start(&self, run: &ScratchRun) {
        self.emit(&JsonLine::Start {
            run_id: &run.id,
            file: &run.file_name,
            started_at: run.started_at.to_rfc3339(),
        });
    }

    fn on_finish(&self, run: &ScratchRun) {
        self.emit(&JsonLine::Finish { run_id: &run.id });
    }

    fn error(&self, run: &ScratchRun, message: &str) {
        self.emit(&JsonLine::Error {
            run_id: &run.id,
            message,
        });
    }

    fn handle(&self, run: &ScratchRun, expression: &SourceExpression, output: &ScratchOutput) {
        self.emit(&JsonLine::Output {
            run_id: &run.id,
            start_line: expression.range.start,
            end_line: expression.range.end,
            kind: output.kind,
            text: &output.text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratchrun_utils::types::ScratchFile;

    fn fixture() -> (ScratchRun, SourceExpression, SourceExpression) {
        let file = ScratchFile::from_source("demo.kts", "1 + 1\nlistOf(1)\n    .map { it }");
        let run = ScratchRun::new(&file);
        let exprs = file.expressions();
        (run, exprs[0].clone(), exprs[1].clone())
    }

    #[test]
    fn test_terminal_lines() {
        let (run, first, second) = fixture();
        let listener = TerminalListener::new(Vec::new());
        listener.on_start(&run);
        listener.handle(&run, &first, &ScratchOutput::result("2"));
        listener.handle(&run, &second, &ScratchOutput::output("a\nb"));
        listener.error(&run, "boom");
        listener.on_finish(&run);

        let text = String::from_utf8(listener.into_inner()).unwrap();
        assert_eq!(text, "L1 = 2\nL2-3 > a\n       b\nerror: boom\n");
    }

    #[test]
    fn test_json_lines_are_tagged() {
        let (run, first, _) = fixture();
        let listener = JsonLinesListener::new(Vec::new());
        listener.on_start(&run);
        listener.handle(&run, &first, &ScratchOutput::result("2"));
        listener.on_finish(&run);

        let text = String::from_utf8(listener.into_inner()).unwrap();
        let events: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["event"], "start");
        assert_eq!(events[0]["file"], "demo.kts");
        assert_eq!(events[1]["event"], "output");
        assert_eq!(events[1]["kind"], "result");
        assert_eq!(events[1]["start_line"], 0);
        assert_eq!(events[1]["text"], "2");
        assert_eq!(events[2]["event"], "finish");
        assert_eq!(events[2]["run_id"], run.id.as_str());
    }

    #[test]
    fn test_line_label() {
        assert_eq!(line_label(LineRange::single(0)), "L1");
        assert_eq!(line_label(LineRange::new(2, 4)), "L3-5");
    }
}
