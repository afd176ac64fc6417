use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inclusive range of 0-based lines in the original snippet.
///
/// # Example
///
/// ```rust
/// use scratchrun_utils::types::LineRange;
///
/// let range = LineRange::new(2, 4);
/// assert!(range.contains_line(3));
/// assert!(range.contains(LineRange::single(4)));
/// assert_eq!(range.to_string(), "2..4");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn single(line: u32) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    /// False for ranges whose end precedes their start.
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    #[must_use]
    pub const fn contains_line(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    #[must_use]
    pub const fn contains(&self, other: LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub const fn overlaps(&self, other: LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One top-level statement or expression of a scratch snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExpression {
    pub range: LineRange,
    pub text: String,
}

impl SourceExpression {
    #[must_use]
    pub fn new(range: LineRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Rejected expression layouts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScratchFileError {
    #[error("Expression range {range} ends before it starts")]
    InvertedRange { range: LineRange },

    #[error("Expression ranges {first} and {second} overlap")]
    Overlapping { first: LineRange, second: LineRange },
}

/// A submitted snippet: raw text plus its ordered, disjoint expressions.
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchFile {
    name: String,
    text: String,
    expressions: Vec<SourceExpression>,
    module: Option<String>,
}

impl ScratchFile {
    /// Build a scratch file from already-segmented expressions.
    ///
    /// Expressions are sorted by start line; inverted or overlapping ranges
    /// are rejected.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        mut expressions: Vec<SourceExpression>,
    ) -> Result<Self, ScratchFileError> {
        if let Some(bad) = expressions.iter().find(|e| !e.range.is_well_formed()) {
            return Err(ScratchFileError::InvertedRange { range: bad.range });
        }

        expressions.sort_by_key(|e| e.range);
        for pair in expressions.windows(2) {
            if pair[0].range.overlaps(pair[1].range) {
                return Err(ScratchFileError::Overlapping {
                    first: pair[0].range,
                    second: pair[1].range,
                });
            }
        }

        Ok(Self {
            name: name.into(),
            text: text.into(),
            expressions,
            module: None,
        })
    }

    /// Segment raw snippet text into expressions.
    #[must_use]
    pub fn from_source(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let expressions = crate::segment::segment_expressions(&text);
        Self {
            name: name.into(),
            text,
            expressions,
            module: None,
        }
    }

    /// Associate the runtime context (module) whose classpath the run uses.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    #[must_use]
    pub fn expressions(&self) -> &[SourceExpression] {
        &self.expressions
    }

    /// The expression whose range is exactly `range`.
    #[must_use]
    pub fn find_expression(&self, range: LineRange) -> Option<&SourceExpression> {
        self.expressions.iter().find(|e| e.range == range)
    }

    /// The expression enclosing `range`, used for diagnostics on sub-elements.
    #[must_use]
    pub fn expression_containing(&self, range: LineRange) -> Option<&SourceExpression> {
        self.expressions.iter().find(|e| e.range.contains(range))
    }
}

/// Kind of a per-expression output event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Value the expression evaluated to
    Result,
    /// Text the expression printed
    Output,
    /// Diagnostic attributed to the expression
    Error,
}

impl OutputKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Result => "result",
            Self::Output => "output",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to listeners for one expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchOutput {
    pub text: String,
    pub kind: OutputKind,
}

impl ScratchOutput {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: OutputKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    #[must_use]
    pub fn result(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Result)
    }

    #[must_use]
    pub fn output(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Output)
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Error)
    }
}

/// Stages of a scratch run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Start,
    Precheck,
    Instrument,
    Analyze,
    Compile,
    Run,
    Parse,
    Finish,
}

impl Stage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Precheck => "precheck",
            Self::Instrument => "instrument",
            Self::Analyze => "analyze",
            Self::Compile => "compile",
            Self::Run => "run",
            Self::Parse => "parse",
            Self::Finish => "finish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of a configuration value, used for attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}
