//! Marker grammar for instrumentation-emitted lines
//!
//! ```text
//! <PREFIX><value>                     sub-result of the current expression
//! <PREFIX>end##<start>|<end>          flush buffers to expression start..end
//! end##!@#%^&*                        end of run output (no prefix)
//! ```

use scratchrun_utils::types::LineRange;

/// Leading token of every line the instrumentation emits.
pub const GENERATED_OUTPUT_PREFIX: &str = "##scratch##generated##";

/// Follows the prefix on line-info lines.
pub const LINES_INFO_MARKER: &str = "end##";

/// Terminal line; everything after it is ignored.
pub const END_OUTPUT_MARKER: &str = "end##!@#%^&*";

/// Rendering of a value-less evaluation, never reported as a result.
pub const NO_VALUE: &str = "kotlin.Unit";

/// One classified line of child output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolLine<'a> {
    EndOfStream,
    LineInfo(LineRange),
    Value(&'a str),
    NoValue,
    User(&'a str),
}

/// Classify a single line of child stdout.
///
/// A trailing `\n` or `\r\n` is ignored. Line-info lines whose numbers are
/// missing, non-numeric or negative decode as [`ProtocolLine::Value`]
/// carrying the whole payload, so a garbled marker shows up as a result
/// instead of aborting the decode.
///
/// ```rust
/// use scratchrun_protocol::markers::{decode_line, ProtocolLine};
/// use scratchrun_utils::types::LineRange;
///
/// assert_eq!(
///     decode_line("##scratch##generated##end##3|5"),
///     ProtocolLine::LineInfo(LineRange::new(3, 5))
/// );
/// assert_eq!(
///     decode_line("##scratch##generated##end##x|y"),
///     ProtocolLine::Value("end##x|y")
/// );
/// assert_eq!(decode_line("hello"), ProtocolLine::User("hello"));
/// ```
#[must_use]
pub fn decode_line(line: &str) -> ProtocolLine<'_> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line == END_OUTPUT_MARKER {
        return ProtocolLine::EndOfStream;
    }

    let Some(payload) = line.strip_prefix(GENERATED_OUTPUT_PREFIX) else {
        return ProtocolLine::User(line);
    };

    if let Some(encoded) = payload.strip_prefix(LINES_INFO_MARKER) {
        match parse_line_info(encoded) {
            Some(range) => return ProtocolLine::LineInfo(range),
            None => tracing::debug!(payload, "Malformed line info, keeping it as a value"),
        }
    }

    if payload == NO_VALUE {
        ProtocolLine::NoValue
    } else {
        ProtocolLine::Value(payload)
    }
}

fn parse_line_info(encoded: &str) -> Option<LineRange> {
    let (start, end) = encoded.split_once('|')?;
    if end.contains('|') {
        return None;
    }
    let start = u32::try_from(start.parse::<i64>().ok()?).ok()?;
    let end = u32::try_from(end.parse::<i64>().ok()?).ok()?;
    Some(LineRange::new(start, end))
}

/// Line reporting one sub-result.
#[must_use]
pub fn encode_value(value: &str) -> String {
    format!("{GENERATED_OUTPUT_PREFIX}{value}")
}

/// Line closing the expression at `range`.
#[must_use]
pub fn encode_line_info(range: LineRange) -> String {
    format!(
        "{GENERATED_OUTPUT_PREFIX}{LINES_INFO_MARKER}{}|{}",
        range.start, range.end
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_marker_without_prefix() {
        assert_eq!(decode_line(END_OUTPUT_MARKER), ProtocolLine::EndOfStream);
        assert_eq!(decode_line("end##!@#%^&*\r\n"), ProtocolLine::EndOfStream);
    }

    #[test]
    fn test_end_marker_with_prefix_is_not_terminal() {
        let line = format!("{GENERATED_OUTPUT_PREFIX}{END_OUTPUT_MARKER}");
        assert_eq!(decode_line(&line), ProtocolLine::Value(END_OUTPUT_MARKER));
    }

    #[test]
    fn test_line_info_round_trip() {
        let line = encode_line_info(LineRange::new(0, 12));
        assert_eq!(decode_line(&line), ProtocolLine::LineInfo(LineRange::new(0, 12)));
    }

    #[test]
    fn test_malformed_line_info_degrades_to_value() {
        for payload in ["end##x|y", "end##-1|2", "end##1", "end##1|2|3", "end##"] {
            let line = format!("{GENERATED_OUTPUT_PREFIX}{payload}");
            assert_eq!(decode_line(&line), ProtocolLine::Value(payload), "{payload}");
        }
    }

    #[test]
    fn test_inverted_line_info_stays_line_info() {
        let line = format!("{GENERATED_OUTPUT_PREFIX}end##4|1");
        assert_eq!(decode_line(&line), ProtocolLine::LineInfo(LineRange::new(4, 1)));
    }

    #[test]
    fn test_no_value_sentinel() {
        assert_eq!(decode_line(&encode_value(NO_VALUE)), ProtocolLine::NoValue);
        assert_eq!(decode_line(&encode_value("Unit")), ProtocolLine::Value("Unit"));
    }

    #[test]
    fn test_user_line_keeps_content() {
        assert_eq!(decode_line("  spaced  \r"), ProtocolLine::User("  spaced  "));
        assert_eq!(decode_line(""), ProtocolLine::User(""));
    }
}
