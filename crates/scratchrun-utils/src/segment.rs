//! Splitting raw snippet text into top-level expressions
//!
//! An expression starts on a non-blank line and ends on the first line where
//! every bracket opened inside it is closed again, unless the following line
//! continues it (`.foo()`, `?: default`, `else`, ...). String literals and
//! comments are skipped while counting brackets.

use crate::types::{LineRange, SourceExpression};

const CONTINUATION_PREFIXES: &[&str] = &[".", "?.", "?:", "&&", "||"];
const CONTINUATION_KEYWORDS: &[&str] = &["else", "catch", "finally"];

/// Segment `text` into ordered, disjoint expressions.
///
/// # Example
///
/// ```rust
/// use scratchrun_utils::segment::segment_expressions;
///
/// let exprs = segment_expressions("val a = 1\n\nprintln(\n  a\n)\n");
/// assert_eq!(exprs.len(), 2);
/// assert_eq!((exprs[1].range.start, exprs[1].range.end), (2, 4));
/// ```
#[must_use]
pub fn segment_expressions(text: &str) -> Vec<SourceExpression> {
    let lines: Vec<&str> = text.lines().collect();
    let mut expressions = Vec::new();
    let mut scanner = BracketScanner::default();
    let mut start: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        let first = match start {
            Some(first) => first,
            None if line.trim().is_empty() => continue,
            None => {
                start = Some(idx);
                idx
            }
        };

        scanner.scan(line);
        if scanner.is_open() {
            continue;
        }
        if lines.get(idx + 1).is_some_and(|next| is_continuation(next)) {
            continue;
        }

        expressions.push(make_expression(&lines, first, idx));
        start = None;
        scanner = BracketScanner::default();
    }

    // Unbalanced trailing input still forms an expression so the analyzer can
    // report it against the right lines.
    if let Some(first) = start {
        let last = lines.len().saturating_sub(1);
        expressions.push(make_expression(&lines, first, last));
    }

    expressions
}

fn make_expression(lines: &[&str], first: usize, last: usize) -> SourceExpression {
    SourceExpression::new(
        LineRange::new(first as u32, last as u32),
        lines[first..=last].join("\n"),
    )
}

fn is_continuation(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return false;
    }
    CONTINUATION_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        || CONTINUATION_KEYWORDS.iter().any(|kw| {
            trimmed.strip_prefix(kw).is_some_and(|rest| {
                rest.chars()
                    .next()
                    .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
            })
        })
}

#[derive(Debug, Default)]
struct BracketScanner {
    depth: usize,
    raw_string: bool,
    block_comment: bool,
}

impl BracketScanner {
    fn is_open(&self) -> bool {
        self.depth > 0 || self.raw_string || self.block_comment
    }

    fn scan(&mut self, line: &str) {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.block_comment {
                if c == '*' && next == Some('/') {
                    self.block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if self.raw_string {
                if is_triple_quote(&chars, i) {
                    self.raw_string = false;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }

            match c {
                '/' if next == Some('/') => break,
                '/' if next == Some('*') => {
                    self.block_comment = true;
                    i += 2;
                    continue;
                }
                '"' if is_triple_quote(&chars, i) => {
                    self.raw_string = true;
                    i += 3;
                    continue;
                }
                '"' | '\'' => {
                    i = skip_quoted(&chars, i, c);
                    continue;
                }
                '(' | '[' | '{' => self.depth += 1,
                ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }
    }
}

fn is_triple_quote(chars: &[char], i: usize) -> bool {
    chars.get(i..i + 3).is_some_and(|s| s == ['"', '"', '"'])
}

/// Index just past the closing quote, or the end of the line.
fn skip_quoted(chars: &[char], open: usize, quote: char) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(text: &str) -> Vec<(u32, u32)> {
        segment_expressions(text)
            .iter()
            .map(|e| (e.range.start, e.range.end))
            .collect()
    }

    #[test]
    fn test_one_expression_per_line() {
        assert_eq!(ranges("val a = 1\nval b = 2\na + b"), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_multiline_call_and_chain() {
        let text = "val x = listOf(1,\n    2)\nx.map { it * 2 }\n    .sum()\n\nprintln(\"a\")";
        assert_eq!(ranges(text), vec![(0, 1), (2, 3), (5, 5)]);
    }

    #[test]
    fn test_brackets_inside_strings_and_comments_ignored() {
        let text = "println(\"(((\") // {{\nval c = '('\n/* ( */ 1";
        assert_eq!(ranges(text), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_raw_string_spans_lines() {
        let text = "val s = \"\"\"\n  (\n\"\"\"\ns.length";
        assert_eq!(ranges(text), vec![(0, 2), (3, 3)]);
    }

    #[test]
    fn test_else_continues_if() {
        let text = "if (a) {\n  1\n}\nelse {\n  2\n}\nelsewhere()";
        assert_eq!(ranges(text), vec![(0, 5), (6, 6)]);
    }

    #[test]
    fn test_unbalanced_tail_forms_expression() {
        assert_eq!(ranges("a\nfoo(\n  1"), vec![(0, 0), (1, 2)]);
    }

    #[test]
    fn test_blank_input() {
        assert!(segment_expressions("\n  \n").is_empty());
    }

    #[test]
    fn test_expression_text_preserved() {
        let exprs = segment_expressions("foo(\n  1)\n");
        assert_eq!(exprs[0].text, "foo(\n  1)");
    }

    mod props {
        use super::*;
        use crate::types::ScratchFile;
        use proptest::prelude::*;

        fn snippet_line() -> impl Strategy<Value = String> {
            prop_oneof![
                Just(String::new()),
                Just("val a = 1".to_string()),
                Just("foo(".to_string()),
                Just(")".to_string()),
                Just("  .map { it }".to_string()),
                Just("} else {".to_string()),
                Just("}".to_string()),
                Just("println(\"(\")".to_string()),
                Just("// (".to_string()),
                Just("\"\"\"".to_string()),
                "[a-z ]{0,8}",
            ]
        }

        proptest! {
            #[test]
            fn prop_ranges_ordered_disjoint_and_cover_code(
                lines in proptest::collection::vec(snippet_line(), 0..20)
            ) {
                let text = lines.join("\n");
                let exprs = segment_expressions(&text);

                for pair in exprs.windows(2) {
                    prop_assert!(pair[0].range.end < pair[1].range.start);
                }
                for (idx, line) in lines.iter().enumerate() {
                    if !line.trim().is_empty() {
                        let idx = idx as u32;
                        prop_assert!(exprs.iter().any(|e| e.range.contains_line(idx)));
                    }
                }
                prop_assert!(ScratchFile::new("p.kts", text, exprs).is_ok());
            }
        }
    }
}
