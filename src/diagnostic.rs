//! Analyzer diagnostics and their translation into contract violations.
//!
//! The analyzer reports lines of the form `file:line:column:message` or
//! `file:message`, where `file` is the rewritten copy of an input. A failed
//! contract check surfaces as a generic type error (a call to a
//! non-function, or a property read on null/undefined) on the line the
//! check was emitted on. The per-file [`TraceTable`] tells which construct
//! that was.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::trace::{TraceKind, TraceTable};

lazy_static::lazy_static! {
    /// Generic failures that a contract check can provoke.
    static ref CHECK_FAILURE: Regex = Regex::new(
        r"(?:TypeError,\s*)?(?:call to non-function|(?:\w+\s+)?propert(?:y|ies)\b[^,]*?\b(?:null|undefined)\b)"
    )
    .unwrap();
}

/// A source position as reported by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Zero-based line in the rewritten source.
    pub line: usize,
    /// Column as reported.
    pub column: usize,
}

/// One parsed analyzer diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Input file name, with the rewrite suffix removed.
    pub file: String,
    /// `None` for file-level diagnostics.
    pub position: Option<Position>,
    pub message: String,
}

impl Diagnostic {
    /// Parse one line of analyzer output.
    ///
    /// Only the first three colons are structural; anything after the third
    /// belongs to the message. Returns `None` for lines that are not
    /// diagnostics at all.
    pub fn parse(line: &str, suffix: &str) -> Option<Self> {
        let fields: Vec<&str> = line.splitn(4, ':').collect();
        if let [file, line_no, column, message] = fields.as_slice() {
            if let (Ok(line_no), Ok(column)) = (
                line_no.trim().parse::<usize>(),
                column.trim().parse::<usize>(),
            ) {
                return Some(Self {
                    file: strip_suffix(file, suffix).to_string(),
                    position: Some(Position {
                        line: line_no.saturating_sub(1),
                        column,
                    }),
                    message: clean_message(message).to_string(),
                });
            }
        }

        let (file, message) = line.split_once(':')?;
        if file.is_empty() || file.contains(char::is_whitespace) {
            return None;
        }
        Some(Self {
            file: strip_suffix(file, suffix).to_string(),
            position: None,
            message: clean_message(message).to_string(),
        })
    }

    /// One-based line for display, which is also the line in the input file.
    pub fn display_line(&self) -> Option<usize> {
        self.position.map(|p| p.line + 1)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(p) => write!(f, "{}:{}:{}: {}", self.file, p.line + 1, p.column, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

fn strip_suffix<'a>(file: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return file;
    }
    match file.find(suffix) {
        Some(end) => &file[..end],
        None => file,
    }
}

fn clean_message(message: &str) -> &str {
    message.strip_prefix(' ').unwrap_or(message).trim_end()
}

/// A diagnostic after remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remapped {
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
    /// The contract construct this diagnostic was attributed to, if any.
    pub kind: Option<TraceKind>,
}

/// One line of final output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Diagnostic(Remapped),
    /// Analyzer output that is not a diagnostic, passed through verbatim.
    Text(String),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Diagnostic(r) => write!(f, "{}", r.diagnostic),
            Output::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Translates analyzer output using the trace tables of the rewritten files.
#[derive(Debug, Clone)]
pub struct Remapper {
    suffix: String,
    traces: HashMap<String, TraceTable>,
}

impl Remapper {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            traces: HashMap::new(),
        }
    }

    /// Register the trace table of an input file, keyed by its path as given
    /// to the analyzer without the rewrite suffix.
    pub fn add_file(&mut self, file: impl Into<String>, trace: TraceTable) {
        self.traces.insert(file.into(), trace);
    }

    /// Remap a whole analyzer report, preserving line order.
    pub fn remap(&self, report: &str) -> Vec<Output> {
        report.lines().flat_map(|line| self.remap_line(line)).collect()
    }

    /// Remap one line of analyzer output into zero or more output lines.
    ///
    /// Empty lines and diagnostics on the preamble line produce nothing. A
    /// check failure on a line carrying several contract constructs produces
    /// one line per construct.
    pub fn remap_line(&self, raw: &str) -> Vec<Output> {
        if raw.trim().is_empty() {
            return Vec::new();
        }
        let Some(diagnostic) = Diagnostic::parse(raw, &self.suffix) else {
            return vec![Output::Text(raw.to_string())];
        };
        let Some(position) = diagnostic.position else {
            return vec![passthrough(diagnostic)];
        };
        if position.line == 0 {
            tracing::debug!(raw, "suppressing diagnostic on preamble line");
            return Vec::new();
        }

        let kinds = self
            .table_for(&diagnostic.file)
            .map(|t| t.kinds_at(position.line))
            .unwrap_or_default();
        let failure = CHECK_FAILURE.find(&diagnostic.message);

        match failure {
            Some(m) if !kinds.is_empty() => {
                let prefix = &diagnostic.message[..m.start()];
                kinds
                    .into_iter()
                    .map(|kind| {
                        Output::Diagnostic(Remapped {
                            diagnostic: Diagnostic {
                                message: format!("{}{}", prefix, kind.message()),
                                ..diagnostic.clone()
                            },
                            kind: Some(kind),
                        })
                    })
                    .collect()
            }
            _ => vec![passthrough(diagnostic)],
        }
    }

    fn table_for(&self, file: &str) -> Option<&TraceTable> {
        if let Some(table) = self.traces.get(file) {
            return Some(table);
        }
        // The analyzer may print paths relative to a different directory.
        let reported = Path::new(file);
        self.traces
            .iter()
            .find(|(key, _)| {
                let key = Path::new(key.as_str());
                key.ends_with(reported) || reported.ends_with(key)
            })
            .map(|(_, table)| table)
    }
}

fn passthrough(diagnostic: Diagnostic) -> Output {
    Output::Diagnostic(Remapped {
        diagnostic,
        kind: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUFFIX: &str = ".rf.js";

    fn remapper_with(file: &str, entries: &[(usize, TraceKind)]) -> Remapper {
        let mut trace = TraceTable::new();
        for (line, kind) in entries {
            trace.record(*line, *kind);
        }
        let mut remapper = Remapper::new(SUFFIX);
        remapper.add_file(file, trace);
        remapper
    }

    fn rendered(outputs: &[Output]) -> Vec<String> {
        outputs.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn test_parse_positional() {
        let d = Diagnostic::parse("foo.js.rf.js:4:3: TypeError, call to non-function", SUFFIX)
            .unwrap();
        assert_eq!(d.file, "foo.js");
        assert_eq!(d.position, Some(Position { line: 3, column: 3 }));
        assert_eq!(d.message, "TypeError, call to non-function");
        assert_eq!(d.display_line(), Some(4));
    }

    #[test]
    fn test_parse_keeps_colons_in_message() {
        let d = Diagnostic::parse("a.js.rf.js:2:1: Reading absent property: foo", SUFFIX).unwrap();
        assert_eq!(d.message, "Reading absent property: foo");
        assert_eq!(d.to_string(), "a.js:2:1: Reading absent property: foo");
    }

    #[test]
    fn test_parse_file_level() {
        let d = Diagnostic::parse("a.js.rf.js: Dead function", SUFFIX).unwrap();
        assert_eq!(d.file, "a.js");
        assert_eq!(d.position, None);
        assert_eq!(d.message, "Dead function");
        assert_eq!(d.to_string(), "a.js: Dead function");
    }

    #[test]
    fn test_parse_non_numeric_position_is_file_level() {
        let d = Diagnostic::parse("a.js:x:y:z", SUFFIX).unwrap();
        assert_eq!(d.position, None);
        assert_eq!(d.message, "x:y:z");
    }

    #[test]
    fn test_parse_rejects_non_diagnostics() {
        assert!(Diagnostic::parse("Analysis finished", SUFFIX).is_none());
        assert!(Diagnostic::parse("Time spent: 3ms", SUFFIX).is_none());
    }

    #[test]
    fn test_assertion_reclassified() {
        let remapper = remapper_with("foo.js", &[(3, TraceKind::Assertion)]);
        let out = remapper.remap_line("foo.js.rf.js:4:3:TypeError, call to non-function");
        assert_eq!(rendered(&out), vec!["foo.js:4:3: Assertion failed"]);
        match &out[0] {
            Output::Diagnostic(r) => assert_eq!(r.kind, Some(TraceKind::Assertion)),
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn test_precondition_and_postcondition_messages() {
        let remapper = remapper_with(
            "m.js",
            &[(5, TraceKind::PreconditionCall), (7, TraceKind::Postcondition)],
        );
        let out = remapper.remap(
            "m.js.rf.js:6:1: TypeError, call to non-function\nm.js.rf.js:8:9: TypeError, call to non-function\n",
        );
        assert_eq!(
            rendered(&out),
            vec![
                "m.js:6:1: The precondition might not hold",
                "m.js:8:9: The postcondition might not hold",
            ]
        );
    }

    #[test]
    fn test_prefix_before_failure_is_kept() {
        let remapper = remapper_with("m.js", &[(2, TraceKind::PreconditionCall)]);
        let out = remapper.remap_line("m.js.rf.js:3:1: [maybe] TypeError, accessing property of null/undefined");
        assert_eq!(
            rendered(&out),
            vec!["m.js:3:1: [maybe] The precondition might not hold"]
        );
    }

    #[test]
    fn test_preamble_line_suppressed() {
        let remapper = remapper_with("m.js", &[(0, TraceKind::Assertion)]);
        assert!(remapper
            .remap_line("m.js.rf.js:1:200: TypeError, call to non-function")
            .is_empty());
    }

    #[test]
    fn test_unrelated_messages_pass_through() {
        let remapper = remapper_with("m.js", &[(2, TraceKind::Assertion)]);
        let out = remapper.remap_line("m.js.rf.js:3:1: Reading absent property x");
        assert_eq!(rendered(&out), vec!["m.js:3:1: Reading absent property x"]);
    }

    #[test]
    fn test_line_without_trace_passes_through() {
        let remapper = remapper_with("m.js", &[(2, TraceKind::Assertion)]);
        let out = remapper.remap_line("m.js.rf.js:5:1: TypeError, call to non-function");
        assert_eq!(rendered(&out), vec!["m.js:5:1: TypeError, call to non-function"]);
    }

    #[test]
    fn test_several_constructs_on_one_line() {
        let remapper = remapper_with(
            "m.js",
            &[(4, TraceKind::Assertion), (4, TraceKind::PreconditionCall)],
        );
        let out = remapper.remap_line("m.js.rf.js:5:2: TypeError, call to non-function");
        assert_eq!(
            rendered(&out),
            vec![
                "m.js:5:2: Assertion failed",
                "m.js:5:2: The precondition might not hold",
            ]
        );
    }

    #[test]
    fn test_text_lines_pass_through_and_blank_lines_drop() {
        let remapper = remapper_with("m.js", &[]);
        let out = remapper.remap("Analysis summary\n\n   \nDone.\n");
        assert_eq!(rendered(&out), vec!["Analysis summary", "Done."]);
    }

    #[test]
    fn test_trace_lookup_by_path_suffix() {
        let remapper = remapper_with("src/m.js", &[(2, TraceKind::Assertion)]);
        let out = remapper.remap_line("/work/src/m.js.rf.js:3:1: TypeError, call to non-function");
        assert_eq!(rendered(&out), vec!["/work/src/m.js:3:1: Assertion failed"]);
    }
}
