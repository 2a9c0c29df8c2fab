//! Trace tables correlating rewritten-source lines with contract constructs.
//!
//! The analyzer only knows about generic type errors. While rewriting, every
//! construct whose failure shows up as such an error records the line it was
//! emitted on, so the diagnostic can later be translated back.

use std::fmt;

use serde::Serialize;

/// Which contract construct produced the code on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    /// An `assert(cond)` call.
    Assertion,
    /// A wrapped call to an ordinary function, which fails when the callee's
    /// `requires` guard took the early exit.
    #[serde(rename = "precondition")]
    PreconditionCall,
    /// An `ensures(pred)` call.
    Postcondition,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::Assertion => "assertion",
            TraceKind::PreconditionCall => "precondition",
            TraceKind::Postcondition => "postcondition",
        }
    }

    /// The user-facing violation message for this construct.
    pub fn message(&self) -> &'static str {
        match self {
            TraceKind::Assertion => "Assertion failed",
            TraceKind::PreconditionCall => "The precondition might not hold",
            TraceKind::Postcondition => "The postcondition might not hold",
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contract construct emitted on a given line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    /// Zero-based line in the rewritten source.
    pub line: usize,
    pub kind: TraceKind,
}

/// All trace entries of one rewritten file, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceTable {
    entries: Vec<TraceEntry>,
}

impl TraceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line: usize, kind: TraceKind) {
        self.entries.push(TraceEntry { line, kind });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct kinds recorded at `line`, in the order they were first recorded.
    pub fn kinds_at(&self, line: usize) -> Vec<TraceKind> {
        let mut kinds = Vec::new();
        for entry in self.entries.iter().filter(|e| e.line == line) {
            if !kinds.contains(&entry.kind) {
                kinds.push(entry.kind);
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_at_dedupes_in_recording_order() {
        let mut table = TraceTable::new();
        table.record(3, TraceKind::Assertion);
        table.record(3, TraceKind::PreconditionCall);
        table.record(3, TraceKind::Assertion);
        table.record(5, TraceKind::Postcondition);

        assert_eq!(
            table.kinds_at(3),
            vec![TraceKind::Assertion, TraceKind::PreconditionCall]
        );
        assert_eq!(table.kinds_at(5), vec![TraceKind::Postcondition]);
        assert!(table.kinds_at(4).is_empty());
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_kind_messages() {
        assert_eq!(TraceKind::Assertion.message(), "Assertion failed");
        assert_eq!(
            TraceKind::PreconditionCall.message(),
            "The precondition might not hold"
        );
        assert_eq!(
            TraceKind::Postcondition.message(),
            "The postcondition might not hold"
        );
    }
}
