//! Replace table: ordered text edits over one source buffer.
//!
//! Edits are collected in discovery order while the tree is walked, sorted
//! once, validated, and then applied in a single left-to-right scan.

use std::cmp::Ordering;

use super::runtime::{PREAMBLE, TRAILER};

/// How an edit nests relative to the syntactic construct it belongs to.
///
/// Only matters when several edits share a start offset. At one offset,
/// closing inserts come first (innermost construct first), then opening
/// inserts (outermost construct first), then the replacement, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Zero-length insert opening a construct that ends at `outer_end`.
    Open { outer_end: usize },
    /// Zero-length insert closing a construct that began at `inner_start`.
    Close { inner_start: usize },
    /// Replacement of a non-empty span.
    Replace,
}

impl Placement {
    fn rank(&self) -> u8 {
        match self {
            Placement::Close { .. } => 0,
            Placement::Open { .. } => 1,
            Placement::Replace => 2,
        }
    }
}

/// A single edit: replace `[start, end)` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub placement: Placement,
    /// Discovery index, used to break ties.
    seq: usize,
}

impl ReplaceEdit {
    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// Ordered edits for one buffer, seeded with the runtime preamble at offset 0.
#[derive(Debug, Clone)]
pub struct ReplaceTable {
    edits: Vec<ReplaceEdit>,
    sorted: bool,
}

impl Default for ReplaceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplaceTable {
    /// Create a table seeded with the standard runtime preamble.
    pub fn new() -> Self {
        Self::seeded(PREAMBLE)
    }

    /// Create a table seeded with a custom preamble.
    pub fn seeded(preamble: impl Into<String>) -> Self {
        let mut table = Self {
            edits: Vec::new(),
            sorted: true,
        };
        table.push(0, 0, preamble.into(), Placement::Open { outer_end: usize::MAX });
        table
    }

    /// Insert `text` at `at`, opening a construct that ends at `outer_end`.
    pub fn open(&mut self, at: usize, outer_end: usize, text: impl Into<String>) {
        self.push(at, at, text.into(), Placement::Open { outer_end });
    }

    /// Insert `text` at `at`, closing a construct that began at `inner_start`.
    pub fn close(&mut self, at: usize, inner_start: usize, text: impl Into<String>) {
        self.push(at, at, text.into(), Placement::Close { inner_start });
    }

    /// Replace the non-empty span `[start, end)` with `text`.
    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) {
        debug_assert!(start < end, "replace() needs a non-empty span");
        self.push(start, end, text.into(), Placement::Replace);
    }

    fn push(&mut self, start: usize, end: usize, text: String, placement: Placement) {
        let seq = self.edits.len();
        self.edits.push(ReplaceEdit {
            start,
            end,
            text,
            placement,
            seq,
        });
        self.sorted = false;
    }

    pub fn edits(&self) -> &[ReplaceEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Sort edits by start offset, applying the coincident-edit rule.
    pub fn sort(&mut self) {
        self.edits.sort_by(compare_edits);
        self.sorted = true;
    }

    /// Check the table is sorted, in range, and free of overlaps.
    ///
    /// Any two consecutive edits must satisfy `prev.end <= next.start`, so
    /// ranges are either disjoint or coincident zero-length insertions.
    pub fn validate(&self, source: &str) -> Result<(), String> {
        if !self.sorted {
            return Err("table has not been sorted".to_string());
        }

        let mut prev_end = 0;
        for edit in &self.edits {
            if edit.start > edit.end {
                return Err(format!("inverted range {}..{}", edit.start, edit.end));
            }
            if edit.end > source.len() {
                return Err(format!(
                    "range {}..{} exceeds buffer length {}",
                    edit.start,
                    edit.end,
                    source.len()
                ));
            }
            if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
                return Err(format!(
                    "range {}..{} is not on a UTF-8 boundary",
                    edit.start, edit.end
                ));
            }
            if edit.start < prev_end {
                return Err(format!(
                    "range {}..{} overlaps an edit ending at {}",
                    edit.start, edit.end, prev_end
                ));
            }
            prev_end = edit.end;
        }

        Ok(())
    }

    /// Apply the sorted table to `source`, appending the generated-file trailer.
    ///
    /// The table must have passed [`ReplaceTable::validate`] for this buffer.
    pub fn assemble(&self, source: &str) -> String {
        debug_assert!(self.validate(source).is_ok(), "assembling an invalid table");

        let inserted: usize = self.edits.iter().map(|e| e.text.len()).sum();
        let mut out = String::with_capacity(source.len() + inserted + TRAILER.len());

        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&source[cursor..edit.start]);
            out.push_str(&edit.text);
            cursor = edit.end;
        }
        out.push_str(&source[cursor..]);
        out.push_str(TRAILER);
        out
    }
}

fn compare_edits(a: &ReplaceEdit, b: &ReplaceEdit) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.placement.rank().cmp(&b.placement.rank()))
        .then_with(|| match (a.placement, b.placement) {
            // Inner constructs close first; an edit discovered later is nested deeper.
            (Placement::Close { inner_start: x }, Placement::Close { inner_start: y }) => {
                y.cmp(&x).then_with(|| b.seq.cmp(&a.seq))
            }
            // Outer constructs open first; an edit discovered earlier encloses the rest.
            (Placement::Open { outer_end: x }, Placement::Open { outer_end: y }) => {
                y.cmp(&x).then_with(|| a.seq.cmp(&b.seq))
            }
            _ => a.seq.cmp(&b.seq),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized(mut table: ReplaceTable) -> ReplaceTable {
        table.sort();
        table
    }

    #[test]
    fn test_empty_table_is_preamble_source_trailer() {
        let source = "var a = 1;\n";
        let table = finalized(ReplaceTable::seeded("P;"));
        assert!(table.validate(source).is_ok());
        assert_eq!(table.assemble(source), format!("P;var a = 1;\n{}", TRAILER));
    }

    #[test]
    fn test_replacement_discards_span() {
        let source = "foo(bar);";
        let mut table = ReplaceTable::seeded("");
        table.replace(0, 3, "baz");
        table.close(8, 0, "!");
        let table = finalized(table);

        assert_eq!(table.assemble(source), format!("baz(bar)!;{}", TRAILER));
    }

    #[test]
    fn test_sort_orders_by_start() {
        let mut table = ReplaceTable::seeded("");
        table.close(9, 5, "c");
        table.open(2, 9, "a");
        table.replace(5, 7, "b");
        let table = finalized(table);

        let starts: Vec<_> = table.edits().iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![0, 2, 5, 9]);
    }

    #[test]
    fn test_coincident_closes_innermost_first() {
        // `f(x)` ends where the enclosing core body ends: the call wrapper
        // must close before the core wrapper, even though it was found later.
        let source = "f(x)";
        let mut table = ReplaceTable::seeded("");
        table.open(0, 4, "[core ");
        table.open(0, 4, "<wrap ");
        table.close(4, 0, " core]");
        table.close(4, 0, " wrap>");
        let table = finalized(table);

        assert_eq!(
            table.assemble(source),
            format!("[core <wrap f(x) wrap> core]{}", TRAILER)
        );
    }

    #[test]
    fn test_coincident_close_prefers_later_inner_start() {
        let source = "{ab}";
        let mut table = ReplaceTable::seeded("");
        table.close(3, 0, "<outer>");
        table.close(3, 1, "<inner>");
        let table = finalized(table);

        assert_eq!(table.assemble(source), format!("{{ab<inner><outer>}}{}", TRAILER));
    }

    #[test]
    fn test_coincident_open_prefers_larger_extent() {
        let source = "f(g(x))";
        let mut table = ReplaceTable::seeded("");
        table.open(2, 6, "<g>");
        table.open(0, 7, "<f>");
        table.open(2, 100, "<stmt>");
        let table = finalized(table);

        assert_eq!(
            table.assemble(source),
            format!("<f>f(<stmt><g>g(x)){}", TRAILER)
        );
    }

    #[test]
    fn test_close_then_open_then_replace_at_same_offset() {
        let source = "a;b(c)";
        let mut table = ReplaceTable::seeded("");
        table.replace(2, 3, "B");
        table.open(2, 6, "<open>");
        table.close(2, 0, "<close>");
        let table = finalized(table);

        assert!(table.validate(source).is_ok());
        assert_eq!(table.assemble(source), format!("a;<close><open>B(c){}", TRAILER));
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let source = "abcdef";
        let mut table = ReplaceTable::seeded("");
        table.replace(0, 4, "x");
        table.replace(2, 5, "y");
        let table = finalized(table);

        let err = table.validate(source).unwrap_err();
        assert!(err.contains("overlaps"), "unexpected error: {}", err);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let source = "abc";
        let mut table = ReplaceTable::seeded("");
        table.close(10, 0, "x");
        let table = finalized(table);

        assert!(table.validate(source).is_err());
    }

    #[test]
    fn test_validate_requires_sorting() {
        let mut table = ReplaceTable::seeded("");
        table.close(1, 0, "x");
        assert!(table.validate("abc").is_err());
    }

    #[test]
    fn test_validate_rejects_split_code_point() {
        let source = "é";
        let mut table = ReplaceTable::seeded("");
        table.close(1, 0, "x");
        let table = finalized(table);

        assert!(table.validate(source).is_err());
    }

    #[test]
    fn test_output_length_accounts_for_every_byte() {
        let source = "function f(x){return g(x);}";
        let mut table = ReplaceTable::seeded("PRE");
        table.open(21, 25, "W(");
        table.close(25, 21, ")()");
        table.replace(0, 8, "FUNCTION");
        let table = finalized(table);

        let replaced: usize = table.edits().iter().map(|e| e.end - e.start).sum();
        let inserted: usize = table.edits().iter().map(|e| e.text.len()).sum();
        let out = table.assemble(source);

        assert_eq!(
            out.len(),
            source.len() - replaced + inserted + TRAILER.len()
        );
        assert!(out.starts_with("PREFUNCTION f(x){return W(g(x))();}"));
    }
}
