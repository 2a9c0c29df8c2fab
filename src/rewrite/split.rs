//! Function body splitter.
//!
//! A function body with contracts is treated as three runs of statements:
//!
//! ```text
//! { "use strict"; requires(..); requires(..);  <core statements>  ensures(..); }
//!   `------------------ lead ---------------'  `----- core -----'  `- tail --'
//! ```
//!
//! A directive prologue stays in front of everything the splitter inserts.
//!
//! The core is wrapped in an immediately invoked function whose value is
//! captured in a temporary, so the trailing `ensures` checks can inspect the
//! real return value. The function then returns that value wrapped in the
//! "has-result" sentinel.

use tree_sitter::Node;

use super::classify::{statement_contract, CallSite};
use super::runtime::{RESULT_FN, RESULT_VAR};
use super::{scope_invocation, Rewriter};
use crate::error::RewriteError;

/// How a function body was partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySplit {
    /// Number of leading directives such as `"use strict";`.
    pub prologue: usize,
    /// Index one past the last leading `requires` statement.
    pub lead: usize,
    /// Index one past the last core statement; trailing `ensures` follow.
    pub tail_end: usize,
    /// Total statement count.
    pub len: usize,
}

impl BodySplit {
    /// Partition `statements` into leading requires, core, and trailing ensures.
    pub fn of(statements: &[Node], source: &str) -> Self {
        let len = statements.len();
        let prologue = statements.iter().take_while(|s| is_directive(**s)).count();
        let lead = prologue
            + statements[prologue..]
                .iter()
                .take_while(|s| statement_contract(**s, source) == Some(CallSite::Precondition))
                .count();
        let trailing = statements
            .iter()
            .rev()
            .take_while(|s| statement_contract(**s, source) == Some(CallSite::Postcondition))
            .count();
        Self {
            prologue,
            lead,
            tail_end: len - trailing,
            len,
        }
    }

    pub fn has_contracts(&self) -> bool {
        self.lead > self.prologue || self.tail_end < self.len
    }

    pub fn has_ensures(&self) -> bool {
        self.tail_end < self.len
    }

    pub fn core_is_empty(&self) -> bool {
        self.lead >= self.tail_end
    }
}

impl Rewriter<'_, '_> {
    /// Rewrite a function-like node whose body carries leading `requires` or
    /// trailing `ensures` statements. Returns whether the function was split.
    pub(super) fn split_function(&mut self, func: Node) -> Result<bool, RewriteError> {
        let Some(body) = func.child_by_field_name("body") else {
            return Ok(false);
        };
        // Arrow functions with an expression body have nothing to split.
        if body.kind() != "statement_block" {
            return Ok(false);
        }

        let source = self.parsed.source();
        let statements = block_statements(body);
        let split = BodySplit::of(&statements, source);
        if !split.has_contracts() {
            return Ok(false);
        }

        if is_async_or_generator(func) {
            let pos = func.start_position();
            tracing::warn!(
                file = %self.parsed.path().display(),
                line = pos.row + 1,
                "skipping contracts of async or generator function"
            );
            return Ok(false);
        }

        if is_constructor(func, source) {
            let pos = func.start_position();
            tracing::warn!(
                file = %self.parsed.path().display(),
                line = pos.row + 1,
                "skipping contracts of class constructor"
            );
            return Ok(false);
        }

        // The sensitivity mark goes after any directive prologue.
        let (open_at, mark_prefix) = match split.prologue {
            0 => (body.start_byte() + 1, ""),
            n => {
                let last = statements[n - 1];
                let terminated = self.parsed.node_text(last).ends_with(';');
                (last.end_byte(), if terminated { "" } else { ";" })
            }
        };
        let close_at = body.end_byte() - 1;

        if let Some(param) = first_parameter(func) {
            self.table.open(
                open_at,
                body.end_byte(),
                format!(
                    "{}TAJS_addContextSensitivity('{}');",
                    mark_prefix,
                    self.parsed.node_text(param)
                ),
            );
        }

        if split.core_is_empty() {
            if split.has_ensures() {
                let first_ensures = statements[split.tail_end];
                self.table.open(
                    first_ensures.start_byte(),
                    first_ensures.end_byte(),
                    format!("var {};", RESULT_VAR),
                );
            }
            self.table.close(
                close_at,
                body.start_byte(),
                format!(";return {}(undefined);", RESULT_FN),
            );
        } else {
            let core_start = statements[split.lead].start_byte();
            let core_end = statements[split.tail_end - 1].end_byte();
            let invoke = scope_invocation(body);
            self.table.open(
                core_start,
                core_end,
                format!("var {} = (function(){{", RESULT_VAR),
            );
            self.table
                .close(core_end, core_start, format!("}}){};", invoke));
            self.table.close(
                close_at,
                body.start_byte(),
                format!(";return {}({});", RESULT_FN, RESULT_VAR),
            );
        }

        tracing::debug!(
            file = %self.parsed.path().display(),
            line = func.start_position().row + 1,
            lead = split.lead,
            core = split.tail_end.saturating_sub(split.lead),
            tail = split.len - split.tail_end,
            "split function body"
        );
        Ok(true)
    }
}

/// Statements of a block, without comments.
fn block_statements(block: Node) -> Vec<Node> {
    let mut cursor = block.walk();
    let statements = block
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    statements
}

/// The first formal parameter, if it is a plain identifier.
fn first_parameter(func: Node) -> Option<Node> {
    // `x => ...` has a bare `parameter` instead of a parameter list.
    if let Some(param) = func.child_by_field_name("parameter") {
        return (param.kind() == "identifier").then_some(param);
    }
    let params = func.child_by_field_name("parameters")?;
    let mut cursor = params.walk();
    let first = params
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    first.filter(|n| n.kind() == "identifier")
}

/// A directive prologue entry: a statement that is only a string literal.
fn is_directive(stmt: Node) -> bool {
    stmt.kind() == "expression_statement"
        && stmt.named_child_count() == 1
        && stmt.named_child(0).map(|n| n.kind()) == Some("string")
}

fn is_constructor(func: Node, source: &str) -> bool {
    func.kind() == "method_definition"
        && func
            .child_by_field_name("name")
            .map(|n| &source[n.byte_range()] == "constructor")
            .unwrap_or(false)
}

fn is_async_or_generator(func: Node) -> bool {
    let mut cursor = func.walk();
    let found = func
        .children(&mut cursor)
        .any(|c| matches!(c.kind(), "async" | "*"));
    found
}
