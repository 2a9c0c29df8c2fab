//! Contract classifier: tags each call expression and emits its edits.

use std::collections::HashSet;

use tree_sitter::Node;

use super::runtime::{DIRECTIVE_PREFIX, NONE_FN, RESULT_FN, RESULT_VAR, WRAP_FN};
use super::{scope_invocation, Rewriter};
use crate::error::RewriteError;
use crate::trace::TraceKind;

lazy_static::lazy_static! {
    /// Callees that are never wrapped: the runtime helpers and the literals
    /// the rewriter itself calls to force a failure.
    static ref RESERVED_CALLEES: HashSet<&'static str> =
        [NONE_FN, RESULT_FN, WRAP_FN, "undefined", "null"].into_iter().collect();
}

/// What a call expression is, decided once per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    /// `requires(cond)`
    Precondition,
    /// `ensures(pred)`
    Postcondition,
    /// `assert(cond)`
    Assertion,
    /// Any other call; its result is unwrapped.
    Ordinary,
    /// A runtime helper or analyzer directive; left alone.
    Reserved,
}

impl CallSite {
    /// Classify by callee name. `None` means the callee is not a plain identifier.
    pub fn from_callee(name: Option<&str>) -> Self {
        match name {
            Some("requires") => CallSite::Precondition,
            Some("ensures") => CallSite::Postcondition,
            Some("assert") => CallSite::Assertion,
            Some(n) if RESERVED_CALLEES.contains(n) || n.starts_with(DIRECTIVE_PREFIX) => {
                CallSite::Reserved
            }
            _ => CallSite::Ordinary,
        }
    }

    /// Classify a `call_expression` node.
    ///
    /// Returns `None` for tagged templates, which tree-sitter also parses as
    /// call expressions but which take no argument list.
    pub fn of(call: Node, source: &str) -> Option<Self> {
        let args = call.child_by_field_name("arguments")?;
        if args.kind() != "arguments" {
            return None;
        }
        // `requires?.(x)` cannot be turned into a guard.
        if call.child_by_field_name("optional_chain").is_some() {
            return Some(CallSite::Ordinary);
        }
        let callee = call.child_by_field_name("function")?;
        // `super(..)` and `import(..)` are syntax, not calls of a value.
        if matches!(callee.kind(), "super" | "import") {
            return Some(CallSite::Reserved);
        }
        let name = (callee.kind() == "identifier").then(|| &source[callee.byte_range()]);
        Some(Self::from_callee(name))
    }

    /// The contract function name, for contract call sites.
    pub fn contract_name(&self) -> Option<&'static str> {
        match self {
            CallSite::Precondition => Some("requires"),
            CallSite::Postcondition => Some("ensures"),
            CallSite::Assertion => Some("assert"),
            CallSite::Ordinary | CallSite::Reserved => None,
        }
    }
}

/// The contract kind of a statement that is a bare contract call, if any.
pub fn statement_contract(stmt: Node, source: &str) -> Option<CallSite> {
    if stmt.kind() != "expression_statement" {
        return None;
    }
    let expr = stmt.named_child(0)?;
    if expr.kind() != "call_expression" {
        return None;
    }
    CallSite::of(expr, source).filter(|site| site.contract_name().is_some())
}

impl Rewriter<'_, '_> {
    /// Classify `call` and record the edits and trace entries it needs.
    pub(super) fn classify_call(&mut self, call: Node) -> Result<(), RewriteError> {
        let Some(site) = CallSite::of(call, self.parsed.source()) else {
            return Ok(());
        };
        let Some(callee) = call.child_by_field_name("function") else {
            return Ok(());
        };

        let (start, end) = (call.start_byte(), call.end_byte());
        match site {
            CallSite::Precondition => {
                self.check_contract_argument(call, "requires")?;
                let is_statement = call.parent().map(|p| p.kind()) == Some("expression_statement");
                if !is_statement || !inside_function(call) {
                    let (line, column) = one_based(call);
                    return Err(RewriteError::MisplacedRequires {
                        path: self.parsed.path().to_path_buf(),
                        line,
                        column,
                    });
                }
                self.table.replace(callee.start_byte(), callee.end_byte(), "if(!");
                self.table
                    .close(end, start, format!(") return {}()", NONE_FN));
            }
            CallSite::Postcondition => {
                self.check_contract_argument(call, "ensures")?;
                self.table.replace(
                    callee.start_byte(),
                    callee.end_byte(),
                    "(function(){try{if(!(",
                );
                self.table.close(
                    end,
                    start,
                    format!(
                        ")({})){{null();}}}}catch(__rfjs_e){{}}}}){}",
                        RESULT_VAR,
                        scope_invocation(call)
                    ),
                );
                self.record_trace(call, TraceKind::Postcondition);
            }
            CallSite::Assertion => {
                self.check_contract_argument(call, "assert")?;
                self.table
                    .replace(callee.start_byte(), callee.end_byte(), "(function(){if(!(");
                self.table.close(
                    end,
                    start,
                    format!(")){{null();}}}}){}", scope_invocation(call)),
                );
                self.record_trace(call, TraceKind::Assertion);
            }
            CallSite::Ordinary => {
                self.table.open(start, end, format!("{}(", WRAP_FN));
                self.table.close(end, start, ")()");
                self.record_trace(call, TraceKind::PreconditionCall);
            }
            CallSite::Reserved => {}
        }

        Ok(())
    }

    /// Contract calls take exactly one plain argument.
    fn check_contract_argument(&self, call: Node, name: &'static str) -> Result<(), RewriteError> {
        let args: Vec<Node> = match call.child_by_field_name("arguments") {
            Some(list) => {
                let mut cursor = list.walk();
                let args = list
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect();
                args
            }
            None => Vec::new(),
        };

        if args.len() != 1 || args[0].kind() == "spread_element" {
            let (line, column) = one_based(call);
            return Err(RewriteError::ContractArity {
                path: self.parsed.path().to_path_buf(),
                name,
                found: args.len(),
                line,
                column,
            });
        }
        Ok(())
    }

    /// Record `kind` on every line the analyzer may attribute the failure to:
    /// the wrapper opens on the call's first line and fails on its last.
    fn record_trace(&mut self, call: Node, kind: TraceKind) {
        let first = call.start_position().row;
        let last = call.end_position().row;
        self.trace.record(first, kind);
        if last != first {
            self.trace.record(last, kind);
        }
    }
}

/// Whether `node` sits in a function body, where a `return` is allowed.
fn inside_function(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "function_declaration"
            | "function_expression"
            | "generator_function_declaration"
            | "generator_function"
            | "arrow_function"
            | "method_definition" => return true,
            "program" | "class_static_block" => return false,
            _ => {}
        }
        current = n.parent();
    }
    false
}

/// One-based (line, column) of a node's start.
fn one_based(node: Node) -> (usize, usize) {
    let pos = node.start_position();
    (pos.row + 1, pos.column + 1)
}
