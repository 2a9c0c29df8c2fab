//! Contract rewriting.
//!
//! A single recursive walk over the syntax tree feeds two components into
//! one [`ReplaceTable`]:
//!
//! - `classify`: every call expression is tagged ([`CallSite`]) and gets the
//!   edits for its tag, plus a trace entry when its failure has to be
//!   recognised later.
//! - `split`: every function whose body starts with `requires` or ends with
//!   `ensures` has its core body captured so postconditions can see the
//!   returned value.
//!
//! The table is then sorted, validated and assembled into the rewritten
//! source, which always starts with the runtime [`PREAMBLE`].

mod classify;
mod runtime;
mod split;
mod table;

pub use classify::{statement_contract, CallSite};
pub use runtime::{PREAMBLE, RESULT_VAR, TRAILER};
pub use split::BodySplit;
pub use table::{Placement, ReplaceEdit, ReplaceTable};

use std::path::Path;

use tree_sitter::Node;

use crate::error::RewriteError;
use crate::syntax::{self, ParsedSource};
use crate::trace::TraceTable;

/// The result of rewriting one source file.
#[derive(Debug, Clone)]
pub struct Rewrite {
    /// Rewritten source text.
    pub source: String,
    /// Contract constructs by rewritten-source line.
    pub trace: TraceTable,
    /// Number of edits applied, including the preamble.
    pub edits: usize,
}

/// Parse and rewrite `source`. `path` is only used in error messages.
pub fn rewrite_source(path: &Path, source: &str) -> Result<Rewrite, RewriteError> {
    let parsed = syntax::parse(path, source)?;
    let mut rewriter = Rewriter::new(&parsed);
    rewriter.visit(parsed.root())?;
    rewriter.finish()
}

/// Accumulates edits and trace entries during one traversal.
pub(crate) struct Rewriter<'p, 's> {
    parsed: &'p ParsedSource<'s>,
    table: ReplaceTable,
    trace: TraceTable,
}

impl<'p, 's> Rewriter<'p, 's> {
    fn new(parsed: &'p ParsedSource<'s>) -> Self {
        Self {
            parsed,
            table: ReplaceTable::new(),
            trace: TraceTable::new(),
        }
    }

    /// Visit `node`, then its children in source order.
    fn visit(&mut self, node: Node) -> Result<(), RewriteError> {
        match node.kind() {
            "function_declaration"
            | "function_expression"
            | "generator_function_declaration"
            | "generator_function"
            | "arrow_function"
            | "method_definition" => {
                self.split_function(node)?;
            }
            "call_expression" => self.classify_call(node)?,
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Rewrite, RewriteError> {
        let source = self.parsed.source();
        self.table.sort();
        self.table
            .validate(source)
            .map_err(|message| RewriteError::EditConflict {
                path: self.parsed.path().to_path_buf(),
                message,
            })?;

        tracing::debug!(
            file = %self.parsed.path().display(),
            edits = self.table.len(),
            traces = self.trace.len(),
            "rewrote source"
        );

        Ok(Rewrite {
            source: self.table.assemble(source),
            edits: self.table.len(),
            trace: self.trace,
        })
    }
}

/// How a wrapper function generated at `node` must be invoked so that `this`
/// and `arguments` inside it are those of the user's code.
///
/// Arrow functions bind neither, so the nearest enclosing non-arrow function
/// decides. Outside any function, and in class field initializers, there is
/// no `arguments` to pass on.
pub(crate) fn scope_invocation(node: Node) -> &'static str {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "function_declaration"
            | "function_expression"
            | "generator_function_declaration"
            | "generator_function"
            | "method_definition" => return runtime::INVOKE_APPLY,
            "program" | "field_definition" | "class_static_block" => break,
            _ => {}
        }
        current = n.parent();
    }
    runtime::INVOKE_CALL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceKind;

    #[test]
    fn test_output_starts_with_preamble() {
        for source in ["", "var a;", "f(1);", "function f(x){requires(x);return x;}"] {
            let rewrite = rewrite_source(Path::new("t.js"), source).unwrap();
            assert!(rewrite.source.starts_with(PREAMBLE), "source: {:?}", source);
        }
    }

    #[test]
    fn test_passthrough_without_calls() {
        let source = "// plain\nvar a = 1;\nfunction f(x) {\n  return x + a;\n}\n";
        let rewrite = rewrite_source(Path::new("t.js"), source).unwrap();
        assert_eq!(rewrite.source, format!("{}{}{}", PREAMBLE, source, TRAILER));
        assert_eq!(rewrite.edits, 1);
        assert!(rewrite.trace.is_empty());
    }

    #[test]
    fn test_line_count_is_preserved() {
        let source = "function f(x){\n  requires(x >= 0);\n  var y = g(x);\n  return y;\n  ensures(function(r){return r;});\n}\nf(1);\n";
        let rewrite = rewrite_source(Path::new("t.js"), source).unwrap();
        let body = rewrite.source.strip_suffix(TRAILER).unwrap();
        assert_eq!(body.lines().count(), source.lines().count());
    }

    #[test]
    fn test_trace_line_correlation() {
        let source = "function f(x){\n  requires(x>=0);\n  var r=x*2;\n  assert(r>=0);\n  return r;\n  ensures(function(res){return res>=0;});\n}\n";
        let rewrite = rewrite_source(Path::new("t.js"), source).unwrap();

        assert_eq!(
            rewrite.trace.entries(),
            &[
                crate::trace::TraceEntry {
                    line: 3,
                    kind: TraceKind::Assertion
                },
                crate::trace::TraceEntry {
                    line: 5,
                    kind: TraceKind::Postcondition
                },
            ]
        );
        assert!(rewrite.trace.kinds_at(1).is_empty());
    }

    #[test]
    fn test_scope_invocation() {
        let cases = [
            ("assert(a);", ".call(this)"),
            ("function f(){assert(a);}", ".apply(this, arguments)"),
            ("var f = () => {assert(a);};", ".call(this)"),
            ("function f(){ var g = () => assert(a); }", ".apply(this, arguments)"),
            ("class A { m(){assert(a);} }", ".apply(this, arguments)"),
        ];
        for (source, expected) in cases {
            let rewrite = rewrite_source(Path::new("t.js"), source).unwrap();
            assert!(
                rewrite.source.contains(&format!("{{null();}}}}){};", expected)),
                "source: {:?}\nrewritten: {}",
                source,
                rewrite.source
            );
        }
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let err = rewrite_source(Path::new("t.js"), "function f( {").unwrap_err();
        assert!(matches!(err, RewriteError::Parse { .. }));
    }
}
