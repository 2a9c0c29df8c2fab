//! JavaScript parsing via tree-sitter.
//!
//! Tree-sitter always produces a tree, marking unparseable regions with
//! ERROR or MISSING nodes. Such a tree cannot be rewritten safely, so any
//! error node is turned into a [`RewriteError::Parse`] here.

use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::RewriteError;

/// A parsed source buffer together with its tree.
pub struct ParsedSource<'s> {
    tree: Tree,
    source: &'s str,
    path: PathBuf,
}

impl<'s> ParsedSource<'s> {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &'s str {
        &self.source[node.byte_range()]
    }
}

/// Parse `source` as JavaScript, failing on any syntax error.
pub fn parse<'s>(path: &Path, source: &'s str) -> Result<ParsedSource<'s>, RewriteError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| RewriteError::ParserInit(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| RewriteError::ParserInit("parser returned no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let node = first_error(root).unwrap_or(root);
        let pos = node.start_position();
        return Err(RewriteError::Parse {
            path: path.to_path_buf(),
            line: pos.row + 1,
            column: pos.column + 1,
        });
    }

    Ok(ParsedSource {
        tree,
        source,
        path: path.to_path_buf(),
    })
}

/// Find the first ERROR or MISSING node in document order.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}
