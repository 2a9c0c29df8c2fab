//! Error types for rewriting and analyzer invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort the rewrite of a single source file.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("failed to initialise JavaScript parser: {0}")]
    ParserInit(String),

    #[error("{}:{line}:{column}: syntax error, cannot rewrite file", path.display())]
    Parse {
        path: PathBuf,
        /// One-based line of the first error node.
        line: usize,
        /// One-based column of the first error node.
        column: usize,
    },

    #[error("{}:{line}:{column}: {name}() takes exactly one non-spread argument, {found} given", path.display())]
    ContractArity {
        path: PathBuf,
        name: &'static str,
        found: usize,
        line: usize,
        column: usize,
    },

    #[error("{}:{line}:{column}: requires() must be used as a statement inside a function", path.display())]
    MisplacedRequires {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    /// The collected edits overlap or fall outside the buffer. This is a bug
    /// in the rewriter, never a property of the input.
    #[error("internal error: conflicting edits in {}: {message}", path.display())]
    EditConflict { path: PathBuf, message: String },
}

/// Errors raised while running the external analyzer.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("failed to start analyzer {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
