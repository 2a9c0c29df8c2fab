//! rfjs - design-by-contract checking for JavaScript.
//!
//! JavaScript sources annotated with `requires(cond)`, `ensures(pred)` and
//! `assert(cond)` are rewritten into plain JavaScript in which a violated
//! contract becomes a generic runtime failure. A flow-sensitive static
//! analyzer reports those failures, and rfjs translates them back into
//! contract violations on the original lines.
//!
//! # Architecture
//!
//! - `syntax`: tree-sitter parsing of JavaScript
//! - `rewrite`: call classification, function body splitting and the edit
//!   table that assembles the rewritten source
//! - `trace`: which contract construct sits on which line
//! - `analyzer`: rewritten files on disk and the analyzer process
//! - `diagnostic`: parsing and remapping of the analyzer's report
//! - `runner`: the rewrite/analyze/remap pipeline
//! - `config`: YAML configuration
//! - `report`: Output formatting (pretty, JSON)

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod report;
pub mod rewrite;
pub mod runner;
pub mod syntax;
pub mod trace;

pub use analyzer::{Analyzer, AnalyzerOutput, RewrittenFile};
pub use config::Config;
pub use diagnostic::{Diagnostic, Output, Remapped, Remapper};
pub use error::{AnalyzerError, RewriteError};
pub use rewrite::{rewrite_source, Rewrite};
pub use runner::{CheckResult, Runner};
pub use trace::{TraceKind, TraceTable};
