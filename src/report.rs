//! Output formatting for check results.
//!
//! Supports two output formats:
//! - Pretty: the remapped analyzer report, colored for terminals
//! - JSON: structured output for programmatic consumption

use std::io::{self, Write};

use colored::*;
use serde::{Deserialize, Serialize};

use crate::diagnostic::{Output, Remapped};
use crate::runner::CheckResult;

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report structure.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub files: usize,
    pub exit_code: Option<i32>,
    pub diagnostics: Vec<JsonDiagnostic>,
    /// Analyzer output lines that are not diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

/// One diagnostic, with a one-based line.
#[derive(Serialize, Deserialize)]
pub struct JsonDiagnostic {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    /// "assertion", "precondition" or "postcondition" for contract violations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Build the JSON report for a check result.
pub fn json_report(result: &CheckResult) -> JsonReport {
    let mut diagnostics = Vec::new();
    let mut other = Vec::new();
    for output in &result.outputs {
        match output {
            Output::Diagnostic(r) => diagnostics.push(diagnostic_to_json(r)),
            Output::Text(text) => other.push(text.clone()),
        }
    }

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        files: result.files_checked,
        exit_code: result.code,
        diagnostics,
        other,
        stderr: result.stderr.clone(),
    }
}

/// Write results in JSON format.
pub fn write_json(result: &CheckResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(result))?;
    println!("{}", json);
    Ok(())
}

fn diagnostic_to_json(r: &Remapped) -> JsonDiagnostic {
    let d = &r.diagnostic;
    JsonDiagnostic {
        file: d.file.clone(),
        line: d.display_line(),
        column: d.position.map(|p| p.column),
        message: d.message.clone(),
        kind: r.kind.map(|k| k.as_str().to_string()),
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in human-readable format: stdout lines in report order, then
/// the analyzer's stderr.
pub fn write_pretty(result: &CheckResult) {
    for output in &result.outputs {
        println!("{}", pretty_line(output));
    }

    if !result.stderr.is_empty() {
        let mut stderr = io::stderr().lock();
        // Nothing sensible to do if stderr itself is gone.
        let _ = stderr.write_all(result.stderr.as_bytes());
        let _ = stderr.flush();
    }
}

/// Render one output line. Colors are dropped automatically when stdout is
/// not a terminal.
pub fn pretty_line(output: &Output) -> String {
    let r = match output {
        Output::Text(text) => return text.clone(),
        Output::Diagnostic(r) => r,
    };
    let d = &r.diagnostic;
    let location = match d.position {
        Some(p) => format!("{}:{}:{}:", d.file, p.line + 1, p.column),
        None => format!("{}:", d.file),
    };
    let message = if r.kind.is_some() {
        d.message.red().to_string()
    } else {
        d.message.clone()
    };
    format!("{} {}", location.bold(), message)
}
