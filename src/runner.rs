//! Check runner: rewrite every input, analyze once, remap the report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::analyzer::{Analyzer, RewrittenFile};
use crate::config::Config;
use crate::diagnostic::{Output, Remapper};
use crate::rewrite::rewrite_source;

/// Result of one check run.
#[derive(Debug)]
pub struct CheckResult {
    /// Remapped analyzer stdout, in report order.
    pub outputs: Vec<Output>,
    /// Analyzer stderr, verbatim.
    pub stderr: String,
    /// Analyzer exit code; `None` if it was killed by a signal.
    pub code: Option<i32>,
    pub files_checked: usize,
}

/// Rewritten copies of the inputs together with their trace tables.
#[derive(Debug)]
pub struct Prepared {
    pub files: Vec<RewrittenFile>,
    pub remapper: Remapper,
}

/// Executes the rewrite/analyze/remap pipeline for a set of files.
pub struct Runner {
    config: Config,
    forwarded: Vec<String>,
    keep_rewritten: bool,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        let keep_rewritten = config.keep_rewritten;
        Self {
            config,
            forwarded: Vec::new(),
            keep_rewritten,
        }
    }

    /// Flags forwarded to the analyzer.
    pub fn forward(mut self, flags: Vec<String>) -> Self {
        self.forwarded = flags;
        self
    }

    /// Keep rewritten files after the run. Only ever turns keeping on.
    pub fn keep_rewritten(mut self, keep: bool) -> Self {
        self.keep_rewritten |= keep;
        self
    }

    /// Rewrite every file and write the copies. Any failure aborts before the
    /// analyzer is started; copies already written are removed again.
    pub fn prepare(&self, files: &[PathBuf]) -> anyhow::Result<Prepared> {
        let mut prepared = Prepared {
            files: Vec::with_capacity(files.len()),
            remapper: Remapper::new(self.config.suffix.as_str()),
        };

        for file in files {
            let source = fs::read_to_string(file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let rewrite = rewrite_source(file, &source)?;
            let written =
                RewrittenFile::write(file, &self.config.suffix, &rewrite.source, self.keep_rewritten)
                    .with_context(|| format!("cannot write rewritten copy of {}", file.display()))?;
            tracing::debug!(
                input = %file.display(),
                output = %written.path().display(),
                edits = rewrite.edits,
                "wrote rewritten file"
            );
            prepared
                .remapper
                .add_file(file.to_string_lossy().into_owned(), rewrite.trace);
            prepared.files.push(written);
        }

        Ok(prepared)
    }

    /// Run the whole pipeline over `files`.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<CheckResult> {
        let prepared = self.prepare(files)?;
        let paths: Vec<&Path> = prepared.files.iter().map(|f| f.path()).collect();

        let analyzer = Analyzer::new(&self.config.analyzer).forward(self.forwarded.iter().cloned());
        let output = analyzer.run(&paths)?;

        let outputs = prepared.remapper.remap(&output.stdout);
        Ok(CheckResult {
            outputs,
            stderr: output.stderr,
            code: output.code,
            files_checked: files.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_writes_copies() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("a.js");
        fs::write(&input, "f(1);\n").unwrap();

        let runner = Runner::new(Config::default());
        let prepared = runner.prepare(&[input.clone()]).unwrap();
        assert_eq!(prepared.files.len(), 1);

        let copy = temp.path().join("a.js.rf.js");
        assert_eq!(prepared.files[0].path(), copy.as_path());
        let rewritten = fs::read_to_string(&copy).unwrap();
        assert!(rewritten.contains("__rfjs_wrap(f(1))();"));

        drop(prepared);
        assert!(!copy.exists());
    }

    #[test]
    fn test_parse_error_aborts_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.js");
        let bad = temp.path().join("bad.js");
        fs::write(&good, "f(1);\n").unwrap();
        fs::write(&bad, "function (\n").unwrap();

        let runner = Runner::new(Config::default());
        let err = runner.prepare(&[good, bad]).unwrap_err();
        assert!(err.to_string().contains("syntax error"));
        assert!(!temp.path().join("good.js.rf.js").exists());
        assert!(!temp.path().join("bad.js.rf.js").exists());
    }

    #[test]
    fn test_keep_rewritten() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("a.js");
        fs::write(&input, "var a;\n").unwrap();

        let runner = Runner::new(Config::default()).keep_rewritten(true);
        drop(runner.prepare(&[input]).unwrap());
        assert!(temp.path().join("a.js.rf.js").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_remaps_analyzer_report() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("a.js");
        fs::write(&input, "var x = 1;\nassert(x > 1);\n").unwrap();

        let mut config = Config::default();
        config.analyzer.program = "sh".to_string();
        config.analyzer.args = vec![
            "-c".to_string(),
            "echo \"$1:2:1: TypeError, call to non-function\"; echo \"$1:1:9: ignored\"; exit 1"
                .to_string(),
            "sh".to_string(),
        ];

        let result = Runner::new(config).run(&[input.clone()]).unwrap();
        let lines: Vec<String> = result.outputs.iter().map(|o| o.to_string()).collect();
        assert_eq!(
            lines,
            vec![format!("{}:2:1: Assertion failed", input.display())]
        );
        assert_eq!(result.code, Some(1));
        assert_eq!(result.files_checked, 1);
        assert!(!temp.path().join("a.js.rf.js").exists());
    }
}
