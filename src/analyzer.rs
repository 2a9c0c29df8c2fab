//! Running the external analyzer over rewritten files.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;

/// A rewritten copy of an input file, written next to it.
///
/// The file is removed when the value is dropped unless it is kept.
#[derive(Debug)]
pub struct RewrittenFile {
    path: PathBuf,
    keep: bool,
}

impl RewrittenFile {
    /// `<input><suffix>`
    pub fn path_for(input: &Path, suffix: &str) -> PathBuf {
        let mut name: OsString = input.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Write `contents` to the rewritten path of `input`, replacing any
    /// previous copy.
    pub fn write(input: &Path, suffix: &str, contents: &str, keep: bool) -> io::Result<Self> {
        let path = Self::path_for(input, suffix);
        fs::write(&path, contents)?;
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_kept(&self) -> bool {
        self.keep
    }
}

impl Drop for RewrittenFile {
    fn drop(&mut self) {
        if self.keep {
            tracing::info!(path = %self.path.display(), "keeping rewritten file");
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to remove rewritten file");
        }
    }
}

/// Captured result of one analyzer run.
#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or `None` if the analyzer was killed by a signal.
    pub code: Option<i32>,
}

impl AnalyzerOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// The analyzer command line, minus the files.
#[derive(Debug, Clone)]
pub struct Analyzer {
    program: String,
    args: Vec<String>,
    forwarded: Vec<String>,
    flags: Vec<String>,
}

impl Analyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            forwarded: Vec::new(),
            flags: config.flags.clone(),
        }
    }

    /// Flags taken verbatim from the rfjs command line.
    pub fn forward(mut self, flags: impl IntoIterator<Item = String>) -> Self {
        self.forwarded.extend(flags);
        self
    }

    /// Full argument list for `files`: configured arguments, the files,
    /// forwarded flags, then configured flags.
    pub fn arguments(&self, files: &[&Path]) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        argv.extend(files.iter().map(|f| f.as_os_str().to_owned()));
        argv.extend(self.forwarded.iter().map(OsString::from));
        argv.extend(self.flags.iter().map(OsString::from));
        argv
    }

    /// Run the analyzer once over `files` and wait for it.
    pub fn run(&self, files: &[&Path]) -> Result<AnalyzerOutput, AnalyzerError> {
        let argv = self.arguments(files);
        tracing::info!(program = %self.program, args = ?argv, "running analyzer");

        let output = Command::new(&self.program)
            .args(&argv)
            .output()
            .map_err(|source| AnalyzerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let result = AnalyzerOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };
        if !result.success() {
            tracing::warn!(code = ?result.code, "analyzer exited unsuccessfully");
        }
        Ok(result)
    }
}
