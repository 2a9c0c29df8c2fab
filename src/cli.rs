//! Command-line interface for rfjs.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::report;
use crate::runner::Runner;

/// Exit codes. Otherwise rfjs exits with the analyzer's own code.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Design-by-contract checking for JavaScript.
///
/// Each input is rewritten so that `requires`, `ensures` and `assert`
/// contracts become checks the analyzer can reason about. The analyzer then
/// runs over the rewritten copies and its report is translated back into
/// contract violations on the original lines.
///
/// Directories are searched for `.js` files. Arguments starting with `-` are
/// passed to the analyzer unchanged, except `--debug`, which keeps the
/// rewritten files, and `-h`/`--help`.
#[derive(Parser, Debug)]
#[command(name = "rfjs")]
#[command(author, version, about, long_about)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(override_usage = "rfjs [--debug] [FILE|DIR|-FLAG]...")]
pub struct Cli {
    /// Input files and directories, and flags for the analyzer
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Command-line arguments sorted by role.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub inputs: Vec<PathBuf>,
    pub forwarded: Vec<String>,
    pub debug: bool,
    pub help: bool,
}

impl Invocation {
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = Invocation::default();
        for arg in args {
            let arg = arg.into();
            match arg.as_str() {
                "--debug" => invocation.debug = true,
                "-h" | "--help" => invocation.help = true,
                a if a.starts_with('-') => invocation.forwarded.push(arg),
                _ => invocation.inputs.push(PathBuf::from(arg)),
            }
        }
        invocation
    }
}

/// Expand inputs into the list of files to check. Directories are walked for
/// `.js` files; explicitly named files are always kept.
pub fn collect_files(inputs: &[PathBuf], config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(collect_dir(input, config)?);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn collect_dir(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            // Skip hidden and dependency directories
            !(name.starts_with('.') || name == "node_modules")
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        // Leftovers of earlier --debug runs
        if !name.ends_with(".js") || name.ends_with(&config.suffix) {
            continue;
        }
        if config.is_path_excluded(path) {
            tracing::debug!(path = %path.display(), "excluded by config");
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Run rfjs with already parsed arguments. Returns the process exit code.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let invocation = Invocation::from_args(cli.args.iter().cloned());

    if invocation.help || invocation.inputs.is_empty() {
        Cli::command().print_long_help()?;
        return Ok(if invocation.help {
            EXIT_SUCCESS
        } else {
            EXIT_ERROR
        });
    }

    let (config, config_path) = Config::load()?;
    config::validate(&config).map_err(|e| {
        let source = config_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string());
        e.context(format!("invalid config ({})", source))
    })?;

    let files = collect_files(&invocation.inputs, &config)?;
    if files.is_empty() {
        eprintln!("Warning: no files to check");
        return Ok(EXIT_SUCCESS);
    }

    let format = config.get_format().to_string();
    let runner = Runner::new(config)
        .forward(invocation.forwarded)
        .keep_rewritten(invocation.debug);
    let result = runner.run(&files)?;

    match format.as_str() {
        "json" => report::write_json(&result)?,
        _ => report::write_pretty(&result),
    }

    Ok(result.code.unwrap_or(EXIT_ERROR))
}
