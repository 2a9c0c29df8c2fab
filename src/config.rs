//! Configuration for rfjs.
//!
//! Everything is optional; a missing file means built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RFJS_CONFIG";

/// Config file names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["rfjs.yaml", ".rfjs.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Appended to an input path to name its rewritten copy.
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Keep rewritten files after the analyzer ran.
    #[serde(default)]
    pub keep_rewritten: bool,
    /// "pretty" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
    /// Glob patterns for files to skip while walking directories.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            suffix: default_suffix(),
            keep_rewritten: false,
            format: None,
            excluded_paths: Vec::new(),
        }
    }
}

/// How to invoke the analyzer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the rewritten files.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Flags placed after the files and any flags forwarded from the command line.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            flags: Vec::new(),
        }
    }
}

fn default_suffix() -> String {
    ".rf.js".to_string()
}

fn default_program() -> String {
    "java".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-jar".to_string(), "bin/tajs-all.jar".to_string()]
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load the first config found, or the defaults. Also returns where the
    /// config came from.
    pub fn load() -> anyhow::Result<(Self, Option<PathBuf>)> {
        let Some(path) = discover(Path::new("."))? else {
            return Ok((Self::default(), None));
        };
        let config = Self::parse_file(&path)
            .with_context(|| format!("error parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok((config, Some(path)))
    }

    /// Returns the output format (defaults to "pretty").
    pub fn get_format(&self) -> &str {
        self.format.as_deref().unwrap_or("pretty")
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }
}

/// Find a config file: the environment override, then `dir`, then the user
/// config directory.
pub fn discover(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        let path = PathBuf::from(explicit);
        if !path.is_file() {
            anyhow::bail!("{} points to missing file {}", CONFIG_ENV, path.display());
        }
        return Ok(Some(path));
    }

    if let Some(path) = discover_in(dir) {
        return Ok(Some(path));
    }

    let user = ProjectDirs::from("", "", "rfjs")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
        .filter(|p| p.is_file());
    Ok(user)
}

/// Look for one of [`DEFAULT_CONFIG_NAMES`] in `dir`.
pub fn discover_in(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.analyzer.program.trim().is_empty() {
        anyhow::bail!("analyzer.program must not be empty");
    }

    // The analyzer picks its front end by extension.
    if !config.suffix.ends_with(".js") || config.suffix == ".js" {
        anyhow::bail!(
            "invalid suffix {:?}, must end in '.js' and add something before it",
            config.suffix
        );
    }

    if let Some(format) = &config.format {
        if format != "pretty" && format != "json" {
            anyhow::bail!("invalid format {:?}, must be 'pretty' or 'json'", format);
        }
    }

    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
