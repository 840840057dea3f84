//! Application configuration resolved from flags, environment, `.env` and a
//! config file.
//!
//! Precedence, highest first: explicit overrides applied by the caller,
//! environment variables (`.env` is loaded without overriding real ones),
//! `$XDG_CONFIG_HOME/canvas-dl/config.toml` (or `~/.config/...`), defaults.
//!
//! The config file is a flat list of `key = value` lines:
//!
//! ```toml
//! api_url = "https://canvas.uva.nl/api/v1"
//! access_token = "7~abc..."
//! concurrency = 3
//! verbose = false
//! ```

use std::env;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::download::DEFAULT_CONCURRENCY;

/// Canvas instance used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://canvas.uva.nl/api/v1";

/// Replacement shown for short tokens.
const TOKEN_MASK: &str = "***TOKEN***";

/// Environment variable names.
const ENV_API_URL: &str = "API_URL";
const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
const ENV_CONCURRENCY: &str = "CANVAS_DL_CONCURRENCY";
const ENV_VERBOSE: &str = "CANVAS_DL_VERBOSE";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be written.
    #[error("failed to write config file '{path}': {source}")]
    Write {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A line of the config file is malformed.
    #[error("invalid config file '{path}' on line {line}: {message}")]
    Syntax {
        /// Config file path.
        path: PathBuf,
        /// 1-indexed line number.
        line: usize,
        /// What is wrong.
        message: String,
    },

    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("cannot determine the config directory (set HOME or XDG_CONFIG_HOME)")]
    NoConfigDir,
}

/// Resolved settings shared by every command.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Canvas API base URL.
    pub api_url: String,
    /// Personal access token, if configured.
    pub access_token: Option<String>,
    /// Concurrent downloads.
    pub concurrency: usize,
    /// Verbose logging requested by config.
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            concurrency: DEFAULT_CONCURRENCY,
            verbose: false,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_url", &self.api_url)
            .field("access_token", &self.access_token.as_deref().map(mask_token))
            .field("concurrency", &self.concurrency)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Values present in the config file.
#[derive(Debug, Default, PartialEq, Eq)]
struct FileConfig {
    api_url: Option<String>,
    access_token: Option<String>,
    concurrency: Option<usize>,
    verbose: Option<bool>,
}

impl AppConfig {
    /// Loads `.env`, then resolves from the process environment and the
    /// default config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the config file exists but is unreadable
    /// or malformed.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable .env file"),
        }
        Self::resolve(|key| env::var(key).ok(), default_config_path().as_deref())
    }

    /// Resolves configuration from an environment lookup and an optional
    /// config file path. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but is unreadable or malformed.
    pub fn resolve<F>(env_lookup: F, config_path: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match config_path {
            Some(path) if path.exists() => load_file_config(path)?,
            _ => FileConfig::default(),
        };
        let env_lookup = |key: &str| env_lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = env_lookup(ENV_API_URL)
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let access_token = env_lookup(ENV_ACCESS_TOKEN).or(file.access_token);

        let concurrency = match env_lookup(ENV_CONCURRENCY) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "invalid {ENV_CONCURRENCY}, using default");
                DEFAULT_CONCURRENCY
            }),
            None => file.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        };
        let verbose = match env_lookup(ENV_VERBOSE) {
            Some(raw) => is_truthy(&raw),
            None => file.verbose.unwrap_or(false),
        };

        Ok(Self {
            api_url,
            access_token,
            concurrency,
            verbose,
        })
    }

    /// Writes the configuration to the default config file, returning its path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] without a home directory, or
    /// [`ConfigError::Write`] when the file cannot be written.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = default_config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] when the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, self.to_file_string()).map_err(write_error)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    fn to_file_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "api_url = {}", quote(&self.api_url));
        if let Some(token) = &self.access_token {
            let _ = writeln!(out, "access_token = {}", quote(token));
        }
        let _ = writeln!(out, "concurrency = {}", self.concurrency);
        let _ = writeln!(out, "verbose = {}", self.verbose);
        out
    }
}

/// Masks a token for display: first and last four characters, or a fixed
/// placeholder for tokens of eight characters or fewer.
///
/// # Example
///
/// ```
/// use canvas_dl_core::mask_token;
///
/// assert_eq!(mask_token("1234567890abcdef"), "1234…cdef");
/// assert_eq!(mask_token("short"), "***TOKEN***");
/// assert_eq!(mask_token(""), "");
/// ```
#[must_use]
pub fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 8 {
        return TOKEN_MASK.to_string();
    }
    let head: String = token.chars().take(4).collect();
    let tail: String = token.chars().skip(count - 4).collect();
    format!("{head}…{tail}")
}

/// Default config file path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/canvas-dl/config.toml`
/// 2. `$HOME/.config/canvas-dl/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(xdg) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("canvas-dl").join("config.toml"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("canvas-dl")
            .join("config.toml"),
    )
}

/// Default cache directory (`$XDG_CACHE_HOME/canvas-dl` or `~/.cache/canvas-dl`).
#[must_use]
pub fn default_cache_dir() -> Option<PathBuf> {
    if let Some(xdg) = env_var_non_empty_os("XDG_CACHE_HOME") {
        return Some(PathBuf::from(xdg).join("canvas-dl"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(PathBuf::from(home).join(".cache").join("canvas-dl"))
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&raw).map_err(|(line, message)| ConfigError::Syntax {
        path: path.to_path_buf(),
        line,
        message,
    })
}

fn parse_config_str(raw: &str) -> Result<FileConfig, (usize, String)> {
    let mut cfg = FileConfig::default();
    for (index, raw_line) in raw.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err((line_no, "expected key = value".to_string()));
        };
        let value = value.trim();
        let invalid = |what: &str| (line_no, format!("invalid `{}` value: {what}", key.trim()));

        match key.trim() {
            "api_url" => cfg.api_url = Some(parse_string_literal(value).map_err(invalid)?),
            "access_token" => {
                cfg.access_token = Some(parse_string_literal(value).map_err(invalid)?);
            }
            "concurrency" => {
                let parsed = value
                    .parse::<usize>()
                    .map_err(|_| invalid("expected a non-negative integer"))?;
                cfg.concurrency = Some(parsed);
            }
            "verbose" => {
                let parsed = match value {
                    "true" => true,
                    "false" => false,
                    _ => return Err(invalid("expected 'true' or 'false'")),
                };
                cfg.verbose = Some(parsed);
            }
            unknown => {
                warn!(key = unknown, line = line_no, "ignoring unknown config key");
            }
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw: &str) -> Result<String, &'static str> {
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return Err("expected double-quoted string");
    }
    Ok(raw[1..raw.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\"))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
