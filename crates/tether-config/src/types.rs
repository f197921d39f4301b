//! Configuration types.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the native module lives and how it is verified.
    pub native: NativeSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

/// Location and integrity settings for the native module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeSection {
    /// Explicit path to the compiled library. Skips the directory search.
    pub path: Option<PathBuf>,
    /// Extra directories searched for the platform library file name, in order.
    pub search_dirs: Vec<PathBuf>,
    /// Expected blake3 digest of the library file (64 lowercase hex chars).
    pub hash: Option<String>,
    /// Refuse to load the library when no `hash` is configured.
    pub require_hash: bool,
}

/// Logging settings consumed by `tether-telemetry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base filter level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Where log lines go (`stderr`, `stdout`, `file`).
    pub target: String,
    /// Directory for daily-rotated log files. Required when `target = "file"`.
    pub directory: Option<PathBuf>,
    /// Additional `tracing` filter directives, e.g. `tether_binding=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            directives: Vec::new(),
        }
    }
}
