//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;

/// Main configuration for the transcoding queue.
///
/// Built once at startup and shared read-only by every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root under which `queue`, `working`, `finished` and `upload` live.
    pub base_dir: PathBuf,

    /// Transcoder flags placed before `-i <input>`.
    pub input_flags: Vec<String>,

    /// Transcoder flags placed after `-i <input>` and before the output path.
    pub output_flags: Vec<String>,

    /// Transcoder program name or path.
    pub transcoder: String,

    /// Container extension of every output file, without the dot.
    pub output_extension: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            input_flags: Vec::new(),
            output_flags: Vec::new(),
            transcoder: "ffmpeg".to_string(),
            output_extension: "mp4".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(Error::config("base_dir cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.transcoder.trim().is_empty() {
            return Err(Error::config("transcoder cannot be empty"));
        }

        let ext = &self.output_extension;
        if ext.is_empty() {
            return Err(Error::config("output_extension cannot be empty"));
        }
        if ext.contains('.') || ext.contains('/') || ext.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::config(format!(
                "output_extension '{ext}' must not contain '.' or a path separator"
            )));
        }

        Ok(())
    }
}

/// Split a flag string on whitespace, dropping empty tokens.
///
/// No quoting is interpreted: `-vf "scale=1280:-1"` yields two tokens with the
/// quotes still attached.
#[must_use]
pub fn split_flags(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}
