/*
 * This file is part of gpufan.
 *
 * Copyright (C) 2025 gpufan contributors
 *
 * gpufan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gpufan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gpufan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Logging setup
//!
//! stdout (or the systemd journal) plus an append-only `fan_control.log`,
//! all behind one `EnvFilter`.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use gf_core::constants::paths;

/// Environment variable overriding the configured level
pub const LOG_ENV: &str = "GPUFAN_LOG";

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Level name or filter directive
    pub level: String,
    /// Directory for the log file; `None` disables it
    pub log_dir: Option<PathBuf>,
    /// Prefer journald over stdout
    pub journald: bool,
}

/// Where log output ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSinks {
    pub journald: bool,
    pub file: Option<PathBuf>,
}

/// Translate level names (`WARNING`, `CRITICAL`, any case) to filter directives
///
/// Anything unrecognized is passed through as an `EnvFilter` directive.
pub fn filter_directive(level: &str) -> String {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace".to_string(),
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARN" | "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" | "FATAL" => "error".to_string(),
        _ => level.trim().to_string(),
    }
}

/// `GPUFAN_LOG` when set and non-empty, else the configured level
pub fn level_from_env(config_level: &str) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config_level.to_string())
}

/// Open `<log_dir>/fan_control.log` for appending, creating the directory
pub fn open_log_file(log_dir: &Path) -> anyhow::Result<(File, PathBuf)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let path = log_dir.join(paths::LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok((file, path))
}

/// Install the global subscriber
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<LogSinks> {
    let directive = filter_directive(&settings.level);
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to build log filter")?;

    let journald = if settings.journald && gf_core::system::journald_available() {
        match tracing_journald::layer() {
            Ok(layer) => Some(layer),
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
                None
            }
        }
    } else {
        None
    };
    let use_journald = journald.is_some();

    let stdout = (!use_journald).then(|| fmt::layer().with_target(false).with_level(true));

    let (file_layer, file_path) = match &settings.log_dir {
        Some(dir) => match open_log_file(dir) {
            Ok((file, path)) => (
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file)),
                ),
                Some(path),
            ),
            Err(e) => {
                // Logging to stdout still works; a missing file is not fatal.
                eprintln!("{:#}", e);
                (None, None)
            }
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(journald)
        .with(stdout)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogSinks {
        journald: use_journald,
        file: file_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_level_names_mapped() {
        assert_eq!(filter_directive("INFO"), "info");
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("critical"), "error");
        assert_eq!(filter_directive(" Debug "), "debug");
    }

    #[test]
    fn test_directive_passthrough() {
        assert_eq!(filter_directive("gf_core=trace,info"), "gf_core=trace,info");
    }

    #[test]
    #[serial]
    fn test_env_overrides_config_level() {
        std::env::set_var(LOG_ENV, "trace");
        assert_eq!(level_from_env("INFO"), "trace");
        std::env::set_var(LOG_ENV, "  ");
        assert_eq!(level_from_env("INFO"), "INFO");
        std::env::remove_var(LOG_ENV);
        assert_eq!(level_from_env("WARNING"), "WARNING");
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let (_file, path) = open_log_file(&log_dir).unwrap();
        assert_eq!(path, log_dir.join("fan_control.log"));
        assert!(path.exists());
    }
}
