//! Configuration loader
//!
//! Loads application configuration from files and environment variables.
//!
//! ## Loading Strategy
//! 1. Probes config file locations and parses the first hit
//! 2. Falls back to built-in defaults when no file is found
//! 3. Applies `DATACAM_*` environment overrides on top
//!
//! ## Environment Variables
//! - `DATACAM_CAMERA_INDEX`: Capture device index
//! - `DATACAM_FRAME_RATE`: Requested stream frame rate
//! - `DATACAM_STABILIZATION_DELAY_MS`: Post-reconfiguration wait
//! - `DATACAM_INTER_CAPTURE_DELAY_MS`: Default wait between captures
//! - `DATACAM_MAX_CONSECUTIVE_FAILURES`: Batch abort threshold
//! - `DATACAM_DEFAULT_LABELS`: Comma-separated label catalog seed
//! - `DATACAM_MANIFEST_FILENAME`: Exported manifest filename
//!
//! ## File Locations
//! The loader probes, in order: `config.toml`/`config.json` and
//! `datacam.toml`/`datacam.json` in the working directory, its parent, and
//! its grandparent.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use datacam_domain::{Config, DatacamError, Result};
use tracing::{debug, info};

/// Load configuration with the file-then-environment strategy.
///
/// # Errors
/// Returns `DatacamError::Config` when a found file fails to parse or an
/// environment override has an invalid value. A missing file is not an
/// error; defaults are used instead.
pub fn load() -> Result<Config> {
    let mut config = match load_from_file(None) {
        Ok(config) => {
            info!("configuration loaded from file");
            config
        }
        Err(err) => {
            debug!(error = ?err, "no config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `DatacamError::Config` when the file is missing, unreadable, or
/// fails to parse.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths()
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| DatacamError::Config("no config file found".into()))?,
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|err| DatacamError::Config(format!("reading {} failed: {err}", path.display())))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| DatacamError::Config(format!("parsing {} failed: {err}", path.display()))),
        Some("json") => serde_json::from_str(&contents)
            .map_err(|err| DatacamError::Config(format!("parsing {} failed: {err}", path.display()))),
        _ => Err(DatacamError::Config(format!(
            "unsupported config format: {}",
            path.display()
        ))),
    }
}

fn probe_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for base in ["", "..", "../.."] {
        for name in ["config", "datacam"] {
            for ext in ["toml", "json"] {
                paths.push(Path::new(base).join(format!("{name}.{ext}")));
            }
        }
    }
    paths
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(index) = env_parse("DATACAM_CAMERA_INDEX")? {
        config.camera.device_index = index;
    }
    if let Some(rate) = env_parse("DATACAM_FRAME_RATE")? {
        config.camera.frame_rate = rate;
    }
    if let Some(delay) = env_parse("DATACAM_STABILIZATION_DELAY_MS")? {
        config.capture.stabilization_delay_ms = delay;
    }
    if let Some(delay) = env_parse("DATACAM_INTER_CAPTURE_DELAY_MS")? {
        config.capture.inter_capture_delay_ms = delay;
    }
    if let Some(limit) = env_parse("DATACAM_MAX_CONSECUTIVE_FAILURES")? {
        config.capture.max_consecutive_failures = limit;
    }
    if let Ok(labels) = std::env::var("DATACAM_DEFAULT_LABELS") {
        config.session.default_labels = labels
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(ToString::to_string)
            .collect();
    }
    if let Ok(filename) = std::env::var("DATACAM_MANIFEST_FILENAME") {
        config.session.manifest_filename = filename;
    }
    Ok(())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|err| DatacamError::Config(format!("invalid {name}: {err}"))),
        Err(_) => Ok(None),
    }
}
