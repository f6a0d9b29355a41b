//! Configuration for the scopetree demo.
//!
//! Read from `~/.scopetree/config.toml`:
//!
//! ```toml
//! [log]
//! filter = "scopetree_core=debug"
//!
//! [demo]
//! depth = 3
//! fanout = 2
//! cause = "shutdown requested by ${USER}"
//! ```
//!
//! Every section and field is optional. `SCOPETREE_DEPTH` and
//! `SCOPETREE_FANOUT` override the demo shape.

use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_DEPTH: usize = 3;
pub const DEFAULT_FANOUT: usize = 2;
pub const MAX_DEPTH: usize = 6;
pub const MAX_FANOUT: usize = 8;
pub const DEFAULT_CAUSE: &str = "demo finished";

#[derive(Debug, Default, Deserialize)]
pub struct ScopetreeConfig {
    pub log: Option<LogConfig>,
    pub demo: Option<DemoConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DemoConfig {
    /// Levels of cancelable scopes below the root.
    pub depth: Option<usize>,
    /// Children per scope.
    pub fanout: Option<usize>,
    /// Cause recorded on the root when the demo cancels it. `${VAR}`
    /// references are expanded.
    pub cause: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl ScopetreeConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log
            .as_ref()
            .and_then(|log| log.filter.as_deref())
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".scopetree").join("config.toml"))
}

/// Demo shape after applying defaults, environment overrides and bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoSettings {
    pub depth: usize,
    pub fanout: usize,
    pub cause: String,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            fanout: DEFAULT_FANOUT,
            cause: DEFAULT_CAUSE.to_string(),
        }
    }
}

impl DemoSettings {
    #[must_use]
    pub fn resolve(config: Option<&ScopetreeConfig>) -> Self {
        Self::resolve_with(config, |name| env::var(name).ok())
    }

    /// Like [`DemoSettings::resolve`], reading overrides through `lookup`.
    pub fn resolve_with(
        config: Option<&ScopetreeConfig>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let demo = config.and_then(|cfg| cfg.demo.as_ref());
        let mut settings = Self::default();

        if let Some(depth) = demo.and_then(|d| d.depth) {
            settings.depth = depth;
        }
        if let Some(fanout) = demo.and_then(|d| d.fanout) {
            settings.fanout = fanout;
        }
        if let Some(cause) = demo.and_then(|d| d.cause.as_deref()) {
            let expanded = expand_env_vars(cause, &lookup);
            if !expanded.trim().is_empty() {
                settings.cause = expanded;
            }
        }

        if let Some(depth) = parse_override(&lookup, "SCOPETREE_DEPTH") {
            settings.depth = depth;
        }
        if let Some(fanout) = parse_override(&lookup, "SCOPETREE_FANOUT") {
            settings.fanout = fanout;
        }

        settings.depth = settings.depth.clamp(1, MAX_DEPTH);
        settings.fanout = settings.fanout.clamp(1, MAX_FANOUT);
        settings
    }
}

fn parse_override(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<usize> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {name}={raw:?}: not a non-negative integer");
            None
        }
    }
}

/// Expand `${VAR}` references. Unset variables expand to nothing.
pub fn expand_env_vars(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&lookup(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out
}
