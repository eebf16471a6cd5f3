//! Shrink-wrap configuration
//!
//! Supports loading from `shrinkwrap.toml`, `.shrinkwrap.toml`, a JSON file,
//! or the `[shrinkwrap]` table of a project manifest (`project.toml`).

use super::catalog::ErrorClasses;
use crate::libfunc::{LibFunc, TargetLibraryInfo};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which error classes may be shrink-wrapped, and what the target provides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShrinkWrapConfig {
    /// Wrap calls whose error is a domain error
    #[serde(default = "enabled")]
    pub domain_error: bool,

    /// Wrap calls whose error is a range error (overflow/underflow)
    #[serde(default = "enabled")]
    pub range_error: bool,

    /// Wrap calls whose error includes a pole error
    #[serde(default = "enabled")]
    pub pole_error: bool,

    #[serde(default)]
    pub target: TargetConfig,
}

/// Target C library description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target triple; decides default availability
    #[serde(default)]
    pub triple: Option<String>,

    /// Routines the target does not provide, by C name
    #[serde(default)]
    pub unavailable: Vec<String>,
}

/// Project manifest that may carry a `[shrinkwrap]` table
pub const PROJECT_MANIFEST: &str = "project.toml";

/// Standalone config files, in lookup order
pub const CONFIG_FILES: [&str; 2] = ["shrinkwrap.toml", ".shrinkwrap.toml"];

fn enabled() -> bool {
    true
}

impl Default for ShrinkWrapConfig {
    fn default() -> Self {
        Self {
            domain_error: true,
            range_error: true,
            pole_error: true,
            target: TargetConfig::default(),
        }
    }
}

impl ShrinkWrapConfig {
    /// Every class enabled
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the given classes enabled
    pub fn with_classes(domain_error: bool, range_error: bool, pole_error: bool) -> Self {
        Self {
            domain_error,
            range_error,
            pole_error,
            target: TargetConfig::default(),
        }
    }

    /// Whether every class in `classes` is enabled
    pub fn allows(&self, classes: ErrorClasses) -> bool {
        (!classes.domain || self.domain_error)
            && (!classes.range || self.range_error)
            && (!classes.pole || self.pole_error)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = read(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }

    /// Load from the `[shrinkwrap]` table of a TOML manifest. A manifest
    /// without that table yields the default configuration.
    pub fn from_manifest(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::manifest_section(path)?.unwrap_or_default())
    }

    /// The `[shrinkwrap]` table of a TOML manifest, if it has one
    fn manifest_section(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = read(path)?;
        let parse_error = |e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let manifest: toml::Value = toml::from_str(&content).map_err(parse_error)?;
        match manifest.get("shrinkwrap") {
            Some(table) => table.clone().try_into().map(Some).map_err(parse_error),
            None => Ok(None),
        }
    }

    /// Find the configuration for `start` by walking up from it.
    ///
    /// In each directory a `project.toml` with a `[shrinkwrap]` table wins,
    /// then `shrinkwrap.toml`, then `.shrinkwrap.toml`. A file that exists but
    /// does not parse is an error. Returns `Ok(None)` if nothing is found.
    pub fn find_config(start: &Path) -> Result<Option<Self>, ConfigError> {
        let mut dir = if start.is_file() {
            match start.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return Ok(None),
            }
        } else {
            start.to_path_buf()
        };

        loop {
            let manifest = dir.join(PROJECT_MANIFEST);
            if manifest.exists()
                && let Some(config) = Self::manifest_section(&manifest)?
            {
                return Ok(Some(config));
            }

            for name in CONFIG_FILES {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Self::from_file(&candidate).map(Some);
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Library oracle for the configured target
    pub fn target_library_info(&self) -> Result<TargetLibraryInfo, ConfigError> {
        let mut info = match &self.target.triple {
            Some(triple) => TargetLibraryInfo::for_triple(triple),
            None => TargetLibraryInfo::new(),
        };
        for name in &self.target.unavailable {
            let func = LibFunc::from_name(name)
                .ok_or_else(|| ConfigError::UnknownFunction(name.clone()))?;
            info.set_unavailable(func);
        }
        Ok(info)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration error
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read {}", path.display())]
    #[diagnostic(code(shrinkwrap::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    #[diagnostic(code(shrinkwrap::config::parse))]
    Parse { path: PathBuf, message: String },

    #[error("unknown config file format: {}", .0.display())]
    #[diagnostic(
        code(shrinkwrap::config::format),
        help("use a .toml or .json file")
    )]
    UnknownFormat(PathBuf),

    #[error("unknown library function `{0}`")]
    #[diagnostic(
        code(shrinkwrap::config::unknown_function),
        help("use the C symbol name, e.g. `exp10f`")
    )]
    UnknownFunction(String),
}
