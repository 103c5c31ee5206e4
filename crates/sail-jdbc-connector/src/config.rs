// SPDX-License-Identifier: Apache-2.0

//! Configuration for the JDBC connector

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::JdbcResult;

/// Configuration for the JDBC connector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JdbcConfig {
    /// Driver artifact cache configuration
    #[serde(default)]
    pub driver_cache: DriverCacheConfig,

    /// Python bridge configuration
    #[serde(default)]
    pub python: PythonBridgeConfig,
}

impl JdbcConfig {
    /// Load the configuration from the defaults merged with `SAIL_JDBC__*` environment variables.
    ///
    /// Nested keys are separated by double underscores,
    /// e.g. `SAIL_JDBC__DRIVER_CACHE__DOWNLOAD_TIMEOUT_SECS=30`.
    pub fn load() -> JdbcResult<Self> {
        Self::figment().extract().map_err(Into::into)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(JdbcConfig::default()))
            .admerge(Env::prefixed("SAIL_JDBC__").map(|p| p.as_str().replace("__", ".").into()))
    }
}

/// Driver artifact cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverCacheConfig {
    /// Local directory holding verified driver artifacts
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,

    /// Timeout for a single driver download in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Maximum number of resolved drivers kept in memory
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for DriverCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            download_timeout_secs: default_download_timeout(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl DriverCacheConfig {
    /// Get download timeout as Duration
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Python bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonBridgeConfig {
    /// Python module providing the scanner class
    #[serde(default = "default_python_module")]
    pub module: String,

    /// Python scanner class name
    #[serde(default = "default_python_class")]
    pub class: String,
}

impl Default for PythonBridgeConfig {
    fn default() -> Self {
        Self {
            module: default_python_module(),
            class: default_python_class(),
        }
    }
}

fn default_cache_directory() -> PathBuf {
    std::env::temp_dir().join("sail").join("jdbc_drivers")
}

fn default_download_timeout() -> u64 {
    60
}

fn default_max_capacity() -> u64 {
    256
}

fn default_python_module() -> String {
    "pysail.jdbc.scanner".to_string()
}

fn default_python_class() -> String {
    "JdbcScanner".to_string()
}
