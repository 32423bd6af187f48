/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::protocol::MAX_FRAME_SIZE;
use crate::common::ProxyError;

/// Configuration for the proxy protocol layer.
///
/// Loaded from TOML files in XDG-compliant directories; every field has a
/// default, so a file only needs the values it overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Tracing and logging configuration
    pub logging: LoggingConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default wait for a reply before a request times out, in milliseconds
    pub request_timeout_ms: u64,
    /// How long the ID of a cancelled or timed-out request is remembered so
    /// its late reply can be dropped quietly, in milliseconds
    pub retired_reply_ttl_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted frame body in bytes
    pub max_frame_size: usize,
    /// Capacity of in-memory frame channels
    pub channel_capacity: usize,
}

/// Tracing and logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Directory for daily rolling log files; logs go to stderr when unset
    pub directory: Option<String>,
    /// File name prefix of the rolling log files
    pub file_prefix: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            retired_reply_ttl_ms: 60_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            channel_capacity: 255,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
            file_prefix: "cadence-proxy.log".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Name of the configuration file inside the XDG config directory.
    pub const FILE_NAME: &'static str = "proxy.toml";

    /// Default request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_timeout_ms)
    }

    /// Retired reply TTL as a `Duration`
    #[must_use]
    pub const fn retired_reply_ttl(&self) -> Duration {
        Duration::from_millis(self.timeouts.retired_reply_ttl_ms)
    }

    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ProxyError> {
        toml::from_str(source).map_err(|e| ProxyError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ProxyError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `cadence-proxy/proxy.toml` under `$XDG_CONFIG_HOME` and then
    /// the `$XDG_CONFIG_DIRS` entries. If no file is found, returns the
    /// default configuration. If a file exists but cannot be read or parsed,
    /// logs the failure and uses defaults.
    #[must_use]
    pub fn load() -> Self {
        use tracing::{info, warn};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("cadence-proxy") {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        if let Some(path) = xdg_dirs.find_config_file(Self::FILE_NAME) {
            info!("Loading configuration from: {}", path.display());
            match Self::from_file(&path) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    warn!("Failed to load configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            info!("No configuration file found, using defaults");
            Self::default()
        }
    }
}
