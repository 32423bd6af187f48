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

//! Process-wide tracing setup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::common::config::LoggingConfig;
use crate::common::ProxyError;

/// Builds the event filter: `RUST_LOG` when set, else the configured
/// directive, else `info`.
#[must_use]
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber.
///
/// With a configured directory, events go to a daily rolling file through a
/// non-blocking writer and the returned guard must be kept alive to flush
/// them. Without one, events go to stderr and no guard is returned.
///
/// # Errors
///
/// [`ProxyError::Io`] if the log directory cannot be created, and
/// [`ProxyError::Config`] if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ProxyError> {
    let builder = FmtSubscriber::builder()
        .compact()
        .with_line_number(true)
        .with_target(true)
        .with_env_filter(build_filter(config));

    let guard = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let subscriber = builder.with_ansi(false).with_writer(non_blocking).finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| ProxyError::Config(e.to_string()))?;
            Some(guard)
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| ProxyError::Config(e.to_string()))?;
            None
        }
    };

    tracing::debug!(filter = %config.filter, directory = ?config.directory, "Tracing initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive_falls_back() {
        let config = LoggingConfig {
            filter: "cadence_proxy=[".to_string(),
            ..LoggingConfig::default()
        };
        let _filter = build_filter(&config);
    }

    #[test]
    fn test_file_logging() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: Some(dir.path().display().to_string()),
            file_prefix: "unit.log".to_string(),
            ..LoggingConfig::default()
        };

        let guard = init_tracing(&config).unwrap();
        assert!(guard.is_some());
        tracing::info!("file logging works");
        drop(guard);

        let created = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| entry.file_name().to_string_lossy().starts_with("unit.log"));
        assert!(created);

        assert!(matches!(init_tracing(&config), Err(ProxyError::Config(_))));
    }
}
