//! Layered configuration for the spectrogram streaming server.
//!
//! Values resolve from, lowest precedence first: built-in defaults, a TOML
//! file named by `--config-path` or `SPECSTREAM_CONFIG_PATH`, `SPECSTREAM_*`
//! environment variables, and command-line flags.

mod defaults;
mod logging;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_WORKER_THREADS, default_create_policy,
    default_data_dir, default_host, default_log_filter, default_log_format, default_port,
    default_worker_threads,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use specstream_storage::CreatePolicy;

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SPECSTREAM")]
pub struct Config {
    /// Interface the WebSocket listener binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port the WebSocket listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding one array file per recording.
    #[serde(default = "default_data_dir")]
    pub data_dir: Utf8PathBuf,
    /// Number of threads serving connections.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Behaviour of array creation when the recording already has storage.
    #[serde(default = "default_create_policy")]
    pub create_policy: CreatePolicy,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            worker_threads: default_worker_threads(),
            create_policy: default_create_policy(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Address string handed to the TCP listener.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory holding array files.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8PathBuf {
        &self.data_dir
    }

    /// Worker count, never below one.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.max(1)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_all_interfaces() {
        let config = Config::default();
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.data_dir(), &Utf8PathBuf::from("."));
        assert_eq!(config.worker_threads(), 4);
        assert_eq!(config.create_policy, CreatePolicy::Truncate);
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn zero_workers_is_raised_to_one() {
        let config = Config {
            worker_threads: 0,
            ..Config::default()
        };
        assert_eq!(config.worker_threads(), 1);
    }
}
