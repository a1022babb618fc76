use camino::Utf8PathBuf;
use specstream_storage::CreatePolicy;

use crate::logging::LogFormat;

/// Default interface the server binds to.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port for the WebSocket listener.
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of connection workers.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned default host, for serde.
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default listener port, for serde.
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Directory holding array files when none is configured.
pub fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

/// Default worker count, for serde.
pub const fn default_worker_threads() -> usize {
    DEFAULT_WORKER_THREADS
}

/// Default behaviour of `create` on existing arrays.
pub fn default_create_policy() -> CreatePolicy {
    CreatePolicy::default()
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
