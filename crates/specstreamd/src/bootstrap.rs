//! Server bootstrap orchestration.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use specstream_analysis::{SpectrogramAnalyzer, StftAnalyzer};
use specstream_config::Config;
use specstream_storage::{ArrayStore, ChannelIndex, FileArrayStore};

use crate::dispatch::DispatchConnectionHandler;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Source of the server configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads the process arguments through [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that resolves configuration from an explicit argument list.
#[derive(Debug, Clone)]
pub struct ArgsConfigLoader {
    args: Vec<OsString>,
}

impl ArgsConfigLoader {
    /// Wraps `args`; the first element is the program name.
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigLoader for ArgsConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(self.args.iter().cloned())
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Creates a loader that always yields `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The data directory could not be created.
    #[error("failed to prepare data directory '{path}': {source}")]
    DataDirectory {
        /// Configured data directory.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// A bootstrapped server, ready to listen.
pub struct Server {
    config: Config,
    store: Arc<FileArrayStore>,
    analyzer: Arc<dyn SpectrogramAnalyzer>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Server {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Array store serving requests.
    #[must_use]
    pub fn store(&self) -> &FileArrayStore {
        &self.store
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Health reporter shared with the launch sequence.
    pub(crate) fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Binds the configured address and starts serving connections.
    pub fn listen(&self) -> Result<ListenerHandle, ListenerError> {
        let listener = SocketListener::bind(&self.config.host, self.config.port)?;
        let addr = listener.local_addr();
        let store: Arc<dyn ArrayStore> = self.store.clone();
        let handler = Arc::new(DispatchConnectionHandler::new(
            store,
            Arc::clone(&self.analyzer),
        ));
        let handle = listener.start(handler, self.config.worker_threads())?;
        self.reporter.listener_started(addr);
        Ok(handle)
    }
}

/// Bootstraps the server using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = fs::create_dir_all(config.data_dir()) {
        let error = BootstrapError::DataDirectory {
            path: config.data_dir().clone(),
            source,
        };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let store = FileArrayStore::new(config.data_dir().as_std_path(), ChannelIndex::default())
        .with_create_policy(config.create_policy);
    reporter.bootstrap_succeeded(&config);

    Ok(Server {
        config,
        store: Arc::new(store),
        analyzer: Arc::new(StftAnalyzer::default()),
        telemetry,
        reporter,
    })
}
