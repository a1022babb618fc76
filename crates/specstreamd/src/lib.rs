//! Spectrogram streaming server.
//!
//! `specstreamd` serves stored multichannel recordings to visualization
//! clients over WebSocket. A client sends a JSON request naming a recording,
//! a channel, and a time window; the server reads the window from the array
//! store, computes a log-power spectrogram and its change points, and streams
//! the results back as length-prefixed binary frames.
//!
//! Startup follows a fixed sequence: configuration is loaded, structured
//! telemetry is installed, the data directory and array store are prepared,
//! and the listener hands accepted connections to a fixed pool of workers.
//! Each stage reports through a [`HealthReporter`] so operators can see where
//! startup stopped.
//!
//! Requests never take the process down. Storage and analysis failures become
//! error frames on the requesting connection, transport failures are logged,
//! and the listener keeps accepting until a termination signal arrives.

mod bootstrap;
mod dispatch;
mod health;
mod process;
mod telemetry;
mod transport;

pub use bootstrap::{
    ArgsConfigLoader, BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use dispatch::DispatchError;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_server, run_server_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{
    DeliveryError, DeliveryPolicy, DeliveryReport, ListenerError, ListenerHandle, SPECTROGRAM_PATH,
};
