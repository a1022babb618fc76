//! Launch sequencing for the server process.

use std::ffi::OsString;
use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ArgsConfigLoader, ConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the server with production collaborators until a termination signal
/// arrives.
///
/// `args` is the full command line, program name first. A bare port in first
/// position (`specstreamd 9000`) is read as `--port 9000`.
pub fn run_server<I, T>(args: I) -> Result<(), LaunchError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    run_server_with(
        &ArgsConfigLoader::new(expand_port_argument(args)),
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal::new(),
    )
}

/// Runs the server with injected collaborators.
///
/// The listener is stopped and every worker joined before this returns, so
/// in-flight requests finish streaming their frames.
pub fn run_server_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    info!(target: PROCESS_TARGET, "starting server runtime");
    let server = bootstrap_with(loader, reporter)?;
    let listener = server.listen()?;
    let waited = shutdown.wait();
    server.reporter().shutdown_requested();
    listener.shutdown();
    listener.join()?;
    waited?;
    server.reporter().shutdown_completed();
    Ok(())
}

fn expand_port_argument<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let positional_port = args
        .get(1)
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| arg.parse::<u16>().is_ok());
    if positional_port {
        args.insert(1, OsString::from("--port"));
    }
    args
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::bare(&["specstreamd"], &["specstreamd"])]
    #[case::positional(&["specstreamd", "9000"], &["specstreamd", "--port", "9000"])]
    #[case::positional_then_flags(
        &["specstreamd", "9000", "--worker-threads", "2"],
        &["specstreamd", "--port", "9000", "--worker-threads", "2"]
    )]
    #[case::flag_untouched(&["specstreamd", "--port", "9000"], &["specstreamd", "--port", "9000"])]
    #[case::not_a_port(&["specstreamd", "70000"], &["specstreamd", "70000"])]
    fn leading_ports_become_flags(#[case] input: &[&str], #[case] expected: &[&str]) {
        let expanded = expand_port_argument(input.iter().copied());
        let expected: Vec<OsString> = expected.iter().map(OsString::from).collect();
        assert_eq!(expanded, expected);
    }
}
