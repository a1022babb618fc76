//! Request dispatch for WebSocket clients.
//!
//! Each inbound message is an envelope `{"type": ..., "content": ...}`. The
//! router decodes it and hands spectrogram requests to the analysis handler,
//! which streams four frames in a fixed order:
//!
//! ```text
//! new            header only: shape, sample rate and window
//! update         row-major block × frequency matrix
//! change_points  detected change-point block indices
//! change_points  per-block summed signal (type "summed_signal")
//! ```
//!
//! A failed request produces a single error frame and leaves the connection
//! open for the next one.

mod errors;
mod handler;
mod response;
mod router;
mod spectrogram;
#[cfg(test)]
mod test_support;

pub use self::errors::DispatchError;
pub(crate) use self::handler::DispatchConnectionHandler;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
