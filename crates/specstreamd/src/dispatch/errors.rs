//! Error types for request dispatch failures.

use specstream_analysis::AnalysisError;
use specstream_protocol::{FrameError, MessageError};
use specstream_storage::StoreError;
use thiserror::Error;

use crate::transport::DeliveryError;

/// Errors that fail a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound message could not be decoded.
    #[error(transparent)]
    Message(#[from] MessageError),
    /// The array store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The requested window could not be analysed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// A response header could not be serialised.
    #[error("failed to build response frame: {0}")]
    Frame(#[from] FrameError),
    /// The connection's outbox stopped accepting frames.
    #[error("failed to queue response: {0}")]
    Delivery(#[from] DeliveryError),
}

impl DispatchError {
    /// Stable label carried in the `kind` field of error frames.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(error) => error.kind(),
            Self::Store(error) => error.kind(),
            Self::Analysis(error) => error.kind(),
            Self::Frame(_) => "frame_encoding",
            Self::Delivery(_) => "delivery",
        }
    }
}
