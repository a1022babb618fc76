//! Queues response frames on a connection's outbox.

use specstream_protocol::Outbound;
use tracing::{debug, warn};

use crate::transport::Outbox;

use super::DISPATCH_TARGET;
use super::errors::DispatchError;

/// Builds frames from outbound headers and queues them in call order.
pub(crate) struct Responder<'a> {
    outbox: &'a Outbox,
}

impl<'a> Responder<'a> {
    pub(crate) const fn new(outbox: &'a Outbox) -> Self {
        Self { outbox }
    }

    /// Queues a header-only frame.
    pub(crate) fn send(&self, header: Outbound) -> Result<(), DispatchError> {
        let action = header.action();
        self.outbox.enqueue(action, header.into_frame()?)?;
        debug!(target: DISPATCH_TARGET, action, "queued frame");
        Ok(())
    }

    /// Queues a frame carrying `payload`.
    pub(crate) fn send_with(
        &self,
        header: Outbound,
        payload: Vec<f32>,
    ) -> Result<(), DispatchError> {
        let action = header.action();
        let values = payload.len();
        self.outbox
            .enqueue(action, header.into_frame_with(payload)?)?;
        debug!(target: DISPATCH_TARGET, action, values, "queued frame");
        Ok(())
    }

    /// Queues an error frame describing `error`.
    pub(crate) fn send_error(&self, error: &DispatchError) {
        let header = Outbound::error(error.kind(), error.to_string());
        if let Err(failure) = self.send(header) {
            warn!(
                target: DISPATCH_TARGET,
                error = %failure,
                original = %error,
                "failed to queue error frame"
            );
        }
    }
}
