//! Wire protocol between the streaming server and visualization clients.
//!
//! Clients send JSON envelopes `{"type": ..., "content": ...}`. The server
//! answers with [`Frame`]s: a length-prefixed, space-padded JSON header
//! followed by an optional little-endian `f32` payload aligned to 8 bytes.

mod frame;
mod messages;

pub use frame::{Frame, FrameError, Opcode, padded_header_len};
pub use messages::{
    Envelope, ErrorContent, INFORMATION, Inbound, MessageError, Outbound,
    REQUEST_FILE_SPECTROGRAM, SpectrogramContent, SpectrogramRequest, VectorSeries,
};
