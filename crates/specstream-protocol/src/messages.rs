//! Typed inbound requests and outbound frame headers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use specstream_storage::{Channel, UnknownChannel};
use thiserror::Error;

use crate::frame::{Frame, FrameError};

/// Inbound message type requesting a spectrogram of a stored recording.
pub const REQUEST_FILE_SPECTROGRAM: &str = "request_file_spectrogram";
/// Inbound message type carrying free-form client information.
pub const INFORMATION: &str = "information";

/// Errors raised while decoding inbound messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The message is not a JSON envelope or its content has the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The requested channel lies outside the channel enumeration.
    #[error(transparent)]
    UnknownChannel(#[from] UnknownChannel),
}

impl MessageError {
    /// Returns a stable snake_case label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_message",
            Self::UnknownChannel(_) => "invalid_channel",
        }
    }
}

/// Inbound envelope: `{"type": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific content.
    #[serde(default)]
    pub content: Value,
}

impl Envelope {
    /// Parses an envelope from message bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Spectrogram request.
    Spectrogram(SpectrogramRequest),
    /// Free-form information to log.
    Information(Value),
    /// Any other message type.
    Unknown {
        /// Message type as sent.
        kind: String,
        /// Content as sent.
        content: Value,
    },
}

impl Inbound {
    /// Decodes message bytes into a typed message.
    ///
    /// Unknown types are returned rather than rejected; malformed envelopes,
    /// ill-typed request content, and out-of-range channels are errors.
    pub fn parse(bytes: &[u8]) -> Result<Self, MessageError> {
        let Envelope { kind, content } = Envelope::parse(bytes)?;
        match kind.as_str() {
            REQUEST_FILE_SPECTROGRAM => SpectrogramRequest::from_content(content).map(Self::Spectrogram),
            INFORMATION => Ok(Self::Information(content)),
            _ => Ok(Self::Unknown { kind, content }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpectrogramRequest {
    mrn: String,
    start_time: f64,
    end_time: f64,
    channel: i64,
}

/// Request for the spectrogram of one channel over a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramRequest {
    /// Recording identifier.
    pub mrn: String,
    /// Window start in seconds.
    pub start_time: f64,
    /// Window end in seconds.
    pub end_time: f64,
    /// Channel to analyse.
    pub channel: Channel,
}

impl SpectrogramRequest {
    fn from_content(content: Value) -> Result<Self, MessageError> {
        let raw: RawSpectrogramRequest = serde_json::from_value(content)?;
        Ok(Self {
            mrn: raw.mrn,
            start_time: raw.start_time,
            end_time: raw.end_time,
            channel: Channel::try_from(raw.channel)?,
        })
    }
}

/// Which vector a `change_points` frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSeries {
    /// Block indices of detected change points.
    ChangePoints,
    /// Per-block spectral energy.
    SummedSignal,
}

/// Content of a `spectrogram` envelope, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SpectrogramContent {
    /// Announces the shape of an upcoming spectrogram.
    New {
        /// Number of time blocks.
        nblocks: usize,
        /// Number of frequency bins.
        nfreqs: usize,
        /// Sample rate in Hz.
        fs: u32,
        /// Window start in seconds.
        #[serde(rename = "startTime")]
        start_time: f64,
        /// Window end in seconds.
        #[serde(rename = "endTime")]
        end_time: f64,
        /// Canvas identifier of the channel.
        #[serde(rename = "canvasId")]
        canvas_id: &'static str,
    },
    /// Carries the spectrogram matrix as payload.
    Update {
        /// Number of time blocks.
        nblocks: usize,
        /// Number of frequency bins.
        nfreqs: usize,
        /// Canvas identifier of the channel.
        #[serde(rename = "canvasId")]
        canvas_id: &'static str,
    },
    /// Carries a change-point vector as payload.
    ChangePoints {
        /// Which vector the payload holds.
        #[serde(rename = "type")]
        series: VectorSeries,
        /// Canvas identifier of the channel.
        #[serde(rename = "canvasId")]
        canvas_id: &'static str,
    },
}

/// Content of an `error` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContent {
    action: &'static str,
    /// Stable error kind label.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorContent {
    /// Creates error content with `action` set to `"error"`.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: "error",
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Outbound envelope: `{"type": "spectrogram" | "error", "content": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Outbound {
    /// Spectrogram progress.
    Spectrogram(SpectrogramContent),
    /// Request failure.
    Error(ErrorContent),
}

impl Outbound {
    /// Header announcing a spectrogram's shape and window.
    #[must_use]
    pub const fn new_spectrogram(
        channel: Channel,
        nblocks: usize,
        nfreqs: usize,
        fs: u32,
        start_time: f64,
        end_time: f64,
    ) -> Self {
        Self::Spectrogram(SpectrogramContent::New {
            nblocks,
            nfreqs,
            fs,
            start_time,
            end_time,
            canvas_id: channel.canvas_id(),
        })
    }

    /// Header for the frame carrying the spectrogram matrix.
    #[must_use]
    pub const fn update(channel: Channel, nblocks: usize, nfreqs: usize) -> Self {
        Self::Spectrogram(SpectrogramContent::Update {
            nblocks,
            nfreqs,
            canvas_id: channel.canvas_id(),
        })
    }

    /// Header for a change-point vector frame.
    #[must_use]
    pub const fn vector(channel: Channel, series: VectorSeries) -> Self {
        Self::Spectrogram(SpectrogramContent::ChangePoints {
            series,
            canvas_id: channel.canvas_id(),
        })
    }

    /// Header for an error frame.
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorContent::new(kind, message))
    }

    /// Label used when logging sends: the content's action, plus the vector
    /// series for change-point frames.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Spectrogram(SpectrogramContent::New { .. }) => "new",
            Self::Spectrogram(SpectrogramContent::Update { .. }) => "update",
            Self::Spectrogram(SpectrogramContent::ChangePoints {
                series: VectorSeries::ChangePoints,
                ..
            }) => "change_points",
            Self::Spectrogram(SpectrogramContent::ChangePoints {
                series: VectorSeries::SummedSignal,
                ..
            }) => "summed_signal",
            Self::Error(_) => "error",
        }
    }

    /// Builds a header-only frame.
    pub fn into_frame(self) -> Result<Frame, FrameError> {
        Frame::header_only(&self)
    }

    /// Builds a frame carrying `payload`.
    pub fn into_frame_with(self, payload: Vec<f32>) -> Result<Frame, FrameError> {
        Frame::with_payload(&self, payload)
    }
}
