//! Binary frame codec.
//!
//! A frame is laid out as:
//!
//! ```text
//! [u32 LE header length][JSON header, space padded][f32 LE payload]
//! ```
//!
//! The header is padded with ASCII spaces so the payload starts at an 8-byte
//! aligned offset. The pad is `8 - ((len + 4) % 8)` bytes, between one and
//! eight, and is applied to header-only frames too.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const LENGTH_PREFIX: usize = 4;
const ALIGNMENT: usize = 8;
const VALUE_LEN: usize = 4;

/// Transport-level message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Header-only frame.
    Text,
    /// Frame carrying a payload.
    Binary,
}

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The buffer ends before the declared header does.
    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required by the length prefix and header.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// The header is not a JSON value.
    #[error("frame header is not valid JSON: {0}")]
    InvalidHeader(#[source] serde_json::Error),
    /// The padded header does not fit the 32-bit length prefix.
    #[error("frame header of {0} bytes exceeds the length prefix")]
    HeaderTooLarge(usize),
    /// The payload is not a whole number of `f32` values.
    #[error("payload of {0} bytes is not a multiple of 4")]
    MisalignedPayload(usize),
}

/// Header length after alignment padding.
///
/// ```text
/// padded_header_len(60) == 68
/// ```
#[must_use]
pub const fn padded_header_len(len: usize) -> usize {
    len + (ALIGNMENT - (len + LENGTH_PREFIX) % ALIGNMENT)
}

/// One protocol message: a JSON header with an optional `f32` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    header: Value,
    payload: Option<Vec<f32>>,
}

impl Frame {
    /// Builds a header-only frame.
    pub fn header_only(header: &impl Serialize) -> Result<Self, FrameError> {
        Ok(Self {
            header: serde_json::to_value(header).map_err(FrameError::InvalidHeader)?,
            payload: None,
        })
    }

    /// Builds a frame carrying `payload` after the header.
    pub fn with_payload(header: &impl Serialize, payload: Vec<f32>) -> Result<Self, FrameError> {
        Ok(Self {
            header: serde_json::to_value(header).map_err(FrameError::InvalidHeader)?,
            payload: Some(payload),
        })
    }

    /// Decoded JSON header.
    #[must_use]
    pub const fn header(&self) -> &Value {
        &self.header
    }

    /// Payload values, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&[f32]> {
        self.payload.as_deref()
    }

    /// Text for header-only frames, binary otherwise.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self.payload {
            Some(_) => Opcode::Binary,
            None => Opcode::Text,
        }
    }

    /// Serialises the frame to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let json = serde_json::to_vec(&self.header).map_err(FrameError::InvalidHeader)?;
        let padded = padded_header_len(json.len());
        let prefix = u32::try_from(padded).map_err(|_| FrameError::HeaderTooLarge(padded))?;
        let payload = self.payload.as_deref().unwrap_or_default();

        let mut bytes = Vec::with_capacity(LENGTH_PREFIX + padded + payload.len() * VALUE_LEN);
        bytes.extend_from_slice(&prefix.to_le_bytes());
        bytes.extend_from_slice(&json);
        bytes.resize(LENGTH_PREFIX + padded, b' ');
        for value in payload {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        Ok(bytes)
    }

    /// Parses a frame, tolerating trailing header padding.
    ///
    /// An empty payload segment decodes as a header-only frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (prefix, rest) = bytes
            .split_first_chunk::<LENGTH_PREFIX>()
            .ok_or(FrameError::Truncated {
                needed: LENGTH_PREFIX,
                available: bytes.len(),
            })?;
        let header_len = u32::from_le_bytes(*prefix) as usize;
        if rest.len() < header_len {
            return Err(FrameError::Truncated {
                needed: LENGTH_PREFIX + header_len,
                available: bytes.len(),
            });
        }
        let (header, body) = rest.split_at(header_len);
        let header = serde_json::from_slice(header).map_err(FrameError::InvalidHeader)?;
        if body.len() % VALUE_LEN != 0 {
            return Err(FrameError::MisalignedPayload(body.len()));
        }
        let payload = (!body.is_empty()).then(|| {
            body.chunks_exact(VALUE_LEN)
                .map(|chunk| {
                    let mut raw = [0_u8; VALUE_LEN];
                    raw.copy_from_slice(chunk);
                    f32::from_le_bytes(raw)
                })
                .collect()
        });
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(0, 4)]
    #[case(1, 3)]
    #[case(3, 1)]
    #[case(4, 8)]
    #[case(7, 5)]
    #[case(8, 4)]
    #[case(60, 8)]
    #[case(61, 7)]
    fn padding_is_between_one_and_eight(#[case] len: usize, #[case] pad: usize) {
        let padded = padded_header_len(len);
        assert_eq!(padded - len, pad);
        assert_eq!((padded + LENGTH_PREFIX) % ALIGNMENT, 0);
    }

    #[test]
    fn sixty_byte_header_occupies_sixty_eight_bytes() {
        assert_eq!(padded_header_len(60), 68);
    }

    #[test]
    fn header_only_frame_is_text_and_aligned() {
        let frame = Frame::header_only(&json!({"action": "new"})).expect("frame");
        assert_eq!(frame.opcode(), Opcode::Text);
        let bytes = frame.encode().expect("encode");
        assert_eq!(bytes.len() % ALIGNMENT, 0);
        let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(declared + LENGTH_PREFIX, bytes.len());
        assert!(bytes[4..].starts_with(br#"{"action":"new"}"#));
        assert_eq!(bytes.last(), Some(&b' '));
    }

    #[test]
    fn payload_starts_on_an_aligned_offset() {
        let frame =
            Frame::with_payload(&json!({"action": "update"}), vec![1.5, -2.0]).expect("frame");
        assert_eq!(frame.opcode(), Opcode::Binary);
        let bytes = frame.encode().expect("encode");
        let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let payload_start = LENGTH_PREFIX + declared;
        assert_eq!(payload_start % ALIGNMENT, 0);
        assert_eq!(&bytes[payload_start..payload_start + 4], &1.5_f32.to_le_bytes());
        assert_eq!(bytes.len(), payload_start + 8);

        let decoded = Frame::decode(&bytes).expect("decode");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn truncated_frames_are_rejected() {
        assert!(matches!(
            Frame::decode(&[1, 0]),
            Err(FrameError::Truncated { needed: 4, .. })
        ));
        assert!(matches!(
            Frame::decode(&[16, 0, 0, 0, b'{']),
            Err(FrameError::Truncated { needed: 20, .. })
        ));
    }

    #[test]
    fn misaligned_payloads_are_rejected() {
        let mut bytes = Frame::header_only(&json!({}))
            .expect("frame")
            .encode()
            .expect("encode");
        bytes.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(
            Frame::decode(&bytes),
            Err(FrameError::MisalignedPayload(3))
        ));
    }

    #[test]
    fn non_json_headers_are_rejected() {
        let bytes = [4, 0, 0, 0, b'n', b'o', b'p', b'e'];
        assert!(matches!(
            Frame::decode(&bytes),
            Err(FrameError::InvalidHeader(_))
        ));
    }
}
