//! On-disk layout of array files.
//!
//! ```text
//! offset  size  field
//!      0     8  magic            b"SSARRAY\0"
//!      8     4  format version   u32 little-endian
//!     12     8  attribute name   b"metadata"
//!     20    16  attribute block  4 x u32 big-endian (fs, samples, rows, cols)
//!     36    28  zero padding
//!     64     -  body             rows x cols f32 little-endian, row-major
//! ```

use crate::errors::StoreError;
use crate::metadata::ArrayMetadata;

/// File name suffix for array files.
pub const ARRAY_EXTENSION: &str = ".ssa";

pub(crate) const HEADER_LEN: usize = 64;
pub(crate) const VALUE_LEN: usize = 4;

const MAGIC: &[u8; 8] = b"SSARRAY\0";
const FORMAT_VERSION: u32 = 1;
const ATTRIBUTE_NAME: &[u8; 8] = b"metadata";

const VERSION_OFFSET: usize = 8;
const ATTRIBUTE_NAME_OFFSET: usize = 12;
const ATTRIBUTE_OFFSET: usize = 20;

/// Maps a recording identifier to its array file name.
///
/// The mapping is pure: the same identifier always yields
/// `<identifier>.ssa`, across processes and restarts.
pub fn array_file_name(id: &str) -> Result<String, StoreError> {
    validate_identifier(id)?;
    Ok(format!("{id}{ARRAY_EXTENSION}"))
}

fn validate_identifier(id: &str) -> Result<(), StoreError> {
    let reason = if id.is_empty() {
        Some("identifier is empty")
    } else if id == "." || id == ".." {
        Some("identifier refers to a directory")
    } else if id.contains(['/', '\\']) {
        Some("identifier contains a path separator")
    } else if id.contains('\0') {
        Some("identifier contains a NUL byte")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidIdentifier {
            id: id.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Encodes the fixed-size file header.
pub(crate) fn encode_header(metadata: &ArrayMetadata) -> [u8; HEADER_LEN] {
    let mut header = [0_u8; HEADER_LEN];
    header[..VERSION_OFFSET].copy_from_slice(MAGIC);
    header[VERSION_OFFSET..ATTRIBUTE_NAME_OFFSET].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    header[ATTRIBUTE_NAME_OFFSET..ATTRIBUTE_OFFSET].copy_from_slice(ATTRIBUTE_NAME);
    header[ATTRIBUTE_OFFSET..ATTRIBUTE_OFFSET + ArrayMetadata::ATTRIBUTE_LEN]
        .copy_from_slice(&metadata.to_attribute_block());
    header
}

/// Header decoding failures, reported as [`StoreError::Corrupt`] by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HeaderError {
    Short(usize),
    Magic,
    Version(u32),
    AttributeName,
}

impl HeaderError {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Short(len) => format!("file holds {len} bytes, shorter than the {HEADER_LEN}-byte header"),
            Self::Magic => "bad magic bytes".to_owned(),
            Self::Version(version) => format!("unsupported format version {version}"),
            Self::AttributeName => "metadata attribute missing".to_owned(),
        }
    }
}

/// Decodes the metadata attribute from the start of an array file.
pub(crate) fn decode_header(bytes: &[u8]) -> Result<ArrayMetadata, HeaderError> {
    let header = bytes
        .get(..HEADER_LEN)
        .ok_or(HeaderError::Short(bytes.len()))?;
    if &header[..VERSION_OFFSET] != MAGIC {
        return Err(HeaderError::Magic);
    }
    let mut version = [0_u8; 4];
    version.copy_from_slice(&header[VERSION_OFFSET..ATTRIBUTE_NAME_OFFSET]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(HeaderError::Version(version));
    }
    if &header[ATTRIBUTE_NAME_OFFSET..ATTRIBUTE_OFFSET] != ATTRIBUTE_NAME {
        return Err(HeaderError::AttributeName);
    }
    let mut block = [0_u8; ArrayMetadata::ATTRIBUTE_LEN];
    block.copy_from_slice(&header[ATTRIBUTE_OFFSET..ATTRIBUTE_OFFSET + ArrayMetadata::ATTRIBUTE_LEN]);
    Ok(ArrayMetadata::from_attribute_block(&block))
}

/// Total file length for an array described by `metadata`.
pub(crate) fn file_len(metadata: &ArrayMetadata) -> Option<u64> {
    let body = metadata.element_count()?.checked_mul(VALUE_LEN)?;
    let total = body.checked_add(HEADER_LEN)?;
    u64::try_from(total).ok()
}

/// Byte offset of element (`row`, `column`) from the start of the file.
pub(crate) fn element_offset(metadata: &ArrayMetadata, row: usize, column: usize) -> usize {
    HEADER_LEN + (row * metadata.columns() + column) * VALUE_LEN
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn file_names_use_the_fixed_extension() {
        assert_eq!(array_file_name("007").expect("valid"), "007.ssa");
    }

    #[rstest]
    #[case::empty("")]
    #[case::parent("..")]
    #[case::nested("a/b")]
    #[case::windows("a\\b")]
    fn unsafe_identifiers_are_rejected(#[case] id: &str) {
        assert!(matches!(
            array_file_name(id),
            Err(StoreError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn header_round_trips_metadata() {
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        let header = encode_header(&metadata);
        assert_eq!(&header[..8], b"SSARRAY\0");
        assert_eq!(decode_header(&header), Ok(metadata));
    }

    #[test]
    fn corrupt_headers_are_detected() {
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        let mut header = encode_header(&metadata);
        assert_eq!(decode_header(&header[..10]), Err(HeaderError::Short(10)));
        header[0] = b'X';
        assert_eq!(decode_header(&header), Err(HeaderError::Magic));
    }

    #[test]
    fn element_offsets_are_row_major() {
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        assert_eq!(element_offset(&metadata, 0, 0), HEADER_LEN);
        assert_eq!(element_offset(&metadata, 1, 2), HEADER_LEN + 6 * VALUE_LEN);
        assert_eq!(file_len(&metadata), Some(64 + 4096 * 4));
    }
}
