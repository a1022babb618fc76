//! Array metadata and its on-disk attribute block.

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Number of integers in the attribute block.
const ATTRIBUTE_FIELDS: usize = 4;

/// Describes one stored array.
///
/// The row and column counts are fixed when the array is created and never
/// change afterwards; `row_count * column_count` `f32` values make up the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayMetadata {
    /// Samples per second.
    pub sample_rate: u32,
    /// Number of valid samples in the recording.
    pub sample_count: u32,
    /// Number of rows (time samples) in the stored array.
    pub row_count: u32,
    /// Number of columns (channels) in the stored array.
    pub column_count: u32,
}

impl ArrayMetadata {
    /// Size of the encoded attribute block in bytes.
    pub const ATTRIBUTE_LEN: usize = ATTRIBUTE_FIELDS * 4;

    /// Builds metadata from its four fields.
    #[must_use]
    pub const fn new(sample_rate: u32, sample_count: u32, row_count: u32, column_count: u32) -> Self {
        Self {
            sample_rate,
            sample_count,
            row_count,
            column_count,
        }
    }

    /// Number of rows as an index type.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.row_count as usize
    }

    /// Number of columns as an index type.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.column_count as usize
    }

    /// Array shape as `[rows, columns]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows(), self.columns()]
    }

    /// Total number of `f32` values in the body, if it fits in `usize`.
    #[must_use]
    pub fn element_count(&self) -> Option<usize> {
        self.rows().checked_mul(self.columns())
    }

    /// Rejects metadata that cannot describe a stored array.
    ///
    /// Values must fit a signed 32-bit integer so the attribute block stays
    /// readable by consumers of the signed on-disk format.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.row_count == 0 || self.column_count == 0 {
            return Err(StoreError::InvalidMetadata {
                message: format!(
                    "array must have at least one row and column (got {}x{})",
                    self.row_count, self.column_count
                ),
            });
        }
        if self.sample_rate == 0 {
            return Err(StoreError::InvalidMetadata {
                message: "sample rate must be positive".to_owned(),
            });
        }
        let limit = i32::MAX.unsigned_abs();
        let fields = [
            ("sample_rate", self.sample_rate),
            ("sample_count", self.sample_count),
            ("row_count", self.row_count),
            ("column_count", self.column_count),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| *value > limit) {
            return Err(StoreError::InvalidMetadata {
                message: format!("{name} {value} exceeds the signed 32-bit range"),
            });
        }
        if self.element_count().is_none() {
            return Err(StoreError::InvalidMetadata {
                message: "array body exceeds the addressable size".to_owned(),
            });
        }
        Ok(())
    }

    /// Encodes the attribute block: four big-endian integers in the order
    /// sample rate, sample count, row count, column count.
    #[must_use]
    pub fn to_attribute_block(&self) -> [u8; Self::ATTRIBUTE_LEN] {
        let mut block = [0_u8; Self::ATTRIBUTE_LEN];
        let fields = [
            self.sample_rate,
            self.sample_count,
            self.row_count,
            self.column_count,
        ];
        for (slot, value) in block.chunks_exact_mut(4).zip(fields) {
            slot.copy_from_slice(&value.to_be_bytes());
        }
        block
    }

    /// Decodes an attribute block produced by [`Self::to_attribute_block`].
    #[must_use]
    pub fn from_attribute_block(block: &[u8; Self::ATTRIBUTE_LEN]) -> Self {
        let mut fields = [0_u32; ATTRIBUTE_FIELDS];
        for (field, chunk) in fields.iter_mut().zip(block.chunks_exact(4)) {
            let mut raw = [0_u8; 4];
            raw.copy_from_slice(chunk);
            *field = u32::from_be_bytes(raw);
        }
        let [sample_rate, sample_count, row_count, column_count] = fields;
        Self::new(sample_rate, sample_count, row_count, column_count)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn attribute_block_is_big_endian_in_field_order() {
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        let block = metadata.to_attribute_block();
        assert_eq!(
            block,
            [0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 4, 0, 0, 0, 0, 4],
            "fields are sample rate, sample count, rows, columns"
        );
        assert_eq!(ArrayMetadata::from_attribute_block(&block), metadata);
    }

    #[rstest]
    #[case::no_rows(ArrayMetadata::new(256, 0, 0, 4))]
    #[case::no_columns(ArrayMetadata::new(256, 10, 10, 0))]
    #[case::no_rate(ArrayMetadata::new(0, 10, 10, 4))]
    #[case::too_wide(ArrayMetadata::new(256, 10, 10, u32::MAX))]
    fn validate_rejects_impossible_arrays(#[case] metadata: ArrayMetadata) {
        assert!(matches!(
            metadata.validate(),
            Err(StoreError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn shape_reports_rows_then_columns() {
        let metadata = ArrayMetadata::new(256, 1024, 1024, 4);
        assert_eq!(metadata.shape(), [1024, 4]);
        assert_eq!(metadata.element_count(), Some(4096));
    }
}
