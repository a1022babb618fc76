//! Rectangular selections over 2-D arrays.

use std::ops::Range;

use thiserror::Error;

/// Rectangular sub-region of a 2-D array.
///
/// Dimension 0 is the row (time) axis and dimension 1 the column (channel)
/// axis. `stride` and `block` describe subsampling; backends currently accept
/// only unit values, which selects `count` contiguous elements along each
/// dimension starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hyperslab {
    /// First selected index along each dimension.
    pub offset: [usize; 2],
    /// Number of selected elements along each dimension.
    pub count: [usize; 2],
    /// Step between selected blocks along each dimension.
    pub stride: [usize; 2],
    /// Block extent along each dimension.
    pub block: [usize; 2],
}

/// Reasons a selection cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The selection extends past the array along a dimension.
    #[error("selection ends at {end} on dimension {dimension} but the extent is {extent}")]
    OutOfBounds {
        /// Dimension that overflowed (0 = rows, 1 = columns).
        dimension: usize,
        /// Exclusive end of the selection.
        end: usize,
        /// Extent of the stored array.
        extent: usize,
    },
    /// A row range with its end before its start.
    #[error("row range {start}..{end} is reversed")]
    Reversed {
        /// Requested start row.
        start: usize,
        /// Requested end row.
        end: usize,
    },
    /// The caller's buffer does not match the selection size.
    #[error("buffer holds {actual} values but the selection covers {expected}")]
    BufferSize {
        /// Elements covered by the selection.
        expected: usize,
        /// Elements held by the buffer.
        actual: usize,
    },
    /// Non-unit stride or block values were requested.
    #[error("only unit stride and block are supported (stride {stride:?}, block {block:?})")]
    UnitStrideOnly {
        /// Requested stride.
        stride: [usize; 2],
        /// Requested block.
        block: [usize; 2],
    },
}

impl Hyperslab {
    /// Selects `rows` of a single `column`.
    pub fn column(rows: Range<usize>, column: usize) -> Result<Self, SelectionError> {
        Self::columns(rows, column, 1)
    }

    /// Selects `rows` across every column of an array `column_count` wide.
    pub fn all_columns(rows: Range<usize>, column_count: usize) -> Result<Self, SelectionError> {
        Self::columns(rows, 0, column_count)
    }

    fn columns(
        rows: Range<usize>,
        first_column: usize,
        column_count: usize,
    ) -> Result<Self, SelectionError> {
        if rows.end < rows.start {
            return Err(SelectionError::Reversed {
                start: rows.start,
                end: rows.end,
            });
        }
        Ok(Self {
            offset: [rows.start, first_column],
            count: [rows.end - rows.start, column_count],
            stride: [1, 1],
            block: [1, 1],
        })
    }

    /// Number of elements covered by the selection.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.count[0].saturating_mul(self.count[1])
    }

    /// Checks the selection against an array of `shape` (rows, columns).
    pub fn validate(&self, shape: [usize; 2]) -> Result<(), SelectionError> {
        if self.stride != [1, 1] || self.block != [1, 1] {
            return Err(SelectionError::UnitStrideOnly {
                stride: self.stride,
                block: self.block,
            });
        }
        for dimension in 0..2 {
            let end = self.offset[dimension].saturating_add(self.count[dimension]);
            if end > shape[dimension] {
                return Err(SelectionError::OutOfBounds {
                    dimension,
                    end,
                    extent: shape[dimension],
                });
            }
        }
        Ok(())
    }

    /// Checks that a caller buffer of `len` values matches the selection.
    pub fn check_buffer(&self, len: usize) -> Result<(), SelectionError> {
        let expected = self.element_count();
        if expected != len {
            return Err(SelectionError::BufferSize {
                expected,
                actual: len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn column_selection_uses_unit_stride() {
        let slab = Hyperslab::column(10..20, 2).expect("valid selection");
        assert_eq!(slab.offset, [10, 2]);
        assert_eq!(slab.count, [10, 1]);
        assert_eq!(slab.stride, [1, 1]);
        assert_eq!(slab.block, [1, 1]);
        assert_eq!(slab.element_count(), 10);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let range = 20..10;
        let error = Hyperslab::column(range, 0).expect_err("reversed");
        assert_eq!(error, SelectionError::Reversed { start: 20, end: 10 });
    }

    #[rstest]
    #[case::rows_overflow(Hyperslab::column(1000..1025, 0), 0)]
    #[case::column_overflow(Hyperslab::column(0..10, 4), 1)]
    fn out_of_bounds_selections_name_the_dimension(
        #[case] slab: Result<Hyperslab, SelectionError>,
        #[case] expected_dimension: usize,
    ) {
        let slab = slab.expect("constructed");
        let error = slab.validate([1024, 4]).expect_err("out of bounds");
        assert!(matches!(
            error,
            SelectionError::OutOfBounds { dimension, .. } if dimension == expected_dimension
        ));
    }

    #[test]
    fn full_array_selection_is_valid() {
        let slab = Hyperslab::all_columns(0..1024, 4).expect("constructed");
        assert!(slab.validate([1024, 4]).is_ok());
        assert!(slab.check_buffer(4096).is_ok());
    }

    #[test]
    fn non_unit_stride_is_unsupported() {
        let mut slab = Hyperslab::column(0..10, 0).expect("constructed");
        slab.stride = [2, 1];
        assert!(matches!(
            slab.validate([1024, 4]),
            Err(SelectionError::UnitStrideOnly { .. })
        ));
    }

    #[test]
    fn buffer_size_mismatch_is_reported() {
        let slab = Hyperslab::column(0..10, 0).expect("constructed");
        assert_eq!(
            slab.check_buffer(9),
            Err(SelectionError::BufferSize {
                expected: 10,
                actual: 9
            })
        );
    }
}
