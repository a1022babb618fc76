//! Spectrogram result matrix.

/// Row-major `block_count × freq_count` matrix of log-power values in dB.
///
/// Row `b` holds the spectrum of block `b`; the layout matches the payload of
/// an `update` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramMatrix {
    block_count: usize,
    freq_count: usize,
    values: Vec<f32>,
}

impl SpectrogramMatrix {
    /// Wraps `values`, returning `None` unless the length matches the shape.
    #[must_use]
    pub fn from_values(block_count: usize, freq_count: usize, values: Vec<f32>) -> Option<Self> {
        let expected = block_count.checked_mul(freq_count)?;
        (values.len() == expected).then_some(Self {
            block_count,
            freq_count,
            values,
        })
    }

    /// Wraps values produced one full block at a time.
    pub(crate) fn from_blocks(block_count: usize, freq_count: usize, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), block_count * freq_count);
        Self {
            block_count,
            freq_count,
            values,
        }
    }

    /// Number of blocks (rows).
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of frequency bins (columns).
    #[must_use]
    pub const fn freq_count(&self) -> usize {
        self.freq_count
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Iterates over block spectra in time order.
    pub fn blocks(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.freq_count.max(1))
    }

    /// Consumes the matrix, returning its row-major values.
    #[must_use]
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}
