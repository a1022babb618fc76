//! Spectrogram and change-point analysis for recorded channels.
//!
//! [`SpecParams`] fixes the sample window and block layout for one request.
//! The [`SpectrogramAnalyzer`] trait is the boundary the server computes
//! through; [`StftAnalyzer`] implements it with a Hann-windowed log-power STFT
//! and a binary-segmentation CUSUM detector over per-block spectral energy.

mod change_points;
mod errors;
mod matrix;
mod params;
mod stft;

pub use change_points::{ChangePointData, CusumDetector};
pub use errors::AnalysisError;
pub use matrix::SpectrogramMatrix;
pub use params::SpecParams;
pub use stft::StftAnalyzer;

/// Tracing target for analysis events.
pub(crate) const ANALYSIS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::analysis");

/// Computes spectrograms and change points for one channel window.
pub trait SpectrogramAnalyzer: Send + Sync {
    /// Computes the `block_count × freq_count` spectrogram of `samples`, which
    /// must hold exactly the rows selected by `params`.
    fn spectrogram(
        &self,
        params: &SpecParams,
        samples: &[f32],
    ) -> Result<SpectrogramMatrix, AnalysisError>;

    /// Sums each block of `matrix` and locates the blocks where its mean shifts.
    fn change_points(&self, matrix: &SpectrogramMatrix) -> ChangePointData;
}
