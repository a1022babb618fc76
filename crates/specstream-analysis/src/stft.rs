//! Hann-windowed short-time Fourier transform.

use std::f32::consts::PI;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::change_points::{ChangePointData, CusumDetector};
use crate::errors::AnalysisError;
use crate::matrix::SpectrogramMatrix;
use crate::params::SpecParams;
use crate::SpectrogramAnalyzer;

/// Added to the power before taking the logarithm so silent blocks stay finite.
const POWER_FLOOR: f32 = 1e-10;

/// Default analyzer: log-power STFT spectrogram and CUSUM change points.
#[derive(Debug, Clone, Copy, Default)]
pub struct StftAnalyzer {
    detector: CusumDetector,
}

impl StftAnalyzer {
    /// Creates an analyzer using `detector` for change points.
    #[must_use]
    pub const fn new(detector: CusumDetector) -> Self {
        Self { detector }
    }
}

impl SpectrogramAnalyzer for StftAnalyzer {
    fn spectrogram(
        &self,
        params: &SpecParams,
        samples: &[f32],
    ) -> Result<SpectrogramMatrix, AnalysisError> {
        if samples.len() != params.window_len() {
            return Err(AnalysisError::SampleCount {
                expected: params.window_len(),
                actual: samples.len(),
            });
        }
        let fft_size = params.fft_size();
        let freq_count = params.freq_count();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let window = hann_window(fft_size);

        let mut values = Vec::with_capacity(params.block_count() * freq_count);
        let mut buffer = vec![Complex::new(0.0, 0.0); fft_size];
        for block in 0..params.block_count() {
            let start = block * params.hop_size();
            let segment = samples.get(start..).unwrap_or_default();
            buffer.fill(Complex::new(0.0, 0.0));
            for ((slot, sample), weight) in buffer.iter_mut().zip(segment).zip(&window) {
                *slot = Complex::new(sample * weight, 0.0);
            }
            fft.process(&mut buffer);
            values.extend(
                buffer
                    .iter()
                    .take(freq_count)
                    .map(|bin| 10.0 * (bin.norm_sqr() + POWER_FLOOR).log10()),
            );
        }
        Ok(SpectrogramMatrix::from_blocks(
            params.block_count(),
            freq_count,
            values,
        ))
    }

    fn change_points(&self, matrix: &SpectrogramMatrix) -> ChangePointData {
        self.detector.detect(matrix)
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    let denominator = size.saturating_sub(1).max(1) as f32;
    (0..size)
        .map(|index| 0.5 * (1.0 - (2.0 * PI * index as f32 / denominator).cos()))
        .collect()
}
