//! Per-request analysis parameters.

use std::ops::Range;

use specstream_storage::{ArrayMetadata, Channel};
use tracing::debug;

use crate::ANALYSIS_TARGET;
use crate::errors::AnalysisError;

/// Analysis context derived once per request from the requested window and the
/// recording's metadata.
///
/// The sample window, FFT size, and block layout are fixed at construction;
/// every consumer sees the same values.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecParams {
    recording_id: String,
    channel: Channel,
    start_time: f64,
    end_time: f64,
    sample_rate: u32,
    start_row: usize,
    end_row: usize,
    fft_size: usize,
    hop_size: usize,
    block_count: usize,
    freq_count: usize,
}

impl SpecParams {
    /// Derives the parameters for `channel` of `recording_id` over
    /// `start_time..end_time` seconds.
    ///
    /// Row bounds are `floor(time * sample_rate)` clamped to the stored sample
    /// count. The FFT size is the next power of two at or above one and a half
    /// seconds of samples and blocks overlap by three quarters.
    pub fn derive(
        recording_id: impl Into<String>,
        channel: Channel,
        start_time: f64,
        end_time: f64,
        metadata: &ArrayMetadata,
    ) -> Result<Self, AnalysisError> {
        let invalid = |reason| AnalysisError::invalid_window(start_time, end_time, reason);
        if !start_time.is_finite() || !end_time.is_finite() {
            return Err(invalid("times must be finite"));
        }
        if start_time < 0.0 || end_time < 0.0 {
            return Err(invalid("times must not be negative"));
        }

        let fs = f64::from(metadata.sample_rate);
        let samples = metadata.rows().min(metadata.sample_count as usize);
        let start_row = time_to_row(start_time, fs, samples);
        let end_row = time_to_row(end_time, fs, samples);
        if end_row <= start_row {
            return Err(invalid("window selects no samples"));
        }

        let fft_size = fft_size_for(metadata.sample_rate);
        let hop_size = (fft_size / 4).max(1);
        let window_len = end_row - start_row;
        let block_count = if window_len >= fft_size {
            (window_len - fft_size) / hop_size + 1
        } else {
            1
        };
        let params = Self {
            recording_id: recording_id.into(),
            channel,
            start_time,
            end_time,
            sample_rate: metadata.sample_rate,
            start_row,
            end_row,
            fft_size,
            hop_size,
            block_count,
            freq_count: fft_size / 2 + 1,
        };
        debug!(
            target: ANALYSIS_TARGET,
            id = %params.recording_id,
            channel = %params.channel,
            start_row,
            end_row,
            fft_size,
            hop_size,
            block_count,
            "derived spectrogram parameters"
        );
        Ok(params)
    }

    /// Recording identifier.
    #[must_use]
    pub fn recording_id(&self) -> &str {
        &self.recording_id
    }

    /// Channel under analysis.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Requested window start in seconds.
    #[must_use]
    pub const fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Requested window end in seconds.
    #[must_use]
    pub const fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Sample rate in Hz.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Half-open row range selected by the window.
    #[must_use]
    pub const fn rows(&self) -> Range<usize> {
        self.start_row..self.end_row
    }

    /// Number of samples in the window.
    #[must_use]
    pub const fn window_len(&self) -> usize {
        self.end_row - self.start_row
    }

    /// FFT length per block.
    #[must_use]
    pub const fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Samples between consecutive block starts.
    #[must_use]
    pub const fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of spectrogram blocks (time steps).
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of frequency bins per block.
    #[must_use]
    pub const fn freq_count(&self) -> usize {
        self.freq_count
    }
}

// Float-to-int `as` saturates; inputs are finite and non-negative here.
fn time_to_row(time: f64, fs: f64, samples: usize) -> usize {
    ((time * fs).floor() as usize).min(samples)
}

fn fft_size_for(sample_rate: u32) -> usize {
    let samples = u64::from(sample_rate) * 3;
    let samples = usize::try_from(samples.div_ceil(2)).unwrap_or(usize::MAX);
    samples.checked_next_power_of_two().unwrap_or(samples).max(2)
}
