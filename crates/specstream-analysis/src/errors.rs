//! Error types for spectrogram analysis.

use thiserror::Error;

/// Errors raised while deriving parameters or computing a spectrogram.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The requested time window selects no samples.
    #[error("invalid time window {start_time}..{end_time}: {reason}")]
    InvalidWindow {
        /// Requested window start in seconds.
        start_time: f64,
        /// Requested window end in seconds.
        end_time: f64,
        /// Why the window was rejected.
        reason: &'static str,
    },
    /// The sample buffer does not match the derived window.
    #[error("expected {expected} samples for the analysis window, got {actual}")]
    SampleCount {
        /// Samples selected by the window.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },
}

impl AnalysisError {
    pub(crate) const fn invalid_window(start_time: f64, end_time: f64, reason: &'static str) -> Self {
        Self::InvalidWindow {
            start_time,
            end_time,
            reason,
        }
    }

    /// Returns a stable snake_case label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidWindow { .. } => "invalid_window",
            Self::SampleCount { .. } => "sample_count",
        }
    }
}
