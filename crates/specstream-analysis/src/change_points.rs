//! Mean-shift detection over per-block spectral energy.

use crate::matrix::SpectrogramMatrix;

/// Result of change-point detection over a spectrogram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangePointData {
    /// Block indices at which a mean shift starts, ascending.
    pub change_points: Vec<f32>,
    /// Sum of each block's spectrum, one value per block.
    pub summed_signal: Vec<f32>,
}

/// Binary-segmentation CUSUM detector.
///
/// A segment is split at the point of maximum absolute cumulative deviation
/// from its mean when that deviation, normalised by `std * sqrt(n)`, exceeds
/// `threshold`. Both halves are then searched recursively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CusumDetector {
    threshold: f64,
    min_segment: usize,
}

impl Default for CusumDetector {
    /// 5% critical value of the supremum of a Brownian bridge.
    fn default() -> Self {
        Self {
            threshold: 1.358,
            min_segment: 2,
        }
    }
}

impl CusumDetector {
    /// Creates a detector; `min_segment` is raised to at least one.
    #[must_use]
    pub fn new(threshold: f64, min_segment: usize) -> Self {
        Self {
            threshold,
            min_segment: min_segment.max(1),
        }
    }

    /// Sums each block of `matrix` and locates mean shifts in the result.
    #[must_use]
    pub fn detect(&self, matrix: &SpectrogramMatrix) -> ChangePointData {
        let summed: Vec<f64> = matrix
            .blocks()
            .map(|block| block.iter().copied().map(f64::from).sum())
            .collect();
        let mut points = Vec::new();
        self.split(&summed, 0, &mut points);
        points.sort_unstable();
        ChangePointData {
            change_points: points.into_iter().map(|point| point as f32).collect(),
            summed_signal: summed.into_iter().map(|value| value as f32).collect(),
        }
    }

    fn split(&self, signal: &[f64], base: usize, points: &mut Vec<usize>) {
        let len = signal.len();
        if len < 2 * self.min_segment {
            return;
        }
        let n = len as f64;
        let mean = signal.iter().sum::<f64>() / n;
        let variance = signal.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let deviation = variance.sqrt();
        if deviation <= f64::EPSILON * mean.abs().max(1.0) {
            return;
        }

        let mut cumulative = 0.0;
        let mut best = (0, 0.0_f64);
        for (index, value) in signal.iter().enumerate().take(len - self.min_segment) {
            cumulative += value - mean;
            let split = index + 1;
            if split >= self.min_segment && cumulative.abs() > best.1 {
                best = (split, cumulative.abs());
            }
        }
        let (split, peak) = best;
        if split == 0 || peak / (deviation * n.sqrt()) <= self.threshold {
            return;
        }
        points.push(base + split);
        let (left, right) = signal.split_at(split);
        self.split(left, base, points);
        self.split(right, base + split, points);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn matrix(blocks: &[f32]) -> SpectrogramMatrix {
        SpectrogramMatrix::from_values(blocks.len(), 1, blocks.to_vec()).expect("shape")
    }

    #[test]
    fn summed_signal_has_one_value_per_block() {
        let matrix = SpectrogramMatrix::from_values(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("shape");
        let data = CusumDetector::default().detect(&matrix);
        assert_eq!(data.summed_signal, vec![3.0, 7.0]);
    }

    #[test]
    fn single_step_is_located() {
        let mut blocks = vec![0.0_f32; 10];
        blocks.extend([10.0_f32; 10]);
        let data = CusumDetector::default().detect(&matrix(&blocks));
        assert_eq!(data.change_points, vec![10.0]);
    }

    #[test]
    fn two_steps_are_reported_in_order() {
        let mut blocks = vec![0.0_f32; 12];
        blocks.extend([20.0_f32; 12]);
        blocks.extend([-5.0_f32; 12]);
        let data = CusumDetector::default().detect(&matrix(&blocks));
        assert_eq!(data.change_points, vec![12.0, 24.0]);
    }

    #[rstest]
    #[case::constant(vec![4.0; 16])]
    #[case::too_short(vec![1.0, 9.0])]
    #[case::empty(Vec::new())]
    fn flat_or_short_signals_have_no_change_points(#[case] blocks: Vec<f32>) {
        let data = CusumDetector::default().detect(&matrix(&blocks));
        assert!(data.change_points.is_empty());
        assert_eq!(data.summed_signal.len(), blocks.len());
    }
}
