//! Power spectrum computation
//!
//! Reduces one windowed frame to a power spectrum of length N/2+1 via an
//! in-place FFT: `|X[k]|^2 = re[k]^2 + im[k]^2`. Deterministic, no
//! randomness; the fixed power-of-two frame size keeps the transform
//! numerically stable across the whole pipeline.

use crate::error::VoiceError;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Planned FFT for a fixed frame size
///
/// Plan once per pipeline, reuse across all frames of all utterances. The
/// planned transform is immutable and cheap to share.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    frame_size: usize,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for the given frame size
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` if `frame_size` is not a power of two.
    pub fn new(frame_size: usize) -> Result<Self, VoiceError> {
        if frame_size == 0 || !frame_size.is_power_of_two() {
            return Err(VoiceError::InvalidInput(format!(
                "FFT frame size must be a power of two, got {}",
                frame_size
            )));
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        Ok(Self { fft, frame_size })
    }

    /// Frame size this analyzer was planned for
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Compute the power spectrum of one windowed frame
    ///
    /// # Arguments
    ///
    /// * `frame` - Windowed samples, length must equal the planned frame size
    ///
    /// # Returns
    ///
    /// Power spectrum of length `frame_size / 2 + 1`
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` on a frame length mismatch.
    pub fn power_spectrum(&self, frame: &[f32]) -> Result<Vec<f32>, VoiceError> {
        if frame.len() != self.frame_size {
            return Err(VoiceError::InvalidInput(format!(
                "Frame length {} does not match FFT size {}",
                frame.len(),
                self.frame_size
            )));
        }

        let mut buf: Vec<Complex<f32>> =
            frame.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.fft.process(&mut buf);

        let num_bins = self.frame_size / 2 + 1;
        Ok(buf[..num_bins]
            .iter()
            .map(|c| c.re * c.re + c.im * c.im)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_peak_lands_in_expected_bin() {
        let frame_size = 512;
        let sample_rate = 16_000.0f32;
        let freq = 1000.0f32;
        let frame: Vec<f32> = (0..frame_size)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let analyzer = SpectrumAnalyzer::new(frame_size).unwrap();
        let power = analyzer.power_spectrum(&frame).unwrap();
        assert_eq!(power.len(), frame_size / 2 + 1);

        let peak_bin = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let expected = (freq * frame_size as f32 / sample_rate).round() as usize;
        assert!(
            (peak_bin as i32 - expected as i32).abs() <= 1,
            "Peak bin {} should be near {}",
            peak_bin,
            expected
        );
    }

    #[test]
    fn test_zero_frame_gives_zero_spectrum() {
        let analyzer = SpectrumAnalyzer::new(512).unwrap();
        let power = analyzer.power_spectrum(&vec![0.0; 512]).unwrap();
        assert!(power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        assert!(SpectrumAnalyzer::new(500).is_err());
        assert!(SpectrumAnalyzer::new(0).is_err());
    }

    #[test]
    fn test_wrong_frame_length_rejected() {
        let analyzer = SpectrumAnalyzer::new(512).unwrap();
        assert!(analyzer.power_spectrum(&vec![0.0; 256]).is_err());
    }
}
