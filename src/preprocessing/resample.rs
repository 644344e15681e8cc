//! Linear-interpolation resampling
//!
//! The identification pipeline analyzes everything at a single target rate so
//! that Mel filter layouts and pitch lag ranges are comparable across capture
//! devices. Linear interpolation is sufficient here: the features downstream
//! are coarse statistical aggregates, not waveform-accurate reconstructions.

use crate::error::VoiceError;

/// Resample audio to a new rate using linear interpolation
///
/// Resampling to the input's own rate is the identity operation and returns a
/// bit-identical copy of the input.
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `in_rate` - Input sample rate in Hz
/// * `out_rate` - Output sample rate in Hz
///
/// # Errors
///
/// Returns `VoiceError::InvalidInput` if either rate is zero.
pub fn resample_linear(
    samples: &[f32],
    in_rate: u32,
    out_rate: u32,
) -> Result<Vec<f32>, VoiceError> {
    if in_rate == 0 || out_rate == 0 {
        return Err(VoiceError::InvalidInput(format!(
            "Invalid sample rate: {} -> {}",
            in_rate, out_rate
        )));
    }

    if in_rate == out_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = out_rate as f64 / in_rate as f64;
    let out_len = ((samples.len() as f64) * ratio).round() as usize;
    if out_len == 0 {
        return Ok(Vec::new());
    }

    log::debug!(
        "Resampling {} samples: {} Hz -> {} Hz ({} samples out)",
        samples.len(),
        in_rate,
        out_rate,
        out_len
    );

    let last = samples[samples.len() - 1];
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src = (i as f64) / ratio;
        let idx = src.floor() as usize;
        let frac = (src - src.floor()) as f32;

        let s0 = samples.get(idx).copied().unwrap_or(last);
        let s1 = samples.get(idx + 1).copied().unwrap_or(last);
        out.push(s0 + (s1 - s0) * frac);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_bit_identical() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.137).sin()).collect();
        let out = resample_linear(&samples, 16_000, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_downsample_halves_length() {
        let samples = vec![0.5f32; 32_000];
        let out = resample_linear(&samples, 32_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
        // Constant signal stays constant under linear interpolation
        assert!(out.iter().all(|&x| (x - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_upsample_preserves_sine_shape() {
        let sample_rate = 8000;
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        let out = resample_linear(&samples, sample_rate, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
        // Peak amplitude should survive interpolation of a slow sine
        let peak = out.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        assert!(peak > 0.95, "Peak should be preserved, got {:.3}", peak);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(resample_linear(&[0.0; 10], 0, 16_000).is_err());
        assert!(resample_linear(&[0.0; 10], 16_000, 0).is_err());
    }

    #[test]
    fn test_empty_input() {
        let out = resample_linear(&[], 8000, 16_000).unwrap();
        assert!(out.is_empty());
    }
}
