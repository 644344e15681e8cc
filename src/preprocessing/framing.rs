//! Framing and windowing
//!
//! Slices a mono buffer into overlapping analysis frames, applies a Hamming
//! taper, and drops frames whose RMS energy sits below the silence floor.
//! Offsets where a full frame does not fit are dropped rather than zero-padded.

use crate::config::PipelineConfig;
use crate::error::VoiceError;

/// One windowed analysis frame together with its pre-window RMS energy
#[derive(Debug, Clone)]
pub struct Frame {
    /// Hamming-windowed samples, length equals the configured frame size
    pub samples: Vec<f32>,

    /// RMS energy of the frame before windowing
    pub rms: f32,
}

/// Compute a Hamming window of the given length
///
/// `w[i] = 0.54 - 0.46 * cos(2 * pi * i / (N - 1))`
pub fn hamming_window(len: usize) -> Vec<f32> {
    if len == 0 {
        return Vec::new();
    }
    let denom = (len - 1).max(1) as f32;
    (0..len)
        .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
        .collect()
}

/// Root-mean-square energy of a sample slice
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Slice audio into windowed frames, discarding silent ones
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `config` - Pipeline configuration (frame size, hop size, silence floor)
///
/// # Returns
///
/// Frames that survived the silence gate, in signal order. An empty vector is
/// not an error: it is how an entirely silent buffer presents itself to the
/// aggregator.
///
/// # Errors
///
/// Returns `VoiceError::InvalidInput` for an empty buffer.
pub fn windowed_frames(samples: &[f32], config: &PipelineConfig) -> Result<Vec<Frame>, VoiceError> {
    if samples.is_empty() {
        return Err(VoiceError::InvalidInput("Empty audio buffer".to_string()));
    }

    let frame_size = config.frame_size;
    let hop_size = config.hop_size;
    let window = hamming_window(frame_size);

    let mut frames = Vec::new();
    let mut dropped = 0usize;
    let mut pos = 0usize;
    while pos + frame_size <= samples.len() {
        let chunk = &samples[pos..pos + frame_size];
        let energy = rms(chunk);
        if energy >= config.silence_rms_floor {
            let windowed: Vec<f32> = chunk.iter().zip(window.iter()).map(|(&s, &w)| s * w).collect();
            frames.push(Frame {
                samples: windowed,
                rms: energy,
            });
        } else {
            dropped += 1;
        }
        pos += hop_size;
    }

    log::debug!(
        "Framed {} samples into {} frames ({} dropped as silence)",
        samples.len(),
        frames.len(),
        dropped
    );

    Ok(frames)
}

/// Zero-crossing rate of a signal: fraction of adjacent sample pairs that
/// change sign, in [0, 1]
///
/// The aggregator calls this once over the whole un-framed signal; the MFCC
/// extractor also uses it per frame.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16_000.0).sin())
            .collect()
    }

    #[test]
    fn test_hamming_window_endpoints() {
        let w = hamming_window(512);
        assert_eq!(w.len(), 512);
        // Endpoints of a Hamming window are 0.54 - 0.46 = 0.08
        assert!((w[0] - 0.08).abs() < 1e-5);
        assert!((w[511] - 0.08).abs() < 1e-5);
        // Center is close to 1.0
        assert!(w[256] > 0.99);
    }

    #[test]
    fn test_frame_count_and_overlap() {
        let config = PipelineConfig::default();
        let samples = loud_signal(2048);
        let frames = windowed_frames(&samples, &config).unwrap();
        // Offsets 0, 256, 512, ..., 1536 fit a 512 frame; 1792 does not
        assert_eq!(frames.len(), 7);
        assert!(frames.iter().all(|f| f.samples.len() == 512));
    }

    #[test]
    fn test_silent_frames_dropped() {
        let config = PipelineConfig::default();
        let mut samples = vec![0.0f32; 1024];
        samples.extend(loud_signal(1024));
        let frames = windowed_frames(&samples, &config).unwrap();
        let all = 2048 / 256 - 1; // full-frame offsets
        assert!(frames.len() < all, "Silent prefix frames should be dropped");
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.rms >= config.silence_rms_floor));
    }

    #[test]
    fn test_all_silence_yields_no_frames() {
        let config = PipelineConfig::default();
        let frames = windowed_frames(&vec![0.001f32; 4096], &config).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let config = PipelineConfig::default();
        assert!(windowed_frames(&[], &config).is_err());
    }

    #[test]
    fn test_zero_crossing_rate_alternating() {
        // Alternating signal crosses at every pair
        let samples: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert!((zero_crossing_rate(&samples) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_crossing_rate_constant() {
        assert_eq!(zero_crossing_rate(&[0.3f32; 100]), 0.0);
    }
}
