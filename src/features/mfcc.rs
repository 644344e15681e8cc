//! MFCC extraction
//!
//! Projects filtered log-Mel energies through a Type-II Discrete Cosine
//! Transform to yield per-frame cepstral coefficients. The same pass computes
//! pitch, frame energy, spectral centroid, and zero-crossing rate, so one
//! walk over the frames produces everything the aggregator needs.

use crate::config::PipelineConfig;
use crate::error::VoiceError;
use crate::features::mel::MelFilterbank;
use crate::features::pitch::estimate_pitch;
use crate::features::spectrum::SpectrumAnalyzer;
use crate::preprocessing::framing::{zero_crossing_rate, Frame};
use std::sync::Arc;

/// Floor applied before the log to avoid log(0)
const LOG_FLOOR: f32 = 1e-10;

/// Per-frame feature bundle
#[derive(Debug, Clone)]
pub struct FrameFeatures {
    /// Cepstral coefficients, `num_coefficients` long
    pub mfcc: Vec<f32>,

    /// Pitch estimate in Hz; `None` for unvoiced frames
    pub pitch_hz: Option<f32>,

    /// RMS energy of the frame before windowing
    pub energy: f32,

    /// Spectral centroid in Hz
    pub centroid_hz: f32,

    /// Zero-crossing rate of the frame, in [0, 1]
    pub zcr: f32,
}

/// Type-II DCT keeping the first `num_coefficients` terms
///
/// `c[k] = sum_n x[n] * cos(pi * k * (n + 0.5) / N)`
pub fn dct_ii(input: &[f32], num_coefficients: usize) -> Vec<f32> {
    let n = input.len();
    (0..num_coefficients)
        .map(|k| {
            input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f32::consts::PI * k as f32 * (i as f32 + 0.5) / n as f32).cos()
                })
                .sum()
        })
        .collect()
}

/// Spectral centroid of a power spectrum, in Hz
///
/// `centroid = sum(f * P(f)) / sum(P(f))`; zero for an empty spectrum.
pub fn spectral_centroid(power_spectrum: &[f32], sample_rate: u32, fft_size: usize) -> f32 {
    let bin_hz = sample_rate as f32 / fft_size as f32;
    let total: f32 = power_spectrum.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f32 = power_spectrum
        .iter()
        .enumerate()
        .map(|(bin, &p)| bin as f32 * bin_hz * p)
        .sum();
    weighted / total
}

/// Extracts per-frame features for one (configuration, sample rate) pair
pub struct MfccExtractor {
    analyzer: SpectrumAnalyzer,
    filterbank: Arc<MelFilterbank>,
    sample_rate: u32,
    num_coefficients: usize,
    pitch_min_hz: f32,
    pitch_max_hz: f32,
}

impl MfccExtractor {
    /// Create an extractor sharing a cached filterbank
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` if the filterbank was built for a
    /// different FFT size or sample rate than requested here.
    pub fn new(
        config: &PipelineConfig,
        filterbank: Arc<MelFilterbank>,
        sample_rate: u32,
    ) -> Result<Self, VoiceError> {
        if filterbank.fft_size() != config.frame_size || filterbank.sample_rate() != sample_rate {
            return Err(VoiceError::InvalidInput(format!(
                "Filterbank built for fft={}, rate={} Hz; extractor wants fft={}, rate={} Hz",
                filterbank.fft_size(),
                filterbank.sample_rate(),
                config.frame_size,
                sample_rate
            )));
        }
        let analyzer = SpectrumAnalyzer::new(config.frame_size)?;
        Ok(Self {
            analyzer,
            filterbank,
            sample_rate,
            num_coefficients: config.num_coefficients,
            pitch_min_hz: config.pitch_min_hz,
            pitch_max_hz: config.pitch_max_hz,
        })
    }

    /// Extract the feature bundle for one windowed frame
    pub fn extract(&self, frame: &Frame) -> Result<FrameFeatures, VoiceError> {
        let power = self.analyzer.power_spectrum(&frame.samples)?;

        let mel_energies = self.filterbank.apply(&power);
        let log_energies: Vec<f32> = mel_energies
            .iter()
            .map(|&e| e.max(LOG_FLOOR).ln())
            .collect();
        let mfcc = dct_ii(&log_energies, self.num_coefficients);

        let pitch_hz = estimate_pitch(
            &frame.samples,
            self.sample_rate,
            self.pitch_min_hz,
            self.pitch_max_hz,
        );
        let centroid_hz = spectral_centroid(&power, self.sample_rate, self.analyzer.frame_size());
        let zcr = zero_crossing_rate(&frame.samples);

        Ok(FrameFeatures {
            mfcc,
            pitch_hz,
            energy: frame.rms,
            centroid_hz,
            zcr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::mel::FilterbankCache;
    use crate::preprocessing::framing::windowed_frames;

    fn extractor(sample_rate: u32) -> (MfccExtractor, PipelineConfig) {
        let config = PipelineConfig::default();
        let cache = FilterbankCache::new();
        let bank = cache.get(&config, sample_rate).unwrap();
        (
            MfccExtractor::new(&config, bank, sample_rate).unwrap(),
            config,
        )
    }

    fn voiced_signal(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.4 * (2.0 * std::f32::consts::PI * freq * t).sin()
                    + 0.2 * (2.0 * std::f32::consts::PI * 2.0 * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_dct_ii_dc_term() {
        // k=0 term is the plain sum of the input
        let input = vec![1.0f32; 26];
        let coeffs = dct_ii(&input, 13);
        assert_eq!(coeffs.len(), 13);
        assert!((coeffs[0] - 26.0).abs() < 1e-4);
        // Constant input has no higher-order cosine content
        for &c in &coeffs[1..] {
            assert!(c.abs() < 1e-3, "Higher coefficient should vanish: {}", c);
        }
    }

    #[test]
    fn test_spectral_centroid_of_single_bin() {
        let mut power = vec![0.0f32; 257];
        power[32] = 10.0; // 32 * 31.25 Hz = 1000 Hz at 16 kHz / 512
        let centroid = spectral_centroid(&power, 16_000, 512);
        assert!((centroid - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_extract_voiced_frame() {
        let sample_rate = 16_000;
        let (extractor, config) = extractor(sample_rate);
        let samples = voiced_signal(220.0, sample_rate, 2048);
        let frames = windowed_frames(&samples, &config).unwrap();
        assert!(!frames.is_empty());

        let features = extractor.extract(&frames[0]).unwrap();
        assert_eq!(features.mfcc.len(), 13);
        assert!(features.energy > 0.01);
        assert!(features.centroid_hz > 0.0);
        assert!(features.zcr > 0.0 && features.zcr < 1.0);

        let pitch = features.pitch_hz.expect("harmonic signal should be voiced");
        assert!(
            (pitch - 220.0).abs() < 10.0,
            "Expected ~220 Hz, got {:.1} Hz",
            pitch
        );
    }

    #[test]
    fn test_mismatched_filterbank_rejected() {
        let config = PipelineConfig::default();
        let cache = FilterbankCache::new();
        let bank = cache.get(&config, 44_100).unwrap();
        assert!(MfccExtractor::new(&config, bank, 16_000).is_err());
    }
}
