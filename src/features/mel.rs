//! Mel filterbank construction and caching
//!
//! Triangular filters mapping linear FFT bins to Mel-spaced bands. A bank is
//! a pure function of `(fft_size, sample_rate, num_filters, min_freq,
//! max_freq)` and is built once per configuration, then shared immutably
//! across all frames of all utterances. `FilterbankCache` keys banks by that
//! tuple so concurrent callers never rebuild per frame; a racing rebuild is
//! harmless since construction is side-effect-free.

use crate::config::PipelineConfig;
use crate::error::VoiceError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Convert frequency in Hz to the Mel scale
#[inline]
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert Mel scale back to Hz
#[inline]
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// One triangular filter over FFT bins
#[derive(Debug, Clone)]
struct TriangularFilter {
    start_bin: usize,
    /// Per-bin weights covering `start_bin..start_bin + weights.len()`
    weights: Vec<f32>,
}

/// Immutable Mel filterbank for a fixed FFT size and sample rate
#[derive(Debug)]
pub struct MelFilterbank {
    filters: Vec<TriangularFilter>,
    fft_size: usize,
    sample_rate: u32,
}

impl MelFilterbank {
    /// Build a filterbank
    ///
    /// Places `num_filters + 2` points evenly spaced on the Mel scale between
    /// `min_freq` and `max_freq` (clamped to Nyquist), converts them back to
    /// FFT bin indices, and builds triangles rising to each center bin and
    /// falling to the end bin.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` when the sample rate produces a
    /// degenerate layout: Nyquist at or below `min_freq`, or too few spectrum
    /// bins to separate the filter edges.
    pub fn new(
        fft_size: usize,
        sample_rate: u32,
        num_filters: usize,
        min_freq: f32,
        max_freq: f32,
    ) -> Result<Self, VoiceError> {
        if sample_rate == 0 {
            return Err(VoiceError::InvalidInput("Invalid sample rate: 0".to_string()));
        }
        if num_filters < 2 {
            return Err(VoiceError::InvalidInput(format!(
                "Need at least 2 Mel filters, got {}",
                num_filters
            )));
        }

        let nyquist = sample_rate as f32 / 2.0;
        let max_freq = max_freq.min(nyquist);
        if max_freq <= min_freq {
            return Err(VoiceError::InvalidInput(format!(
                "Degenerate Mel range at {} Hz sample rate: [{:.1}, {:.1}] Hz",
                sample_rate, min_freq, max_freq
            )));
        }

        let num_bins = fft_size / 2 + 1;
        let mel_low = hz_to_mel(min_freq);
        let mel_high = hz_to_mel(max_freq);

        // num_filters + 2 evenly spaced Mel points -> bin indices
        let bin_hz = sample_rate as f32 / fft_size as f32;
        let points: Vec<usize> = (0..num_filters + 2)
            .map(|i| {
                let mel = mel_low + (mel_high - mel_low) * i as f32 / (num_filters + 1) as f32;
                ((mel_to_hz(mel) / bin_hz).floor() as usize).min(num_bins - 1)
            })
            .collect();

        if points[0] >= points[num_filters + 1] {
            return Err(VoiceError::InvalidInput(format!(
                "Sample rate {} Hz yields too few spectrum bins for {} Mel filters",
                sample_rate, num_filters
            )));
        }

        let mut filters = Vec::with_capacity(num_filters);
        for f in 0..num_filters {
            let start = points[f];
            let center = points[f + 1];
            let end = points[f + 2];

            let mut weights = Vec::with_capacity(end.saturating_sub(start) + 1);
            for bin in start..=end {
                let w = if bin < center {
                    if center == start {
                        1.0
                    } else {
                        (bin - start) as f32 / (center - start) as f32
                    }
                } else if end == center {
                    1.0
                } else {
                    (end - bin) as f32 / (end - center) as f32
                };
                weights.push(w.max(0.0));
            }
            filters.push(TriangularFilter {
                start_bin: start,
                weights,
            });
        }

        log::debug!(
            "Built Mel filterbank: {} filters, fft={}, rate={} Hz, range=[{:.0}, {:.0}] Hz",
            num_filters,
            fft_size,
            sample_rate,
            min_freq,
            max_freq
        );

        Ok(Self {
            filters,
            fft_size,
            sample_rate,
        })
    }

    /// Number of filters in the bank
    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    /// FFT size this bank was built for
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Sample rate this bank was built for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Apply the filterbank to a power spectrum, producing one energy per filter
    pub fn apply(&self, power_spectrum: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(i, &w)| {
                        power_spectrum
                            .get(filter.start_bin + i)
                            .copied()
                            .unwrap_or(0.0)
                            * w
                    })
                    .sum()
            })
            .collect()
    }
}

/// Cache key: the full configuration tuple a bank is a pure function of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FilterbankKey {
    fft_size: usize,
    sample_rate: u32,
    num_filters: usize,
    min_freq_bits: u32,
    max_freq_bits: u32,
}

/// Explicit cache of Mel filterbanks keyed by configuration
///
/// Owned by the pipeline rather than hiding behind a global, so per-user
/// isolation and testing stay straightforward.
#[derive(Debug, Default)]
pub struct FilterbankCache {
    banks: Mutex<HashMap<FilterbankKey, Arc<MelFilterbank>>>,
}

impl FilterbankCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the bank for this configuration and sample rate, building it on
    /// first use
    pub fn get(
        &self,
        config: &PipelineConfig,
        sample_rate: u32,
    ) -> Result<Arc<MelFilterbank>, VoiceError> {
        let key = FilterbankKey {
            fft_size: config.frame_size,
            sample_rate,
            num_filters: config.num_filters,
            min_freq_bits: config.min_freq.to_bits(),
            max_freq_bits: config.max_freq.to_bits(),
        };

        let mut banks = self
            .banks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(bank) = banks.get(&key) {
            return Ok(Arc::clone(bank));
        }

        let bank = Arc::new(MelFilterbank::new(
            config.frame_size,
            sample_rate,
            config.num_filters,
            config.min_freq,
            config.max_freq,
        )?);
        banks.insert(key, Arc::clone(&bank));
        Ok(bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [50.0f32, 300.0, 1000.0, 4000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!(
                (back - hz).abs() < 0.5,
                "Mel roundtrip drifted: {} -> {}",
                hz,
                back
            );
        }
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = MelFilterbank::new(512, 16_000, 26, 300.0, 8000.0).unwrap();
        assert_eq!(bank.num_filters(), 26);

        let spectrum = vec![1.0f32; 257];
        let energies = bank.apply(&spectrum);
        assert_eq!(energies.len(), 26);
        // Flat spectrum should put non-trivial energy in every filter
        assert!(energies.iter().all(|&e| e > 0.0));
    }

    #[test]
    fn test_tone_excites_matching_filter() {
        let bank = MelFilterbank::new(512, 16_000, 26, 300.0, 8000.0).unwrap();

        // Concentrate power at the bin for 1000 Hz
        let mut spectrum = vec![0.0f32; 257];
        let bin = (1000.0 * 512.0 / 16_000.0) as usize;
        spectrum[bin] = 100.0;

        let energies = bank.apply(&spectrum);
        let hot = energies
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        // 1000 Hz sits in the lower third of a 300-8000 Hz Mel layout
        assert!(hot < 13, "1000 Hz should excite a low filter, got {}", hot);
        assert!(energies[hot] > 0.0);
    }

    #[test]
    fn test_degenerate_sample_rate_rejected() {
        // Nyquist of 400 Hz sits below the 300 Hz lower edge once clamped
        assert!(MelFilterbank::new(512, 500, 26, 300.0, 8000.0).is_err());
        assert!(MelFilterbank::new(512, 0, 26, 300.0, 8000.0).is_err());
    }

    #[test]
    fn test_cache_returns_shared_instance() {
        let cache = FilterbankCache::new();
        let config = PipelineConfig::default();
        let a = cache.get(&config, 16_000).unwrap();
        let b = cache.get(&config, 16_000).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = cache.get(&config, 44_100).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
