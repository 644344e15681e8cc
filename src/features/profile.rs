//! Utterance-level profile aggregation
//!
//! Reduces per-frame features across one utterance into a fixed-size
//! statistical profile: per-coefficient mean and standard deviation, pitch
//! statistics over voiced frames, energy statistics over all surviving
//! frames, spectral centroid mean, and a single zero-crossing rate computed
//! over the whole un-framed signal.

use crate::features::mfcc::FrameFeatures;
use serde::{Deserialize, Serialize};

/// Statistical voice profile of one utterance
///
/// Value object, fully determined by the utterance's frames. The canonical
/// silence profile is all zeros except `zcr`, which is still computed on the
/// raw signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfccProfile {
    /// Mean of each cepstral coefficient across frames
    pub mfcc_means: Vec<f32>,

    /// Standard deviation of each cepstral coefficient across frames
    pub mfcc_stds: Vec<f32>,

    /// Mean pitch in Hz over voiced frames (0 if none were voiced)
    pub pitch_mean: f32,

    /// Pitch standard deviation in Hz over voiced frames
    pub pitch_std: f32,

    /// Mean RMS energy over surviving frames
    pub energy_mean: f32,

    /// RMS energy standard deviation over surviving frames
    pub energy_std: f32,

    /// Mean spectral centroid in Hz
    pub centroid_mean: f32,

    /// Zero-crossing rate of the whole un-framed signal, in [0, 1]
    pub zcr: f32,
}

fn mean_and_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let var = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
    (mean, var.max(0.0).sqrt())
}

impl MfccProfile {
    /// Canonical silence profile: zeros everywhere except the raw-signal ZCR
    pub fn silence(num_coefficients: usize, signal_zcr: f32) -> Self {
        Self {
            mfcc_means: vec![0.0; num_coefficients],
            mfcc_stds: vec![0.0; num_coefficients],
            pitch_mean: 0.0,
            pitch_std: 0.0,
            energy_mean: 0.0,
            energy_std: 0.0,
            centroid_mean: 0.0,
            zcr: signal_zcr,
        }
    }

    /// Aggregate per-frame features into a profile
    ///
    /// # Arguments
    ///
    /// * `frames` - Features of the frames that survived the silence gate
    /// * `signal_zcr` - Zero-crossing rate of the whole un-framed signal
    /// * `num_coefficients` - Cepstral coefficient count (used for the
    ///   silence profile shape when `frames` is empty)
    pub fn aggregate(frames: &[FrameFeatures], signal_zcr: f32, num_coefficients: usize) -> Self {
        if frames.is_empty() {
            log::debug!("No frames survived the silence gate; returning silence profile");
            return Self::silence(num_coefficients, signal_zcr);
        }

        let n = frames[0].mfcc.len();
        let mut mfcc_means = vec![0.0f32; n];
        let mut mfcc_stds = vec![0.0f32; n];
        for c in 0..n {
            let column: Vec<f32> = frames.iter().map(|f| f.mfcc[c]).collect();
            let (mean, std) = mean_and_std(&column);
            mfcc_means[c] = mean;
            mfcc_stds[c] = std;
        }

        let voiced: Vec<f32> = frames.iter().filter_map(|f| f.pitch_hz).collect();
        let (pitch_mean, pitch_std) = mean_and_std(&voiced);

        let energies: Vec<f32> = frames.iter().map(|f| f.energy).collect();
        let (energy_mean, energy_std) = mean_and_std(&energies);

        let centroids: Vec<f32> = frames.iter().map(|f| f.centroid_hz).collect();
        let (centroid_mean, _) = mean_and_std(&centroids);

        Self {
            mfcc_means,
            mfcc_stds,
            pitch_mean,
            pitch_std,
            energy_mean,
            energy_std,
            centroid_mean,
            zcr: signal_zcr,
        }
    }

    /// Whether this profile represents silence, judged by its energy mean
    pub fn is_silence(&self, silence_floor: f32) -> bool {
        self.energy_mean < silence_floor
    }

    /// Field-by-field average of several profiles (enrollment)
    ///
    /// Returns `None` for an empty slice or mismatched coefficient lengths.
    pub fn average(profiles: &[MfccProfile]) -> Option<MfccProfile> {
        let first = profiles.first()?;
        let n = first.mfcc_means.len();
        if profiles.iter().any(|p| p.mfcc_means.len() != n) {
            return None;
        }

        let count = profiles.len() as f32;
        let mut out = MfccProfile::silence(n, 0.0);
        for p in profiles {
            for c in 0..n {
                out.mfcc_means[c] += p.mfcc_means[c] / count;
                out.mfcc_stds[c] += p.mfcc_stds[c] / count;
            }
            out.pitch_mean += p.pitch_mean / count;
            out.pitch_std += p.pitch_std / count;
            out.energy_mean += p.energy_mean / count;
            out.energy_std += p.energy_std / count;
            out.centroid_mean += p.centroid_mean / count;
            out.zcr += p.zcr / count;
        }
        Some(out)
    }

    /// Weighted merge of an existing profile with one new sample profile
    ///
    /// `new = old * w + sample * (1 - w)`, the profile-side counterpart of
    /// the embedding merge used by incremental enrollment.
    pub fn weighted_merge(&self, sample: &MfccProfile, w: f32) -> Option<MfccProfile> {
        let n = self.mfcc_means.len();
        if sample.mfcc_means.len() != n {
            return None;
        }
        let blend = |old: f32, new: f32| old * w + new * (1.0 - w);
        Some(MfccProfile {
            mfcc_means: self
                .mfcc_means
                .iter()
                .zip(&sample.mfcc_means)
                .map(|(&o, &s)| blend(o, s))
                .collect(),
            mfcc_stds: self
                .mfcc_stds
                .iter()
                .zip(&sample.mfcc_stds)
                .map(|(&o, &s)| blend(o, s))
                .collect(),
            pitch_mean: blend(self.pitch_mean, sample.pitch_mean),
            pitch_std: blend(self.pitch_std, sample.pitch_std),
            energy_mean: blend(self.energy_mean, sample.energy_mean),
            energy_std: blend(self.energy_std, sample.energy_std),
            centroid_mean: blend(self.centroid_mean, sample.centroid_mean),
            zcr: blend(self.zcr, sample.zcr),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(mfcc: Vec<f32>, pitch: Option<f32>, energy: f32) -> FrameFeatures {
        FrameFeatures {
            mfcc,
            pitch_hz: pitch,
            energy,
            centroid_hz: 1000.0,
            zcr: 0.1,
        }
    }

    #[test]
    fn test_aggregate_means_and_stds() {
        let frames = vec![
            features(vec![1.0, 2.0], Some(200.0), 0.1),
            features(vec![3.0, 4.0], Some(220.0), 0.3),
        ];
        let profile = MfccProfile::aggregate(&frames, 0.05, 2);

        assert_eq!(profile.mfcc_means, vec![2.0, 3.0]);
        assert!((profile.mfcc_stds[0] - 1.0).abs() < 1e-6);
        assert!((profile.pitch_mean - 210.0).abs() < 1e-4);
        assert!((profile.energy_mean - 0.2).abs() < 1e-6);
        assert!((profile.zcr - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_stats_ignore_unvoiced_frames() {
        let frames = vec![
            features(vec![1.0], Some(200.0), 0.1),
            features(vec![1.0], None, 0.1),
            features(vec![1.0], Some(200.0), 0.1),
        ];
        let profile = MfccProfile::aggregate(&frames, 0.0, 1);
        assert!((profile.pitch_mean - 200.0).abs() < 1e-4);
        assert!(profile.pitch_std.abs() < 1e-4);
    }

    #[test]
    fn test_empty_frames_give_silence_profile() {
        let profile = MfccProfile::aggregate(&[], 0.07, 13);
        assert!(profile.is_silence(0.01));
        assert_eq!(profile.mfcc_means, vec![0.0; 13]);
        assert!((profile.zcr - 0.07).abs() < 1e-6);
    }

    #[test]
    fn test_average_of_two_profiles() {
        let a = MfccProfile {
            energy_mean: 0.2,
            pitch_mean: 100.0,
            ..MfccProfile::silence(2, 0.1)
        };
        let b = MfccProfile {
            energy_mean: 0.4,
            pitch_mean: 300.0,
            ..MfccProfile::silence(2, 0.3)
        };
        let avg = MfccProfile::average(&[a, b]).unwrap();
        assert!((avg.energy_mean - 0.3).abs() < 1e-6);
        assert!((avg.pitch_mean - 200.0).abs() < 1e-4);
        assert!((avg.zcr - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_average_rejects_mismatched_lengths() {
        let a = MfccProfile::silence(13, 0.0);
        let b = MfccProfile::silence(12, 0.0);
        assert!(MfccProfile::average(&[a, b]).is_none());
        assert!(MfccProfile::average(&[]).is_none());
    }

    #[test]
    fn test_weighted_merge_endpoints() {
        let old = MfccProfile {
            pitch_mean: 100.0,
            ..MfccProfile::silence(1, 0.0)
        };
        let new = MfccProfile {
            pitch_mean: 200.0,
            ..MfccProfile::silence(1, 0.0)
        };
        let merged = old.weighted_merge(&new, 0.5).unwrap();
        assert!((merged.pitch_mean - 150.0).abs() < 1e-4);

        let keep_old = old.weighted_merge(&new, 1.0).unwrap();
        assert!((keep_old.pitch_mean - 100.0).abs() < 1e-4);
    }
}
