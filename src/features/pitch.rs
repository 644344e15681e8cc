//! Autocorrelation pitch estimation
//!
//! Finds the fundamental frequency of one frame by maximizing
//! `sum(x[i] * x[i + lag])` over the lag range corresponding to 50-400 Hz.
//! Estimates outside that range are rejected as unvoiced or noise.

/// Estimate pitch in Hz for one frame, or `None` if unvoiced
///
/// # Arguments
///
/// * `frame` - Frame samples (windowed or raw; autocorrelation tolerates both)
/// * `sample_rate` - Sample rate in Hz
/// * `min_hz` - Lowest pitch considered voiced
/// * `max_hz` - Highest pitch considered voiced
pub fn estimate_pitch(frame: &[f32], sample_rate: u32, min_hz: f32, max_hz: f32) -> Option<f32> {
    if frame.len() < 2 || sample_rate == 0 || min_hz <= 0.0 || max_hz <= min_hz {
        return None;
    }

    // Lag bounds: short lags mean high pitch
    let lag_min = ((sample_rate as f32 / max_hz).floor() as usize).max(1);
    let lag_max = ((sample_rate as f32 / min_hz).ceil() as usize).min(frame.len() - 1);
    if lag_min >= lag_max {
        return None;
    }

    let mut best_lag = 0usize;
    let mut best_corr = 0.0f32;
    for lag in lag_min..=lag_max {
        let mut corr = 0.0f32;
        for i in 0..frame.len() - lag {
            corr += frame[i] * frame[i + lag];
        }
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_corr <= 0.0 {
        return None;
    }

    let pitch = sample_rate as f32 / best_lag as f32;
    if pitch < min_hz || pitch > max_hz {
        return None;
    }
    Some(pitch)
}
