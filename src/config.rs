//! Configuration parameters for the identification pipeline

/// Pipeline configuration parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Framing
    /// Analysis frame size in samples (default: 512, must be a power of two)
    pub frame_size: usize,

    /// Hop size in samples (default: 256, 50% overlap)
    pub hop_size: usize,

    /// RMS floor below which a frame is discarded as silence (default: 0.01)
    ///
    /// This is the primary mechanism for ignoring background noise and
    /// inter-word pauses. The same floor gates the profile energy mean when
    /// deciding whether an utterance is silence.
    pub silence_rms_floor: f32,

    // Resampling
    /// Sample rate all input audio is resampled to before analysis
    /// (default: 16000 Hz). Input already at this rate passes through untouched.
    pub target_sample_rate: u32,

    // Mel filterbank
    /// Number of triangular Mel filters (default: 26)
    pub num_filters: usize,

    /// Lower edge of the Mel filterbank in Hz (default: 300.0)
    pub min_freq: f32,

    /// Upper edge of the Mel filterbank in Hz (default: 8000.0)
    pub max_freq: f32,

    /// Number of cepstral coefficients kept from the DCT (default: 13)
    pub num_coefficients: usize,

    // Pitch
    /// Minimum pitch considered voiced, in Hz (default: 50.0)
    pub pitch_min_hz: f32,

    /// Maximum pitch considered voiced, in Hz (default: 400.0)
    pub pitch_max_hz: f32,

    // Matching thresholds
    /// Cosine similarity required to match the enrolled owner (default: 0.82)
    pub owner_threshold: f32,

    /// Cosine similarity required to match any other known or session
    /// speaker (default: 0.75)
    pub known_threshold: f32,

    /// Maximum number of recent embeddings retained per session speaker
    /// (default: 10)
    pub session_history_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_size: 512,
            hop_size: 256,
            silence_rms_floor: 0.01,
            target_sample_rate: 16_000,
            num_filters: 26,
            min_freq: 300.0,
            max_freq: 8000.0,
            num_coefficients: 13,
            pitch_min_hz: 50.0,
            pitch_max_hz: 400.0,
            owner_threshold: 0.82,
            known_threshold: 0.75,
            session_history_len: 10,
        }
    }
}

impl PipelineConfig {
    /// Validate structural constraints that the rest of the pipeline relies on
    pub fn validate(&self) -> Result<(), crate::error::VoiceError> {
        if self.frame_size == 0 || !self.frame_size.is_power_of_two() {
            return Err(crate::error::VoiceError::InvalidInput(format!(
                "Frame size must be a power of two, got {}",
                self.frame_size
            )));
        }
        if self.hop_size == 0 {
            return Err(crate::error::VoiceError::InvalidInput(
                "Hop size must be non-zero".to_string(),
            ));
        }
        if self.num_filters < 2 {
            return Err(crate::error::VoiceError::InvalidInput(format!(
                "Need at least 2 Mel filters, got {}",
                self.num_filters
            )));
        }
        if self.num_coefficients == 0 || self.num_coefficients > self.num_filters {
            return Err(crate::error::VoiceError::InvalidInput(format!(
                "Coefficient count must be in 1..={}, got {}",
                self.num_filters, self.num_coefficients
            )));
        }
        if self.min_freq < 0.0 || self.min_freq >= self.max_freq {
            return Err(crate::error::VoiceError::InvalidInput(format!(
                "Invalid Mel frequency range: [{:.1}, {:.1}] Hz",
                self.min_freq, self.max_freq
            )));
        }
        if self.pitch_min_hz <= 0.0 || self.pitch_min_hz >= self.pitch_max_hz {
            return Err(crate::error::VoiceError::InvalidInput(format!(
                "Invalid pitch range: [{:.1}, {:.1}] Hz",
                self.pitch_min_hz, self.pitch_max_hz
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two_frame() {
        let config = PipelineConfig {
            frame_size: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_mel_range() {
        let config = PipelineConfig {
            min_freq: 8000.0,
            max_freq: 300.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
