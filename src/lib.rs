//! # Voiceprint DSP
//!
//! Text-independent speaker identification from short spoken utterances:
//! given a raw mono audio buffer, decide whether it is the enrolled owner, a
//! previously seen speaker, or someone new, using only signal-derived
//! features (no ML model, no network call).
//!
//! ## Features
//!
//! - **MFCC pipeline**: Hamming-windowed framing, FFT power spectrum, cached
//!   Mel filterbank, 13-coefficient DCT-II cepstra
//! - **Voice statistics**: autocorrelation pitch, frame energy, spectral
//!   centroid, zero-crossing rate, aggregated per utterance
//! - **128-dim embeddings**: deterministic unit-norm vectors compared by
//!   cosine similarity
//! - **Tiered matching**: silence -> owner -> known -> session -> new, with
//!   multi-sample enrollment and incremental merge
//!
//! ## Quick Start
//!
//! ```
//! use voiceprint_dsp::{PipelineConfig, SpeakerIdentifier};
//!
//! let mut engine = SpeakerIdentifier::new(PipelineConfig::default())?;
//!
//! // One second of near-silence at 16 kHz
//! let samples = vec![0.0f32; 16_000];
//! let result = engine.identify(&samples, 16_000)?;
//!
//! assert_eq!(result.speaker_id, "silence");
//! # Ok::<(), voiceprint_dsp::VoiceError>(())
//! ```
//!
//! ## Architecture
//!
//! The identification pipeline follows this flow:
//!
//! ```text
//! Audio -> Resample -> Framer/Windower -> Power Spectrum -> Mel Filterbank
//!       -> MFCC + Pitch + Energy + Centroid + ZCR -> Profile -> Embedding
//!       -> Matcher (consults Speaker Registry) -> SpeakerMatch
//! ```
//!
//! Enrollment runs the same pipeline over several utterances and feeds the
//! registry's merge operation instead of the matcher. Processing one
//! utterance is pure, synchronous and CPU-bound; the registry is the only
//! mutable shared state and its writes must be serialized per user.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod features;
pub mod preprocessing;
pub mod speaker;

// Re-export main types
pub use config::PipelineConfig;
pub use error::VoiceError;
pub use features::mel::FilterbankCache;
pub use features::profile::MfccProfile;
pub use speaker::embedding::{Embedding, EMBEDDING_DIM};
pub use speaker::matcher::{SpeakerMatch, SILENCE_SPEAKER_ID};
pub use speaker::registry::{SpeakerRegistry, VoiceRecord};

use features::mfcc::MfccExtractor;
use preprocessing::framing::{windowed_frames, zero_crossing_rate};
use preprocessing::resample::resample_linear;
use speaker::registry;

/// Extract the statistical voice profile of one utterance
///
/// Runs the pure part of the pipeline: resampling to the configured target
/// rate, framing with silence gating, per-frame feature extraction, and
/// aggregation. Safe to call from any thread; the filterbank cache is the
/// only shared state and is read-mostly.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Pipeline configuration
/// * `cache` - Filterbank cache shared across calls
///
/// # Errors
///
/// Returns `VoiceError::InvalidInput` for an empty buffer, a zero sample
/// rate, or a sample rate that degenerates the Mel filter layout.
pub fn extract_profile(
    samples: &[f32],
    sample_rate: u32,
    config: &PipelineConfig,
    cache: &FilterbankCache,
) -> Result<MfccProfile, VoiceError> {
    if samples.is_empty() {
        return Err(VoiceError::InvalidInput("Empty audio buffer".to_string()));
    }
    if sample_rate == 0 {
        return Err(VoiceError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    log::debug!(
        "Extracting profile: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    let audio = resample_linear(samples, sample_rate, config.target_sample_rate)?;
    let analysis_rate = config.target_sample_rate;

    // ZCR is computed once over the whole un-framed signal, not per frame
    let signal_zcr = zero_crossing_rate(&audio);

    let frames = windowed_frames(&audio, config)?;
    if frames.is_empty() {
        return Ok(MfccProfile::silence(config.num_coefficients, signal_zcr));
    }

    let filterbank = cache.get(config, analysis_rate)?;
    let extractor = MfccExtractor::new(config, filterbank, analysis_rate)?;

    let mut features = Vec::with_capacity(frames.len());
    for frame in &frames {
        features.push(extractor.extract(frame)?);
    }

    Ok(MfccProfile::aggregate(
        &features,
        signal_zcr,
        config.num_coefficients,
    ))
}

/// Speaker identification engine
///
/// Owns the pipeline configuration, the filterbank cache, and the speaker
/// registry. One engine corresponds to one user's enrolled records and one
/// conversational session.
pub struct SpeakerIdentifier {
    config: PipelineConfig,
    cache: FilterbankCache,
    registry: SpeakerRegistry,
}

impl SpeakerIdentifier {
    /// Create an engine with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` if the configuration is
    /// structurally invalid (non-power-of-two frame size, inverted ranges).
    pub fn new(config: PipelineConfig) -> Result<Self, VoiceError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: FilterbankCache::new(),
            registry: SpeakerRegistry::new(),
        })
    }

    /// The active pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read access to the underlying registry
    pub fn registry(&self) -> &SpeakerRegistry {
        &self.registry
    }

    /// Identify the speaker of one utterance
    ///
    /// Runs the full pipeline and the tiered match. A buffer with no usable
    /// speech returns the dedicated silence match rather than an error, so
    /// callers can distinguish "nothing was said" from "someone spoke and
    /// wasn't recognized".
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` for an empty buffer or degenerate
    /// sample rate.
    pub fn identify(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<SpeakerMatch, VoiceError> {
        let profile = extract_profile(samples, sample_rate, &self.config, &self.cache)?;
        let is_silent = profile.is_silence(self.config.silence_rms_floor);
        let embedding = Embedding::from_profile(&profile);

        Ok(self.registry.identify(
            &embedding,
            is_silent,
            self.config.owner_threshold,
            self.config.known_threshold,
            self.config.session_history_len,
        ))
    }

    /// Enroll a speaker from one or more audio samples
    ///
    /// Each sample runs through the full pipeline; samples whose profile
    /// energy mean falls below the silence floor are discarded as too quiet
    /// to enroll. The retained profiles are averaged field-by-field and the
    /// individual embeddings are merged by vector sum plus renormalization
    /// (not derived from the averaged profile).
    ///
    /// The returned record is the caller's to persist; this crate never
    /// writes to durable storage.
    ///
    /// # Errors
    ///
    /// * `VoiceError::InvalidInput` - no samples, empty speaker id, or bad audio
    /// * `VoiceError::InsufficientEnrollmentSamples` - every sample was too quiet
    /// * `VoiceError::DuplicateOwner` - `is_owner = true` while a different
    ///   speaker already holds the flag
    pub fn enroll(
        &mut self,
        samples: &[Vec<f32>],
        sample_rate: u32,
        speaker_id: &str,
        speaker_name: &str,
        is_owner: bool,
    ) -> Result<VoiceRecord, VoiceError> {
        if speaker_id.is_empty() {
            return Err(VoiceError::InvalidInput("Empty speaker id".to_string()));
        }
        if samples.is_empty() {
            return Err(VoiceError::InvalidInput(
                "Enrollment requires at least one audio sample".to_string(),
            ));
        }

        let mut profiles = Vec::with_capacity(samples.len());
        let mut embeddings = Vec::with_capacity(samples.len());
        for sample in samples {
            let profile = extract_profile(sample, sample_rate, &self.config, &self.cache)?;
            if profile.is_silence(self.config.silence_rms_floor) {
                log::warn!("Discarding enrollment sample below the silence floor");
                continue;
            }
            embeddings.push(Embedding::from_profile(&profile));
            profiles.push(profile);
        }

        if profiles.is_empty() {
            return Err(VoiceError::InsufficientEnrollmentSamples(format!(
                "All {} submitted samples were too quiet to enroll",
                samples.len()
            )));
        }

        let profile = MfccProfile::average(&profiles).ok_or_else(|| {
            VoiceError::ProcessingError("Enrollment profiles had mismatched shapes".to_string())
        })?;
        let embedding = Embedding::merge_sum(&embeddings)?;

        let record = registry::new_record(
            speaker_id.to_string(),
            speaker_name.to_string(),
            embedding,
            profile,
            is_owner,
            profiles.len() as u32,
        );
        self.registry.insert_enrolled(record.clone())?;
        Ok(record)
    }

    /// Merge one additional utterance into an existing speaker's record
    ///
    /// This is the incremental "update" action: the new sample is blended
    /// into the stored embedding with weight `1 / (sample_count + 1)`.
    ///
    /// # Errors
    ///
    /// * `VoiceError::InvalidInput` - unknown speaker id or bad audio
    /// * `VoiceError::InsufficientEnrollmentSamples` - the sample was too quiet
    pub fn merge_sample(
        &mut self,
        speaker_id: &str,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<VoiceRecord, VoiceError> {
        let profile = extract_profile(samples, sample_rate, &self.config, &self.cache)?;
        if profile.is_silence(self.config.silence_rms_floor) {
            return Err(VoiceError::InsufficientEnrollmentSamples(
                "Sample is too quiet to merge".to_string(),
            ));
        }
        let embedding = Embedding::from_profile(&profile);
        self.registry.apply_merge(speaker_id, &embedding, &profile)
    }

    /// Populate the registry from externally persisted records
    ///
    /// # Errors
    ///
    /// Propagates registry validation: duplicate ids or duplicate owners.
    /// Embeddings of any length other than 128 were already rejected when
    /// the records were deserialized.
    pub fn load_records(&mut self, records: Vec<VoiceRecord>) -> Result<(), VoiceError> {
        self.registry.load_records(records)
    }

    /// Look up a durable record by speaker id
    pub fn get_record(&self, speaker_id: &str) -> Option<&VoiceRecord> {
        self.registry.get_record(speaker_id)
    }

    /// Delete a durable record, returning it if present
    pub fn remove_record(&mut self, speaker_id: &str) -> Option<VoiceRecord> {
        self.registry.remove_record(speaker_id)
    }

    /// Transfer the owner flag to an already-enrolled speaker
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` if the speaker id is unknown.
    pub fn promote_owner(&mut self, speaker_id: &str) -> Result<(), VoiceError> {
        self.registry.promote_owner(speaker_id)
    }

    /// Clear transient session-speaker state between conversations
    pub fn reset_session(&mut self) {
        self.registry.reset_session();
    }

    /// Ids of the current unidentified session speakers
    pub fn session_speaker_ids(&self) -> Vec<String> {
        self.registry.session_speaker_ids()
    }
}
