//! Speaker registry and enrollment state
//!
//! The registry is the single owner of both speaker maps: durable
//! [`VoiceRecord`]s injected by the persistence collaborator, and transient
//! session speakers created on first unmatched utterance and discarded on
//! session reset. It is an explicit, constructible object; call sites receive
//! it by reference instead of reaching for a hidden global, which keeps
//! per-user isolation and testing straightforward. Writes must be serialized
//! per user by the caller.

use crate::error::VoiceError;
use crate::features::profile::MfccProfile;
use crate::speaker::embedding::Embedding;
use crate::speaker::matcher::{self, MatchDecision, SpeakerMatch, SILENCE_SPEAKER_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Durable record of an enrolled speaker
///
/// Created by enrollment, updated by merge actions, deleted by explicit
/// removal. Identification never mutates it. Persistence is the caller's
/// concern; the only serialization constraint is the 128-length embedding,
/// enforced by the [`Embedding`] type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceRecord {
    /// Unique speaker id within the owning user's records
    pub speaker_id: String,

    /// Display name
    pub speaker_name: String,

    /// Merged voice embedding
    pub embedding: Embedding,

    /// Averaged statistical profile
    pub profile: MfccProfile,

    /// Whether this speaker is the enrolled owner; at most one record per
    /// registry may carry the flag, enforced by the registry
    pub is_owner: bool,

    /// Number of enrollment samples merged into this record (>= 1)
    pub sample_count: u32,

    /// Creation time, milliseconds since the Unix epoch
    pub created_at_ms: u64,

    /// Last update time, milliseconds since the Unix epoch
    pub updated_at_ms: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Registry of known and session speakers
#[derive(Debug, Default)]
pub struct SpeakerRegistry {
    records: HashMap<String, VoiceRecord>,
    sessions: HashMap<String, Vec<Embedding>>,
    session_counter: u64,
}

impl SpeakerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the registry from externally persisted records
    ///
    /// Replaces any existing durable records. Session state is untouched.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` on duplicate speaker ids and
    /// `VoiceError::DuplicateOwner` if more than one record claims the owner
    /// flag. Embedding length is already guaranteed by the type.
    pub fn load_records(&mut self, records: Vec<VoiceRecord>) -> Result<(), VoiceError> {
        let mut map = HashMap::with_capacity(records.len());
        let mut owner_id: Option<String> = None;
        for record in records {
            if let Some(existing) = &owner_id {
                if record.is_owner {
                    return Err(VoiceError::DuplicateOwner(format!(
                        "Records '{}' and '{}' both claim the owner flag",
                        existing, record.speaker_id
                    )));
                }
            } else if record.is_owner {
                owner_id = Some(record.speaker_id.clone());
            }
            if map.insert(record.speaker_id.clone(), record).is_some() {
                return Err(VoiceError::InvalidInput(
                    "Duplicate speaker id in loaded records".to_string(),
                ));
            }
        }
        log::debug!("Loaded {} voice records (owner: {:?})", map.len(), owner_id);
        self.records = map;
        Ok(())
    }

    /// Look up a durable record by speaker id
    pub fn get_record(&self, speaker_id: &str) -> Option<&VoiceRecord> {
        self.records.get(speaker_id)
    }

    /// Delete a durable record, returning it if present
    pub fn remove_record(&mut self, speaker_id: &str) -> Option<VoiceRecord> {
        let removed = self.records.remove(speaker_id);
        if removed.is_some() {
            log::debug!("Removed voice record '{}'", speaker_id);
        }
        removed
    }

    /// The owner record, if one is enrolled
    pub fn owner(&self) -> Option<&VoiceRecord> {
        self.records.values().find(|r| r.is_owner)
    }

    /// Number of durable records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Transfer the owner flag to an existing record
    ///
    /// This is the explicit update path required when an owner already
    /// exists; it clears the previous flag in the same call so the
    /// single-owner invariant can never be observed violated.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` if the speaker id is unknown.
    pub fn promote_owner(&mut self, speaker_id: &str) -> Result<(), VoiceError> {
        if !self.records.contains_key(speaker_id) {
            return Err(VoiceError::InvalidInput(format!(
                "Unknown speaker id '{}'",
                speaker_id
            )));
        }
        let now = now_ms();
        for record in self.records.values_mut() {
            let promote = record.speaker_id == speaker_id;
            if record.is_owner != promote {
                record.is_owner = promote;
                record.updated_at_ms = now;
            }
        }
        log::debug!("Promoted '{}' to owner", speaker_id);
        Ok(())
    }

    /// Insert a freshly enrolled record
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::DuplicateOwner` if the record asserts
    /// `is_owner = true` while a different speaker already holds the flag;
    /// callers must use [`SpeakerRegistry::promote_owner`] instead.
    /// Returns `VoiceError::InvalidInput` if the speaker id is already
    /// enrolled.
    pub fn insert_enrolled(&mut self, record: VoiceRecord) -> Result<(), VoiceError> {
        if record.is_owner {
            if let Some(owner) = self.owner() {
                if owner.speaker_id != record.speaker_id {
                    return Err(VoiceError::DuplicateOwner(format!(
                        "'{}' is already enrolled as owner; use the explicit update path",
                        owner.speaker_id
                    )));
                }
            }
        }
        if self.records.contains_key(&record.speaker_id) {
            return Err(VoiceError::InvalidInput(format!(
                "Speaker '{}' is already enrolled; use the merge action to update",
                record.speaker_id
            )));
        }
        log::debug!(
            "Enrolled '{}' ({} samples, owner: {})",
            record.speaker_id,
            record.sample_count,
            record.is_owner
        );
        self.records.insert(record.speaker_id.clone(), record);
        Ok(())
    }

    /// Merge one additional sample into an existing record
    ///
    /// Embedding: `new = old * w + sample * (1 - w)` with
    /// `w = sample_count / (sample_count + 1)`, renormalized. The profile is
    /// re-averaged with the same weights and `sample_count` is incremented.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::InvalidInput` if the speaker id is unknown or
    /// the profiles have mismatched coefficient counts.
    pub fn apply_merge(
        &mut self,
        speaker_id: &str,
        sample_embedding: &Embedding,
        sample_profile: &MfccProfile,
    ) -> Result<VoiceRecord, VoiceError> {
        let record = self.records.get_mut(speaker_id).ok_or_else(|| {
            VoiceError::InvalidInput(format!("Unknown speaker id '{}'", speaker_id))
        })?;

        let w = record.sample_count as f32 / (record.sample_count as f32 + 1.0);
        let profile = record
            .profile
            .weighted_merge(sample_profile, w)
            .ok_or_else(|| {
                VoiceError::InvalidInput(
                    "Sample profile has a different coefficient count".to_string(),
                )
            })?;

        record.embedding = record
            .embedding
            .merge_weighted(sample_embedding, record.sample_count);
        record.profile = profile;
        record.sample_count += 1;
        record.updated_at_ms = now_ms();

        log::debug!(
            "Merged sample into '{}' (now {} samples)",
            speaker_id,
            record.sample_count
        );
        Ok(record.clone())
    }

    /// Discard all transient session-speaker state
    pub fn reset_session(&mut self) {
        if !self.sessions.is_empty() {
            log::debug!("Resetting {} session speakers", self.sessions.len());
        }
        self.sessions.clear();
    }

    /// Ids of the current unidentified session speakers
    pub fn session_speaker_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run the tiered match for a query embedding
    ///
    /// * `is_silent` short-circuits to the silence match.
    /// * A session-tier match appends the query to that speaker's embedding
    ///   history (bounded to `session_history_len` recent entries) so
    ///   repeated unidentified speakers converge.
    /// * No match allocates a fresh session speaker seeded with this single
    ///   embedding, returned with confidence 1.0.
    pub fn identify(
        &mut self,
        query: &Embedding,
        is_silent: bool,
        owner_threshold: f32,
        known_threshold: f32,
        session_history_len: usize,
    ) -> SpeakerMatch {
        let owner = self.owner();
        let owner_embedding = owner.map(|r| r.embedding.clone());
        let owner_id = owner.map(|r| r.speaker_id.clone());

        let known: Vec<(&str, &Embedding)> = self
            .records
            .values()
            .filter(|r| !r.is_owner)
            .map(|r| (r.speaker_id.as_str(), &r.embedding))
            .collect();

        let sessions: Vec<(String, Embedding)> = self
            .sessions
            .iter()
            .filter_map(|(id, history)| {
                Embedding::merge_sum(history).ok().map(|e| (id.clone(), e))
            })
            .collect();

        let decision = matcher::decide(
            query,
            is_silent,
            owner_embedding.as_ref(),
            &known,
            &sessions,
            owner_threshold,
            known_threshold,
        );

        match decision {
            MatchDecision::Silence => SpeakerMatch {
                speaker_id: SILENCE_SPEAKER_ID.to_string(),
                speaker_name: "Silence".to_string(),
                confidence: 0.0,
                is_owner: false,
                record: None,
            },
            MatchDecision::Owner { similarity } => {
                let id = owner_id.expect("owner decision implies an owner record");
                let record = self.records[&id].clone();
                SpeakerMatch {
                    speaker_id: record.speaker_id.clone(),
                    speaker_name: record.speaker_name.clone(),
                    confidence: similarity.clamp(0.0, 1.0),
                    is_owner: true,
                    record: Some(record),
                }
            }
            MatchDecision::Known {
                speaker_id,
                similarity,
            } => {
                let record = self.records[&speaker_id].clone();
                SpeakerMatch {
                    speaker_id: record.speaker_id.clone(),
                    speaker_name: record.speaker_name.clone(),
                    confidence: similarity.clamp(0.0, 1.0),
                    is_owner: false,
                    record: Some(record),
                }
            }
            MatchDecision::Session {
                session_id,
                similarity,
            } => {
                if let Some(history) = self.sessions.get_mut(&session_id) {
                    history.push(query.clone());
                    if history.len() > session_history_len {
                        let excess = history.len() - session_history_len;
                        history.drain(..excess);
                    }
                }
                SpeakerMatch {
                    speaker_id: session_id.clone(),
                    speaker_name: session_id,
                    confidence: similarity.clamp(0.0, 1.0),
                    is_owner: false,
                    record: None,
                }
            }
            MatchDecision::NewSpeaker => {
                self.session_counter += 1;
                let session_id = format!("session-speaker-{}", self.session_counter);
                self.sessions.insert(session_id.clone(), vec![query.clone()]);
                log::debug!("Allocated new session speaker '{}'", session_id);
                SpeakerMatch {
                    speaker_id: session_id.clone(),
                    speaker_name: session_id,
                    confidence: 1.0,
                    is_owner: false,
                    record: None,
                }
            }
        }
    }
}

/// Build a fresh [`VoiceRecord`] from merged enrollment results
pub fn new_record(
    speaker_id: String,
    speaker_name: String,
    embedding: Embedding,
    profile: MfccProfile,
    is_owner: bool,
    sample_count: u32,
) -> VoiceRecord {
    let now = now_ms();
    VoiceRecord {
        speaker_id,
        speaker_name,
        embedding,
        profile,
        is_owner,
        sample_count,
        created_at_ms: now,
        updated_at_ms: now,
    }
}
