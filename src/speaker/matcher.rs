//! Tiered match decision
//!
//! The threshold logic is a small state machine over match tiers, modeled as
//! an explicit outcome enum with a single decision function so the ordering
//! invariant stays visible and testable in isolation. Tiers are terminal and
//! strictly ordered: silence, owner, known speaker, session speaker, new
//! speaker. The owner check always runs before the general known-speaker
//! scan; owner identity must never be shadowed by a merely-similar known
//! speaker.

use crate::speaker::embedding::Embedding;
use crate::speaker::registry::VoiceRecord;
use serde::{Deserialize, Serialize};

/// Speaker id reported for utterances with no usable speech
pub const SILENCE_SPEAKER_ID: &str = "silence";

/// Result of one identification call; never persisted by this crate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerMatch {
    /// Matched speaker id, or `"silence"` / a session speaker id
    pub speaker_id: String,

    /// Display name of the matched speaker
    pub speaker_name: String,

    /// Match confidence in [0, 1]
    ///
    /// For the new-speaker tier this is 1.0: full confidence that the voice
    /// is distinct, not a measure of voice quality.
    pub confidence: f32,

    /// Whether the matched speaker is the enrolled owner
    pub is_owner: bool,

    /// The matched durable record, when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<VoiceRecord>,
}

/// Outcome of the tier decision, before the registry fills in names and ids
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    /// Utterance energy was below the silence floor; no similarity computed
    Silence,

    /// Query matched the owner record at or above the owner threshold
    Owner {
        /// Cosine similarity against the owner embedding
        similarity: f32,
    },

    /// Query matched a non-owner durable record
    Known {
        /// Id of the best-matching record
        speaker_id: String,
        /// Cosine similarity against that record's embedding
        similarity: f32,
    },

    /// Query matched the merged embedding of a transient session speaker
    Session {
        /// Session speaker id
        session_id: String,
        /// Cosine similarity against the merged session embedding
        similarity: f32,
    },

    /// Nothing matched; the caller allocates a fresh session speaker
    NewSpeaker,
}

/// Decide which tier a query embedding falls into
///
/// # Arguments
///
/// * `query` - Query embedding
/// * `is_silent` - Whether the originating profile's energy mean was below
///   the silence floor (tier 1, checked before any similarity)
/// * `owner` - The owner embedding, if an owner record exists
/// * `known` - (speaker_id, embedding) pairs for all non-owner records
/// * `sessions` - (session_id, merged embedding) pairs for session speakers
/// * `owner_threshold` - Similarity required for the owner tier
/// * `known_threshold` - Similarity required for the known and session tiers
pub fn decide(
    query: &Embedding,
    is_silent: bool,
    owner: Option<&Embedding>,
    known: &[(&str, &Embedding)],
    sessions: &[(String, Embedding)],
    owner_threshold: f32,
    known_threshold: f32,
) -> MatchDecision {
    if is_silent {
        return MatchDecision::Silence;
    }

    if let Some(owner_embedding) = owner {
        let similarity = query.cosine_similarity(owner_embedding);
        log::debug!("Owner similarity: {:.3}", similarity);
        if similarity >= owner_threshold {
            return MatchDecision::Owner { similarity };
        }
    }

    let best_known = known
        .iter()
        .map(|&(id, embedding)| (id, query.cosine_similarity(embedding)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((speaker_id, similarity)) = best_known {
        if similarity >= known_threshold {
            return MatchDecision::Known {
                speaker_id: speaker_id.to_string(),
                similarity,
            };
        }
    }

    let best_session = sessions
        .iter()
        .map(|(id, embedding)| (id, query.cosine_similarity(embedding)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((session_id, similarity)) = best_session {
        if similarity >= known_threshold {
            return MatchDecision::Session {
                session_id: session_id.clone(),
                similarity,
            };
        }
    }

    MatchDecision::NewSpeaker
}
