//! Error types for the speaker identification engine

use std::fmt;

/// Errors that can occur during identification or enrollment
#[derive(Debug, Clone)]
pub enum VoiceError {
    /// Invalid input parameters (empty audio, bad sample rate, wrong embedding length)
    InvalidInput(String),

    /// Processing error during feature extraction
    ProcessingError(String),

    /// Enrollment asserted is_owner=true while a different speaker already holds the flag
    DuplicateOwner(String),

    /// Every submitted enrollment sample was filtered out as too quiet
    InsufficientEnrollmentSamples(String),
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            VoiceError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            VoiceError::DuplicateOwner(msg) => write!(f, "Duplicate owner: {}", msg),
            VoiceError::InsufficientEnrollmentSamples(msg) => {
                write!(f, "Insufficient enrollment samples: {}", msg)
            }
        }
    }
}

impl std::error::Error for VoiceError {}
