//! Audio preprocessing
//!
//! Everything that runs before feature extraction:
//! - Linear resampling to the pipeline's target rate
//! - Framing with a Hamming taper and RMS silence gating

pub mod framing;
pub mod resample;
