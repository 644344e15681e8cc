//! Feature extraction modules
//!
//! This module contains the per-frame signal analysis:
//! - Power spectrum (FFT)
//! - Mel filterbank construction and caching
//! - MFCC extraction (DCT-II over log-Mel energies)
//! - Autocorrelation pitch estimation
//! - Utterance-level profile aggregation

pub mod mel;
pub mod mfcc;
pub mod pitch;
pub mod profile;
pub mod spectrum;
