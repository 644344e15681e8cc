//! Speaker modeling and matching
//!
//! This module contains everything above the signal level:
//! - Embedding generation and cosine similarity
//! - The tiered match decision (owner -> known -> session -> new)
//! - The speaker registry with enrollment and session state

pub mod embedding;
pub mod matcher;
pub mod registry;
