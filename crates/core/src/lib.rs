//! Core types for the phishguard detection service
//!
//! This crate provides foundational types used across all other crates:
//! - Transcript fragment types
//! - Audio level diagnostics
//! - Time helpers for the outbound event contract

pub mod audio;
pub mod time;
pub mod transcript;

pub use audio::pcm16_volume;
pub use time::epoch_secs;
pub use transcript::TranscriptFragment;
