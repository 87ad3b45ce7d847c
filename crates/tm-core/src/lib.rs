//! tm-core: Shared types for TrackMix
//!
//! This crate provides the foundational types used across all TrackMix crates:
//! decoded audio buffers, clips, tracks, mixer configuration and the error
//! taxonomy surfaced to the UI collaborator.

mod clip;
mod config;
mod error;
mod sample;
mod track;

pub use clip::*;
pub use config::*;
pub use error::*;
pub use sample::*;
pub use track::*;

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of channels in every mixdown and live render block
pub const OUTPUT_CHANNELS: usize = 2;

/// Live render rate used when the config does not pin one
pub const DEFAULT_LIVE_SAMPLE_RATE: u32 = 48000;

// Global ID counter for generating unique IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Clamp a gain value to the [0, 1] slider range.
///
/// NaN maps to silence.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
