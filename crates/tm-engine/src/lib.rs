//! tm-engine: Session, transport and mixdown
//!
//! Provides:
//! - `MixSession`: tracks, clips, pending loads and recordings
//! - Transport: per-track and global play/pause/stop plus live render
//! - `MixdownEngine`: offline summation to a WAV export
//! - `Mixer`: cloneable async handle over a session

mod bus;
mod mixdown;
mod mixer;
mod session;
mod transport;

pub use bus::*;
pub use mixdown::*;
pub use mixer::*;
pub use session::*;

pub use tm_core::{
    AudioBuffer, ClipId, ClipSource, Instrument, MixConfig, MixError, SessionError, TrackId,
    TrackState,
};
