//! tm-file: Clip loading and audio file I/O
//!
//! Provides:
//! - In-memory decoding (WAV via hound, everything else via symphonia)
//! - Async clip loading from files, URLs, recordings and instruments
//! - WAV serialization of mixed buffers
//! - Linear sample rate conversion
//! - Capture streams for live recording

mod capture;
mod decode;
mod loader;
mod resample;
mod wav;

pub use capture::*;
pub use decode::*;
pub use loader::*;
pub use resample::*;
pub use wav::*;
