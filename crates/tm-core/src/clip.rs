//! Clips: decoded sources attached to a track, with their playback cursor

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{AudioBuffer, clamp_unit, next_id};

/// Unique clip identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl ClipId {
    pub fn next() -> Self {
        Self(next_id())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Built-in draggable instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Bass,
    Guitar,
    Drums,
    Violin,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [Self::Bass, Self::Guitar, Self::Drums, Self::Violin];

    /// Bundled file name inside the instrument directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Bass => "bass.mp3",
            Self::Guitar => "guitar.mp3",
            Self::Drums => "drums.mp3",
            Self::Violin => "violin.mp3",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bass => "Bass",
            Self::Guitar => "Guitar",
            Self::Drums => "Drums",
            Self::Violin => "Violin",
        }
    }

    /// Parse the drag payload name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Where a clip's audio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    File,
    Url,
    Recording,
    Instrument,
}

/// Label of a URL clip whose path has no file segment.
///
/// The session numbers these as `Music1`, `Music2`, ...
pub const UNNAMED_URL_LABEL: &str = "Music";

/// Source descriptor handed to the clip loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipSource {
    /// Local audio file
    File(PathBuf),
    /// Remote audio, fetched with an unauthenticated GET
    Url(String),
    /// Encoded chunks captured by a recording session, in arrival order
    Recording(Vec<Vec<u8>>),
    /// Bundled instrument sample
    Instrument(Instrument),
}

impl ClipSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::File(_) => SourceKind::File,
            Self::Url(_) => SourceKind::Url,
            Self::Recording(_) => SourceKind::Recording,
            Self::Instrument(_) => SourceKind::Instrument,
        }
    }

    /// Display name for the resulting clip
    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Audio".to_string()),
            Self::Url(url) => {
                let rest = url.split_once("://").map_or(url.as_str(), |(_, r)| r);
                let rest = rest.split(['?', '#']).next().unwrap_or_default();
                rest.split_once('/')
                    .and_then(|(_, path)| path.trim_end_matches('/').rsplit('/').next())
                    .filter(|s| !s.is_empty())
                    .unwrap_or(UNNAMED_URL_LABEL)
                    .to_string()
            }
            Self::Recording(_) => "Recording".to_string(),
            Self::Instrument(instrument) => instrument.name().to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIP
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-clip playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipPlayback {
    #[default]
    Paused,
    Playing,
}

/// Decoded audio clip on a track
#[derive(Debug, Clone)]
pub struct Clip {
    pub id: ClipId,
    pub name: String,
    pub kind: SourceKind,
    buffer: Arc<AudioBuffer>,
    volume: f64,
    looping: bool,
    playback: ClipPlayback,
    position: f64,
}

impl Clip {
    pub fn new(name: impl Into<String>, kind: SourceKind, buffer: Arc<AudioBuffer>) -> Self {
        Self {
            id: ClipId::next(),
            name: name.into(),
            kind,
            buffer,
            volume: 1.0,
            looping: false,
            playback: ClipPlayback::Paused,
            position: 0.0,
        }
    }

    /// Decoded buffer (immutable once loaded)
    #[inline]
    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set clip volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_unit(volume);
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    #[inline]
    pub fn playback(&self) -> ClipPlayback {
        self.playback
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playback == ClipPlayback::Playing
    }

    /// Playback position in seconds
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// True once a non-looping clip has run to its end
    pub fn has_ended(&self) -> bool {
        self.position >= self.duration()
    }

    /// Start playback from the current position; an ended clip restarts at 0
    pub fn play(&mut self) {
        if self.has_ended() {
            self.position = 0.0;
        }
        self.playback = ClipPlayback::Playing;
    }

    /// Pause, keeping the position
    pub fn pause(&mut self) {
        self.playback = ClipPlayback::Paused;
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) {
        self.playback = ClipPlayback::Paused;
        self.position = 0.0;
    }

    /// Flip between playing and paused. Returns true if now playing.
    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.is_playing()
    }

    /// Move the cursor, clamped to the clip
    pub fn seek(&mut self, seconds: f64) {
        self.position = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.duration())
        };
    }

    /// Advance a playing clip by `seconds` of wall time.
    ///
    /// Looping clips wrap; other clips stop at their end and pause.
    pub fn advance(&mut self, seconds: f64) {
        if !self.is_playing() {
            return;
        }

        let duration = self.duration();
        if duration <= 0.0 {
            self.pause();
            return;
        }

        self.position += seconds;
        if self.position >= duration {
            if self.looping {
                self.position %= duration;
            } else {
                self.position = duration;
                self.pause();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_clip(seconds: f64) -> Clip {
        let frames = (seconds * 100.0) as usize;
        let buffer = Arc::new(AudioBuffer::mono(vec![0.5; frames], 100));
        Clip::new("test", SourceKind::File, buffer)
    }

    #[test]
    fn test_instrument_lookup() {
        assert_eq!(Instrument::from_name("drums"), Some(Instrument::Drums));
        assert_eq!(Instrument::from_name("Violin "), Some(Instrument::Violin));
        assert_eq!(Instrument::from_name("Kazoo"), None);
        assert_eq!(Instrument::Bass.file_name(), "bass.mp3");
    }

    #[test]
    fn test_source_label() {
        let url = ClipSource::Url("https://example.com/loops/beat.wav".into());
        assert_eq!(url.label(), "beat.wav");
        assert_eq!(url.kind(), SourceKind::Url);

        let bare = ClipSource::Url("https://example.com/".into());
        assert_eq!(bare.label(), UNNAMED_URL_LABEL);
        let host_only = ClipSource::Url("https://example.com".into());
        assert_eq!(host_only.label(), UNNAMED_URL_LABEL);
        let query = ClipSource::Url("https://example.com/a/loop.mp3?token=1".into());
        assert_eq!(query.label(), "loop.mp3");

        let file = ClipSource::File(PathBuf::from("/tmp/take.wav"));
        assert_eq!(file.label(), "take.wav");
    }

    #[test]
    fn test_volume_clamping() {
        let mut clip = test_clip(1.0);
        clip.set_volume(1.5);
        assert_eq!(clip.volume(), 1.0);
        clip.set_volume(-0.2);
        assert_eq!(clip.volume(), 0.0);
    }

    #[test]
    fn test_toggle_and_stop() {
        let mut clip = test_clip(2.0);
        assert!(clip.toggle());
        clip.advance(0.5);
        assert!(!clip.toggle());
        assert!((clip.position() - 0.5).abs() < 1e-9);

        clip.stop();
        assert!(!clip.is_playing());
        assert_eq!(clip.position(), 0.0);
    }

    #[test]
    fn test_advance_past_end() {
        let mut clip = test_clip(1.0);
        clip.play();
        clip.advance(1.5);
        assert!(!clip.is_playing());
        assert!(clip.has_ended());

        // Playing an ended clip restarts it
        clip.play();
        assert_eq!(clip.position(), 0.0);
    }

    #[test]
    fn test_advance_looping() {
        let mut clip = test_clip(1.0);
        clip.set_looping(true);
        clip.play();
        clip.advance(1.25);
        assert!(clip.is_playing());
        assert!((clip.position() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_seek_clamps() {
        let mut clip = test_clip(1.0);
        clip.seek(3.0);
        assert_eq!(clip.position(), 1.0);
        clip.seek(-1.0);
        assert_eq!(clip.position(), 0.0);
    }
}
