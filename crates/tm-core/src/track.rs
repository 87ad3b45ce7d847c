//! Tracks: ordered clips sharing transport controls and a volume multiplier

use serde::{Deserialize, Serialize};

use crate::{Clip, ClipId, clamp_unit, next_id};

/// Unique track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl TrackId {
    pub fn next() -> Self {
        Self(next_id())
    }
}

/// Track-level transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Recording state (at most one capture per track)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

// ═══════════════════════════════════════════════════════════════════════════
// TRACK
// ═══════════════════════════════════════════════════════════════════════════

/// Audio track with clips
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    clips: Vec<Clip>,
    volume: f64,
    state: TrackState,
    recording: RecordingState,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackId::next(),
            name: name.into(),
            clips: Vec::new(),
            volume: 1.0,
            state: TrackState::Idle,
            recording: RecordingState::Idle,
        }
    }

    #[inline]
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    #[inline]
    pub fn clips_mut(&mut self) -> &mut [Clip] {
        &mut self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// Append a clip. It joins paused at position 0.
    pub fn add_clip(&mut self, clip: Clip) -> ClipId {
        let id = clip.id;
        self.clips.push(clip);
        id
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<Clip> {
        let index = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(index))
    }

    /// Drop every clip (track deletion cascade)
    pub fn clear_clips(&mut self) -> usize {
        let count = self.clips.len();
        self.clips.clear();
        count
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the track slider, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_unit(volume);
    }

    /// Effective gain for a clip on this track: track volume × clip volume
    #[inline]
    pub fn effective_gain(&self, clip: &Clip) -> f64 {
        self.volume * clip.volume()
    }

    #[inline]
    pub fn state(&self) -> TrackState {
        self.state
    }

    // ───────────────────────────────────────────────────────────────────────
    // Transport
    // ───────────────────────────────────────────────────────────────────────

    /// Play button: every clip flips independently based on its own state.
    pub fn toggle_play(&mut self) -> TrackState {
        let mut any_playing = self.clips.is_empty();
        for clip in &mut self.clips {
            any_playing |= clip.toggle();
        }
        self.state = if any_playing {
            TrackState::Playing
        } else {
            TrackState::Paused
        };
        self.state
    }

    /// Unconditional play (used by play-all)
    pub fn play(&mut self) {
        self.clips.iter_mut().for_each(Clip::play);
        self.state = TrackState::Playing;
    }

    /// Pause every clip, keeping positions
    pub fn pause(&mut self) {
        self.clips.iter_mut().for_each(Clip::pause);
        self.state = TrackState::Paused;
    }

    /// Pause every clip and rewind to zero
    pub fn stop(&mut self) {
        self.clips.iter_mut().for_each(Clip::stop);
        self.state = TrackState::Idle;
    }

    /// Re-derive the track state after clips advanced on their own
    pub(crate) fn settle(&mut self) {
        if self.state == TrackState::Playing
            && !self.clips.is_empty()
            && !self.clips.iter().any(Clip::is_playing)
        {
            self.state = TrackState::Paused;
        }
    }

    /// Advance every playing clip by `seconds`
    pub fn advance(&mut self, seconds: f64) {
        for clip in &mut self.clips {
            clip.advance(seconds);
        }
        self.settle();
    }

    // ───────────────────────────────────────────────────────────────────────
    // Recording
    // ───────────────────────────────────────────────────────────────────────

    #[inline]
    pub fn recording_state(&self) -> RecordingState {
        self.recording
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording == RecordingState::Recording
    }

    /// Whether the record control is enabled
    #[inline]
    pub fn can_start_recording(&self) -> bool {
        !self.is_recording()
    }

    /// Whether the stop-recording control is enabled
    #[inline]
    pub fn can_stop_recording(&self) -> bool {
        self.is_recording()
    }

    pub fn set_recording_state(&mut self, state: RecordingState) {
        self.recording = state;
    }
}
