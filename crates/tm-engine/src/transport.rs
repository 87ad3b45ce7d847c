//! Transport
//!
//! Play/pause/stop across tracks and the pull-based live render. A host
//! audio callback drains [`MixSession::render`] block by block; clips
//! advance by exactly the rendered span.

use tm_core::{AudioBuffer, ClipId, OverloadMode, SessionResult, TrackId, TrackState};

use crate::bus::MixBus;
use crate::session::MixSession;

impl MixSession {
    /// Track play button: toggles each clip independently
    pub fn play(&mut self, track: TrackId) -> SessionResult<TrackState> {
        let track = self.track_mut(track)?;
        let state = track.toggle_play();
        log::debug!("{} -> {:?}", track.name, state);
        Ok(state)
    }

    pub fn pause(&mut self, track: TrackId) -> SessionResult<()> {
        self.track_mut(track)?.pause();
        Ok(())
    }

    /// Pause and rewind every clip on the track
    pub fn stop(&mut self, track: TrackId) -> SessionResult<()> {
        self.track_mut(track)?.stop();
        Ok(())
    }

    pub fn play_all(&mut self) {
        self.tracks_mut().iter_mut().for_each(|t| t.play());
    }

    pub fn pause_all(&mut self) {
        self.tracks_mut().iter_mut().for_each(|t| t.pause());
    }

    pub fn stop_all(&mut self) {
        self.tracks_mut().iter_mut().for_each(|t| t.stop());
    }

    /// Move a clip's cursor (clamped to its duration)
    pub fn seek(&mut self, track: TrackId, clip: ClipId, seconds: f64) -> SessionResult<()> {
        self.clip_mut(track, clip)?.seek(seconds);
        Ok(())
    }

    /// Whether any clip is currently audible
    pub fn is_playing(&self) -> bool {
        self.tracks()
            .iter()
            .any(|t| t.clips().iter().any(|c| c.is_playing()))
    }

    /// Render the next `frames` frames of everything that is playing, at the
    /// live sample rate, then advance the playing clips.
    pub fn render(&mut self, frames: usize) -> AudioBuffer {
        let rate = self.config().live_sample_rate();
        let mut bus = MixBus::new(frames, rate);

        for track in self.tracks() {
            for clip in track.clips().iter().filter(|c| c.is_playing()) {
                let gain = track.effective_gain(clip);
                let buffer = clip.buffer();

                if buffer.sample_rate != rate {
                    bus.accumulate_at_rate(buffer, gain, clip.position(), clip.is_looping());
                    continue;
                }

                let mut source_offset = (clip.position() * rate as f64).round() as usize;
                let mut written = 0;
                while written < frames {
                    let mixed = bus.accumulate(buffer, gain, source_offset, written);
                    written += mixed;
                    // A wrap that yields nothing would spin forever
                    if !clip.is_looping() || (mixed == 0 && source_offset == 0) {
                        break;
                    }
                    source_offset = 0;
                }
            }
        }

        // Peak normalization needs the whole mix; only per-sample shaping applies live
        if self.config().overload == OverloadMode::SoftClip {
            bus.apply_overload(OverloadMode::SoftClip);
        }

        if rate > 0 {
            let seconds = frames as f64 / rate as f64;
            self.tracks_mut().iter_mut().for_each(|t| t.advance(seconds));
        }

        bus.into_buffer()
    }
}
