//! Mix Session
//!
//! Owned state of one mixing session: ordered tracks, in-flight clip loads
//! and live captures. Every operation here is synchronous; the async halves
//! (fetch, decode) live in [`crate::Mixer`], which brackets them with
//! [`MixSession::begin_load`] / [`MixSession::complete_load`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tm_core::{
    Clip, ClipId, LoadResult, MixConfig, MixError, MixResult, RecordingError, RecordingState,
    SessionError, SessionResult, SourceKind, Track, TrackId, UNNAMED_URL_LABEL,
};
use tm_file::{CaptureDevice, CaptureStream, LoadedClip};

use crate::mixdown::{ExportedMix, MixInput, MixdownEngine};

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Handle for one in-flight clip load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    fn next() -> Self {
        Self(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

/// What happened to a completed load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Clip appended to its track
    Attached(ClipId),
    /// Track (or ticket) went away while loading; result dropped
    Discarded,
}

impl AttachOutcome {
    pub fn clip_id(&self) -> Option<ClipId> {
        match self {
            Self::Attached(id) => Some(*id),
            Self::Discarded => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// All tracks, clips and pending work of one session
#[derive(Debug, Default)]
pub struct MixSession {
    config: MixConfig,
    tracks: Vec<Track>,
    pending: HashMap<LoadTicket, TrackId>,
    captures: HashMap<TrackId, CaptureStream>,
    tracks_created: usize,
    unnamed_urls: usize,
}

impl MixSession {
    pub fn new(config: MixConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    #[inline]
    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    // ───────────────────────────────────────────────────────────────────────
    // Tracks
    // ───────────────────────────────────────────────────────────────────────

    /// Append an empty track named "Track N"
    pub fn create_track(&mut self) -> TrackId {
        self.tracks_created += 1;
        let track = Track::new(format!("Track {}", self.tracks_created));
        let id = track.id;
        log::info!("Created {} ({:?})", track.name, id);
        self.tracks.push(track);
        id
    }

    /// Remove a track, cancelling its loads and discarding any recording
    pub fn delete_track(&mut self, id: TrackId) -> SessionResult<Track> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(SessionError::TrackNotFound(id))?;

        if let Some(stream) = self.captures.remove(&id) {
            let dropped = stream.discard();
            log::info!("Discarded recording on deleted track {id:?} ({dropped} chunks)");
        }

        let before = self.pending.len();
        self.pending.retain(|_, track| *track != id);
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} pending load(s) for {id:?}");
        }

        let mut track = self.tracks.remove(index);
        track.stop();
        track.set_recording_state(RecordingState::Idle);
        let clips = track.clear_clips();
        log::info!("Deleted {} ({clips} clips)", track.name);
        Ok(track)
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub(crate) fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn track(&self, id: TrackId) -> SessionResult<&Track> {
        self.tracks
            .iter()
            .find(|t| t.id == id)
            .ok_or(SessionError::TrackNotFound(id))
    }

    pub fn track_mut(&mut self, id: TrackId) -> SessionResult<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(SessionError::TrackNotFound(id))
    }

    pub fn clip(&self, track: TrackId, clip: ClipId) -> SessionResult<&Clip> {
        self.track(track)?
            .clip(clip)
            .ok_or(SessionError::ClipNotFound(clip))
    }

    pub fn clip_mut(&mut self, track: TrackId, clip: ClipId) -> SessionResult<&mut Clip> {
        self.track_mut(track)?
            .clip_mut(clip)
            .ok_or(SessionError::ClipNotFound(clip))
    }

    /// Total clips across all tracks
    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(|t| t.clips().len()).sum()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Clips
    // ───────────────────────────────────────────────────────────────────────

    /// Register an in-flight load targeting `track`
    pub fn begin_load(&mut self, track: TrackId) -> SessionResult<LoadTicket> {
        self.track(track)?;
        let ticket = LoadTicket::next();
        self.pending.insert(ticket, track);
        Ok(ticket)
    }

    /// Finish a load started with [`Self::begin_load`].
    ///
    /// A ticket that was cancelled in the meantime discards the result, even
    /// a failed one.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: LoadResult<LoadedClip>,
    ) -> SessionResult<AttachOutcome> {
        let Some(track_id) = self.pending.remove(&ticket) else {
            match &result {
                Ok(loaded) => log::warn!("Dropping late load '{}': track is gone", loaded.name),
                Err(e) => log::warn!("Dropping late load failure: {e}"),
            }
            return Ok(AttachOutcome::Discarded);
        };

        let loaded = result?;
        self.track(track_id)?;
        let clip = self.name_clip(loaded).into_clip();
        let name = clip.name.clone();
        let track = self.track_mut(track_id)?;
        let id = track.add_clip(clip);
        log::debug!("Attached '{name}' to {} as {id:?}", track.name);
        Ok(AttachOutcome::Attached(id))
    }

    /// Number URL clips that carry no file name: Music1, Music2, ...
    fn name_clip(&mut self, mut loaded: LoadedClip) -> LoadedClip {
        if loaded.kind == SourceKind::Url && loaded.name == UNNAMED_URL_LABEL {
            self.unnamed_urls += 1;
            loaded.name = format!("{UNNAMED_URL_LABEL}{}", self.unnamed_urls);
        }
        loaded
    }

    /// Drop a pending load; its result will be discarded
    pub fn cancel_load(&mut self, ticket: LoadTicket) -> bool {
        self.pending.remove(&ticket).is_some()
    }

    /// Loads still in flight
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Attach an already decoded clip
    pub fn attach_loaded(&mut self, track: TrackId, loaded: LoadedClip) -> SessionResult<ClipId> {
        self.track(track)?;
        let clip = self.name_clip(loaded).into_clip();
        Ok(self.track_mut(track)?.add_clip(clip))
    }

    pub fn delete_clip(&mut self, track: TrackId, clip: ClipId) -> SessionResult<Clip> {
        self.track_mut(track)?
            .remove_clip(clip)
            .ok_or(SessionError::ClipNotFound(clip))
    }

    pub fn set_track_volume(&mut self, track: TrackId, volume: f64) -> SessionResult<()> {
        self.track_mut(track)?.set_volume(volume);
        Ok(())
    }

    pub fn set_clip_volume(
        &mut self,
        track: TrackId,
        clip: ClipId,
        volume: f64,
    ) -> SessionResult<()> {
        self.clip_mut(track, clip)?.set_volume(volume);
        Ok(())
    }

    /// Toggle looping on a clip wherever it lives
    pub fn set_clip_loop(&mut self, clip: ClipId, looping: bool) -> SessionResult<()> {
        self.tracks
            .iter_mut()
            .find_map(|t| t.clip_mut(clip))
            .ok_or(SessionError::ClipNotFound(clip))?
            .set_looping(looping);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────
    // Recording
    // ───────────────────────────────────────────────────────────────────────

    /// Open a capture stream on `device` and arm the track
    pub fn start_recording(
        &mut self,
        track: TrackId,
        device: &dyn CaptureDevice,
    ) -> SessionResult<()> {
        if !self.track(track)?.can_start_recording() {
            return Err(RecordingError::AlreadyRecording.into());
        }

        let stream = device.open()?;
        self.captures.insert(track, stream);

        let track = self.track_mut(track)?;
        track.set_recording_state(RecordingState::Recording);
        log::info!("Recording started on {} via '{}'", track.name, device.name());
        Ok(())
    }

    /// Close the capture and collect its chunks.
    ///
    /// The returned ticket guards the decode that follows.
    pub fn finish_recording(
        &mut self,
        track: TrackId,
    ) -> SessionResult<(LoadTicket, Vec<Vec<u8>>)> {
        if !self.track(track)?.can_stop_recording() {
            return Err(RecordingError::NotRecording.into());
        }

        let chunks = self
            .captures
            .remove(&track)
            .map(CaptureStream::finish)
            .unwrap_or_default();

        let track_ref = self.track_mut(track)?;
        track_ref.set_recording_state(RecordingState::Idle);
        log::info!(
            "Recording stopped on {} ({} chunks)",
            track_ref.name,
            chunks.len()
        );

        let ticket = self.begin_load(track)?;
        Ok((ticket, chunks))
    }

    /// Whether any track is currently recording
    pub fn is_recording(&self) -> bool {
        !self.captures.is_empty() || self.tracks.iter().any(Track::is_recording)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Export
    // ───────────────────────────────────────────────────────────────────────

    /// Snapshot every clip with its effective gain.
    ///
    /// Refuses while loads are in flight; [`crate::Mixer::export_mix`] waits
    /// for them instead.
    pub fn mix_inputs(&self) -> MixResult<Vec<MixInput>> {
        if !self.pending.is_empty() {
            return Err(MixError::SourceUnavailable(format!(
                "{} clip load(s) still in flight",
                self.pending.len()
            )));
        }

        Ok(self
            .tracks
            .iter()
            .flat_map(|track| {
                track.clips().iter().map(move |clip| {
                    MixInput::new(
                        clip.name.clone(),
                        clip.buffer().clone(),
                        track.effective_gain(clip),
                    )
                })
            })
            .collect())
    }

    /// Render every clip into a WAV export
    pub fn export_mix(&self) -> MixResult<ExportedMix> {
        MixdownEngine::new(self.config.clone()).export(&self.mix_inputs()?)
    }
}
