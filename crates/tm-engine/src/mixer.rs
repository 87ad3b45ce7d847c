//! Mixer: shared handle over one [`MixSession`]
//!
//! Wraps the session in `Arc<Mutex<_>>` together with the clip loader and
//! the capture device. The lock is only taken for short synchronous
//! sections and never held across an `.await`.

use std::pin::pin;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tm_core::{
    AudioBuffer, ClipId, ClipSource, LoadResult, MixConfig, MixError, RecordingError,
    SessionError, SessionResult, TrackId, TrackState,
};
use tm_file::{CaptureDevice, ChannelCaptureDevice, ClipLoader, LoadedClip};
use tokio::sync::Notify;

use crate::mixdown::{ExportedMix, MixdownEngine};
use crate::session::{AttachOutcome, LoadTicket, MixSession};

/// Cloneable mixer handle
#[derive(Clone)]
pub struct Mixer {
    session: Arc<Mutex<MixSession>>,
    loader: ClipLoader,
    capture: Arc<dyn CaptureDevice>,
    /// Signalled whenever an in-flight load settles or is cancelled
    settled: Arc<Notify>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PENDING LOAD GUARD
// ═══════════════════════════════════════════════════════════════════════════════

/// Holds a load ticket across the fetch/decode await.
///
/// Dropping the guard before [`PendingLoad::complete`] (timeout, `select!`,
/// aborted task) cancels the ticket so the session does not wait on it.
struct PendingLoad {
    session: Arc<Mutex<MixSession>>,
    settled: Arc<Notify>,
    ticket: Option<LoadTicket>,
    /// What is lost if the guard is dropped
    what: &'static str,
}

impl PendingLoad {
    fn new(mixer: &Mixer, ticket: LoadTicket, what: &'static str) -> Self {
        Self {
            session: Arc::clone(&mixer.session),
            settled: Arc::clone(&mixer.settled),
            ticket: Some(ticket),
            what,
        }
    }

    fn complete(mut self, result: LoadResult<LoadedClip>) -> SessionResult<AttachOutcome> {
        let Some(ticket) = self.ticket.take() else {
            return Ok(AttachOutcome::Discarded);
        };
        let outcome = self.session.lock().complete_load(ticket, result);
        self.settled.notify_waiters();
        outcome
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        if self.session.lock().cancel_load(ticket) {
            log::warn!("{} dropped before it finished loading", self.what);
        }
        self.settled.notify_waiters();
    }
}

impl Mixer {
    /// Mixer with a host-fed capture device
    pub fn new(config: MixConfig) -> Self {
        Self::with_capture_device(config, Arc::new(ChannelCaptureDevice::default()))
    }

    pub fn with_capture_device(config: MixConfig, capture: Arc<dyn CaptureDevice>) -> Self {
        let loader = ClipLoader::new(&config);
        Self {
            session: Arc::new(Mutex::new(MixSession::new(config))),
            loader,
            capture,
            settled: Arc::new(Notify::new()),
        }
    }

    /// Read session state under the lock
    pub fn with_session<R>(&self, f: impl FnOnce(&MixSession) -> R) -> R {
        f(&self.session.lock())
    }

    pub fn loader(&self) -> &ClipLoader {
        &self.loader
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TRACKS / CLIPS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_track(&self) -> TrackId {
        self.session.lock().create_track()
    }

    pub fn delete_track(&self, track: TrackId) -> SessionResult<()> {
        self.session.lock().delete_track(track)?;
        self.settled.notify_waiters();
        Ok(())
    }

    /// Load a source and append it to `track`.
    ///
    /// If the track is deleted while the load is in flight the result is
    /// dropped and `AttachOutcome::Discarded` is returned. Dropping the
    /// future cancels the load.
    pub async fn attach_clip(
        &self,
        track: TrackId,
        source: ClipSource,
    ) -> SessionResult<AttachOutcome> {
        let ticket = self.session.lock().begin_load(track)?;
        let pending = PendingLoad::new(self, ticket, "Clip load");
        let result = self.loader.load(source).await;
        pending.complete(result)
    }

    /// Load several sources concurrently; results come back in source order
    pub async fn attach_clips(
        &self,
        track: TrackId,
        sources: Vec<ClipSource>,
    ) -> Vec<SessionResult<AttachOutcome>> {
        join_all(
            sources
                .into_iter()
                .map(|source| self.attach_clip(track, source)),
        )
        .await
    }

    pub fn delete_clip(&self, track: TrackId, clip: ClipId) -> SessionResult<()> {
        self.session.lock().delete_clip(track, clip).map(|_| ())
    }

    pub fn set_track_volume(&self, track: TrackId, volume: f64) -> SessionResult<()> {
        self.session.lock().set_track_volume(track, volume)
    }

    pub fn set_clip_volume(&self, track: TrackId, clip: ClipId, volume: f64) -> SessionResult<()> {
        self.session.lock().set_clip_volume(track, clip, volume)
    }

    pub fn set_clip_loop(&self, clip: ClipId, looping: bool) -> SessionResult<()> {
        self.session.lock().set_clip_loop(clip, looping)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TRANSPORT
    // ═══════════════════════════════════════════════════════════════════════

    pub fn play(&self, track: TrackId) -> SessionResult<TrackState> {
        self.session.lock().play(track)
    }

    pub fn pause(&self, track: TrackId) -> SessionResult<()> {
        self.session.lock().pause(track)
    }

    pub fn stop(&self, track: TrackId) -> SessionResult<()> {
        self.session.lock().stop(track)
    }

    pub fn play_all(&self) {
        self.session.lock().play_all();
    }

    pub fn pause_all(&self) {
        self.session.lock().pause_all();
    }

    pub fn stop_all(&self) {
        self.session.lock().stop_all();
    }

    pub fn seek(&self, track: TrackId, clip: ClipId, seconds: f64) -> SessionResult<()> {
        self.session.lock().seek(track, clip, seconds)
    }

    /// Pull the next live block
    pub fn render(&self, frames: usize) -> AudioBuffer {
        self.session.lock().render(frames)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RECORDING
    // ═══════════════════════════════════════════════════════════════════════

    pub fn start_recording(&self, track: TrackId) -> SessionResult<()> {
        self.session
            .lock()
            .start_recording(track, self.capture.as_ref())
    }

    /// Stop capturing, decode the take and append it as a clip
    pub async fn stop_recording(&self, track: TrackId) -> SessionResult<AttachOutcome> {
        let (ticket, chunks) = self.session.lock().finish_recording(track)?;
        let pending = PendingLoad::new(self, ticket, "Recording take");
        let result = self.loader.load(ClipSource::Recording(chunks)).await;

        match pending.complete(result) {
            Err(SessionError::Load(e)) => Err(RecordingError::Load(e).into()),
            other => other,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════

    /// Mix every clip and encode the WAV off the async executor.
    ///
    /// Waits for in-flight clip loads to settle before taking the snapshot.
    pub async fn export_mix(&self) -> SessionResult<ExportedMix> {
        let (engine, inputs) = loop {
            // Registered before the check so a load settling in between still wakes us
            let mut settled = pin!(self.settled.notified());
            settled.as_mut().enable();

            {
                let session = self.session.lock();
                let pending = session.pending_loads();
                if pending == 0 {
                    break (
                        MixdownEngine::new(session.config().clone()),
                        session.mix_inputs()?,
                    );
                }
                log::debug!("Export waiting on {pending} clip load(s)");
            }

            settled.await;
        };

        let export = tokio::task::spawn_blocking(move || engine.export(&inputs))
            .await
            .map_err(|e| MixError::Encode(format!("mixdown task failed: {e}")))??;

        Ok(export)
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("capture", &self.capture.name())
            .field(
                "tracks",
                &self.session.try_lock().map(|s| s.tracks().len()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixer_track_lifecycle() {
        let mixer = Mixer::new(MixConfig::default());
        let track = mixer.create_track();

        assert_eq!(mixer.with_session(|s| s.tracks().len()), 1);
        mixer.set_track_volume(track, 2.0).unwrap();
        assert_eq!(
            mixer.with_session(|s| s.track(track).map(|t| t.volume())).unwrap(),
            1.0
        );

        mixer.delete_track(track).unwrap();
        assert!(matches!(
            mixer.delete_track(track),
            Err(SessionError::TrackNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_attach_to_missing_track() {
        let mixer = Mixer::new(MixConfig::default());
        let err = mixer
            .attach_clip(TrackId(u64::MAX), ClipSource::Url("https://example.com/a.wav".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TrackNotFound(_)));
    }

    #[tokio::test]
    async fn test_export_empty_session() {
        let mixer = Mixer::new(MixConfig::default());
        mixer.create_track();

        let err = mixer.export_mix().await.unwrap_err();
        assert_eq!(err, SessionError::Mix(MixError::EmptyMix));
    }
}
