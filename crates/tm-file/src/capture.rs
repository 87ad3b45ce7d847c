//! Live capture plumbing
//!
//! A recording session receives encoded audio chunks (in arrival order)
//! from whatever host thread owns the microphone. Chunks travel over a
//! crossbeam channel; closing the stream makes later chunks bounce off the
//! feed, so anything not yet delivered at stop time is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tm_core::RecordingError;

/// Source of capture streams (microphone, loopback, test double)
pub trait CaptureDevice: Send + Sync {
    /// Acquire a new capture stream
    fn open(&self) -> Result<CaptureStream, RecordingError>;

    /// Device name for logging
    fn name(&self) -> &str {
        "capture"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STREAM / FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// Receiving end held by the recording track
#[derive(Debug)]
pub struct CaptureStream {
    chunks: Receiver<Vec<u8>>,
    active: Arc<AtomicBool>,
}

/// Producing end held by the host capture callback
#[derive(Debug, Clone)]
pub struct CaptureFeed {
    chunks: Sender<Vec<u8>>,
    active: Arc<AtomicBool>,
}

/// Create a connected feed/stream pair
pub fn capture_pair() -> (CaptureFeed, CaptureStream) {
    let (tx, rx) = unbounded();
    let active = Arc::new(AtomicBool::new(true));
    (
        CaptureFeed {
            chunks: tx,
            active: Arc::clone(&active),
        },
        CaptureStream { chunks: rx, active },
    )
}

impl CaptureFeed {
    /// Deliver one chunk. Returns false if the stream is closed; empty
    /// chunks are ignored.
    pub fn push(&self, chunk: Vec<u8>) -> bool {
        if !self.is_active() {
            return false;
        }
        if chunk.is_empty() {
            return true;
        }
        self.chunks.send(chunk).is_ok()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl CaptureStream {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Close the stream and collect every chunk delivered so far
    pub fn finish(self) -> Vec<Vec<u8>> {
        self.active.store(false, Ordering::Release);
        self.chunks.try_iter().collect()
    }

    /// Close the stream and drop whatever was captured
    pub fn discard(self) -> usize {
        self.active.store(false, Ordering::Release);
        self.chunks.try_iter().count()
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL DEVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Capture device whose chunks are pushed in by the host.
///
/// After each successful `open`, the host picks up the matching feed with
/// [`ChannelCaptureDevice::take_feed`].
#[derive(Debug)]
pub struct ChannelCaptureDevice {
    name: String,
    available: AtomicBool,
    feed: Mutex<Option<CaptureFeed>>,
}

impl ChannelCaptureDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: AtomicBool::new(true),
            feed: Mutex::new(None),
        }
    }

    /// Simulate permission denial / unplugged microphone
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Feed for the most recently opened stream
    pub fn take_feed(&self) -> Option<CaptureFeed> {
        self.feed.lock().take()
    }
}

impl Default for ChannelCaptureDevice {
    fn default() -> Self {
        Self::new("default input")
    }
}

impl CaptureDevice for ChannelCaptureDevice {
    fn open(&self) -> Result<CaptureStream, RecordingError> {
        if !self.available.load(Ordering::Acquire) {
            return Err(RecordingError::DeviceUnavailable(self.name.clone()));
        }

        let (feed, stream) = capture_pair();
        *self.feed.lock() = Some(feed);
        Ok(stream)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
