//! Clip loader
//!
//! Resolves a `ClipSource` into a fully decoded buffer:
//! - local files are read with tokio
//! - http(s) URLs are fetched with reqwest
//! - recordings are concatenated chunk by chunk
//! - instruments resolve to bundled files
//!
//! The loader never touches session state; callers decide what to do with
//! the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tm_core::{
    AudioBuffer, Clip, ClipSource, Instrument, LoadError, LoadResult, MixConfig, SourceKind,
};
use url::Url;

use crate::decode::decode_bytes;

/// Decoded result of one load
#[derive(Debug, Clone)]
pub struct LoadedClip {
    pub name: String,
    pub kind: SourceKind,
    pub buffer: AudioBuffer,
}

impl LoadedClip {
    /// Turn into a clip ready to attach
    pub fn into_clip(self) -> Clip {
        Clip::new(self.name, self.kind, Arc::new(self.buffer))
    }
}

/// Async clip loader
#[derive(Debug, Clone)]
pub struct ClipLoader {
    client: reqwest::Client,
    instrument_dir: PathBuf,
}

impl ClipLoader {
    pub fn new(config: &MixConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });

        Self {
            client,
            instrument_dir: config.instrument_dir.clone(),
        }
    }

    /// Load and decode one source
    pub async fn load(&self, source: ClipSource) -> LoadResult<LoadedClip> {
        let name = source.label();
        let kind = source.kind();

        let buffer = match source {
            ClipSource::File(path) => self.load_file(&path).await?,
            ClipSource::Url(url) => self.load_url(&url).await?,
            ClipSource::Recording(chunks) => Self::load_recording(chunks).await?,
            ClipSource::Instrument(instrument) => {
                let path = self.instrument_path(instrument);
                self.load_file(&path).await?
            }
        };

        log::debug!(
            "Loaded '{}': {} ch, {} Hz, {:.3}s",
            name,
            buffer.num_channels(),
            buffer.sample_rate,
            buffer.duration()
        );

        Ok(LoadedClip { name, kind, buffer })
    }

    /// Load independent sources concurrently, one result per source in order
    pub async fn load_all(&self, sources: Vec<ClipSource>) -> Vec<LoadResult<LoadedClip>> {
        join_all(sources.into_iter().map(|source| self.load(source))).await
    }

    /// Bundled file backing an instrument
    pub fn instrument_path(&self, instrument: Instrument) -> PathBuf {
        self.instrument_dir.join(instrument.file_name())
    }

    /// Read and decode a local file
    pub async fn load_file(&self, path: &Path) -> LoadResult<AudioBuffer> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LoadError::InvalidSource(format!("{}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        decode_off_thread(bytes, extension).await
    }

    /// Fetch and decode a remote source (http, https or file URLs)
    pub async fn load_url(&self, raw: &str) -> LoadResult<AudioBuffer> {
        let url = Url::parse(raw.trim())
            .map_err(|e| LoadError::InvalidSource(format!("{raw}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| LoadError::InvalidSource(format!("{raw}: not a local path")))?;
                return self.load_file(&path).await;
            }
            other => {
                return Err(LoadError::InvalidSource(format!(
                    "{raw}: unsupported scheme '{other}'"
                )));
            }
        }

        let extension = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::NetworkFailure(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::NetworkFailure(e.to_string()))?;

        decode_off_thread(bytes.to_vec(), extension).await
    }

    /// Concatenate captured chunks and decode them as one payload
    pub async fn load_recording(chunks: Vec<Vec<u8>>) -> LoadResult<AudioBuffer> {
        let total: usize = chunks.iter().map(Vec::len).sum();
        if total == 0 {
            return Err(LoadError::InvalidSource("empty recording".to_string()));
        }

        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }

        decode_off_thread(bytes, None).await
    }
}

/// Decode on the blocking pool so the event loop stays responsive
async fn decode_off_thread(bytes: Vec<u8>, extension: Option<String>) -> LoadResult<AudioBuffer> {
    tokio::task::spawn_blocking(move || decode_bytes(bytes, extension.as_deref()))
        .await
        .map_err(|e| LoadError::DecodeFailure(format!("decode task failed: {e}")))?
}
