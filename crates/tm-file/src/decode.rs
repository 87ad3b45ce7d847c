//! In-memory audio decoding
//!
//! Supports:
//! - WAV (8/16/24/32-bit int, 32-bit float) via hound
//! - MP3, FLAC, OGG Vorbis, AAC/M4A, AIFF via symphonia
//!
//! Every decoder produces a fully resident `AudioBuffer` with samples
//! normalized to [-1.0, 1.0]. There is no streaming decode.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tm_core::{AudioBuffer, LoadError, LoadResult, Sample};

/// True if the payload starts with a RIFF/WAVE header
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Decode a complete encoded payload.
///
/// `extension` is only a probing hint (e.g. "mp3"); the container is
/// detected from the bytes.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> LoadResult<AudioBuffer> {
    if bytes.is_empty() {
        return Err(LoadError::DecodeFailure("empty payload".to_string()));
    }

    let buffer = if is_wav(&bytes) {
        match decode_wav(&bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::debug!("hound rejected WAV payload ({e}), probing with symphonia");
                decode_probed(bytes, Some("wav"))?
            }
        }
    } else {
        decode_probed(bytes, extension)?
    };

    if !buffer.is_resident() || buffer.num_frames() == 0 {
        return Err(LoadError::DecodeFailure(
            "decoded stream has no audio frames".to_string(),
        ));
    }

    Ok(buffer)
}

// ═══════════════════════════════════════════════════════════════════════════════
// WAV (hound)
// ═══════════════════════════════════════════════════════════════════════════════

/// Read a WAV payload using hound
pub fn decode_wav(bytes: &[u8]) -> LoadResult<AudioBuffer> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| LoadError::DecodeFailure(e.to_string()))?;
    let spec = reader.spec();

    let num_channels = spec.channels as usize;
    if num_channels == 0 || spec.sample_rate == 0 {
        return Err(LoadError::DecodeFailure(format!(
            "invalid WAV spec: {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<Result<_, _>>(),
        hound::SampleFormat::Int => {
            let max_value = (1u64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_value))
                .collect::<Result<_, _>>()
        }
    }
    .map_err(|e| LoadError::DecodeFailure(e.to_string()))?;

    Ok(AudioBuffer::from_interleaved(
        &samples,
        num_channels,
        spec.sample_rate,
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROBED FORMATS (symphonia)
// ═══════════════════════════════════════════════════════════════════════════════

/// Probe and decode any container symphonia understands
pub fn decode_probed(bytes: Vec<u8>, extension: Option<&str>) -> LoadResult<AudioBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| LoadError::DecodeFailure(format!("unrecognized audio: {e}")))?;

    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::DecodeFailure("no audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut num_channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::DecodeFailure(e.to_string()))?;

    let mut interleaved: Vec<Sample> = Vec::new();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(LoadError::DecodeFailure(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping corrupted audio packet: {msg}");
                continue;
            }
            Err(e) => return Err(LoadError::DecodeFailure(e.to_string())),
        };

        let spec = *decoded.spec();
        if num_channels == 0 {
            num_channels = spec.channels.count();
        }
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend(sample_buf.samples().iter().map(|&s| s as f64));
    }

    if num_channels == 0 || sample_rate == 0 {
        return Err(LoadError::DecodeFailure(
            "stream did not report channels or sample rate".to_string(),
        ));
    }

    Ok(AudioBuffer::from_interleaved(
        &interleaved,
        num_channels,
        sample_rate,
    ))
}
