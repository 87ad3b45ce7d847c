//! Mixdown Engine
//!
//! Offline render of every clip in a session into one stereo buffer and a
//! WAV byte stream:
//! - output rate from the configured policy (resample or reject)
//! - additive summation through [`MixBus`]
//! - optional overload handling
//! - WAV encode at the configured bit depth

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tm_core::{
    AudioBuffer, ExportBitDepth, MixConfig, MixError, MixResult, OUTPUT_CHANNELS,
    SampleRatePolicy,
};
use tm_file::{encode_wav, resample_buffer};

use crate::bus::MixBus;

// ═══════════════════════════════════════════════════════════════════════════════
// INPUTS / OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// One clip as seen by the mixdown: its buffer and effective gain
#[derive(Debug, Clone)]
pub struct MixInput {
    /// Clip name (used in error messages)
    pub label: String,
    pub buffer: Arc<AudioBuffer>,
    /// track volume × clip volume
    pub gain: f64,
}

impl MixInput {
    pub fn new(label: impl Into<String>, buffer: Arc<AudioBuffer>, gain: f64) -> Self {
        Self {
            label: label.into(),
            buffer,
            gain,
        }
    }
}

/// Finished export, ready to hand to the user
#[derive(Debug, Clone)]
pub struct ExportedMix {
    /// Suggested download name
    pub filename: String,
    /// Complete RIFF/WAVE file
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub bit_depth: ExportBitDepth,
    /// Absolute peak of the mix before encoding
    pub peak: f64,
}

impl ExportedMix {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    /// Write the WAV into `dir` under its filename
    pub fn write_to(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        log::info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Offline mixdown renderer
#[derive(Debug, Clone, Default)]
pub struct MixdownEngine {
    config: MixConfig,
}

impl MixdownEngine {
    pub fn new(config: MixConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    /// Pick the output rate for a set of inputs
    pub fn output_rate(&self, inputs: &[MixInput]) -> MixResult<u32> {
        let first = inputs
            .first()
            .map(|i| i.buffer.sample_rate)
            .ok_or(MixError::EmptyMix)?;
        let highest = inputs
            .iter()
            .map(|i| i.buffer.sample_rate)
            .max()
            .unwrap_or(first);

        match self.config.sample_rate_policy {
            SampleRatePolicy::Resample => Ok(self.config.sample_rate.unwrap_or(highest)),
            SampleRatePolicy::Reject => {
                let expected = self.config.sample_rate.unwrap_or(first);
                match inputs
                    .iter()
                    .map(|i| i.buffer.sample_rate)
                    .find(|&rate| rate != expected)
                {
                    Some(found) => Err(MixError::SampleRateMismatch { expected, found }),
                    None => Ok(expected),
                }
            }
        }
    }

    /// Sum every input into a stereo buffer at the output rate
    pub fn render(&self, inputs: &[MixInput]) -> MixResult<AudioBuffer> {
        if inputs.is_empty() {
            return Err(MixError::EmptyMix);
        }

        if let Some(missing) = inputs.iter().find(|i| !i.buffer.is_resident()) {
            return Err(MixError::SourceUnavailable(format!(
                "clip '{}' has no decoded audio",
                missing.label
            )));
        }

        let rate = self.output_rate(inputs)?;

        let sources: Vec<Cow<'_, AudioBuffer>> = inputs
            .iter()
            .map(|input| {
                if input.buffer.sample_rate == rate {
                    Cow::Borrowed(input.buffer.as_ref())
                } else {
                    Cow::Owned(resample_buffer(&input.buffer, rate))
                }
            })
            .collect();

        let frames = sources.iter().map(|s| s.num_frames()).max().unwrap_or(0);
        let mut bus = MixBus::new(frames, rate);

        for (source, input) in sources.iter().zip(inputs) {
            let mixed = bus.accumulate(source, input.gain, 0, 0);
            log::debug!(
                "Mixed '{}' ({} frames, gain {:.3})",
                input.label,
                mixed,
                input.gain
            );
        }

        bus.apply_overload(self.config.overload);

        Ok(bus.into_buffer())
    }

    /// Render and encode to WAV
    pub fn export(&self, inputs: &[MixInput]) -> MixResult<ExportedMix> {
        let mixed = self.render(inputs)?;
        let peak = mixed.peak();
        let bytes = encode_wav(&mixed, self.config.bit_depth)?;

        let export = ExportedMix {
            filename: self.config.export_filename.clone(),
            bytes,
            sample_rate: mixed.sample_rate,
            channels: OUTPUT_CHANNELS as u16,
            frames: mixed.num_frames(),
            bit_depth: self.config.bit_depth,
            peak,
        };

        log::info!(
            "Exported '{}': {} clips, {:.3}s @ {} Hz, {}-bit, peak {:.3}",
            export.filename,
            inputs.len(),
            export.duration(),
            export.sample_rate,
            export.bit_depth.bits(),
            export.peak
        );

        Ok(export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_core::OverloadMode;

    fn input(samples: Vec<f64>, rate: u32, gain: f64) -> MixInput {
        MixInput::new("clip", Arc::new(AudioBuffer::mono(samples, rate)), gain)
    }

    #[test]
    fn test_empty_mix() {
        let engine = MixdownEngine::default();
        assert_eq!(engine.render(&[]).unwrap_err(), MixError::EmptyMix);
        assert_eq!(engine.export(&[]).unwrap_err(), MixError::EmptyMix);
    }

    #[test]
    fn test_non_resident_buffer() {
        let engine = MixdownEngine::default();
        let empty = MixInput::new(
            "ghost",
            Arc::new(AudioBuffer {
                channels: Vec::new(),
                sample_rate: 44100,
            }),
            1.0,
        );

        let err = engine.render(&[empty]).unwrap_err();
        assert!(matches!(err, MixError::SourceUnavailable(ref msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_duration_is_longest_clip() {
        let engine = MixdownEngine::default();
        let mixed = engine
            .render(&[
                input(vec![0.5; 10], 10, 1.0),
                input(vec![0.25; 30], 10, 1.0),
            ])
            .unwrap();

        assert_eq!(mixed.num_frames(), 30);
        assert_eq!(mixed.num_channels(), 2);
        assert!((mixed.channels[0][5] - 0.75).abs() < 1e-12);
        assert!((mixed.channels[1][20] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_output_rate_resample() {
        let engine = MixdownEngine::default();
        let inputs = [input(vec![0.0; 4], 22050, 1.0), input(vec![0.0; 4], 44100, 1.0)];
        assert_eq!(engine.output_rate(&inputs).unwrap(), 44100);

        let fixed = MixdownEngine::new(MixConfig::default().with_sample_rate(48000));
        assert_eq!(fixed.output_rate(&inputs).unwrap(), 48000);
    }

    #[test]
    fn test_output_rate_reject() {
        let engine = MixdownEngine::new(MixConfig::strict());
        let inputs = [input(vec![0.0; 4], 44100, 1.0), input(vec![0.0; 4], 48000, 1.0)];

        assert_eq!(
            engine.output_rate(&inputs).unwrap_err(),
            MixError::SampleRateMismatch {
                expected: 44100,
                found: 48000
            }
        );
        assert_eq!(engine.output_rate(&inputs[..1]).unwrap(), 44100);
    }

    #[test]
    fn test_resampled_clip_keeps_duration() {
        let engine = MixdownEngine::default();
        let mixed = engine
            .render(&[input(vec![0.1; 100], 100, 1.0), input(vec![0.1; 50], 50, 1.0)])
            .unwrap();

        assert_eq!(mixed.sample_rate, 100);
        assert_eq!(mixed.num_frames(), 100);
        assert!((mixed.channels[0][10] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_no_normalization_by_default() {
        let engine = MixdownEngine::default();
        let mixed = engine
            .render(&[input(vec![0.8; 4], 10, 1.0), input(vec![0.8; 4], 10, 1.0)])
            .unwrap();
        assert!((mixed.peak() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_overload_normalize() {
        let config =
            MixConfig::default().with_overload(OverloadMode::PeakNormalize { ceiling: 1.0 });
        let mixed = MixdownEngine::new(config)
            .render(&[input(vec![0.8; 4], 10, 1.0), input(vec![0.8; 4], 10, 1.0)])
            .unwrap();
        assert!((mixed.peak() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_export_metadata() {
        let engine = MixdownEngine::default();
        let export = engine.export(&[input(vec![0.5; 441], 44100, 1.0)]).unwrap();

        assert_eq!(export.filename, "mixed-audio.wav");
        assert_eq!(export.channels, 2);
        assert_eq!(export.frames, 441);
        assert_eq!(export.bit_depth, ExportBitDepth::Float32);
        assert!((export.duration() - 0.01).abs() < 1e-9);
        assert_eq!(&export.bytes[0..4], b"RIFF");
    }
}
