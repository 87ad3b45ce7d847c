//! Mix Bus
//!
//! The one summation path shared by offline mixdown and live rendering:
//! every source is accumulated (never overwritten) into a fixed stereo
//! buffer, scaled by its effective gain. Mono sources feed both channels,
//! channels past the bus width are ignored, and a source only contributes
//! over its own length.

use tm_core::{AudioBuffer, OUTPUT_CHANNELS, OverloadMode, Sample};

/// Fixed-width summing bus
#[derive(Debug, Clone)]
pub struct MixBus {
    channels: Vec<Vec<Sample>>,
    sample_rate: u32,
}

impl MixBus {
    /// Silent stereo bus of `frames` frames
    pub fn new(frames: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; OUTPUT_CHANNELS],
            sample_rate,
        }
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Add `source[source_offset..]` into the bus starting at `bus_offset`.
    ///
    /// Returns the number of frames mixed. The source must already run at
    /// the bus rate.
    pub fn accumulate(
        &mut self,
        source: &AudioBuffer,
        gain: f64,
        source_offset: usize,
        bus_offset: usize,
    ) -> usize {
        let available = source.num_frames().saturating_sub(source_offset);
        let room = self.frames().saturating_sub(bus_offset);
        let len = available.min(room);
        if len == 0 || gain == 0.0 {
            return len;
        }

        for (out_ch, out) in self.channels.iter_mut().enumerate() {
            let Some(input) = source.channel_for_output(out_ch) else {
                continue;
            };
            let input = &input[source_offset..source_offset + len];
            let out = &mut out[bus_offset..bus_offset + len];
            for (o, &s) in out.iter_mut().zip(input) {
                *o += s * gain;
            }
        }

        len
    }

    /// Add a source running at a different rate, starting at `start_secs`
    /// into the source. Uses nearest-frame lookup. Looping sources wrap.
    ///
    /// Returns the number of bus frames written.
    pub fn accumulate_at_rate(
        &mut self,
        source: &AudioBuffer,
        gain: f64,
        start_secs: f64,
        looping: bool,
    ) -> usize {
        let source_frames = source.num_frames();
        if source_frames == 0 || source.sample_rate == 0 || self.sample_rate == 0 {
            return 0;
        }

        let step = source.sample_rate as f64 / self.sample_rate as f64;
        let start = start_secs * source.sample_rate as f64;
        let mut written = 0;

        for i in 0..self.frames() {
            let mut frame = (start + i as f64 * step) as usize;
            if frame >= source_frames {
                if !looping {
                    break;
                }
                frame %= source_frames;
            }

            for (out_ch, out) in self.channels.iter_mut().enumerate() {
                if let Some(input) = source.channel_for_output(out_ch) {
                    out[i] += input[frame] * gain;
                }
            }
            written += 1;
        }

        written
    }

    /// Absolute peak across both channels
    pub fn peak(&self) -> Sample {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0, |peak: Sample, &s| peak.max(s.abs()))
    }

    /// Apply the configured overload handling
    pub fn apply_overload(&mut self, mode: OverloadMode) {
        match mode {
            OverloadMode::None => {}
            OverloadMode::PeakNormalize { ceiling } => {
                let peak = self.peak();
                if ceiling > 0.0 && peak > ceiling {
                    let scale = ceiling / peak;
                    log::debug!("Normalizing mix peak {peak:.3} to {ceiling:.3}");
                    self.channels
                        .iter_mut()
                        .flat_map(|c| c.iter_mut())
                        .for_each(|s| *s *= scale);
                }
            }
            OverloadMode::SoftClip => {
                self.channels
                    .iter_mut()
                    .flat_map(|c| c.iter_mut())
                    .for_each(|s| *s = s.tanh());
            }
        }
    }

    pub fn into_buffer(self) -> AudioBuffer {
        AudioBuffer {
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }
}
