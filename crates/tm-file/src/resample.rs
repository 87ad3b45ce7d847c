//! Sample rate conversion (linear interpolation)
//!
//! Whole-buffer conversion for the offline mixdown. Good enough for
//! reconciling clips decoded at different rates; it does not band-limit.

use tm_core::{AudioBuffer, Sample};

/// Linear-interpolation sample rate converter
#[derive(Debug, Clone, Copy)]
pub struct SampleRateConverter {
    source_rate: u32,
    target_rate: u32,
}

impl SampleRateConverter {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate,
            target_rate,
        }
    }

    #[inline]
    pub fn is_passthrough(&self) -> bool {
        self.source_rate == self.target_rate
    }

    /// Number of output frames produced for `input_frames` source frames
    pub fn output_frames(&self, input_frames: usize) -> usize {
        if self.is_passthrough() || self.source_rate == 0 {
            return input_frames;
        }
        ((input_frames as f64) * self.target_rate as f64 / self.source_rate as f64).round() as usize
    }

    /// Convert one channel
    pub fn process(&self, input: &[Sample]) -> Vec<Sample> {
        if self.is_passthrough() || input.is_empty() || self.source_rate == 0 {
            return input.to_vec();
        }

        let ratio = self.source_rate as f64 / self.target_rate as f64;
        let last = input.len() - 1;

        (0..self.output_frames(input.len()))
            .map(|out_frame| {
                let in_pos = out_frame as f64 * ratio;
                let in_frame = (in_pos as usize).min(last);
                let frac = in_pos - in_frame as f64;

                let sample_a = input[in_frame];
                let sample_b = input[(in_frame + 1).min(last)];

                sample_a + (sample_b - sample_a) * frac
            })
            .collect()
    }
}

/// Convert every channel of a buffer to `target_rate`
pub fn resample_buffer(buffer: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    let converter = SampleRateConverter::new(buffer.sample_rate, target_rate);
    if converter.is_passthrough() {
        return buffer.clone();
    }

    log::debug!(
        "Resampling {} frames from {} Hz to {} Hz",
        buffer.num_frames(),
        buffer.sample_rate,
        target_rate
    );

    AudioBuffer {
        channels: buffer
            .channels
            .iter()
            .map(|ch| converter.process(ch))
            .collect(),
        sample_rate: target_rate,
    }
}
