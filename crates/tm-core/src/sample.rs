//! Sample types and decoded audio buffers

/// Type alias for audio samples (always f64 for summation headroom)
pub type Sample = f64;

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO BUFFER
// ═══════════════════════════════════════════════════════════════════════════════

/// Fully decoded audio (deinterleaved, one Vec per channel)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Audio samples, `channels[ch][frame]`
    pub channels: Vec<Vec<Sample>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0; num_frames]; num_channels],
            sample_rate,
        }
    }

    /// Wrap a single channel
    pub fn mono(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            channels: vec![samples],
            sample_rate,
        }
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames
    pub fn num_frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// True when the buffer holds decoded audio that can be mixed
    pub fn is_resident(&self) -> bool {
        self.sample_rate > 0
            && !self.channels.is_empty()
            && self.channels.iter().all(|c| c.len() == self.num_frames())
    }

    /// Source channel feeding output channel `out_ch`.
    ///
    /// Mono sources feed every output channel; channels past the
    /// source's count get nothing.
    #[inline]
    pub fn channel_for_output(&self, out_ch: usize) -> Option<&[Sample]> {
        match self.channels.len() {
            0 => None,
            1 => Some(&self.channels[0]),
            _ => self.channels.get(out_ch).map(Vec::as_slice),
        }
    }

    /// Get as interleaved samples
    pub fn to_interleaved(&self) -> Vec<Sample> {
        let frames = self.num_frames();
        let mut interleaved = Vec::with_capacity(frames * self.num_channels());

        for i in 0..frames {
            for ch in &self.channels {
                interleaved.push(ch[i]);
            }
        }

        interleaved
    }

    /// Create from interleaved samples
    pub fn from_interleaved(samples: &[Sample], num_channels: usize, sample_rate: u32) -> Self {
        if num_channels == 0 {
            return Self {
                channels: Vec::new(),
                sample_rate,
            };
        }

        let num_frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(num_frames); num_channels];

        for chunk in samples.chunks_exact(num_channels) {
            for (ch, &sample) in chunk.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self {
            channels,
            sample_rate,
        }
    }

    /// Absolute peak across all channels
    pub fn peak(&self) -> Sample {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0, |peak: Sample, &s| peak.max(s.abs()))
    }
}
