//! Mixer configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the mixdown does when clips disagree on sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleRatePolicy {
    /// Convert every clip to the output rate
    #[default]
    Resample,
    /// Fail the export with `MixError::SampleRateMismatch`
    Reject,
}

/// Post-summation handling of amplitudes above full scale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum OverloadMode {
    /// Leave the sum untouched
    #[default]
    None,
    /// Scale the whole mix so its peak sits at `ceiling` (only when it exceeds it)
    PeakNormalize { ceiling: f64 },
    /// tanh saturation per sample
    SoftClip,
}

/// Sample format of the exported WAV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportBitDepth {
    Int16,
    Int24,
    #[default]
    Float32,
}

impl ExportBitDepth {
    pub fn bits(&self) -> u16 {
        match self {
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Float32 => 32,
        }
    }
}

/// Mixer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Output rate override (None = follow the clips)
    pub sample_rate: Option<u32>,

    /// Mismatched-rate handling
    pub sample_rate_policy: SampleRatePolicy,

    /// Overload handling after summation
    pub overload: OverloadMode,

    /// Exported sample format
    pub bit_depth: ExportBitDepth,

    /// Default download name
    pub export_filename: String,

    /// Timeout for URL fetches
    pub fetch_timeout_secs: u64,

    /// Directory holding the bundled instrument samples
    pub instrument_dir: PathBuf,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            sample_rate_policy: SampleRatePolicy::Resample,
            overload: OverloadMode::None,
            bit_depth: ExportBitDepth::Float32,
            export_filename: "mixed-audio.wav".to_string(),
            fetch_timeout_secs: 30,
            instrument_dir: PathBuf::from("audio"),
        }
    }
}

impl MixConfig {
    /// Strict preset: every clip must already share one rate
    pub fn strict() -> Self {
        Self {
            sample_rate_policy: SampleRatePolicy::Reject,
            ..Default::default()
        }
    }

    /// Distribution preset: 16-bit 44.1 kHz, peak-normalized to -0.1 dBFS
    pub fn cd_quality() -> Self {
        Self {
            sample_rate: Some(44100),
            overload: OverloadMode::PeakNormalize { ceiling: 0.988 },
            bit_depth: ExportBitDepth::Int16,
            ..Default::default()
        }
    }

    /// Parse an embedded JSON blob; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn with_policy(mut self, policy: SampleRatePolicy) -> Self {
        self.sample_rate_policy = policy;
        self
    }

    pub fn with_overload(mut self, overload: OverloadMode) -> Self {
        self.overload = overload;
        self
    }

    pub fn with_bit_depth(mut self, bit_depth: ExportBitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn with_instrument_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.instrument_dir = dir.into();
        self
    }

    /// Rate used by live rendering
    pub fn live_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(crate::DEFAULT_LIVE_SAMPLE_RATE)
    }
}
