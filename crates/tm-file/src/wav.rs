//! WAV serialization of mixed buffers (hound)

use std::io::Cursor;
use std::path::Path;

use tm_core::{AudioBuffer, ExportBitDepth, MixError, MixResult};

/// Encode a buffer into an in-memory RIFF/WAVE byte stream.
///
/// Integer depths clamp to full scale; Float32 keeps out-of-range peaks.
pub fn encode_wav(buffer: &AudioBuffer, bit_depth: ExportBitDepth) -> MixResult<Vec<u8>> {
    if buffer.num_channels() == 0 || buffer.sample_rate == 0 {
        return Err(MixError::Encode(format!(
            "cannot encode {} channels at {} Hz",
            buffer.num_channels(),
            buffer.sample_rate
        )));
    }

    let spec = hound::WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth.bits(),
        sample_format: match bit_depth {
            ExportBitDepth::Float32 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        },
    };

    let mut output = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut output), spec).map_err(encode_err)?;

    let num_frames = buffer.num_frames();

    match bit_depth {
        ExportBitDepth::Float32 => {
            for i in 0..num_frames {
                for ch in &buffer.channels {
                    writer.write_sample(ch[i] as f32).map_err(encode_err)?;
                }
            }
        }
        ExportBitDepth::Int16 => {
            for i in 0..num_frames {
                for ch in &buffer.channels {
                    let sample = (ch[i].clamp(-1.0, 1.0) * 32767.0) as i16;
                    writer.write_sample(sample).map_err(encode_err)?;
                }
            }
        }
        ExportBitDepth::Int24 => {
            for i in 0..num_frames {
                for ch in &buffer.channels {
                    let sample = (ch[i].clamp(-1.0, 1.0) * 8388607.0) as i32;
                    writer.write_sample(sample).map_err(encode_err)?;
                }
            }
        }
    }

    writer.finalize().map_err(encode_err)?;

    Ok(output)
}

/// Encode and write straight to disk
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    buffer: &AudioBuffer,
    bit_depth: ExportBitDepth,
) -> MixResult<()> {
    let bytes = encode_wav(buffer, bit_depth)?;
    std::fs::write(path.as_ref(), bytes).map_err(|e| MixError::Encode(e.to_string()))
}

fn encode_err(err: hound::Error) -> MixError {
    MixError::Encode(err.to_string())
}
