use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::MAX_SAMPLE_I24;

/// PCM encodings the writer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    PcmInt24,
    Float32,
}

fn spec(sample_rate: u32, encoding: SampleEncoding) -> WavSpec {
    match encoding {
        SampleEncoding::PcmInt24 => WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        },
        SampleEncoding::Float32 => WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    }
}

/// Writes 24-bit integer samples to a mono WAV file. Samples are clamped to
/// the 24-bit range at this boundary; the core guarantees the range already,
/// so clamping only matters for buffers that did not come from it.
pub fn write_wav_i24(path: &Path, samples: &[i32], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(sample_rate, SampleEncoding::PcmInt24))?;
    for &sample in samples {
        writer.write_sample(sample.clamp(-MAX_SAMPLE_I24, MAX_SAMPLE_I24))?;
    }
    writer.finalize()?;
    info!(samples = samples.len(), sample_rate, path = %path.display(), "wrote 24-bit WAV");
    Ok(())
}

/// Writes normalized float samples to a mono float-32 WAV file.
pub fn write_wav_f32(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(sample_rate, SampleEncoding::Float32))?;
    for &sample in samples {
        writer.write_sample(sample.clamp(-1.0, 1.0))?;
    }
    writer.finalize()?;
    info!(samples = samples.len(), sample_rate, path = %path.display(), "wrote float WAV");
    Ok(())
}
