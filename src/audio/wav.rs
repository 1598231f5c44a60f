use anyhow::{Context, Result};
use std::path::Path;

use super::buffer::SampleBuffer;
use super::mixdown;

/// Normalizes `buffer` and writes it as 16-bit PCM. Nothing is created on failure.
pub fn write_pcm16(path: &Path, buffer: SampleBuffer) -> Result<SampleBuffer> {
    let normalized = mixdown::normalize(buffer).context("Normalization failed")?;
    let pcm = mixdown::to_pcm16(&normalized);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let spec = hound::WavSpec {
        channels: normalized.channels,
        sample_rate: normalized.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for sample in pcm {
        writer.write_sample(sample).context("Failed to write sample")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    log::info!(
        "Wrote {} ({} ch, {} Hz, {:.2}s)",
        path.display(),
        normalized.channels,
        normalized.sample_rate,
        normalized.duration()
    );
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::SAMPLE_RATE;

    #[test]
    fn writes_normalized_pcm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("mix.wav");
        let buf = SampleBuffer::mono(SAMPLE_RATE, vec![0.0, 0.25, -0.5]).into_stereo();
        write_pcm16(&path, buf).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 0, 16384, 16384, -32767, -32767]);
    }

    #[test]
    fn silent_mix_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.wav");
        let buf = SampleBuffer::silent(SAMPLE_RATE, 1, 64);
        assert!(write_pcm16(&path, buf).is_err());
        assert!(!path.exists());
    }
}
