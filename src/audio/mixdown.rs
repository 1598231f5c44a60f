use super::buffer::SampleBuffer;
use crate::error::{SynthError, SynthResult};

pub const DRUM_WEIGHT: f32 = 0.2;
pub const MIDI_WEIGHT: f32 = 0.5;
pub const FULL_SCALE: f32 = i16::MAX as f32;

/// Sums the optional drum and rendered-MIDI layers onto the master timeline.
///
/// Layers are truncated or zero-padded to the master length and converted to its
/// channel layout. The rendered layer must share the master's sample rate.
pub fn mix(
    mut master: SampleBuffer,
    drums: Option<SampleBuffer>,
    rendered_midi: Option<SampleBuffer>,
) -> SynthResult<SampleBuffer> {
    let frames = master.frames();

    if let Some(drums) = drums {
        if drums.sample_rate != master.sample_rate {
            return Err(SynthError::SampleRateMismatch {
                expected: master.sample_rate,
                actual: drums.sample_rate,
            });
        }
        let drums = drums.with_channels(master.channels).resized(frames);
        master.add_scaled(&drums, DRUM_WEIGHT)?;
        log::info!("Mixed drum layer at {:.1}", DRUM_WEIGHT);
    }

    if let Some(midi) = rendered_midi {
        if midi.sample_rate != master.sample_rate {
            return Err(SynthError::SampleRateMismatch {
                expected: master.sample_rate,
                actual: midi.sample_rate,
            });
        }
        if midi.frames() != frames {
            log::info!(
                "Rendered MIDI is {} samples, master is {}; resizing",
                midi.frames(),
                frames
            );
        }
        let midi = midi.with_channels(master.channels).resized(frames);
        master.add_scaled(&midi, MIDI_WEIGHT)?;
        log::info!("Mixed rendered MIDI layer at {:.1}", MIDI_WEIGHT);
    }

    Ok(master)
}

/// Divides by the global peak so the loudest sample lands exactly on ±1.
pub fn normalize(mut buffer: SampleBuffer) -> SynthResult<SampleBuffer> {
    let peak = buffer.peak();
    if !(peak > 0.0) || !peak.is_finite() {
        return Err(SynthError::SilentBuffer);
    }
    log::info!("Normalizing by peak {:.4}", peak);
    for s in buffer.samples.iter_mut() {
        *s /= peak;
    }
    Ok(buffer)
}

/// Scales a normalized buffer to signed 16-bit PCM.
pub fn to_pcm16(buffer: &SampleBuffer) -> Vec<i16> {
    buffer
        .samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * FULL_SCALE).round() as i16)
        .collect()
}
