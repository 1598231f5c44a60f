use std::f64::consts::PI;

use super::buffer::{samples_for, SampleBuffer};
use crate::error::{SynthError, SynthResult};

const KICK_FREQ: f64 = 150.0;
const KICK_SECONDS: f64 = 0.1;
const KICK_AMPLITUDE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrumPattern {
    pub tempo_bpm: f64,
    pub beats_per_measure: u32,
    pub measures: u32,
}

impl DrumPattern {
    pub fn beat_seconds(&self) -> SynthResult<f64> {
        if !(self.tempo_bpm > 0.0) || !self.tempo_bpm.is_finite() {
            return Err(SynthError::InvalidTempo(self.tempo_bpm));
        }
        Ok(60.0 / self.tempo_bpm)
    }

    pub fn duration(&self) -> SynthResult<f64> {
        Ok(self.beats() as f64 * self.beat_seconds()?)
    }

    pub fn beats(&self) -> u64 {
        self.measures as u64 * self.beats_per_measure as u64
    }
}

/// Fixed-tempo kick on every beat, normalized to peak 1 on its own.
pub fn generate_drum_beat(pattern: &DrumPattern, sample_rate: u32, stereo: bool) -> SynthResult<SampleBuffer> {
    let beat = pattern.beat_seconds()?;
    let total = samples_for(sample_rate, pattern.duration()?);
    let mut signal = vec![0.0f32; total];

    let kick: Vec<f32> = (0..samples_for(sample_rate, KICK_SECONDS))
        .map(|n| (KICK_AMPLITUDE * (2.0 * PI * KICK_FREQ * n as f64 / sample_rate as f64).sin()) as f32)
        .collect();

    let mut onsets = 0;
    for k in 0..pattern.beats() {
        let start = samples_for(sample_rate, k as f64 * beat);
        if start >= total {
            break;
        }
        let end = (start + kick.len()).min(total);
        for (dst, src) in signal[start..end].iter_mut().zip(&kick) {
            *dst += *src;
        }
        onsets += 1;
    }

    let peak = signal.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak > 0.0 {
        for s in signal.iter_mut() {
            *s /= peak;
        }
    }

    log::info!(
        "Drum layer: {} kicks at {:.1} BPM over {:.2}s",
        onsets,
        pattern.tempo_bpm,
        total as f64 / sample_rate as f64
    );

    let buffer = SampleBuffer::mono(sample_rate, signal);
    Ok(if stereo { buffer.into_stereo() } else { buffer })
}
