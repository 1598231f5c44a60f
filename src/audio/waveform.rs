use biquad::{Biquad, Coefficients, DirectForm1, ToHertz};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use super::buffer::{samples_for, SampleBuffer};
use crate::error::{SynthError, SynthResult};

/// Q values of the two biquad sections of a 4th-order Butterworth low-pass.
const BUTTERWORTH_4_Q: [f32; 2] = [0.541_196_1, 1.306_563];
/// Subtractive cutoff as a fraction of Nyquist.
const SUBTRACTIVE_CUTOFF: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveKind {
    Sine,
    Square,
    Sawtooth,
    Triangle,
    Additive,
    Subtractive,
}

impl WaveKind {
    pub const ALL: [WaveKind; 6] = [
        WaveKind::Sine,
        WaveKind::Square,
        WaveKind::Sawtooth,
        WaveKind::Triangle,
        WaveKind::Additive,
        WaveKind::Subtractive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WaveKind::Sine => "sine",
            WaveKind::Square => "square",
            WaveKind::Sawtooth => "sawtooth",
            WaveKind::Triangle => "triangle",
            WaveKind::Additive => "additive",
            WaveKind::Subtractive => "subtractive",
        }
    }
}

impl fmt::Display for WaveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveKind {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaveKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SynthError::UnsupportedKind {
                axis: "wave",
                name: s.to_string(),
            })
    }
}

/// Renders `duration` seconds of `kind` at `freq` Hz, phase 0 at sample 0.
///
/// Every call restarts the phase, so consecutive frames are not phase-continuous.
pub fn generate(kind: WaveKind, sample_rate: u32, duration: f64, freq: f64) -> SynthResult<SampleBuffer> {
    let len = samples_for(sample_rate, duration);
    let sr = sample_rate as f64;
    let at = |n: usize| n as f64 / sr;

    let samples: Vec<f32> = match kind {
        WaveKind::Sine => (0..len)
            .map(|n| 0.5 * (2.0 * PI * freq * at(n)).sin())
            .map(|s| s as f32)
            .collect(),
        WaveKind::Square => square(len, sr, freq),
        WaveKind::Sawtooth => (0..len)
            .map(|n| {
                let x = at(n) * freq;
                0.5 * (2.0 * (x - (x + 0.5).floor()))
            })
            .map(|s| s as f32)
            .collect(),
        WaveKind::Triangle => (0..len)
            .map(|n| 0.5 * ((at(n) * freq).rem_euclid(1.0) - 0.5).abs() * 2.0)
            .map(|s| s as f32)
            .collect(),
        WaveKind::Additive => (0..len)
            .map(|n| {
                let t = at(n);
                0.5 * ((2.0 * PI * freq * t).sin() + (2.0 * PI * (freq / 2.0) * t).sin())
            })
            .map(|s| s as f32)
            .collect(),
        WaveKind::Subtractive => {
            let mut wave = square(len, sr, freq);
            lowpass_4(&mut wave, sample_rate, SUBTRACTIVE_CUTOFF * sr / 2.0)?;
            wave
        }
    };

    Ok(SampleBuffer::mono(sample_rate, samples))
}

fn square(len: usize, sr: f64, freq: f64) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let s = (2.0 * PI * freq * n as f64 / sr).sin();
            if s > 0.0 {
                0.5
            } else if s < 0.0 {
                -0.5
            } else {
                0.0
            }
        })
        .collect()
}

/// In-place 4th-order Butterworth low-pass as two cascaded biquads.
fn lowpass_4(samples: &mut [f32], sample_rate: u32, cutoff_hz: f64) -> SynthResult<()> {
    let mut sections = Vec::with_capacity(BUTTERWORTH_4_Q.len());
    for q in BUTTERWORTH_4_Q {
        let coeffs = Coefficients::<f32>::from_params(
            biquad::Type::LowPass,
            (sample_rate as f32).hz(),
            (cutoff_hz as f32).hz(),
            q,
        )
        .map_err(|e| SynthError::Filter(format!("{:?}", e)))?;
        sections.push(DirectForm1::<f32>::new(coeffs));
    }

    for s in samples.iter_mut() {
        let mut x = *s;
        for section in sections.iter_mut() {
            x = section.run(x);
        }
        *s = x;
    }
    Ok(())
}
