use std::f64::consts::PI;
use std::str::FromStr;

use super::buffer::{samples_for, SampleBuffer};
use crate::error::{SynthError, SynthResult};

/// Echo delay in seconds.
const DELAY_SECONDS: f64 = 0.1;
/// Level of the delayed copy.
const DELAY_MIX: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SynthesisKind {
    #[default]
    None,
    /// Adds a sine completing exactly two cycles across the buffer.
    Additive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeKind {
    #[default]
    None,
    FadeIn,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectKind {
    #[default]
    None,
    Delay,
}

impl SynthesisKind {
    pub const NAMES: [&'static str; 2] = ["none", "additive"];
}

impl EnvelopeKind {
    pub const NAMES: [&'static str; 2] = ["none", "fade_in"];

    /// Unknown envelope names fall back to pass-through instead of failing.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            log::warn!("Unknown envelope '{}', leaving frames unshaped", s);
            EnvelopeKind::None
        })
    }
}

impl EffectKind {
    pub const NAMES: [&'static str; 2] = ["none", "delay"];
}

impl FromStr for SynthesisKind {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(SynthesisKind::None),
            "additive" => Ok(SynthesisKind::Additive),
            _ => Err(SynthError::UnsupportedKind {
                axis: "synthesis",
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for EnvelopeKind {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "none" => Ok(EnvelopeKind::None),
            "fade_in" => Ok(EnvelopeKind::FadeIn),
            _ => Err(SynthError::UnsupportedKind {
                axis: "envelope",
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for EffectKind {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(EffectKind::None),
            "delay" | "reverb" => Ok(EffectKind::Delay),
            _ => Err(SynthError::UnsupportedKind {
                axis: "effect",
                name: s.to_string(),
            }),
        }
    }
}

pub fn apply_synthesis(mut buffer: SampleBuffer, kind: SynthesisKind) -> SynthResult<SampleBuffer> {
    match kind {
        SynthesisKind::None => Ok(buffer),
        SynthesisKind::Additive => {
            let n = buffer.frames();
            let overlay: Vec<f32> = (0..n)
                .map(|i| (2.0 * PI * i as f64 * 2.0 / n as f64).sin() as f32)
                .collect();
            let mut overlay = SampleBuffer::mono(buffer.sample_rate, overlay);
            if buffer.channels == 2 {
                overlay = overlay.into_stereo();
            }
            buffer.add_scaled(&overlay, 1.0)?;
            Ok(buffer)
        }
    }
}

pub fn apply_envelope(mut buffer: SampleBuffer, kind: EnvelopeKind) -> SampleBuffer {
    match kind {
        EnvelopeKind::None => buffer,
        EnvelopeKind::FadeIn => {
            let n = buffer.frames();
            let ch = buffer.channels.max(1) as usize;
            let denom = n.saturating_sub(1).max(1) as f32;
            for (i, frame) in buffer.samples.chunks_mut(ch).enumerate() {
                let gain = i as f32 / denom;
                for s in frame {
                    *s *= gain;
                }
            }
            buffer
        }
    }
}

/// Mixes in a causally delayed copy: head zero-padded, tail truncated, no wraparound.
pub fn apply_effect(mut buffer: SampleBuffer, kind: EffectKind) -> SampleBuffer {
    match kind {
        EffectKind::None => buffer,
        EffectKind::Delay => {
            let ch = buffer.channels.max(1) as usize;
            let shift = samples_for(buffer.sample_rate, DELAY_SECONDS) * ch;
            if shift >= buffer.samples.len() {
                return buffer;
            }
            let dry = buffer.samples.clone();
            for (dst, src) in buffer.samples[shift..].iter_mut().zip(&dry) {
                *dst += src * DELAY_MIX;
            }
            buffer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::SAMPLE_RATE;

    #[test]
    fn additive_preserves_shape() {
        for channels in [1u16, 2] {
            let buf = SampleBuffer::silent(SAMPLE_RATE, channels, 1000);
            let out = apply_synthesis(buf.clone(), SynthesisKind::Additive).unwrap();
            assert!(out.same_shape(&buf));
        }
    }

    #[test]
    fn additive_overlay_is_two_cycles() {
        let buf = SampleBuffer::silent(SAMPLE_RATE, 1, 400);
        let out = apply_synthesis(buf, SynthesisKind::Additive).unwrap();
        // quarter of the first cycle
        assert!((out.samples[50] - 1.0).abs() < 1e-5);
        assert!(out.samples[100].abs() < 1e-5);
        assert!((out.samples[150] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn fade_in_ramps_from_zero_to_one() {
        let buf = SampleBuffer::mono(SAMPLE_RATE, vec![1.0; 5]);
        let out = apply_envelope(buf, EnvelopeKind::FadeIn);
        assert_eq!(out.samples, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn fade_in_applies_per_stereo_frame() {
        let buf = SampleBuffer::mono(SAMPLE_RATE, vec![1.0; 3]).into_stereo();
        let out = apply_envelope(buf, EnvelopeKind::FadeIn);
        assert_eq!(out.samples, vec![0.0, 0.0, 0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn unknown_envelope_is_pass_through() {
        assert_eq!(EnvelopeKind::parse_lenient("wobble"), EnvelopeKind::None);
        assert_eq!(EnvelopeKind::parse_lenient("fade-in"), EnvelopeKind::FadeIn);
    }

    #[test]
    fn delay_is_causal_without_wraparound() {
        let shift = samples_for(SAMPLE_RATE, DELAY_SECONDS);
        let mut samples = vec![0.0; shift * 2];
        let last = samples.len() - 1;
        samples[last] = 1.0;
        samples[0] = 1.0;
        let out = apply_effect(SampleBuffer::mono(SAMPLE_RATE, samples), EffectKind::Delay);
        assert_eq!(out.samples[0], 1.0);
        assert_eq!(out.samples[shift], 0.5);
        // the tail impulse must not wrap into the head
        assert!(out.samples[1..shift].iter().all(|&s| s == 0.0));
        assert_eq!(out.frames(), shift * 2);
    }

    #[test]
    fn delay_shorter_buffer_is_untouched() {
        let buf = SampleBuffer::mono(SAMPLE_RATE, vec![0.3; 10]);
        assert_eq!(apply_effect(buf.clone(), EffectKind::Delay), buf);
    }

    #[test]
    fn rejects_unknown_effect_and_synthesis() {
        assert!("flanger".parse::<EffectKind>().is_err());
        assert!("granular".parse::<SynthesisKind>().is_err());
        assert_eq!("reverb".parse::<EffectKind>().unwrap(), EffectKind::Delay);
    }
}
