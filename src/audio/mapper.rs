use indicatif::ProgressBar;
use rayon::prelude::*;
use std::str::FromStr;

use super::buffer::{samples_for, SampleBuffer};
use super::stages::{self, EffectKind, EnvelopeKind, SynthesisKind};
use super::waveform::{self, WaveKind};
use crate::error::{SynthError, SynthResult};
use crate::frames::model::FrameSequence;

/// How frame brightness becomes an oscillator frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlMapping {
    /// Brightness used as Hz, clamped to `[lo, hi]`.
    Direct { lo: f64, hi: f64 },
    /// `clip(brightness * 10, lo, hi)` Hz.
    Scaled { lo: f64, hi: f64 },
}

impl Default for ControlMapping {
    fn default() -> Self {
        ControlMapping::Scaled { lo: 100.0, hi: 1000.0 }
    }
}

impl ControlMapping {
    pub const NAMES: [&'static str; 2] = ["scaled", "direct"];

    pub fn frequency(self, brightness: f64) -> f64 {
        match self {
            ControlMapping::Direct { lo, hi } => brightness.clamp(lo, hi),
            ControlMapping::Scaled { lo, hi } => (brightness * 10.0).clamp(lo, hi),
        }
    }
}

impl FromStr for ControlMapping {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scaled" => Ok(ControlMapping::default()),
            "direct" => Ok(ControlMapping::Direct { lo: 20.0, hi: 1000.0 }),
            _ => Err(SynthError::UnsupportedKind {
                axis: "mapping",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub sample_rate: u32,
    pub stereo: bool,
    pub wave: WaveKind,
    pub synthesis: SynthesisKind,
    pub envelope: EnvelopeKind,
    pub effect: EffectKind,
    pub include_sine: bool,
    pub mapping: ControlMapping,
}

impl RenderSettings {
    pub fn channels(&self) -> u16 {
        if self.stereo {
            2
        } else {
            1
        }
    }
}

/// Renders one frame: base wave, synthesis, optional sine blend, envelope, effect.
pub fn render_frame(brightness: f64, frame_duration: f64, settings: &RenderSettings) -> SynthResult<SampleBuffer> {
    let freq = settings.mapping.frequency(brightness);
    let sr = settings.sample_rate;

    let mut wave = waveform::generate(settings.wave, sr, frame_duration, freq)?;
    if settings.stereo {
        wave = wave.into_stereo();
    }

    wave = stages::apply_synthesis(wave, settings.synthesis)?;

    if settings.include_sine {
        let mut sine = waveform::generate(WaveKind::Sine, sr, frame_duration, freq)?;
        if settings.stereo {
            sine = sine.into_stereo();
        }
        wave.add_scaled(&sine, 0.5)?;
    }

    wave = stages::apply_envelope(wave, settings.envelope);
    Ok(stages::apply_effect(wave, settings.effect))
}

/// Places every frame's buffer on a master timeline of `round(sr * video_duration)` frames.
///
/// Frames are synthesized in parallel; accumulation into the master stays on this thread.
/// Anything running past the end of the timeline is truncated.
pub fn map_frames(
    sequence: &FrameSequence,
    settings: &RenderSettings,
    progress: &ProgressBar,
) -> SynthResult<SampleBuffer> {
    let channels = settings.channels();
    if sequence.is_empty() {
        log::warn!("No frames to map; returning an empty timeline");
        return Ok(SampleBuffer::silent(settings.sample_rate, channels, 0));
    }

    let sr = settings.sample_rate;
    let frame_duration = sequence.frame_duration()?;
    let total = samples_for(sr, sequence.video_duration);
    let mut master = SampleBuffer::silent(sr, channels, total);

    log::info!(
        "Mapping {} frames ({:.4}s each) onto {} samples, wave={}, mapping={:?}",
        sequence.len(),
        frame_duration,
        total,
        settings.wave,
        settings.mapping
    );

    let waves: Vec<SampleBuffer> = sequence
        .frames
        .par_iter()
        .enumerate()
        .map(|(i, frame)| {
            render_frame(frame.brightness, frame_duration, settings).map_err(|e| e.at_frame(i))
        })
        .collect::<SynthResult<Vec<_>>>()?;

    let mut truncated = 0usize;
    for (i, wave) in waves.iter().enumerate() {
        let start = samples_for(sr, i as f64 * frame_duration);
        let written = master
            .accumulate_at(start, wave)
            .map_err(|e| e.at_frame(i))?;
        truncated += wave.frames() - written;
        progress.inc(1);
    }

    if truncated > 0 {
        log::info!("Truncated {} trailing sample(s) at the end of the timeline", truncated);
    }

    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::SAMPLE_RATE;
    use crate::frames::model::fixtures;

    fn settings(wave: WaveKind) -> RenderSettings {
        RenderSettings {
            sample_rate: SAMPLE_RATE,
            stereo: false,
            wave,
            synthesis: SynthesisKind::None,
            envelope: EnvelopeKind::None,
            effect: EffectKind::None,
            include_sine: false,
            mapping: ControlMapping::default(),
        }
    }

    #[test]
    fn scaled_mapping_clips() {
        let m = ControlMapping::default();
        assert_eq!(m.frequency(5.0), 100.0);
        assert_eq!(m.frequency(50.0), 500.0);
        assert_eq!(m.frequency(255.0), 1000.0);
    }

    #[test]
    fn direct_mapping_uses_brightness_as_hz() {
        let m: ControlMapping = "direct".parse().unwrap();
        assert_eq!(m.frequency(128.0), 128.0);
        assert_eq!(m.frequency(0.0), 20.0);
    }

    #[test]
    fn empty_sequence_maps_to_empty_buffer() {
        let seq = fixtures::uniform(0, 1.0, 128.0);
        let out = map_frames(&seq, &settings(WaveKind::Sine), &ProgressBar::hidden()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn timeline_length_matches_video_duration() {
        let seq = fixtures::uniform(10, 1.0, 128.0);
        let out = map_frames(&seq, &settings(WaveKind::Sine), &ProgressBar::hidden()).unwrap();
        assert_eq!(out.frames(), 44_100);
    }

    #[test]
    fn every_frame_region_is_audible() {
        let seq = fixtures::uniform(10, 1.0, 128.0);
        let out = map_frames(&seq, &settings(WaveKind::Sine), &ProgressBar::hidden()).unwrap();
        for region in out.samples.chunks(4410) {
            let peak = region.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
            assert!(peak > 0.4, "silent region");
        }
    }

    #[test]
    fn odd_frame_count_never_grows_master() {
        // 7 frames over 1s do not divide evenly into samples
        let seq = fixtures::uniform(7, 1.0, 30.0);
        let mut s = settings(WaveKind::Square);
        s.effect = EffectKind::Delay;
        s.stereo = true;
        let out = map_frames(&seq, &s, &ProgressBar::hidden()).unwrap();
        assert_eq!(out.frames(), 44_100);
        assert_eq!(out.channels, 2);
    }

    #[test]
    fn sine_blend_raises_level() {
        let seq = fixtures::uniform(4, 0.4, 40.0);
        let plain = map_frames(&seq, &settings(WaveKind::Sine), &ProgressBar::hidden()).unwrap();
        let mut s = settings(WaveKind::Sine);
        s.include_sine = true;
        let blended = map_frames(&seq, &s, &ProgressBar::hidden()).unwrap();
        assert!((blended.peak() / plain.peak() - 1.5).abs() < 1e-3);
    }
}
