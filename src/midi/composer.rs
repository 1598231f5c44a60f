use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Deserialize;

use super::events::MidiEventList;
use crate::color::palette::{ColorMatcher, ColorPalette, PaletteMatch};
use crate::error::{SynthError, SynthResult};
use crate::frames::model::{FrameFeature, FrameSequence};

pub const MELODY_CHANNEL: u8 = 0;
pub const BASS_CHANNEL: u8 = 1;
pub const CHORD_CHANNEL: u8 = 2;
pub const ARPEGGIO_CHANNEL: u8 = 3;
/// Shared by the fractal and progression layers.
pub const TEXTURE_CHANNEL: u8 = 4;
/// General-MIDI percussion channel.
pub const DRUM_CHANNEL: u8 = 9;

pub const KICK: u8 = 36;
pub const SNARE: u8 = 38;

/// Frames between program changes.
pub const PROGRAM_PERIOD: usize = 10;
const PITCH_LOW: f64 = 60.0;
const PITCH_HIGH: f64 = 80.0;
/// Dominant color that picks the instrument.
const REFERENCE_COLOR: usize = 3;
const FALLBACK_COLOR: &str = "#000000";

const TEXTURE_TRACK: u8 = 4;
const DRUM_TRACK: u8 = 5;
const TEXTURE_VELOCITY: u8 = 100;

const FRACTAL_PERIOD: usize = 16;
const FRACTAL_DEPTH: u8 = 3;
const FRACTAL_STEP: u8 = 2;
/// Onset shift per fractal level, seconds.
const FRACTAL_OFFSET: f64 = 0.1;

const PROGRESSION_PERIOD: usize = 40;
const PROGRESSION: [u8; 4] = [0, 4, 7, 12];
const PROGRESSION_SECONDS: f64 = 1.0;

const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Pitch-class transitions: C -> {D, E}, D -> {E, C}, E -> {C, D}.
const TRANSITIONS: [(u8, [(u8, f64); 2]); 3] = [
    (0, [(2, 0.5), (4, 0.5)]),
    (2, [(4, 0.7), (0, 0.3)]),
    (4, [(0, 0.6), (2, 0.4)]),
];

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayerConfig {
    pub melody: bool,
    pub bass: bool,
    pub chord: bool,
    pub arpeggio: bool,
    /// Stacked notes a whole step apart, each entering later and shorter.
    pub fractal: bool,
    /// Major triad plus octave on the frame pitch.
    pub progression: bool,
    pub drums: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            melody: true,
            bass: true,
            chord: true,
            arpeggio: true,
            fractal: true,
            progression: true,
            drums: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ComposerSettings {
    pub tempo_bpm: f64,
    pub seed: u64,
    pub layers: LayerConfig,
}

/// One pitched layer: its schedule, register and voice memory.
struct Layer {
    track: u8,
    channel: u8,
    /// Emit a note when `frame % period == 0`.
    period: usize,
    octave_offset: i16,
    /// Note length in beats.
    length: f64,
    velocity: Velocity,
    last_pitch: Option<u8>,
}

#[derive(Clone, Copy)]
enum Velocity {
    Fixed(u8),
    Random(u8, u8),
}

impl Velocity {
    fn pick(self, rng: &mut Pcg32) -> u8 {
        match self {
            Velocity::Fixed(v) => v,
            Velocity::Random(lo, hi) => rng.gen_range(lo..=hi),
        }
    }
}

impl Layer {
    /// Next pitch from the Markov table when the last pitch class is known,
    /// otherwise the target snapped down onto the major scale.
    fn next_pitch(&mut self, target: u8, rng: &mut Pcg32) -> u8 {
        let from_table = self.last_pitch.and_then(|last| {
            let (_, choices) = TRANSITIONS.iter().find(|(pc, _)| *pc == last % 12)?;
            let weights = WeightedIndex::new(choices.iter().map(|(_, w)| *w)).ok()?;
            let pc = choices[weights.sample(rng)].0;
            Some(target - target % 12 + pc)
        });
        let pitch = from_table.unwrap_or_else(|| snap_to_scale(target));
        self.last_pitch = Some(pitch);
        pitch
    }
}

fn snap_to_scale(pitch: u8) -> u8 {
    let pc = pitch % 12;
    let degree = MAJOR_SCALE.iter().rev().find(|&&d| d <= pc).copied().unwrap_or(0);
    pitch - pc + degree
}

/// Brightness 0-255 quantized linearly onto MIDI 60-80.
pub fn brightness_to_pitch(brightness: f64) -> u8 {
    let unit = brightness.clamp(0.0, 255.0) / 255.0;
    (PITCH_LOW + (unit * (PITCH_HIGH - PITCH_LOW)).round()) as u8
}

/// Hex of the frame's instrument color, or black when it is missing.
pub fn reference_color(frame: &FrameFeature) -> &str {
    frame
        .dominant_colors
        .get(REFERENCE_COLOR)
        .map(|c| c.hex.as_str())
        .unwrap_or(FALLBACK_COLOR)
}

fn frame_program(index: usize, frame: &FrameFeature, matcher: &mut ColorMatcher) -> SynthResult<u8> {
    let hex = reference_color(frame);
    let found = match matcher.nearest(hex) {
        Ok(m) => m,
        Err(SynthError::InvalidColor(bad)) => {
            log::warn!("Frame {}: unparseable color '{}', using black", index, bad);
            matcher.nearest(FALLBACK_COLOR)?
        }
        Err(e) => return Err(e.at_frame(index)),
    };
    Ok(found.index.min(127))
}

/// Palette match for each of the video's overall dominant colors.
pub fn overall_instruments(
    sequence: &FrameSequence,
    matcher: &mut ColorMatcher,
) -> Vec<(String, PaletteMatch)> {
    sequence
        .overall_dominant_colors
        .iter()
        .filter_map(|c| match matcher.nearest(&c.hex) {
            Ok(m) => Some((c.hex.clone(), m)),
            Err(e) => {
                log::warn!("Skipping overall color: {}", e);
                None
            }
        })
        .collect()
}

/// Builds the multi-layer event list. Times are absolute seconds, `frame * frame_duration`,
/// and no note extends past the end of the video.
pub fn compose(
    sequence: &FrameSequence,
    palette: &ColorPalette,
    settings: &ComposerSettings,
) -> SynthResult<MidiEventList> {
    if !(settings.tempo_bpm > 0.0) || !settings.tempo_bpm.is_finite() {
        return Err(SynthError::InvalidTempo(settings.tempo_bpm));
    }
    let mut events = MidiEventList::default();
    if sequence.is_empty() {
        log::warn!("No frames to compose");
        return Ok(events);
    }

    let frame_duration = sequence.frame_duration()?;
    let beat = 60.0 / settings.tempo_bpm;
    let end = sequence.video_duration;
    let mut rng = Pcg32::seed_from_u64(settings.seed);
    let mut matcher = ColorMatcher::new(palette);

    for (hex, m) in overall_instruments(sequence, &mut matcher) {
        log::info!("Overall color {} -> palette {} ({}), dE={:.2}", hex, m.index, m.hex, m.distance);
    }

    let layers_on = settings.layers;
    let mut layers: Vec<Layer> = [
        (layers_on.melody, 0, MELODY_CHANNEL, 4, 0, 1.0, Velocity::Random(90, 127)),
        (layers_on.bass, 1, BASS_CHANNEL, 8, -24, 1.0, Velocity::Fixed(100)),
        (layers_on.chord, 2, CHORD_CHANNEL, 16, -12, 2.0, Velocity::Fixed(90)),
        (layers_on.arpeggio, 3, ARPEGGIO_CHANNEL, 2, 12, 0.5, Velocity::Fixed(80)),
    ]
    .into_iter()
    .filter(|(on, ..)| *on)
    .map(|(_, track, channel, period, octave_offset, length, velocity)| Layer {
        track,
        channel,
        period,
        octave_offset,
        length,
        velocity,
        last_pitch: None,
    })
    .collect();
    let texture_on = layers_on.fractal || layers_on.progression;

    for (i, frame) in sequence.frames.iter().enumerate() {
        let time = i as f64 * frame_duration;
        let pitch = brightness_to_pitch(frame.brightness);
        let program = frame_program(i, frame, &mut matcher)?;
        let clip = |length: f64| length.min(end - time);

        for layer in layers.iter_mut() {
            if i % PROGRAM_PERIOD == 0 {
                events.add_program_change(layer.track, layer.channel, time, program);
            }
            if i % layer.period == 0 {
                let target = (pitch as i16 + layer.octave_offset).clamp(0, 127) as u8;
                let note = layer.next_pitch(target, &mut rng);
                let velocity = layer.velocity.pick(&mut rng);
                events.add_note(layer.track, layer.channel, note, time, clip(layer.length * beat), velocity);
            }
        }

        if texture_on && i % PROGRAM_PERIOD == 0 {
            events.add_program_change(TEXTURE_TRACK, TEXTURE_CHANNEL, time, program);
        }
        if layers_on.fractal && i % FRACTAL_PERIOD == 0 {
            for depth in 0..FRACTAL_DEPTH {
                let start = time + depth as f64 * FRACTAL_OFFSET;
                if start >= end {
                    break;
                }
                let length = (beat / (depth + 1) as f64).min(end - start);
                let note = pitch + FRACTAL_STEP * depth;
                events.add_note(TEXTURE_TRACK, TEXTURE_CHANNEL, note, start, length, TEXTURE_VELOCITY);
            }
        }
        if layers_on.progression && i % PROGRESSION_PERIOD == 0 {
            for interval in PROGRESSION {
                let length = clip(PROGRESSION_SECONDS);
                events.add_note(TEXTURE_TRACK, TEXTURE_CHANNEL, pitch + interval, time, length, TEXTURE_VELOCITY);
            }
        }

        if layers_on.drums {
            if i % 2 == 0 {
                let velocity = rng.gen_range(100..=127);
                events.add_note(DRUM_TRACK, DRUM_CHANNEL, KICK, time, clip(beat / 2.0), velocity);
            }
            if i % 4 == 2 {
                let velocity = rng.gen_range(80..=110);
                events.add_note(DRUM_TRACK, DRUM_CHANNEL, SNARE, time, clip(beat / 2.0), velocity);
            }
        }
    }

    for channel in [
        MELODY_CHANNEL,
        BASS_CHANNEL,
        CHORD_CHANNEL,
        ARPEGGIO_CHANNEL,
        TEXTURE_CHANNEL,
        DRUM_CHANNEL,
    ] {
        log::debug!(
            "Channel {}: {} notes, {} program changes",
            channel,
            events.notes_on(channel).count(),
            events.program_changes_on(channel).count()
        );
    }

    log::info!(
        "Composed {} notes, {} program changes over {:.2}s ({} distinct colors matched)",
        events.notes.len(),
        events.program_changes.len(),
        events.end_time(),
        matcher.cached()
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::model::fixtures;

    fn settings() -> ComposerSettings {
        ComposerSettings {
            tempo_bpm: 120.0,
            seed: 7,
            layers: LayerConfig::default(),
        }
    }

    #[test]
    fn program_change_every_ten_frames() {
        let seq = fixtures::uniform(100, 10.0, 128.0);
        let palette = ColorPalette::circular(16, 8);
        let events = compose(&seq, &palette, &settings()).unwrap();
        let changes: Vec<_> = events.program_changes_on(MELODY_CHANNEL).collect();
        assert_eq!(changes.len(), 100 / 10);
        assert!(changes.windows(2).all(|w| w[1].time > w[0].time));
        assert!(events.program_changes_on(DRUM_CHANNEL).next().is_none());
    }

    #[test]
    fn layer_schedules() {
        let seq = fixtures::uniform(32, 3.2, 100.0);
        let palette = ColorPalette::circular(16, 8);
        let events = compose(&seq, &palette, &settings()).unwrap();
        assert_eq!(events.notes_on(MELODY_CHANNEL).count(), 8);
        assert_eq!(events.notes_on(BASS_CHANNEL).count(), 4);
        assert_eq!(events.notes_on(CHORD_CHANNEL).count(), 2);
        assert_eq!(events.notes_on(ARPEGGIO_CHANNEL).count(), 16);
        let drums: Vec<_> = events.notes_on(DRUM_CHANNEL).collect();
        assert_eq!(drums.iter().filter(|n| n.pitch == KICK).count(), 16);
        assert_eq!(drums.iter().filter(|n| n.pitch == SNARE).count(), 8);
        assert!(drums.iter().all(|n| n.velocity >= 80));
    }

    fn only(fractal: bool, progression: bool) -> ComposerSettings {
        let mut s = settings();
        s.layers = LayerConfig {
            melody: false,
            bass: false,
            chord: false,
            arpeggio: false,
            fractal,
            progression,
            drums: false,
        };
        s
    }

    #[test]
    fn fractal_layer_stacks_later_shorter_notes() {
        // brightness 128 -> pitch 70; beat is 0.5s at 120 bpm
        let seq = fixtures::uniform(48, 4.8, 128.0);
        let palette = ColorPalette::circular(16, 8);
        let events = compose(&seq, &palette, &only(true, false)).unwrap();
        let notes: Vec<_> = events.notes_on(TEXTURE_CHANNEL).collect();
        assert_eq!(notes.len(), 3 * 3);
        assert_eq!(events.notes.len(), notes.len());

        let second: Vec<_> = notes.iter().filter(|n| n.start >= 1.6 - 1e-9 && n.start < 2.0).collect();
        assert_eq!(second.len(), 3);
        for (depth, n) in second.iter().enumerate() {
            assert_eq!(n.pitch, 70 + 2 * depth as u8);
            assert!((n.start - (1.6 + 0.1 * depth as f64)).abs() < 1e-9);
            assert!((n.duration - 0.5 / (depth + 1) as f64).abs() < 1e-9);
            assert_eq!(n.velocity, 100);
        }
        assert_eq!(events.program_changes_on(TEXTURE_CHANNEL).count(), 5);
    }

    #[test]
    fn progression_layer_every_forty_frames() {
        let seq = fixtures::uniform(48, 4.8, 128.0);
        let palette = ColorPalette::circular(16, 8);
        let events = compose(&seq, &palette, &only(false, true)).unwrap();
        let notes: Vec<_> = events.notes_on(TEXTURE_CHANNEL).collect();
        assert_eq!(notes.len(), 2 * 4);

        let pitches: Vec<u8> = notes[..4].iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![70, 74, 77, 82]);
        assert!(notes[..4].iter().all(|n| n.start == 0.0 && (n.duration - 1.0).abs() < 1e-9));
        // frame 40 starts at 4.0s; clipped to the 4.8s video
        assert!(notes[4..].iter().all(|n| (n.start - 4.0).abs() < 1e-9));
        assert!(notes[4..].iter().all(|n| (n.duration - 0.8).abs() < 1e-9));
    }

    #[test]
    fn times_are_absolute_and_bounded() {
        let seq = fixtures::uniform(40, 2.0, 200.0);
        let palette = ColorPalette::circular(16, 8);
        let events = compose(&seq, &palette, &settings()).unwrap();
        for note in &events.notes {
            let frame = (note.start / 0.05).round();
            assert!((note.start - frame * 0.05).abs() < 1e-9);
            assert!(note.start + note.duration <= 2.0 + 1e-9);
        }
        assert!(events.end_time() <= 2.0 + 1e-9);
    }

    #[test]
    fn registers_follow_layers() {
        let seq = fixtures::uniform(16, 1.6, 255.0);
        let palette = ColorPalette::circular(16, 8);
        let events = compose(&seq, &palette, &settings()).unwrap();
        for n in events.notes_on(MELODY_CHANNEL) {
            assert!((72..84).contains(&n.pitch), "{}", n.pitch);
        }
        for n in events.notes_on(BASS_CHANNEL) {
            assert!((48..60).contains(&n.pitch), "{}", n.pitch);
        }
        for n in events.notes_on(ARPEGGIO_CHANNEL) {
            assert!((84..96).contains(&n.pitch), "{}", n.pitch);
        }
    }

    #[test]
    fn instrument_comes_from_fourth_color() {
        // fourth dominant color in the fixture is yellow
        let seq = fixtures::uniform(10, 1.0, 128.0);
        let palette = ColorPalette::circular(16, 8);
        let expected = palette.nearest("#ffff00").unwrap().index;
        let events = compose(&seq, &palette, &settings()).unwrap();
        assert!(events.program_changes.iter().all(|p| p.program == expected));
    }

    #[test]
    fn missing_colors_fall_back_to_black() {
        let mut seq = fixtures::uniform(10, 1.0, 128.0);
        seq.frames[0].dominant_colors.truncate(2);
        let palette = ColorPalette::circular(16, 8);
        let black = palette.nearest("#000000").unwrap().index;
        let events = compose(&seq, &palette, &settings()).unwrap();
        assert_eq!(events.program_changes_on(MELODY_CHANNEL).next().unwrap().program, black);
    }

    #[test]
    fn bad_frame_color_is_not_fatal() {
        let mut seq = fixtures::uniform(10, 1.0, 128.0);
        seq.frames[0].dominant_colors[3].hex = "not-a-color".into();
        let palette = ColorPalette::circular(16, 8);
        assert!(compose(&seq, &palette, &settings()).is_ok());
    }

    #[test]
    fn same_seed_same_events() {
        let seq = fixtures::uniform(50, 5.0, 90.0);
        let palette = ColorPalette::circular(16, 8);
        let a = compose(&seq, &palette, &settings()).unwrap();
        let b = compose(&seq, &palette, &settings()).unwrap();
        assert_eq!(a.notes, b.notes);
    }

    #[test]
    fn disabled_layers_are_silent() {
        let seq = fixtures::uniform(20, 2.0, 90.0);
        let palette = ColorPalette::circular(16, 8);
        let mut s = settings();
        s.layers = LayerConfig {
            melody: true,
            bass: false,
            chord: false,
            arpeggio: false,
            fractal: false,
            progression: false,
            drums: false,
        };
        let events = compose(&seq, &palette, &s).unwrap();
        assert!(events.notes.iter().all(|n| n.channel == MELODY_CHANNEL));
    }

    #[test]
    fn rejects_zero_tempo_and_handles_empty() {
        let palette = ColorPalette::circular(16, 8);
        let mut s = settings();
        s.tempo_bpm = 0.0;
        let seq = fixtures::uniform(4, 1.0, 90.0);
        assert!(matches!(compose(&seq, &palette, &s), Err(SynthError::InvalidTempo(_))));
        let empty = fixtures::uniform(0, 1.0, 90.0);
        assert!(compose(&empty, &palette, &settings()).unwrap().is_empty());
    }

    #[test]
    fn pitch_quantization_range() {
        assert_eq!(brightness_to_pitch(0.0), 60);
        assert_eq!(brightness_to_pitch(255.0), 80);
        assert_eq!(brightness_to_pitch(-5.0), 60);
        assert_eq!(brightness_to_pitch(127.5), 70);
    }

    #[test]
    fn markov_walks_scale_degrees() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut layer = Layer {
            track: 0,
            channel: 0,
            period: 1,
            octave_offset: 0,
            length: 1.0,
            velocity: Velocity::Fixed(100),
            last_pitch: None,
        };
        // 61 (C#) snaps to C, then the table keeps it on C/D/E
        assert_eq!(layer.next_pitch(61, &mut rng), 60);
        for _ in 0..20 {
            let p = layer.next_pitch(61, &mut rng);
            assert!([60, 62, 64].contains(&p));
        }
    }
}
