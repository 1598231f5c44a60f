use anyhow::{Context, Result};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};
use std::path::Path;

use super::events::MidiEventList;

/// Ticks per quarter note.
pub const PPQ: u16 = 480;
/// Largest value the 24-bit tempo meta event can hold.
const MAX_MICROS_PER_QUARTER: f64 = 0xFF_FFFF as f64;

struct TimedEvent {
    tick: u32,
    /// Same-tick order: note-off, program change, note-on.
    order: u8,
    kind: TrackEventKind<'static>,
}

fn seconds_to_ticks(seconds: f64, tempo_bpm: f64) -> u32 {
    (seconds * tempo_bpm / 60.0 * PPQ as f64).round().max(0.0) as u32
}

fn midi(channel: u8, message: MidiMessage) -> TrackEventKind<'static> {
    TrackEventKind::Midi {
        channel: u4::from(channel.min(15)),
        message,
    }
}

fn conductor_track(micros_per_quarter: u32) -> Vec<TrackEvent<'static>> {
    vec![
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(micros_per_quarter))),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
        },
        TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]
}

/// Encodes the event list as a format-1 file: a tempo track followed by one
/// track per event track index.
pub fn to_bytes(events: &MidiEventList, tempo_bpm: f64) -> Result<Vec<u8>> {
    if !(tempo_bpm > 0.0) || !tempo_bpm.is_finite() {
        anyhow::bail!("invalid MIDI tempo {}", tempo_bpm);
    }
    let micros = (60_000_000.0 / tempo_bpm).round();
    if micros > MAX_MICROS_PER_QUARTER {
        anyhow::bail!(
            "MIDI tempo {} BPM is too slow to encode ({} us per quarter, max {})",
            tempo_bpm,
            micros,
            MAX_MICROS_PER_QUARTER
        );
    }
    if events.is_empty() {
        log::warn!("Encoding a MIDI file with no events");
    }
    let mut tracks = vec![conductor_track(micros as u32)];

    for track in 0..=events.max_track().unwrap_or(0) {
        let mut timed = Vec::new();
        for p in events.program_changes.iter().filter(|p| p.track == track) {
            timed.push(TimedEvent {
                tick: seconds_to_ticks(p.time, tempo_bpm),
                order: 1,
                kind: midi(
                    p.channel,
                    MidiMessage::ProgramChange {
                        program: u7::from(p.program.min(127)),
                    },
                ),
            });
        }
        for n in events.notes.iter().filter(|n| n.track == track) {
            let key = u7::from(n.pitch.min(127));
            timed.push(TimedEvent {
                tick: seconds_to_ticks(n.start, tempo_bpm),
                order: 2,
                kind: midi(
                    n.channel,
                    MidiMessage::NoteOn {
                        key,
                        vel: u7::from(n.velocity.min(127)),
                    },
                ),
            });
            timed.push(TimedEvent {
                tick: seconds_to_ticks(n.start + n.duration, tempo_bpm),
                order: 0,
                kind: midi(n.channel, MidiMessage::NoteOff { key, vel: u7::from(0) }),
            });
        }
        timed.sort_by_key(|e| (e.tick, e.order));

        let mut track_events = Vec::with_capacity(timed.len() + 1);
        let mut previous_tick = 0;
        for event in timed {
            track_events.push(TrackEvent {
                delta: u28::from(event.tick - previous_tick),
                kind: event.kind,
            });
            previous_tick = event.tick;
        }
        track_events.push(TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        tracks.push(track_events);
    }

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(u15::from(PPQ)),
    };
    let mut bytes = Vec::new();
    Smf { header, tracks }
        .write_std(&mut bytes)
        .context("Failed to encode MIDI")?;
    Ok(bytes)
}

pub fn write_smf(path: &Path, events: &MidiEventList, tempo_bpm: f64) -> Result<()> {
    let bytes = to_bytes(events, tempo_bpm)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!(
        "Wrote MIDI: {} ({} notes, {} bytes)",
        path.display(),
        events.notes.len(),
        bytes.len()
    );
    Ok(())
}
