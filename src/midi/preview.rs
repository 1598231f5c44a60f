use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::Path;

use super::events::MidiEventList;
use super::render::MidiRenderer;
use super::smf::write_smf;
use crate::audio::wav::write_pcm16;

const PREVIEW_TEMPO: f64 = 120.0;
const PREVIEW_VELOCITY: u8 = 100;
pub const PROGRAMS: u8 = 128;

/// One second of the octave 60..=71 sounded together on `program`.
pub fn preview_events(program: u8) -> MidiEventList {
    let mut events = MidiEventList::default();
    events.add_program_change(0, 0, 0.0, program);
    for pitch in 60..=71 {
        events.add_note(0, 0, pitch, 0.0, 1.0, PREVIEW_VELOCITY);
    }
    events
}

/// Writes `<program>.mid` for every General-MIDI program into `dir`, plus
/// `<program>.wav` when a renderer is available. Returns the number of WAVs written.
pub fn write_previews(dir: &Path, renderer: Option<&dyn MidiRenderer>, pb: &ProgressBar) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preview directory: {}", dir.display()))?;

    let mut rendered = 0;
    for program in 0..PROGRAMS {
        let midi_path = dir.join(format!("{}.mid", program));
        write_smf(&midi_path, &preview_events(program), PREVIEW_TEMPO)?;

        if let Some(renderer) = renderer {
            let buffer = renderer
                .render(&midi_path)
                .with_context(|| format!("Rendering preview for program {}", program))?;
            let wav_path = dir.join(format!("{}.wav", program));
            match write_pcm16(&wav_path, buffer) {
                Ok(_) => rendered += 1,
                Err(e) => log::warn!("Skipping preview {}: {:#}", program, e),
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    log::info!("Wrote {} previews ({} rendered) to {}", PROGRAMS, rendered, dir.display());
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::{SampleBuffer, SAMPLE_RATE};
    use crate::error::SynthResult;

    struct ToneRenderer;

    impl MidiRenderer for ToneRenderer {
        fn render(&self, _midi_path: &Path) -> SynthResult<SampleBuffer> {
            Ok(SampleBuffer::mono(SAMPLE_RATE, vec![0.0, 0.5, -0.25, 0.1]))
        }
    }

    #[test]
    fn preview_is_one_octave() {
        let events = preview_events(42);
        assert_eq!(events.notes.len(), 12);
        assert_eq!(events.program_changes[0].program, 42);
        assert!(events.notes.iter().all(|n| n.start == 0.0 && n.duration == 1.0));
        assert_eq!(events.notes.first().map(|n| n.pitch), Some(60));
        assert_eq!(events.notes.last().map(|n| n.pitch), Some(71));
    }

    #[test]
    fn writes_all_programs() {
        let dir = tempfile::tempdir().unwrap();
        let count = write_previews(dir.path(), Some(&ToneRenderer), &ProgressBar::hidden()).unwrap();
        assert_eq!(count, 128);
        assert!(dir.path().join("0.mid").exists());
        assert!(dir.path().join("127.wav").exists());
    }

    #[test]
    fn midi_only_without_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let count = write_previews(dir.path(), None, &ProgressBar::hidden()).unwrap();
        assert_eq!(count, 0);
        assert!(dir.path().join("64.mid").exists());
        assert!(!dir.path().join("64.wav").exists());
    }
}
