use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::audio::buffer::SampleBuffer;
use crate::audio::decode::decode_audio;
use crate::error::{SynthError, SynthResult};

/// Turns a Standard MIDI File into audio.
pub trait MidiRenderer {
    fn render(&self, midi_path: &Path) -> SynthResult<SampleBuffer>;
}

/// Renders through an external `fluidsynth` binary and a General-MIDI soundfont.
pub struct FluidSynthRenderer {
    pub binary: PathBuf,
    pub soundfont: PathBuf,
    pub sample_rate: u32,
}

impl FluidSynthRenderer {
    pub fn new(binary: PathBuf, soundfont: PathBuf, sample_rate: u32) -> Self {
        Self {
            binary,
            soundfont,
            sample_rate,
        }
    }

    fn render_to(&self, midi_path: &Path, wav_path: &Path) -> SynthResult<()> {
        if !self.soundfont.exists() {
            return Err(SynthError::RenderFailure(format!(
                "soundfont not found: {}",
                self.soundfont.display()
            )));
        }
        let output = Command::new(&self.binary)
            .arg("-ni")
            .arg(&self.soundfont)
            .arg(midi_path)
            .arg("-F")
            .arg(wav_path)
            .arg("-r")
            .arg(self.sample_rate.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                SynthError::RenderFailure(format!(
                    "failed to run {}: {}. Is fluidsynth installed?",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthError::RenderFailure(format!(
                "fluidsynth exited with {}:\n{}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl MidiRenderer for FluidSynthRenderer {
    fn render(&self, midi_path: &Path) -> SynthResult<SampleBuffer> {
        let dir = tempfile::tempdir().map_err(|e| SynthError::RenderFailure(e.to_string()))?;
        let wav_path = dir.path().join("rendered.wav");

        log::info!("Rendering {} with {}", midi_path.display(), self.soundfont.display());
        self.render_to(midi_path, &wav_path)?;

        let buffer =
            decode_audio(&wav_path).map_err(|e| SynthError::RenderFailure(format!("{:#}", e)))?;
        if buffer.sample_rate != self.sample_rate {
            return Err(SynthError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: buffer.sample_rate,
            });
        }
        log::info!(
            "Rendered MIDI: {:.2}s, {} channel(s)",
            buffer.duration(),
            buffer.channels
        );
        Ok(buffer)
    }
}
