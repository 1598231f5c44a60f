use serde::Deserialize;

use crate::error::{SynthError, SynthResult};

/// A representative color produced by clustering a frame's pixels.
#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    #[serde(default)]
    pub name: String,
}

/// One visual sample of the input video.
#[allow(dead_code)]
#[derive(Clone, Debug, Deserialize)]
pub struct FrameFeature {
    /// Mean luminance, 0-255
    pub brightness: f64,
    /// Ranked by pixel-cluster weight, typically 4 entries
    #[serde(default)]
    pub dominant_colors: Vec<DominantColor>,
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default)]
    pub contrast: Option<f64>,
    #[serde(default)]
    pub motion: Option<f64>,
}

/// Ordered frame records plus whole-video summary. Order is the only clock.
#[derive(Clone, Debug, Deserialize)]
pub struct FrameSequence {
    pub video_duration: f64,
    #[serde(default)]
    pub overall_dominant_colors: Vec<DominantColor>,
    pub frames: Vec<FrameFeature>,
}

impl FrameSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Seconds covered by each frame; constant across the sequence.
    pub fn frame_duration(&self) -> SynthResult<f64> {
        if self.frames.is_empty() {
            return Err(SynthError::EmptySequence);
        }
        Ok(self.video_duration / self.frames.len() as f64)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn color(hex: &str) -> DominantColor {
        let v = u32::from_str_radix(hex.trim_start_matches('#'), 16).unwrap_or(0);
        DominantColor {
            rgb: [(v >> 16) as u8, (v >> 8) as u8, v as u8],
            hex: hex.to_string(),
            name: String::new(),
        }
    }

    pub fn uniform(n: usize, duration: f64, brightness: f64) -> FrameSequence {
        let frame = FrameFeature {
            brightness,
            dominant_colors: ["#ff0000", "#00ff00", "#0000ff", "#ffff00"]
                .iter()
                .map(|h| color(h))
                .collect(),
            mass: None,
            contrast: None,
            motion: None,
        };
        FrameSequence {
            video_duration: duration,
            overall_dominant_colors: vec![color("#ff0000"), color("#0000ff")],
            frames: vec![frame; n],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_is_constant() {
        let seq = fixtures::uniform(10, 1.0, 128.0);
        assert!((seq.frame_duration().unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_sequence_has_no_frame_duration() {
        let seq = fixtures::uniform(0, 1.0, 128.0);
        assert!(matches!(seq.frame_duration(), Err(SynthError::EmptySequence)));
    }
}
