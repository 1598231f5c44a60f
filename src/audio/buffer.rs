use crate::error::{SynthError, SynthResult};

/// Fixed pipeline sample rate.
pub const SAMPLE_RATE: u32 = 44_100;

/// Interleaved floating-point samples with a channel count and sample rate.
///
/// Values are nominally in [-1, 1] but intermediate sums may exceed that range;
/// normalization happens once, right before the file is written.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn silent(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: 1,
            samples,
        }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    pub fn same_shape(&self, other: &SampleBuffer) -> bool {
        self.channels == other.channels && self.samples.len() == other.samples.len()
    }

    fn shape_mismatch(&self, other: &SampleBuffer) -> SynthError {
        SynthError::ShapeMismatch {
            left: self.channels,
            left_frames: self.frames(),
            right: other.channels,
            right_frames: other.frames(),
        }
    }

    /// Duplicates a mono buffer into two identical channels.
    pub fn into_stereo(self) -> Self {
        if self.channels != 1 {
            return self;
        }
        let samples = self.samples.iter().flat_map(|&s| [s, s]).collect();
        Self {
            sample_rate: self.sample_rate,
            channels: 2,
            samples,
        }
    }

    /// Converts to `channels` by averaging down to mono, then duplicating up.
    pub fn with_channels(self, channels: u16) -> Self {
        if self.channels == channels || channels == 0 {
            return self;
        }
        let src = self.channels.max(1) as usize;
        let mono: Vec<f32> = self
            .samples
            .chunks(src)
            .map(|frame| frame.iter().sum::<f32>() / src as f32)
            .collect();
        let samples = mono
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
            .collect();
        Self {
            sample_rate: self.sample_rate,
            channels,
            samples,
        }
    }

    /// Element-wise `self += other * gain`. Shapes must match exactly.
    pub fn add_scaled(&mut self, other: &SampleBuffer, gain: f32) -> SynthResult<()> {
        if !self.same_shape(other) {
            return Err(self.shape_mismatch(other));
        }
        for (dst, src) in self.samples.iter_mut().zip(&other.samples) {
            *dst += src * gain;
        }
        Ok(())
    }

    /// Truncates or zero-pads to `frames`; never interpolates.
    pub fn resized(mut self, frames: usize) -> Self {
        self.samples.resize(frames * self.channels as usize, 0.0);
        self
    }

    /// Adds `other` starting at `start_frame`, dropping whatever runs past the end.
    /// Returns the number of frames actually written.
    pub fn accumulate_at(&mut self, start_frame: usize, other: &SampleBuffer) -> SynthResult<usize> {
        if self.channels != other.channels {
            return Err(self.shape_mismatch(other));
        }
        let total = self.frames();
        if start_frame >= total {
            return Ok(0);
        }
        let end_frame = (start_frame + other.frames()).min(total);
        let ch = self.channels as usize;
        let region = &mut self.samples[start_frame * ch..end_frame * ch];
        for (dst, src) in region.iter_mut().zip(&other.samples) {
            *dst += *src;
        }
        Ok(end_frame - start_frame)
    }
}

pub fn samples_for(sample_rate: u32, seconds: f64) -> usize {
    (sample_rate as f64 * seconds).round().max(0.0) as usize
}
