use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use super::buffer::SampleBuffer;

const FFT_SIZE: usize = 2048;
const HOP_SIZE: usize = 1024;

#[derive(Clone, Debug, Serialize)]
pub struct WindowStats {
    /// Window start in seconds
    pub time: f32,
    pub rms: f32,
    pub peak: f32,
    /// Spectral centroid (Hz)
    pub spectral_centroid: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SignalReport {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: f32,
    pub peak: f32,
    pub rms: f32,
    pub windows: Vec<WindowStats>,
}

/// Summarizes a rendered buffer: global level plus per-window RMS and centroid.
pub fn analyze(buffer: &SampleBuffer) -> SignalReport {
    let mono = buffer.clone().with_channels(1).samples;
    let sr = buffer.sample_rate;
    let freq_resolution = sr as f32 / FFT_SIZE as f32;
    let hann = hann_window(FFT_SIZE);

    let rms = if buffer.is_empty() {
        0.0
    } else {
        (mono.iter().map(|s| s * s).sum::<f32>() / mono.len() as f32).sqrt()
    };

    let num_windows = if buffer.is_empty() {
        0
    } else {
        mono.len().saturating_sub(1) / HOP_SIZE + 1
    };

    let windows: Vec<WindowStats> = (0..num_windows)
        .into_par_iter()
        .map(|w| {
            let start = w * HOP_SIZE;
            let end = (start + FFT_SIZE).min(mono.len());
            let chunk = &mono[start..end];

            let mut fft_input: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); FFT_SIZE];
            for (i, &s) in chunk.iter().enumerate() {
                fft_input[i] = Complex::new(s * hann[i], 0.0);
            }

            // Per-thread FFT planner (rayon-safe)
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(FFT_SIZE);
            fft.process(&mut fft_input);

            let bins: Vec<f32> = fft_input[..FFT_SIZE / 2].iter().map(|c| c.norm()).collect();
            let total_energy: f32 = bins.iter().sum();
            let spectral_centroid = if total_energy > 1e-10 {
                bins.iter()
                    .enumerate()
                    .map(|(i, &mag)| i as f32 * freq_resolution * mag)
                    .sum::<f32>()
                    / total_energy
            } else {
                0.0
            };

            let window_rms =
                (chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len().max(1) as f32).sqrt();
            let peak = chunk.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            WindowStats {
                time: start as f32 / sr as f32,
                rms: window_rms,
                peak,
                spectral_centroid,
            }
        })
        .collect();

    SignalReport {
        sample_rate: sr,
        channels: buffer.channels,
        duration: buffer.duration() as f32,
        peak: buffer.peak(),
        rms,
        windows,
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
