use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::lab::{delta_e_2000, Lab, Rgb};
use crate::error::{SynthError, SynthResult};

/// Number of reference colors; indices double as General-MIDI programs.
pub const PALETTE_SIZE: usize = 128;

#[derive(Clone, Debug)]
pub struct PaletteEntry {
    pub index: u8,
    pub hex: String,
    pub lab: Lab,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaletteMatch {
    pub index: u8,
    pub hex: String,
    pub distance: f64,
}

/// Index-ascending reference colors, read-only after load.
#[derive(Clone, Debug)]
pub struct ColorPalette {
    entries: Vec<PaletteEntry>,
}

impl ColorPalette {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read palette: {}", path.display()))?;
        let palette = Self::from_json(&content)
            .with_context(|| format!("Failed to parse palette: {}", path.display()))?;
        log::info!("Loaded {} palette colors from {}", palette.len(), path.display());
        Ok(palette)
    }

    /// Parses a `{"0": "#000000", ...}` mapping.
    pub fn from_json(content: &str) -> SynthResult<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(content)
            .map_err(|e| SynthError::InvalidPalette(e.to_string()))?;
        let mut colors = BTreeMap::new();
        for (key, hex) in raw {
            let index: u8 = key
                .trim()
                .parse()
                .ok()
                .filter(|&i: &u8| (i as usize) < PALETTE_SIZE)
                .ok_or_else(|| SynthError::InvalidPalette(format!("bad index '{}'", key)))?;
            colors.insert(index, Rgb::from_hex(&hex)?);
        }
        Self::from_colors(colors)
    }

    fn from_colors(colors: BTreeMap<u8, Rgb>) -> SynthResult<Self> {
        if colors.is_empty() {
            return Err(SynthError::InvalidPalette("no colors".into()));
        }
        if colors.len() != PALETTE_SIZE {
            log::warn!("Palette has {} entries, expected {}", colors.len(), PALETTE_SIZE);
        }
        let entries = colors
            .into_iter()
            .map(|(index, rgb)| PaletteEntry {
                index,
                hex: rgb.to_hex(),
                lab: rgb.to_lab(),
            })
            .collect();
        Ok(Self { entries })
    }

    /// Regenerates the reference palette: `hue_segments` fully saturated hues per
    /// brightness level, brightest level first. The zero-brightness row is a gray
    /// ramp starting at pure black.
    pub fn circular(hue_segments: usize, brightness_levels: usize) -> Self {
        let mut colors = BTreeMap::new();
        for j in 0..brightness_levels {
            for i in 0..hue_segments {
                let index = j * hue_segments + i;
                if index >= PALETTE_SIZE {
                    continue;
                }
                let hue = i as f64 / hue_segments as f64;
                let brightness = if brightness_levels > 1 {
                    100.0 - (j as f64 / (brightness_levels - 1) as f64) * 100.0
                } else {
                    100.0
                };
                let rgb = if brightness == 0.0 {
                    let gray = ((255.0 / hue_segments as f64) * i as f64) as u8;
                    Rgb(gray, gray, gray)
                } else {
                    let (r, g, b) = hsv_to_rgb(hue, 1.0, brightness / 100.0);
                    Rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
                };
                colors.insert(index as u8, rgb);
            }
        }
        Self {
            entries: colors
                .into_iter()
                .map(|(index, rgb)| PaletteEntry {
                    index,
                    hex: rgb.to_hex(),
                    lab: rgb.to_lab(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> SynthResult<String> {
        let map: BTreeMap<String, &str> = self
            .entries
            .iter()
            .map(|e| (e.index.to_string(), e.hex.as_str()))
            .collect();
        serde_json::to_string_pretty(&map).map_err(|e| SynthError::InvalidPalette(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Linear scan for the smallest CIEDE2000 distance; ties go to the lower index.
    pub fn nearest_rgb(&self, rgb: Rgb) -> PaletteMatch {
        let query = rgb.to_lab();
        let mut best = &self.entries[0];
        let mut best_distance = f64::INFINITY;
        for entry in &self.entries {
            let distance = delta_e_2000(query, entry.lab);
            if distance < best_distance {
                best_distance = distance;
                best = entry;
            }
        }
        PaletteMatch {
            index: best.index,
            hex: best.hex.clone(),
            distance: best_distance,
        }
    }

    #[cfg(test)]
    pub fn nearest(&self, hex: &str) -> SynthResult<PaletteMatch> {
        Ok(self.nearest_rgb(Rgb::from_hex(hex)?))
    }
}

/// Memoizing front-end for repeated lookups of the same color.
pub struct ColorMatcher<'a> {
    palette: &'a ColorPalette,
    cache: HashMap<Rgb, PaletteMatch>,
}

impl<'a> ColorMatcher<'a> {
    pub fn new(palette: &'a ColorPalette) -> Self {
        Self {
            palette,
            cache: HashMap::new(),
        }
    }

    pub fn nearest(&mut self, hex: &str) -> SynthResult<PaletteMatch> {
        let rgb = Rgb::from_hex(hex)?;
        let palette = self.palette;
        Ok(self
            .cache
            .entry(rgb)
            .or_insert_with(|| palette.nearest_rgb(rgb))
            .clone())
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
