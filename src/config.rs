use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::midi::composer::LayerConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub drums: DrumsConfig,
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_wave")]
    pub wave: String,
    #[serde(default = "default_none")]
    pub synthesis: String,
    #[serde(default = "default_none")]
    pub effect: String,
    #[serde(default = "default_none")]
    pub envelope: String,
    #[serde(default)]
    pub include_sine: bool,
    #[serde(default)]
    pub stereo: bool,
    #[serde(default = "default_mapping")]
    pub mapping: String,
}

#[derive(Debug, Deserialize)]
pub struct DrumsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_drum_tempo")]
    pub tempo: f64,
    #[serde(default = "default_beats_per_measure")]
    pub beats_per_measure: u32,
    #[serde(default = "default_measures")]
    pub measures: u32,
}

#[derive(Debug, Deserialize)]
pub struct MidiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_midi_tempo")]
    pub tempo: f64,
    #[serde(default)]
    pub seed: u64,
    pub soundfont: Option<PathBuf>,
    #[serde(default = "default_fluidsynth")]
    pub fluidsynth: PathBuf,
    #[serde(default)]
    pub layers: LayerConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaletteConfig {
    pub path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            wave: default_wave(),
            synthesis: default_none(),
            effect: default_none(),
            envelope: default_none(),
            include_sine: false,
            stereo: false,
            mapping: default_mapping(),
        }
    }
}

impl Default for DrumsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tempo: default_drum_tempo(),
            beats_per_measure: default_beats_per_measure(),
            measures: default_measures(),
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tempo: default_midi_tempo(),
            seed: 0,
            soundfont: None,
            fluidsynth: default_fluidsynth(),
            layers: LayerConfig::default(),
        }
    }
}

pub fn default_wave() -> String { "sine".into() }
pub fn default_none() -> String { "none".into() }
pub fn default_mapping() -> String { "scaled".into() }
pub fn default_drum_tempo() -> f64 { 120.0 }
pub fn default_beats_per_measure() -> u32 { 4 }
pub fn default_measures() -> u32 { 1 }
pub fn default_midi_tempo() -> f64 { 120.0 }
pub fn default_fluidsynth() -> PathBuf { PathBuf::from("fluidsynth") }

/// Explicit path first, then `./chromasynth.toml`, then the user config directories.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("chromasynth.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("chromasynth").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("chromasynth").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_config(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}
