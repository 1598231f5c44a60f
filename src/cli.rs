use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chromasynth", about = "Sonify per-frame video features into a WAV soundtrack")]
pub struct Cli {
    /// Frame feature file (JSON)
    pub input: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "output.wav")]
    pub output: PathBuf,

    /// Base waveform (sine, square, sawtooth, triangle, additive, subtractive)
    #[arg(short, long, default_value = "sine")]
    pub wave: String,

    /// Synthesis stage (none, additive)
    #[arg(long, default_value = "none")]
    pub synthesis: String,

    /// Effect stage (none, delay)
    #[arg(long, default_value = "none")]
    pub effect: String,

    /// Envelope (none, fade_in). Unknown names leave frames unshaped.
    #[arg(long, default_value = "none")]
    pub envelope: String,

    /// Brightness-to-frequency mapping (scaled, direct)
    #[arg(long, default_value = "scaled")]
    pub mapping: String,

    /// Blend a sine of the same frequency into every frame
    #[arg(long)]
    pub include_sine: bool,

    /// Write two channels instead of one
    #[arg(long)]
    pub stereo: bool,

    /// Add the fixed-tempo kick layer
    #[arg(long)]
    pub drums: bool,

    /// Drum tempo in BPM
    #[arg(long, default_value_t = 120.0)]
    pub drum_tempo: f64,

    #[arg(long, default_value_t = 4)]
    pub beats_per_measure: u32,

    #[arg(long, default_value_t = 1)]
    pub measures: u32,

    /// Also save the drum layer on its own
    #[arg(long)]
    pub drum_out: Option<PathBuf>,

    /// Compose a multi-layer MIDI arrangement from brightness and color
    #[arg(long)]
    pub midi: bool,

    /// Where to write the composed MIDI file
    #[arg(long, default_value = "output.mid")]
    pub midi_out: PathBuf,

    /// MIDI tempo in BPM
    #[arg(long, default_value_t = 120.0)]
    pub midi_tempo: f64,

    /// Seed for velocities and melodic choices
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// General-MIDI soundfont; without one the MIDI file is written but not mixed in
    #[arg(long)]
    pub soundfont: Option<PathBuf>,

    /// fluidsynth binary
    #[arg(long, default_value = "fluidsynth")]
    pub fluidsynth: PathBuf,

    /// Color palette JSON ("0".."127" -> hex); defaults to the built-in circular palette
    #[arg(long)]
    pub palette: Option<PathBuf>,

    /// Write a JSON report of the output signal and overall color matches
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the 128-entry reference palette and exit
    #[arg(long)]
    pub write_palette: Option<PathBuf>,

    /// Write one preview per MIDI program into this directory and exit
    #[arg(long)]
    pub instrument_previews: Option<PathBuf>,

    /// List supported identifiers for every stage and exit
    #[arg(long)]
    pub list_kinds: bool,

    /// Config file (default: ./chromasynth.toml or ~/.config/chromasynth/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
