mod audio;
mod cli;
mod color;
mod config;
mod error;
mod frames;
mod midi;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};

use audio::buffer::{SampleBuffer, SAMPLE_RATE};
use audio::diagnostics::{self, SignalReport};
use audio::drums::{generate_drum_beat, DrumPattern};
use audio::mapper::{map_frames, ControlMapping, RenderSettings};
use audio::stages::{EffectKind, EnvelopeKind, SynthesisKind};
use audio::waveform::WaveKind;
use audio::{mixdown, wav};
use cli::Cli;
use color::palette::{ColorMatcher, ColorPalette};
use error::SynthError;
use frames::model::FrameSequence;
use midi::composer::{self, ComposerSettings, LayerConfig};
use midi::render::{FluidSynthRenderer, MidiRenderer};

const HUE_SEGMENTS: usize = 16;
const BRIGHTNESS_LEVELS: usize = 8;

#[derive(Serialize)]
struct ColorReport {
    color: String,
    program: u8,
    palette_hex: String,
    distance: f64,
    preview: String,
}

#[derive(Serialize)]
struct Report {
    input: PathBuf,
    output: PathBuf,
    frames: usize,
    video_duration: f64,
    signal: SignalReport,
    overall_colors: Vec<ColorReport>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut layers = LayerConfig::default();

    if let Some(path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.wave == "sine" { cli.wave = cfg.render.wave; }
            if cli.synthesis == "none" { cli.synthesis = cfg.render.synthesis; }
            if cli.effect == "none" { cli.effect = cfg.render.effect; }
            if cli.envelope == "none" { cli.envelope = cfg.render.envelope; }
            if cli.mapping == "scaled" { cli.mapping = cfg.render.mapping; }
            if !cli.include_sine { cli.include_sine = cfg.render.include_sine; }
            if !cli.stereo { cli.stereo = cfg.render.stereo; }
            if !cli.drums { cli.drums = cfg.drums.enabled; }
            if cli.drum_tempo == 120.0 { cli.drum_tempo = cfg.drums.tempo; }
            if cli.beats_per_measure == 4 { cli.beats_per_measure = cfg.drums.beats_per_measure; }
            if cli.measures == 1 { cli.measures = cfg.drums.measures; }
            if !cli.midi { cli.midi = cfg.midi.enabled; }
            if cli.midi_tempo == 120.0 { cli.midi_tempo = cfg.midi.tempo; }
            if cli.seed == 0 { cli.seed = cfg.midi.seed; }
            if cli.soundfont.is_none() { cli.soundfont = cfg.midi.soundfont; }
            if cli.fluidsynth == Path::new("fluidsynth") { cli.fluidsynth = cfg.midi.fluidsynth; }
            if cli.palette.is_none() { cli.palette = cfg.palette.path; }
            layers = cfg.midi.layers;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.list_kinds {
        let waves: Vec<&str> = WaveKind::ALL.iter().map(|w| w.name()).collect();
        println!("Supported identifiers:");
        println!("  {:<10} {}", "wave", waves.join(", "));
        println!("  {:<10} {}", "synthesis", SynthesisKind::NAMES.join(", "));
        println!("  {:<10} {}", "envelope", EnvelopeKind::NAMES.join(", "));
        println!("  {:<10} {}", "effect", EffectKind::NAMES.join(", "));
        println!("  {:<10} {}", "mapping", ControlMapping::NAMES.join(", "));
        return Ok(());
    }

    if let Some(ref path) = cli.write_palette {
        let json = ColorPalette::circular(HUE_SEGMENTS, BRIGHTNESS_LEVELS).to_json()?;
        std::fs::write(path, json).with_context(|| format!("Failed to write palette: {}", path.display()))?;
        log::info!("Wrote reference palette to {}", path.display());
        return Ok(());
    }

    if let Some(ref dir) = cli.instrument_previews {
        let renderer = build_renderer(&cli);
        if renderer.is_none() {
            log::warn!("No soundfont configured; writing MIDI previews only");
        }
        let pb = progress_bar(midi::preview::PROGRAMS as u64, "programs");
        midi::preview::write_previews(dir, renderer.as_ref().map(|r| r as &dyn MidiRenderer), &pb)?;
        return Ok(());
    }

    let input = cli.input.as_ref().context("Input feature file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("chromasynth - video features to sound");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());

    // 1. Load features
    let sequence = frames::loader::load_sequence(input)?;
    if sequence.is_empty() {
        return Err(anyhow::Error::new(SynthError::EmptySequence)
            .context(format!("Nothing to sonify in {}", input.display())));
    }

    // 2. Per-frame synthesis onto the master timeline
    let settings = render_settings(&cli)?;
    let pb = progress_bar(sequence.len() as u64, "frames");
    let master = map_frames(&sequence, &settings, &pb).context("Frame mapping failed")?;
    pb.finish_and_clear();

    // 3. Drum layer
    let drums = if cli.drums {
        let pattern = DrumPattern {
            tempo_bpm: cli.drum_tempo,
            beats_per_measure: cli.beats_per_measure,
            measures: cli.measures,
        };
        let beat = generate_drum_beat(&pattern, SAMPLE_RATE, settings.stereo)
            .context("Drum generation failed")?;
        if let Some(ref path) = cli.drum_out {
            wav::write_pcm16(path, beat.clone()).context("Failed to write drum layer")?;
        }
        Some(beat)
    } else {
        None
    };

    // 4. MIDI arrangement
    let rendered = if cli.midi {
        compose_midi(&cli, &sequence, layers)?
    } else {
        None
    };

    // 5. Mixdown and write
    let mixed = mixdown::mix(master, drums, rendered).context("Mixdown failed")?;
    let written = wav::write_pcm16(&cli.output, mixed)?;

    if let Some(ref path) = cli.report {
        write_report(path, &cli, &sequence, &written)?;
    }

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

fn progress_bar(len: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "[{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} {} ({{eta}} remaining)",
                unit
            ))
            .unwrap()
            .progress_chars("=>-"),
    );
    pb
}

fn render_settings(cli: &Cli) -> Result<RenderSettings> {
    Ok(RenderSettings {
        sample_rate: SAMPLE_RATE,
        stereo: cli.stereo,
        wave: cli.wave.parse::<WaveKind>().context("Invalid --wave")?,
        synthesis: cli.synthesis.parse::<SynthesisKind>().context("Invalid --synthesis")?,
        envelope: EnvelopeKind::parse_lenient(&cli.envelope),
        effect: cli.effect.parse::<EffectKind>().context("Invalid --effect")?,
        include_sine: cli.include_sine,
        mapping: cli.mapping.parse::<ControlMapping>().context("Invalid --mapping")?,
    })
}

fn load_palette(cli: &Cli) -> Result<ColorPalette> {
    match cli.palette {
        Some(ref path) => ColorPalette::load(path),
        None => Ok(ColorPalette::circular(HUE_SEGMENTS, BRIGHTNESS_LEVELS)),
    }
}

fn build_renderer(cli: &Cli) -> Option<FluidSynthRenderer> {
    cli.soundfont
        .as_ref()
        .map(|sf| FluidSynthRenderer::new(cli.fluidsynth.clone(), sf.clone(), SAMPLE_RATE))
}

/// Composes and writes the MIDI file, then renders it when a soundfont is set.
fn compose_midi(cli: &Cli, sequence: &FrameSequence, layers: LayerConfig) -> Result<Option<SampleBuffer>> {
    let palette = load_palette(cli)?;
    let settings = ComposerSettings {
        tempo_bpm: cli.midi_tempo,
        seed: cli.seed,
        layers,
    };
    let events = composer::compose(sequence, &palette, &settings).context("MIDI composition failed")?;
    midi::smf::write_smf(&cli.midi_out, &events, cli.midi_tempo)?;

    match build_renderer(cli) {
        Some(renderer) => {
            let buffer = renderer.render(&cli.midi_out).context("MIDI rendering failed")?;
            Ok(Some(buffer))
        }
        None => {
            log::warn!("No soundfont configured; MIDI written but not mixed in");
            Ok(None)
        }
    }
}

fn write_report(path: &Path, cli: &Cli, sequence: &FrameSequence, written: &SampleBuffer) -> Result<()> {
    let palette = load_palette(cli)?;
    let mut matcher = ColorMatcher::new(&palette);
    let overall_colors = composer::overall_instruments(sequence, &mut matcher)
        .into_iter()
        .map(|(color, m)| ColorReport {
            color,
            program: m.index,
            palette_hex: m.hex,
            distance: m.distance,
            preview: format!("{}.wav", m.index),
        })
        .collect();

    let report = Report {
        input: cli.input.clone().unwrap_or_default(),
        output: cli.output.clone(),
        frames: sequence.len(),
        video_duration: sequence.video_duration,
        signal: diagnostics::analyze(written),
        overall_colors,
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Wrote report to {}", path.display());
    Ok(())
}
