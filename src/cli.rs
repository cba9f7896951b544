//! Command-line argument parsing for the offline demo.

use clap::Parser;
use std::path::PathBuf;

use helixwave::{ModeKind, TuningPreset};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Helixwave")]
#[command(about = "Deterministic audio-reactive structure visualizer", long_about = None)]
pub struct Args {
    /// WAV file to derive the structure from (neutral spiral if omitted)
    #[arg(value_name = "WAV")]
    pub audio: Option<PathBuf>,

    /// View mode: macro (default) or micro
    #[arg(long, value_name = "MODE", default_value = "macro")]
    pub mode: String,

    /// Tuning preset: classic (default), ethereal, pulse
    #[arg(long, value_name = "PRESET", default_value = "classic")]
    pub preset: String,

    /// Audio sensitivity in [0,1]
    #[arg(long, value_name = "LEVEL", default_value = "0.5")]
    pub sensitivity: f32,

    /// Number of 60 Hz frames to simulate
    #[arg(long, value_name = "FRAMES", default_value = "600")]
    pub frames: u32,

    /// Switch to the other mode halfway through (exercises the
    /// structure handoff)
    #[arg(long)]
    pub switch_halfway: bool,

    /// Write the derived structure as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

impl Args {
    /// Parse the view mode from the command line.
    pub fn parse_mode(&self) -> ModeKind {
        match self.mode.to_lowercase().as_str() {
            "micro" => ModeKind::Micro,
            "macro" => ModeKind::Macro,
            other => {
                eprintln!("Warning: Unknown mode '{}', using macro", other);
                ModeKind::Macro
            }
        }
    }

    /// Parse the tuning preset from the command line.
    pub fn parse_preset(&self) -> TuningPreset {
        match self.preset.to_lowercase().as_str() {
            "classic" => TuningPreset::Classic,
            "ethereal" => TuningPreset::Ethereal,
            "pulse" => TuningPreset::Pulse,
            other => {
                eprintln!("Warning: Unknown preset '{}', using classic", other);
                TuningPreset::Classic
            }
        }
    }
}
