//! Helixwave - deterministic audio-reactive structure visualization
//!
//! Decoded audio is hashed into a seed, the seed drives a deterministic
//! node structure ("DNA"), and two interchangeable view modes deform that
//! structure every frame from live frequency features. Same audio in,
//! same structure out - across sessions, reloads, and mode switches.
//!
//! The rendering substrate, UI, and audio playback transport are external
//! collaborators: this crate produces vertex-ready geometry buffers and
//! consumes decoded samples plus frequency snapshots.

use thiserror::Error;

pub mod color;
pub mod deform;
pub mod features;
pub mod hashing;
pub mod modes;
pub mod params;
pub mod source;
pub mod structure;
pub mod viz;

pub use deform::{DeformationEngine, RenderPoint};
pub use features::{BandEnergies, FeatureExtractor, FeatureFrame};
pub use hashing::{content_hash, SeededRng};
pub use modes::{MacroMode, MicroMode, ModeKind, RenderGeometry, VisualMode};
pub use params::{Tuning, TuningPreset};
pub use source::{AudioSource, SilenceSource, WavSource};
pub use structure::{generate, StructureNode};
pub use viz::{PostFx, Visualizer};

/// Crate error surface.
#[derive(Error, Debug)]
pub enum HelixError {
    /// WAV decode failed (bad file, unsupported layout, I/O)
    #[error("audio decode failed: {0}")]
    Decode(#[from] hound::Error),

    /// Tuning override merge or structure export serialization failed
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error outside of decoding
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
