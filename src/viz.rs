//! Orchestrator: owns the audio source, the feature extractor, and the
//! active view mode, and drives them once per frame.
//!
//! All per-frame work happens inside [`Visualizer::advance_frame`], which
//! the embedding renderer calls from its own loop with a measured delta.
//! There are no threads, locks, or platform scheduling primitives here;
//! the whole pipeline is testable with synthetic deltas.

use std::path::Path;
use tracing::{debug, info};

use crate::features::{FeatureExtractor, FeatureFrame, MAX_FRAME_DT, MIN_FRAME_DT};
use crate::hashing::content_hash;
use crate::modes::{MacroMode, MicroMode, ModeKind, RenderGeometry, VisualMode};
use crate::params::Tuning;
use crate::source::{AudioSource, SilenceSource, WavSource, SNAPSHOT_BINS};
use crate::structure;
use crate::HelixError;

/// Seed used when no audio is loaded.
const FALLBACK_SEED: &str = "no-audio";

/// Post-processing parameters derived from the frame's features, for the
/// compositor to consume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostFx {
    pub bloom_strength: f32,
    pub exposure: f32,
}

pub struct Visualizer {
    tuning: Tuning,
    source: Box<dyn AudioSource>,
    extractor: FeatureExtractor,
    mode: Box<dyn VisualMode>,
    sensitivity: f32,
    content_hash: String,
    snapshot: Vec<u8>,
}

impl Visualizer {
    /// Build a visualizer with no audio loaded: the initial mode runs on
    /// the fallback structure until [`load_audio`](Self::load_audio)
    /// succeeds.
    pub fn new(tuning: Tuning, kind: ModeKind) -> Self {
        let extractor = FeatureExtractor::new(tuning.bands.clone(), tuning.features.clone());
        let mut mode = build_mode(kind, &tuning);
        mode.on_new_audio(Vec::new(), FALLBACK_SEED);

        Self {
            tuning,
            source: Box::new(SilenceSource),
            extractor,
            mode,
            sensitivity: 0.5,
            content_hash: FALLBACK_SEED.to_string(),
            snapshot: vec![0; SNAPSHOT_BINS],
        }
    }

    /// Decode a WAV file, hash it, and regenerate the structure.
    ///
    /// On failure the previous source, structure, and mode state remain
    /// untouched and playable; no partial structure is ever built.
    pub fn load_audio(&mut self, path: &Path) -> Result<&str, HelixError> {
        let source = WavSource::load(path)?;
        self.set_source(Box::new(source));
        Ok(&self.content_hash)
    }

    /// Adopt an already-decoded audio source (for embedders that decode
    /// elsewhere). Hashes its samples and regenerates the structure, same
    /// as a successful [`load_audio`](Self::load_audio).
    pub fn set_source(&mut self, source: Box<dyn AudioSource>) {
        let hash = if source.channel_samples().is_empty() {
            FALLBACK_SEED.to_string()
        } else {
            content_hash(source.channel_samples())
        };
        let nodes = structure::generate(
            source.channel_samples(),
            source.duration_secs(),
            &hash,
            &self.tuning.structure,
        );
        info!(
            hash = %hash,
            nodes = nodes.len(),
            duration_s = source.duration_secs(),
            "audio source adopted"
        );

        self.source = source;
        self.content_hash = hash;
        self.extractor.reset();
        self.mode.on_new_audio(nodes, &self.content_hash);
    }

    /// Switch view modes.
    ///
    /// The old mode hands its structure over synchronously before it is
    /// disposed; the new mode accepts it, or regenerates from audio when
    /// the old mode held none.
    pub fn set_mode(&mut self, kind: ModeKind) {
        if kind == self.mode.kind() {
            return;
        }
        let exported = self.mode.export_structure();
        self.mode.dispose();

        let nodes = exported.unwrap_or_else(|| {
            structure::generate(
                self.source.channel_samples(),
                self.source.duration_secs(),
                &self.content_hash,
                &self.tuning.structure,
            )
        });

        let mut mode = build_mode(kind, &self.tuning);
        mode.on_new_audio(nodes, &self.content_hash);
        self.mode = mode;
        debug!(?kind, "mode switched");
    }

    /// Run one frame: advance the playhead, snapshot the spectrum,
    /// extract features, deform the active mode's geometry.
    ///
    /// `dt_s` is the measured frame delta; it is clamped so a late frame
    /// stretches the smoothing instead of breaking it.
    pub fn advance_frame(&mut self, dt_s: f32) -> FeatureFrame {
        let dt = dt_s.clamp(MIN_FRAME_DT, MAX_FRAME_DT);
        self.source.advance(dt);
        self.source.frequency_snapshot(&mut self.snapshot);
        let frame = self.extractor.update(&self.snapshot, self.sensitivity, dt);
        self.mode.update(&frame, dt, self.sensitivity);
        frame
    }

    /// Post-processing parameters for a frame's features.
    pub fn post_fx(&self, frame: &FeatureFrame) -> PostFx {
        let post = &self.tuning.post;
        PostFx {
            bloom_strength: post.bloom_floor
                + frame.loudness * post.bloom_loudness_gain
                + frame.bass_hit * post.bloom_hit_gain,
            exposure: post.exposure_base + frame.treble_envelope * post.exposure_treble_gain,
        }
    }

    /// Geometry buffers of the active mode.
    pub fn geometry(&self) -> RenderGeometry<'_> {
        self.mode.geometry()
    }

    /// The held structure, if any (e.g. for export to disk).
    pub fn export_structure(&self) -> Option<Vec<crate::structure::StructureNode>> {
        self.mode.export_structure()
    }

    /// Content hash of the loaded audio, or the fallback seed.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Set the UI sensitivity control, clamped to [0,1].
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity.clamp(0.0, 1.0);
    }
}

fn build_mode(kind: ModeKind, tuning: &Tuning) -> Box<dyn VisualMode> {
    match kind {
        ModeKind::Micro => Box::new(MicroMode::new(tuning.clone())),
        ModeKind::Macro => Box::new(MacroMode::new(tuning.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TuningPreset;
    use std::f32::consts::PI;

    fn small_tuning() -> Tuning {
        let mut tuning = TuningPreset::Classic.tuning();
        tuning.macro_cloud.cloud_size = 80;
        tuning
    }

    fn write_test_wav(dir: &tempfile::TempDir, secs: f32) -> std::path::PathBuf {
        let path = dir.path().join("test.wav");
        let rate = 44_100u32;
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..(rate as f32 * secs) as usize {
            let t = i as f32 / rate as f32;
            let s = (2.0 * PI * 110.0 * t).sin() * 0.6 + (2.0 * PI * 2200.0 * t).sin() * 0.2;
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_starts_on_fallback_and_stays_usable() {
        let mut viz = Visualizer::new(small_tuning(), ModeKind::Macro);
        assert_eq!(viz.content_hash(), FALLBACK_SEED);

        let frame = viz.advance_frame(1.0 / 60.0);
        assert_eq!(frame.loudness, 0.0);
        match viz.geometry() {
            RenderGeometry::Cloud { points } => assert!(!points.is_empty()),
            other => panic!("expected cloud, got {:?}", other),
        }
    }

    #[test]
    fn test_load_failure_keeps_prior_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(&dir, 3.0);

        let mut viz = Visualizer::new(small_tuning(), ModeKind::Micro);
        viz.load_audio(&path).unwrap();
        let before = viz.export_structure().unwrap();
        let hash_before = viz.content_hash().to_string();

        assert!(viz.load_audio(Path::new("/missing.wav")).is_err());
        assert_eq!(viz.export_structure().unwrap(), before);
        assert_eq!(viz.content_hash(), hash_before);

        // Still advancing frames after the failed load
        viz.advance_frame(1.0 / 60.0);
    }

    #[test]
    fn test_same_file_same_hash_and_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(&dir, 3.0);

        let mut a = Visualizer::new(small_tuning(), ModeKind::Micro);
        let mut b = Visualizer::new(small_tuning(), ModeKind::Micro);
        let hash_a = a.load_audio(&path).unwrap().to_string();
        let hash_b = b.load_audio(&path).unwrap().to_string();

        assert_eq!(hash_a, hash_b);
        let nodes_a = a.export_structure().unwrap();
        let nodes_b = b.export_structure().unwrap();
        assert_eq!(nodes_a.len(), 50);
        assert_eq!(nodes_a, nodes_b);
    }

    #[test]
    fn test_mode_switch_preserves_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(&dir, 4.0);

        let mut viz = Visualizer::new(small_tuning(), ModeKind::Micro);
        viz.load_audio(&path).unwrap();
        let original = viz.export_structure().unwrap();

        viz.set_mode(ModeKind::Macro);
        assert_eq!(viz.mode_kind(), ModeKind::Macro);
        assert_eq!(viz.export_structure().unwrap(), original);

        viz.set_mode(ModeKind::Micro);
        assert_eq!(viz.export_structure().unwrap(), original);
    }

    #[test]
    fn test_injected_empty_source_falls_back() {
        let mut viz = Visualizer::new(small_tuning(), ModeKind::Macro);
        viz.set_source(Box::new(crate::source::SilenceSource));
        assert_eq!(viz.content_hash(), FALLBACK_SEED);
        viz.advance_frame(1.0 / 60.0);
        match viz.geometry() {
            RenderGeometry::Cloud { points } => {
                assert!(points.iter().all(|p| p.shape_tier == 1.0))
            }
            other => panic!("expected cloud, got {:?}", other),
        }
    }

    #[test]
    fn test_set_same_mode_is_noop() {
        let mut viz = Visualizer::new(small_tuning(), ModeKind::Macro);
        viz.set_mode(ModeKind::Macro);
        assert_eq!(viz.mode_kind(), ModeKind::Macro);
        viz.advance_frame(1.0 / 60.0);
    }

    #[test]
    fn test_frames_react_to_loaded_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(&dir, 2.0);

        let mut viz = Visualizer::new(small_tuning(), ModeKind::Macro);
        viz.load_audio(&path).unwrap();
        viz.set_sensitivity(0.8);

        let mut peak_loudness = 0.0f32;
        for _ in 0..30 {
            let frame = viz.advance_frame(1.0 / 60.0);
            peak_loudness = peak_loudness.max(frame.loudness);
        }
        assert!(peak_loudness > 0.0, "tone should register as loudness");

        let frame = viz.advance_frame(1.0 / 60.0);
        let fx = viz.post_fx(&frame);
        assert!(fx.bloom_strength >= viz.tuning.post.bloom_floor);
        assert!(fx.exposure >= viz.tuning.post.exposure_base);
    }
}
