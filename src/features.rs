//! Per-frame reduction of a live frequency snapshot into reactive features.
//!
//! The extractor is the only persistent mutable state on the audio path:
//! previous band values, smoothed envelopes, and the pulse/hit accumulators
//! survive across frames. Everything else is stateless logic over the
//! incoming bins: O(bin count) per call, no allocation after construction.

use tracing::trace;

use crate::params::{BandTuning, FeatureTuning};

/// Shortest frame delta the smoothing math will accept (seconds).
pub const MIN_FRAME_DT: f32 = 0.001;

/// Longest frame delta the smoothing math will accept (seconds). Late
/// frames are treated as this long rather than letting envelopes jump.
pub const MAX_FRAME_DT: f32 = 0.050;

/// Frame delta the hold/decay factors are calibrated against (seconds).
const REFERENCE_FRAME_DT: f32 = 1.0 / 60.0;

/// Mean energies of the four frequency bands, each in [0,1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub bass: f32,
    pub low_mid: f32,
    pub high_mid: f32,
    pub treble: f32,
}

impl BandEnergies {
    /// Unweighted mean of the four bands.
    pub fn mean(&self) -> f32 {
        (self.bass + self.low_mid + self.high_mid + self.treble) / 4.0
    }

    /// Mean of the two mid bands, used for lane pull strength.
    pub fn mid(&self) -> f32 {
        (self.low_mid + self.high_mid) / 2.0
    }
}

/// One frame of extracted audio features.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFrame {
    /// Raw band energies for this frame
    pub bands: BandEnergies,

    /// Smoothed bass energy, [0,1]
    pub bass_envelope: f32,

    /// Smoothed treble energy, [0,1]
    pub treble_envelope: f32,

    /// Fast-attack slow-decay bass transient, [0, hit ceiling]
    pub bass_hit: f32,

    /// Percussive low-mid pluck signal, [0, pulse ceiling]
    pub mid_pulse: f32,

    /// Unweighted mean of the four band energies, [0,1]
    pub loudness: f32,
}

/// Splits snapshot bins into four contiguous bands and reduces them to
/// envelopes, transients, and loudness.
pub struct FeatureExtractor {
    bands: BandTuning,
    tuning: FeatureTuning,

    prev_low_mid: f32,
    prev_bass: f32,
    bass_env: f32,
    treble_env: f32,
    mid_pulse: f32,
    bass_hit: f32,
}

impl FeatureExtractor {
    pub fn new(bands: BandTuning, tuning: FeatureTuning) -> Self {
        Self {
            bands,
            tuning,
            prev_low_mid: 0.0,
            prev_bass: 0.0,
            bass_env: 0.0,
            treble_env: 0.0,
            mid_pulse: 0.0,
            bass_hit: 0.0,
        }
    }

    /// Clear all persisted state (e.g. when new audio is loaded).
    pub fn reset(&mut self) {
        self.prev_low_mid = 0.0;
        self.prev_bass = 0.0;
        self.bass_env = 0.0;
        self.treble_env = 0.0;
        self.mid_pulse = 0.0;
        self.bass_hit = 0.0;
    }

    /// Reduce one frequency snapshot into a feature frame.
    ///
    /// `bins` are 0-255 magnitudes, `sensitivity` is the UI control in
    /// [0,1], `dt_s` is the measured frame delta (clamped to
    /// [`MIN_FRAME_DT`, `MAX_FRAME_DT`] so variable frame timing shifts
    /// the smoothing instead of breaking it).
    pub fn update(&mut self, bins: &[u8], sensitivity: f32, dt_s: f32) -> FeatureFrame {
        let dt = dt_s.clamp(MIN_FRAME_DT, MAX_FRAME_DT);
        let frames = dt / REFERENCE_FRAME_DT;

        let bands = band_energies(bins, &self.bands);
        let gain = self.tuning.gain_floor + sensitivity.clamp(0.0, 1.0) * self.tuning.gain_range;

        // Percussive pluck: rectified positive low-mid delta, held and
        // blended so a single spike rings briefly without a delay line.
        let raw_pulse = (bands.low_mid - self.prev_low_mid).max(0.0) * self.tuning.pulse_scale * gain;
        self.mid_pulse = (self.mid_pulse * self.tuning.pulse_hold.powf(frames)
            + raw_pulse * self.tuning.pulse_intake)
            .clamp(0.0, self.tuning.pulse_ceiling);

        // Envelopes: exponential moving average toward the gain-scaled
        // band energy, frame-rate independent via the time constants.
        let bass_target = (bands.bass * gain).min(1.0);
        let bass_blend = 1.0 - (-dt / self.tuning.bass_env_tau_s).exp();
        self.bass_env = (self.bass_env + (bass_target - self.bass_env) * bass_blend).clamp(0.0, 1.0);

        let treble_target = (bands.treble * gain).min(1.0);
        let treble_blend = 1.0 - (-dt / self.tuning.treble_env_tau_s).exp();
        self.treble_env =
            (self.treble_env + (treble_target - self.treble_env) * treble_blend).clamp(0.0, 1.0);

        // Transient detector: fast rise on a positive bass delta, slow
        // exponential fall afterwards.
        let raw_hit = (bands.bass - self.prev_bass).max(0.0) * self.tuning.hit_scale * gain;
        self.bass_hit = (self.bass_hit * self.tuning.hit_decay.powf(frames)
            + raw_hit * self.tuning.hit_attack)
            .clamp(0.0, self.tuning.hit_ceiling);

        self.prev_low_mid = bands.low_mid;
        self.prev_bass = bands.bass;

        let frame = FeatureFrame {
            bands,
            bass_envelope: self.bass_env,
            treble_envelope: self.treble_env,
            bass_hit: self.bass_hit,
            mid_pulse: self.mid_pulse,
            loudness: bands.mean(),
        };
        trace!(?frame, "features extracted");
        frame
    }
}

/// Partition bins into four contiguous bands by fractional boundaries and
/// take each band's mean, normalized to [0,1].
pub fn band_energies(bins: &[u8], tuning: &BandTuning) -> BandEnergies {
    let n = bins.len();
    if n == 0 {
        return BandEnergies::default();
    }

    let bass_end = (tuning.bass_end * n as f32) as usize;
    let low_mid_end = ((tuning.low_mid_end * n as f32) as usize).max(bass_end);
    let high_mid_end = ((tuning.high_mid_end * n as f32) as usize).max(low_mid_end);

    BandEnergies {
        bass: band_mean(bins, 0, bass_end.min(n)),
        low_mid: band_mean(bins, bass_end.min(n), low_mid_end.min(n)),
        high_mid: band_mean(bins, low_mid_end.min(n), high_mid_end.min(n)),
        treble: band_mean(bins, high_mid_end.min(n), n),
    }
}

fn band_mean(bins: &[u8], start: usize, end: usize) -> f32 {
    if end <= start {
        return 0.0;
    }
    let sum: u32 = bins[start..end].iter().map(|&b| b as u32).sum();
    sum as f32 / ((end - start) as f32 * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(BandTuning::default(), FeatureTuning::default())
    }

    fn loud_bins(n: usize) -> Vec<u8> {
        vec![200; n]
    }

    #[test]
    fn test_zero_bins_yield_zero_bands() {
        let mut ex = extractor();
        let frame = ex.update(&vec![0u8; 512], 0.5, DT);

        assert_eq!(frame.bands, BandEnergies::default());
        assert_eq!(frame.loudness, 0.0);
        assert_eq!(frame.bass_hit, 0.0);
        assert_eq!(frame.mid_pulse, 0.0);
    }

    #[test]
    fn test_transients_decay_toward_zero_over_silence() {
        let mut ex = extractor();

        // Spike, then silence
        ex.update(&loud_bins(512), 1.0, DT);
        let after_spike = ex.update(&vec![0u8; 512], 1.0, DT);
        assert!(after_spike.bass_hit > 0.0);

        let mut prev_hit = after_spike.bass_hit;
        let mut prev_pulse = after_spike.mid_pulse;
        for _ in 0..120 {
            let frame = ex.update(&vec![0u8; 512], 1.0, DT);
            assert!(frame.bass_hit >= 0.0);
            assert!(frame.mid_pulse >= 0.0);
            assert!(frame.bass_hit <= prev_hit);
            assert!(frame.mid_pulse <= prev_pulse);
            prev_hit = frame.bass_hit;
            prev_pulse = frame.mid_pulse;
        }
        assert!(prev_hit < 0.01);
        assert!(prev_pulse < 0.01);
    }

    #[test]
    fn test_envelopes_track_sustained_energy() {
        let mut ex = extractor();
        let mut frame = FeatureFrame::default();
        for _ in 0..120 {
            frame = ex.update(&loud_bins(512), 0.8, DT);
        }
        assert!(frame.bass_envelope > 0.5);
        assert!(frame.treble_envelope > 0.5);

        for _ in 0..240 {
            frame = ex.update(&vec![0u8; 512], 0.8, DT);
        }
        assert!(frame.bass_envelope < 0.05);
        assert!(frame.treble_envelope < 0.05);
    }

    #[test]
    fn test_sensitivity_scales_response() {
        let mut quiet = extractor();
        let mut hot = extractor();

        let mut quiet_frame = FeatureFrame::default();
        let mut hot_frame = FeatureFrame::default();
        for _ in 0..30 {
            quiet_frame = quiet.update(&loud_bins(512), 0.0, DT);
            hot_frame = hot.update(&loud_bins(512), 1.0, DT);
        }
        assert!(hot_frame.bass_envelope > quiet_frame.bass_envelope);
    }

    #[test]
    fn test_hit_fires_on_bass_onset_only() {
        let mut ex = extractor();
        let n = 512;

        // Treble-only energy: bass band stays silent
        let mut treble_only = vec![0u8; n];
        for bin in treble_only.iter_mut().skip(n * 3 / 4) {
            *bin = 220;
        }
        let frame = ex.update(&treble_only, 1.0, DT);
        assert_eq!(frame.bass_hit, 0.0);

        // Bass onset fires the detector
        let mut with_bass = treble_only.clone();
        for bin in with_bass.iter_mut().take(n / 16) {
            *bin = 255;
        }
        let frame = ex.update(&with_bass, 1.0, DT);
        assert!(frame.bass_hit > 0.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut ex = extractor();
        for _ in 0..30 {
            ex.update(&loud_bins(512), 1.0, DT);
        }
        ex.reset();
        let frame = ex.update(&vec![0u8; 512], 1.0, DT);
        assert_eq!(frame.bass_envelope, 0.0);
        assert_eq!(frame.bass_hit, 0.0);
        assert_eq!(frame.mid_pulse, 0.0);
    }

    #[test]
    fn test_band_partition_covers_all_bins() {
        // A single hot bin lands in exactly one band
        let tuning = BandTuning::default();
        let n = 512;
        for &idx in &[0usize, 40, 41, 127, 128, 281, 282, 511] {
            let mut bins = vec![0u8; n];
            bins[idx] = 255;
            let bands = band_energies(&bins, &tuning);
            let nonzero = [bands.bass, bands.low_mid, bands.high_mid, bands.treble]
                .iter()
                .filter(|&&b| b > 0.0)
                .count();
            assert_eq!(nonzero, 1, "bin {} should land in exactly one band", idx);
        }
    }

    proptest! {
        #[test]
        fn prop_outputs_stay_in_documented_ranges(
            frames in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 64),
                1..60,
            ),
            sensitivity in 0.0f32..=1.0,
            dt in 0.0005f32..0.2,
        ) {
            let tuning = FeatureTuning::default();
            let mut ex = FeatureExtractor::new(BandTuning::default(), tuning.clone());
            for bins in &frames {
                let frame = ex.update(bins, sensitivity, dt);
                prop_assert!((0.0..=1.0).contains(&frame.bass_envelope));
                prop_assert!((0.0..=1.0).contains(&frame.treble_envelope));
                prop_assert!((0.0..=tuning.hit_ceiling).contains(&frame.bass_hit));
                prop_assert!((0.0..=tuning.pulse_ceiling).contains(&frame.mid_pulse));
                prop_assert!((0.0..=1.0).contains(&frame.loudness));
            }
        }
    }
}
