//! Tuning parameter definitions with documented semantics and named presets.
//!
//! All magic numbers live here with:
//! - Documented ranges and meanings
//! - `Default` impls carrying the baseline ("classic") profile
//! - Selective override via recursive JSON merge ([`Tuning::merged`])

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::HelixError;

/// Structure generation parameters (node placement and connectivity).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StructureTuning {
    /// Length of the strand along its axis (world units)
    pub strand_length: f32,

    /// Number of full helix turns over the strand
    pub helix_turns: f32,

    /// Base helix radius (world units)
    pub helix_radius: f32,

    /// Extra radius per unit slice amplitude (world units)
    pub amplitude_reach: f32,

    /// Vertical lift per unit slice amplitude (world units)
    pub amplitude_lift: f32,

    /// Angular modulation per unit zero-crossing rate (radians)
    pub frequency_twist: f32,

    /// Seeded jitter along the strand axis (± world units)
    pub axial_jitter: f32,

    /// Seeded vertical jitter (± world units)
    pub vertical_jitter: f32,

    /// Seeded angular jitter (± radians)
    pub angle_jitter: f32,

    /// Maximum Euclidean distance for a connection candidate (world units)
    pub edge_distance: f32,

    /// Probability that an in-range ordered pair becomes an edge
    pub edge_probability: f32,

    /// Hue at the start of the strand [0,1)
    pub hue_base: f32,

    /// Hue advance across the strand
    pub hue_span: f32,

    /// Hue shift per unit slice amplitude
    pub hue_amplitude_shift: f32,
}

impl Default for StructureTuning {
    fn default() -> Self {
        Self {
            strand_length: 60.0,
            helix_turns: 9.0,
            helix_radius: 6.0,
            amplitude_reach: 4.0,
            amplitude_lift: 3.0,
            frequency_twist: 6.0,
            axial_jitter: 2.0,
            vertical_jitter: 1.5,
            angle_jitter: 0.8,
            edge_distance: 7.5,
            edge_probability: 0.7,
            hue_base: 0.55,
            hue_span: 0.35,
            hue_amplitude_shift: 0.10,
        }
    }
}

/// Frequency band boundaries as fractions of the snapshot bin count.
///
/// The four bands are contiguous: bass = [0, bass_end), low-mid =
/// [bass_end, low_mid_end), high-mid = [low_mid_end, high_mid_end),
/// treble = [high_mid_end, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BandTuning {
    /// Upper boundary of the bass band (fraction of bins)
    pub bass_end: f32,

    /// Upper boundary of the low-mid band (fraction of bins)
    pub low_mid_end: f32,

    /// Upper boundary of the high-mid band (fraction of bins)
    pub high_mid_end: f32,
}

impl Default for BandTuning {
    fn default() -> Self {
        Self {
            bass_end: 0.08,
            low_mid_end: 0.25,
            high_mid_end: 0.55,
        }
    }
}

/// Feature extraction gains, time constants, and clamp ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FeatureTuning {
    /// Gain multiplier at sensitivity 0
    pub gain_floor: f32,

    /// Additional gain across the sensitivity range
    pub gain_range: f32,

    /// Scale applied to the rectified low-mid delta
    pub pulse_scale: f32,

    /// Per-reference-frame hold factor for the mid pulse [0,1)
    pub pulse_hold: f32,

    /// Intake factor blending new pulse energy in
    pub pulse_intake: f32,

    /// Mid-pulse clamp ceiling
    pub pulse_ceiling: f32,

    /// Scale applied to the rectified bass delta
    pub hit_scale: f32,

    /// Attack factor blending new hit energy in
    pub hit_attack: f32,

    /// Per-reference-frame decay factor for the bass hit [0,1)
    pub hit_decay: f32,

    /// Bass-hit clamp ceiling
    pub hit_ceiling: f32,

    /// Bass envelope time constant (seconds)
    pub bass_env_tau_s: f32,

    /// Treble envelope time constant (seconds)
    pub treble_env_tau_s: f32,
}

impl Default for FeatureTuning {
    fn default() -> Self {
        Self {
            gain_floor: 0.6,
            gain_range: 1.4,
            pulse_scale: 6.0,
            pulse_hold: 0.82,
            pulse_intake: 0.9,
            pulse_ceiling: 1.5,
            hit_scale: 5.0,
            hit_attack: 0.85,
            hit_decay: 0.90,
            hit_ceiling: 1.35,
            bass_env_tau_s: 0.12,
            treble_env_tau_s: 0.08,
        }
    }
}

/// Soft zone partition of the normalized polar axis.
///
/// Weights are logistic windows, never hard cutoffs: a point near a
/// boundary blends continuously between zone behaviors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ZoneTuning {
    /// Center of the bass/mid boundary on the normalized polar axis [0,1]
    pub bass_edge: f32,

    /// Center of the mid/treble boundary on the normalized polar axis [0,1]
    pub treble_edge: f32,

    /// Logistic softness; larger values widen the blend region
    pub softness: f32,
}

impl Default for ZoneTuning {
    fn default() -> Self {
        Self {
            bass_edge: 0.35,
            treble_edge: 0.65,
            softness: 0.08,
        }
    }
}

/// Spiral arm lane parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ArmTuning {
    /// Minimum seed-chosen lane count (inclusive)
    pub count_min: usize,

    /// Maximum seed-chosen lane count (inclusive)
    pub count_max: usize,

    /// Lane twist from bottom to top of the structure (radians)
    pub pitch: f32,

    /// Lane pull gain; multiplied by mid-band energy
    pub tightness: f32,

    /// Baseline forward rotation (radians per second)
    pub spin_rate: f32,
}

impl Default for ArmTuning {
    fn default() -> Self {
        Self {
            count_min: 3,
            count_max: 7,
            pitch: 1.8,
            tightness: 4.0,
            spin_rate: 0.25,
        }
    }
}

/// Radial motion: breathing, transient splash, and sustained bass bias.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RadialTuning {
    /// Amplitudes of the three breathing partials (world units)
    pub breathing_amplitudes: [f32; 3],

    /// Rates of the three breathing partials (radians per second)
    pub breathing_rates: [f32; 3],

    /// Outward splash per unit bass-hit impulse (world units)
    pub splash_gain: f32,

    /// Sustained outward bias per unit bass envelope (world units)
    pub bass_bias_gain: f32,

    /// Per-point radius smoothing time constant (seconds)
    pub smoothing_tau_s: f32,

    /// How strongly sensitivity shortens the smoothing time constant
    pub sensitivity_tau_scale: f32,
}

impl Default for RadialTuning {
    fn default() -> Self {
        Self {
            breathing_amplitudes: [0.55, 0.30, 0.18],
            breathing_rates: [0.31, 0.73, 1.21],
            splash_gain: 4.5,
            bass_bias_gain: 2.5,
            smoothing_tau_s: 0.18,
            sensitivity_tau_scale: 1.5,
        }
    }
}

/// Vertical (polar) motion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VerticalTuning {
    /// Fraction of the polar angle removed toward the treble pole at full
    /// treble envelope
    pub treble_lift: f32,

    /// Per-point polar smoothing time constant (seconds)
    pub smoothing_tau_s: f32,
}

impl Default for VerticalTuning {
    fn default() -> Self {
        Self {
            treble_lift: 0.35,
            smoothing_tau_s: 0.25,
        }
    }
}

/// Tangential tide drift: slow carrier plus band-driven shimmer and
/// undercurrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TideTuning {
    /// Spatial scale of the Perlin carrier (per radian of azimuth)
    pub carrier_scale: f32,

    /// Temporal speed of the Perlin carrier
    pub carrier_speed: f32,

    /// Carrier magnitude (world units)
    pub carrier_gain: f32,

    /// Treble shimmer oscillation rate (radians per second)
    pub shimmer_rate: f32,

    /// Shimmer magnitude per unit treble envelope (world units)
    pub shimmer_gain: f32,

    /// Bass undercurrent oscillation rate (radians per second)
    pub undercurrent_rate: f32,

    /// Undercurrent magnitude per unit bass envelope (world units)
    pub undercurrent_gain: f32,
}

impl Default for TideTuning {
    fn default() -> Self {
        Self {
            carrier_scale: 0.35,
            carrier_speed: 0.07,
            carrier_gain: 1.6,
            shimmer_rate: 5.3,
            shimmer_gain: 0.45,
            undercurrent_rate: 0.9,
            undercurrent_gain: 0.8,
        }
    }
}

/// Color response parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ColorTuning {
    /// Hue shift per unit treble energy in the treble zone
    pub hue_treble_shift: f32,

    /// Saturation at sensitivity 0
    pub saturation_floor: f32,

    /// Additional saturation across the sensitivity range
    pub saturation_range: f32,

    /// Luminance floor
    pub lum_floor: f32,

    /// Luminance per unit composite energy
    pub lum_energy_gain: f32,

    /// How strongly off-lane points are darkened [0,1]
    pub lane_darkening: f32,
}

impl Default for ColorTuning {
    fn default() -> Self {
        Self {
            hue_treble_shift: 0.12,
            saturation_floor: 0.45,
            saturation_range: 0.40,
            lum_floor: 0.18,
            lum_energy_gain: 0.55,
            lane_darkening: 0.45,
        }
    }
}

/// Macro (point cloud) view parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MacroTuning {
    /// Number of rendered points; structure nodes are cycled to fill it
    pub cloud_size: usize,

    /// Minimum base radius after normalization (world units)
    pub radius_floor: f32,

    /// Radius span above the floor (world units)
    pub radius_span: f32,

    /// Turns of the neutral fallback spiral
    pub fallback_turns: f32,
}

impl Default for MacroTuning {
    fn default() -> Self {
        Self {
            cloud_size: 1500,
            radius_floor: 6.0,
            radius_span: 18.0,
            fallback_turns: 5.0,
        }
    }
}

/// Micro (connected graph) view parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MicroTuning {
    /// Base node scale (world units)
    pub node_base_scale: f32,

    /// Node scale gain per unit bass envelope
    pub bass_pulse_gain: f32,

    /// Node scale gain per unit bass-hit impulse
    pub hit_pulse_gain: f32,

    /// Graph spin rate (radians per second)
    pub spin_rate: f32,

    /// Node saturation
    pub saturation: f32,

    /// Node luminance floor
    pub lum_floor: f32,

    /// Node luminance gain per unit loudness
    pub lum_loudness_gain: f32,

    /// Edge luminance relative to the source node
    pub edge_luminance: f32,
}

impl Default for MicroTuning {
    fn default() -> Self {
        Self {
            node_base_scale: 0.6,
            bass_pulse_gain: 0.8,
            hit_pulse_gain: 0.5,
            spin_rate: 0.3,
            saturation: 0.7,
            lum_floor: 0.3,
            lum_loudness_gain: 0.4,
            edge_luminance: 0.35,
        }
    }
}

/// Post-processing parameter response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PostTuning {
    /// Bloom strength floor
    pub bloom_floor: f32,

    /// Bloom gain per unit loudness
    pub bloom_loudness_gain: f32,

    /// Bloom gain per unit bass-hit impulse
    pub bloom_hit_gain: f32,

    /// Exposure baseline
    pub exposure_base: f32,

    /// Exposure gain per unit treble envelope
    pub exposure_treble_gain: f32,
}

impl Default for PostTuning {
    fn default() -> Self {
        Self {
            bloom_floor: 0.4,
            bloom_loudness_gain: 0.8,
            bloom_hit_gain: 0.5,
            exposure_base: 1.0,
            exposure_treble_gain: 0.25,
        }
    }
}

/// Complete tuning profile for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Tuning {
    pub structure: StructureTuning,
    pub bands: BandTuning,
    pub features: FeatureTuning,
    pub zones: ZoneTuning,
    pub arms: ArmTuning,
    pub radial: RadialTuning,
    pub vertical: VerticalTuning,
    pub tide: TideTuning,
    pub color: ColorTuning,
    pub macro_cloud: MacroTuning,
    pub micro: MicroTuning,
    pub post: PostTuning,
}

impl Tuning {
    /// Apply a partial override on top of this profile.
    ///
    /// The override is a (possibly sparse) JSON object mirroring the
    /// `Tuning` shape; it is merged recursively onto the serialized profile,
    /// so unspecified keys keep their current values. Unknown keys are
    /// rejected when the merged value is deserialized.
    pub fn merged(&self, overrides: Value) -> Result<Tuning, HelixError> {
        let mut base = serde_json::to_value(self)?;
        merge_value(&mut base, &overrides);
        Ok(serde_json::from_value(base)?)
    }
}

/// Recursive JSON merge: objects merge key-by-key, everything else is
/// replaced by the overlay.
fn merge_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

/// Named tuning profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningPreset {
    /// Baseline profile (the `Default` values)
    Classic,

    /// Softer blending, wider drift, gentler transients
    Ethereal,

    /// Punchy transients, tight lanes, faster rotation
    Pulse,
}

impl TuningPreset {
    /// Build the complete tuning profile for this preset.
    pub fn tuning(&self) -> Tuning {
        let mut tuning = Tuning::default();
        match self {
            TuningPreset::Classic => {}
            TuningPreset::Ethereal => {
                tuning.zones.softness = 0.14;
                tuning.radial.splash_gain = 2.5;
                tuning.radial.smoothing_tau_s = 0.30;
                tuning.tide.carrier_gain = 2.4;
                tuning.tide.shimmer_gain = 0.65;
                tuning.color.saturation_floor = 0.35;
                tuning.color.lane_darkening = 0.25;
                tuning.arms.spin_rate = 0.15;
            }
            TuningPreset::Pulse => {
                tuning.features.hit_scale = 7.0;
                tuning.features.pulse_scale = 7.5;
                tuning.radial.splash_gain = 6.5;
                tuning.radial.smoothing_tau_s = 0.10;
                tuning.arms.tightness = 6.0;
                tuning.arms.spin_rate = 0.40;
                tuning.color.lane_darkening = 0.60;
            }
        }
        tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merged_overrides_single_leaf() {
        let base = TuningPreset::Classic.tuning();
        let merged = base
            .merged(json!({ "zones": { "softness": 0.2 } }))
            .unwrap();

        assert_eq!(merged.zones.softness, 0.2);
        // Sibling and unrelated keys keep their preset values
        assert_eq!(merged.zones.bass_edge, base.zones.bass_edge);
        assert_eq!(merged.arms.tightness, base.arms.tightness);
    }

    #[test]
    fn test_merged_rejects_unknown_keys() {
        let base = Tuning::default();
        let result = base.merged(json!({ "zones": { "sofness": 0.2 } }));
        assert!(result.is_err());
    }

    #[test]
    fn test_merged_empty_override_is_identity() {
        let base = TuningPreset::Pulse.tuning();
        let merged = base.merged(json!({})).unwrap();
        assert_eq!(merged.radial.splash_gain, base.radial.splash_gain);
        assert_eq!(merged.arms.spin_rate, base.arms.spin_rate);
    }

    #[test]
    fn test_presets_differ_from_classic() {
        let classic = TuningPreset::Classic.tuning();
        let ethereal = TuningPreset::Ethereal.tuning();
        let pulse = TuningPreset::Pulse.tuning();

        assert!(ethereal.zones.softness > classic.zones.softness);
        assert!(pulse.radial.splash_gain > classic.radial.splash_gain);
    }
}
