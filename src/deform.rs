//! Reactive deformation engine: per-frame position, color, and shape-tier
//! for every point of the macro cloud.
//!
//! Each point's immutable base position is reinterpreted in a spherical
//! frame (radius, polar angle from the top pole, azimuth). Per frame the
//! engine blends three overlapping zone behaviors, pulls azimuths forward
//! onto spiral arm lanes, perturbs radii with breathing/splash/bias terms,
//! nudges polar angles with treble, and adds a tangential tide drift.
//! All per-point motion is exponentially smoothed against smoothing caches
//! that live exactly as long as the current structure.

pub mod zones;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use noise::{NoiseFn, Perlin};
use std::f32::consts::{PI, TAU};
use tracing::debug;

use crate::color::hsl_to_rgb;
use crate::features::{FeatureFrame, MAX_FRAME_DT, MIN_FRAME_DT};
use crate::hashing::SeededRng;
use crate::params::Tuning;
use crate::structure::StructureNode;
use zones::{forward_lane_target, zone_weights};

/// One deformed point, laid out for direct upload as a vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RenderPoint {
    /// Deformed world-space position
    pub position: [f32; 3],

    /// Continuous archetype selector in [0,2]
    pub shape_tier: f32,

    /// HSL-derived RGB color
    pub color: [f32; 3],

    /// Composite energy driving luminance, exposed for point sizing
    pub energy: f32,
}

/// Immutable per-point attributes cached at structure-build time.
#[derive(Debug, Clone)]
struct BasePoint {
    radius: f32,
    polar: f32,
    azimuth: f32,
    hue: f32,
    amplitude: f32,
    phase: f32,
}

/// Per-point deformation state for the macro cloud.
pub struct DeformationEngine {
    tuning: Tuning,

    base: Vec<BasePoint>,
    // Smoothing caches, index-parallel with `base`; rebuilt (never
    // resized in place) whenever the structure changes so stale state
    // from a previous structure can't leak into a new one.
    cur_azimuth: Vec<f32>,
    cur_radius: Vec<f32>,
    cur_polar: Vec<f32>,

    arm_count: usize,
    lane_phase: f32,
    carrier: Perlin,
    time_s: f32,
    fallback: bool,
}

impl DeformationEngine {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            base: Vec::new(),
            cur_azimuth: Vec::new(),
            cur_radius: Vec::new(),
            cur_polar: Vec::new(),
            arm_count: 1,
            lane_phase: 0.0,
            carrier: Perlin::new(0),
            time_s: 0.0,
            fallback: true,
        }
    }

    /// Number of points the engine is currently driving.
    pub fn point_count(&self) -> usize {
        self.base.len()
    }

    /// Whether the engine is running the neutral-spiral fallback.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Seed-chosen arm lane count for the current structure.
    pub fn arm_count(&self) -> usize {
        self.arm_count
    }

    /// Rebuild all per-point state from a structure.
    ///
    /// Draw order from the seed is fixed: arm count, lane phase, carrier
    /// seed, then per-point scatter and phase. An empty structure builds
    /// the neutral spiral instead (same point count, shape-tier forced
    /// to 1).
    pub fn rebuild(&mut self, structure: &[StructureNode], seed: &str) {
        let count = self.tuning.macro_cloud.cloud_size;
        let mut rng = SeededRng::new(seed);

        self.arm_count = rng.next_usize_inclusive(
            self.tuning.arms.count_min,
            self.tuning.arms.count_max.max(self.tuning.arms.count_min),
        );
        self.lane_phase = rng.next() * TAU;
        self.carrier = Perlin::new((rng.next() * u32::MAX as f32) as u32);
        self.time_s = 0.0;

        self.base.clear();
        self.base.reserve(count);

        if structure.is_empty() {
            self.fallback = true;
            let radius =
                self.tuning.macro_cloud.radius_floor + self.tuning.macro_cloud.radius_span * 0.5;
            for i in 0..count {
                let t = i as f32 / count.max(1) as f32;
                self.base.push(BasePoint {
                    radius,
                    // Bottom pole to top pole as the spiral climbs
                    polar: (1.0 - t) * PI,
                    azimuth: t * self.tuning.macro_cloud.fallback_turns * TAU,
                    hue: 0.6,
                    amplitude: 0.5,
                    phase: rng.next() * TAU,
                });
            }
            debug!(points = count, "neutral spiral fallback built");
        } else {
            self.fallback = false;
            let max_len = structure
                .iter()
                .map(|n| n.position.length())
                .fold(0.0f32, f32::max)
                .max(1e-3);

            for i in 0..count {
                let node = &structure[i % structure.len()];
                let len = node.position.length().max(1e-3);
                let polar = (node.position.y / len).clamp(-1.0, 1.0).acos();
                let azimuth = node.position.z.atan2(node.position.x);

                // Cycled points get a wider scatter so duplicates of the
                // same node don't coincide
                let scatter = if i < structure.len() { 0.15 } else { 1.0 };
                let radius = self.tuning.macro_cloud.radius_floor
                    + self.tuning.macro_cloud.radius_span * (len / max_len)
                    + rng.next_range(-1.2, 1.2) * scatter;

                self.base.push(BasePoint {
                    radius: radius.max(0.5),
                    polar: (polar + rng.next_range(-0.2, 0.2) * scatter).clamp(0.0, PI),
                    azimuth: azimuth + rng.next_range(-0.4, 0.4) * scatter,
                    hue: node.hue,
                    amplitude: node.amplitude,
                    phase: rng.next() * TAU,
                });
            }
            debug!(
                points = count,
                nodes = structure.len(),
                arms = self.arm_count,
                "deformation state rebuilt"
            );
        }

        self.cur_azimuth = self.base.iter().map(|b| b.azimuth).collect();
        self.cur_radius = self.base.iter().map(|b| b.radius).collect();
        self.cur_polar = self.base.iter().map(|b| b.polar).collect();
    }

    /// Advance one frame: recompute every point from its base attributes
    /// and the current features, writing into `out` (resized to the point
    /// count). Total for any point count >= 0 and in-range features.
    pub fn advance(
        &mut self,
        frame: &FeatureFrame,
        dt_s: f32,
        sensitivity: f32,
        out: &mut Vec<RenderPoint>,
    ) {
        let dt = dt_s.clamp(MIN_FRAME_DT, MAX_FRAME_DT);
        self.time_s += dt;
        out.resize(self.base.len(), RenderPoint::zeroed());

        let arms = &self.tuning.arms;
        let radial = &self.tuning.radial;
        let vertical = &self.tuning.vertical;
        let tide = &self.tuning.tide;
        let color = &self.tuning.color;
        let sensitivity = sensitivity.clamp(0.0, 1.0);

        let spacing = TAU / self.arm_count.max(1) as f32;
        // Sustained mids hold points near their lanes; the pluck signal
        // tightens the pull momentarily on top
        let mid_drive = frame.bands.mid() + frame.mid_pulse * 0.5;
        let pull_coef = 1.0 - (-dt * arms.tightness * mid_drive).exp();

        let radial_tau =
            radial.smoothing_tau_s / (1.0 + sensitivity * radial.sensitivity_tau_scale);
        let radial_coef = 1.0 - (-dt / radial_tau.max(1e-4)).exp();
        let polar_coef = 1.0 - (-dt / vertical.smoothing_tau_s.max(1e-4)).exp();

        for (i, base) in self.base.iter().enumerate() {
            // Vertical placement on the pole axis decides how much of
            // each band's behavior this point expresses
            let y_norm = 1.0 - self.cur_polar[i] / PI;
            let w = zone_weights(y_norm, &self.tuning.zones);

            // Azimuth: baseline spin plus a forward-only pull onto the
            // nearest lane ahead. Lanes twist with height (spiral pitch).
            let lane_phase = self.lane_phase + y_norm * arms.pitch;
            let mut azimuth = self.cur_azimuth[i] + arms.spin_rate * dt;
            let target = forward_lane_target(azimuth, self.arm_count, lane_phase);
            azimuth += (target - azimuth) * pull_coef;
            if azimuth > 1e3 {
                // Trig-invariant rewind to keep f32 precision over long runs
                azimuth = azimuth.rem_euclid(TAU);
            }
            self.cur_azimuth[i] = azimuth;

            // Radius: breathing + outward-only transient splash +
            // sustained bass bias, smoothed toward the target
            let mut breathing = 0.0;
            for k in 0..3 {
                breathing += radial.breathing_amplitudes[k]
                    * (self.time_s * radial.breathing_rates[k] + base.phase * (k + 1) as f32).sin();
            }
            let zone_mix = 0.4 + 0.6 * w[0];
            let target_radius = (base.radius
                + breathing
                + frame.bass_hit * radial.splash_gain * zone_mix
                + frame.bass_envelope * radial.bass_bias_gain * zone_mix)
                .max(0.1);
            self.cur_radius[i] += (target_radius - self.cur_radius[i]) * radial_coef;

            // Polar: treble (and only treble) lifts points toward the top
            // pole; bass stays purely radial
            let target_polar =
                base.polar * (1.0 - frame.treble_envelope * vertical.treble_lift * w[2]);
            self.cur_polar[i] += (target_polar - self.cur_polar[i]) * polar_coef;

            let polar = self.cur_polar[i];
            let radius = self.cur_radius[i];
            let (sin_p, cos_p) = polar.sin_cos();
            let (sin_a, cos_a) = azimuth.sin_cos();

            let mut position = Vec3::new(sin_p * cos_a, cos_p, sin_p * sin_a) * radius;

            // Tangential tide: slow carrier + treble shimmer + bass
            // undercurrent, orthogonal to the radius vector
            let carrier = self.carrier.get([
                (azimuth * tide.carrier_scale) as f64,
                (self.time_s * tide.carrier_speed) as f64,
            ]) as f32
                * tide.carrier_gain;
            let shimmer = (self.time_s * tide.shimmer_rate + base.phase).sin()
                * frame.treble_envelope
                * tide.shimmer_gain;
            let undercurrent = (self.time_s * tide.undercurrent_rate + base.phase * 0.5).sin()
                * frame.bass_envelope
                * tide.undercurrent_gain;
            let tangent = Vec3::new(-sin_a, 0.0, cos_a);
            position += tangent * (carrier + shimmer + undercurrent);

            // Shape and color follow the same zone weights so the visual
            // archetype never disagrees with the motion
            let shape_tier = if self.fallback { 1.0 } else { w[1] + 2.0 * w[2] };

            let lane_offset = (azimuth - lane_phase).rem_euclid(spacing);
            let lane_dist = lane_offset.min(spacing - lane_offset) / (spacing * 0.5);

            let hue = (base.hue + frame.bands.treble * color.hue_treble_shift * w[2])
                .rem_euclid(1.0);
            let energy = 0.35 * base.amplitude
                + 0.35 * frame.loudness
                + 0.30
                    * (w[0] * frame.bands.bass + w[1] * frame.bands.mid() + w[2] * frame.bands.treble);
            let saturation = color.saturation_floor + sensitivity * color.saturation_range;
            let luminance = ((color.lum_floor + energy * color.lum_energy_gain)
                * (1.0 - color.lane_darkening * lane_dist))
                .clamp(0.0, 1.0);

            out[i] = RenderPoint {
                position: position.to_array(),
                shape_tier,
                color: hsl_to_rgb(hue, saturation, luminance),
                energy,
            };
        }
    }
}
