//! Soft zone partition and arm-lane angle math.
//!
//! Both helpers are pure: the engine calls them per point per frame, and
//! the invariants they carry (weights sum to 1, lane targets never behind
//! the current angle) are what keep the deformation free of visible snaps.

use std::f32::consts::TAU;

use crate::params::ZoneTuning;

/// Continuous bass/mid/treble zone weights for a normalized polar
/// position `y` in [0,1] (0 = bass pole, 1 = treble pole).
///
/// Each weight is a logistic window, so a point near a boundary blends
/// between zones instead of switching; the weights are >= 0 and are
/// normalized to sum to 1.
pub fn zone_weights(y: f32, tuning: &ZoneTuning) -> [f32; 3] {
    let y = y.clamp(0.0, 1.0);
    let softness = tuning.softness.max(1e-4);

    let bass = logistic((tuning.bass_edge - y) / softness);
    let mid = logistic((y - tuning.bass_edge) / softness)
        * logistic((tuning.treble_edge - y) / softness);
    let treble = logistic((y - tuning.treble_edge) / softness);

    let sum = (bass + mid + treble).max(1e-6);
    [bass / sum, mid / sum, treble / sum]
}

fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Angle of the nearest lane at or ahead of `current`, with lanes evenly
/// spaced every `TAU / lane_count` starting at `phase`.
///
/// The returned target is always at or ahead of `current`: snapping toward it can
/// only advance rotation, never reverse it.
pub fn forward_lane_target(current: f32, lane_count: usize, phase: f32) -> f32 {
    let spacing = TAU / lane_count.max(1) as f32;
    let ahead = (phase - current).rem_euclid(spacing);
    current + ahead
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_poles_belong_to_their_zones() {
        let tuning = ZoneTuning::default();
        let bottom = zone_weights(0.0, &tuning);
        let middle = zone_weights(0.5, &tuning);
        let top = zone_weights(1.0, &tuning);

        assert!(bottom[0] > 0.9, "bottom pole is bass territory: {:?}", bottom);
        assert!(middle[1] > 0.9, "midline is mid territory: {:?}", middle);
        assert!(top[2] > 0.9, "top pole is treble territory: {:?}", top);
    }

    #[test]
    fn test_weights_are_continuous_across_boundary() {
        let tuning = ZoneTuning::default();
        let step = 1e-3;
        let mut prev = zone_weights(0.0, &tuning);
        let mut y = step;
        while y <= 1.0 {
            let next = zone_weights(y, &tuning);
            for k in 0..3 {
                assert!(
                    (next[k] - prev[k]).abs() < 0.05,
                    "weight {} jumped at y={}",
                    k,
                    y
                );
            }
            prev = next;
            y += step;
        }
    }

    #[test]
    fn test_lane_target_on_lane_is_identity() {
        let target = forward_lane_target(TAU / 4.0, 4, 0.0);
        assert!((target - TAU / 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_lane_target_wraps_forward() {
        // Just past the last lane before wrap: target is the next lane
        // ahead, not the one behind
        let spacing = TAU / 3.0;
        let current = spacing * 2.0 + 0.1;
        let target = forward_lane_target(current, 3, 0.0);
        assert!(target >= current);
        assert!((target - TAU).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_weights_nonnegative_and_normalized(
            y in 0.0f32..=1.0,
            bass_edge in 0.1f32..0.45,
            treble_edge in 0.55f32..0.9,
            softness in 0.01f32..0.3,
        ) {
            let tuning = ZoneTuning { bass_edge, treble_edge, softness };
            let w = zone_weights(y, &tuning);
            for weight in w {
                prop_assert!(weight >= 0.0);
            }
            prop_assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1e-4);
        }

        #[test]
        fn prop_lane_target_never_behind(
            current in -100.0f32..100.0,
            lanes in 1usize..12,
            phase in -10.0f32..10.0,
        ) {
            let target = forward_lane_target(current, lanes, phase);
            let spacing = TAU / lanes as f32;
            prop_assert!(target >= current);
            prop_assert!(target - current <= spacing + 1e-3);
        }
    }
}
