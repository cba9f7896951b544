//! Deterministic structure generation from decoded audio.
//!
//! The structure ("DNA") is derived once per audio load: the waveform is
//! sliced into per-node windows, each window contributes an amplitude and a
//! dominant-frequency proxy, and nodes are placed on a jittered helix. All
//! randomness comes from a [`SeededRng`] seeded with the content hash, so
//! the same audio always yields the same structure, bit for bit.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::debug;

use crate::hashing::SeededRng;
use crate::params::StructureTuning;

/// Lower bound on node count, regardless of duration.
pub const MIN_NODES: usize = 50;

/// Upper bound on node count, regardless of duration.
pub const MAX_NODES: usize = 200;

/// Nodes per second of audio before clamping.
pub const NODES_PER_SECOND: f32 = 10.0;

/// A single node of the derived structure.
///
/// Immutable after generation. Passed by value when a mode exports its
/// structure to a successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    /// Index of the node in generation order
    pub id: usize,

    /// World-space position
    pub position: Vec3,

    /// Peak |sample| of the node's waveform slice, in [0,1]
    pub amplitude: f32,

    /// Zero-crossing rate of the slice (sign changes / slice length).
    /// A structural proxy for spectral content, deliberately not a true
    /// FFT-based frequency estimate: changing it would change every
    /// derived position.
    pub dominant_frequency: f32,

    /// Assigned hue in [0,1)
    pub hue: f32,

    /// Directed adjacency: ids of nodes this one connects to
    pub connections: Vec<usize>,
}

/// Node count for a given audio duration: denser for longer audio,
/// bounded both ways.
pub fn node_count_for_duration(duration_s: f32) -> usize {
    ((duration_s * NODES_PER_SECOND).floor() as usize).clamp(MIN_NODES, MAX_NODES)
}

/// Generate the structure for decoded first-channel samples.
///
/// Returns an empty list when `samples` is empty; downstream point builds
/// fall back to the neutral spiral in that case. For non-empty input the
/// output is a pure function of `(samples, duration_s, seed)`.
pub fn generate(
    samples: &[f32],
    duration_s: f32,
    seed: &str,
    tuning: &StructureTuning,
) -> Vec<StructureNode> {
    if samples.is_empty() {
        debug!("structure generation skipped: no samples");
        return Vec::new();
    }

    let count = node_count_for_duration(duration_s);
    let slice_len = samples.len().div_ceil(count).max(1);
    let mut rng = SeededRng::new(seed);

    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        let start = (i * slice_len).min(samples.len());
        let end = ((i + 1) * slice_len).min(samples.len());
        let slice = &samples[start..end];

        let amplitude = slice
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
            .min(1.0);
        let dominant_frequency = zero_crossing_rate(slice);

        let t = i as f32 / count as f32;

        // Three jitter draws per node, in a fixed order; the edge pass
        // below draws afterwards. Reordering any draw changes every
        // structure derived from the same seed.
        let axial = rng.next() - 0.5;
        let vertical = rng.next() - 0.5;
        let angular = rng.next() - 0.5;

        let angle = t * tuning.helix_turns * TAU
            + dominant_frequency * tuning.frequency_twist
            + angular * tuning.angle_jitter;
        let radius = tuning.helix_radius + amplitude * tuning.amplitude_reach;

        let position = Vec3::new(
            (t - 0.5) * tuning.strand_length + axial * tuning.axial_jitter,
            angle.cos() * radius
                + amplitude * tuning.amplitude_lift
                + vertical * tuning.vertical_jitter,
            angle.sin() * radius,
        );

        let hue =
            (tuning.hue_base + t * tuning.hue_span + amplitude * tuning.hue_amplitude_shift)
                .fract();

        nodes.push(StructureNode {
            id: i,
            position,
            amplitude,
            dominant_frequency,
            hue,
            connections: Vec::new(),
        });
    }

    // Pairwise connection pass over every ordered pair. N is at most
    // MAX_NODES so the quadratic scan stays cheap. The draw happens only
    // for in-range pairs, which is part of the deterministic draw order.
    let mut connections: Vec<Vec<usize>> = vec![Vec::new(); count];
    for i in 0..count {
        for j in 0..count {
            if i == j {
                continue;
            }
            let dist = nodes[i].position.distance(nodes[j].position);
            if dist < tuning.edge_distance && rng.next() < tuning.edge_probability {
                connections[i].push(j);
            }
        }
    }
    for (node, adjacency) in nodes.iter_mut().zip(connections) {
        node.connections = adjacency;
    }

    debug!(
        node_count = nodes.len(),
        edge_count = nodes.iter().map(|n| n.connections.len()).sum::<usize>(),
        "structure generated"
    );
    nodes
}

/// Sign changes between consecutive samples, divided by slice length.
fn zero_crossing_rate(slice: &[f32]) -> f32 {
    if slice.len() < 2 {
        return 0.0;
    }
    let changes = slice
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    changes as f32 / slice.len() as f32
}
