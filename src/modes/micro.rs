//! Micro mode: the structure as a small connected graph.
//!
//! Nodes are instanced spheres scaled by the bass envelope with a
//! per-node ripple phase; edges are line segments following the directed
//! adjacency lists. The whole graph spins slowly, faster when the music
//! is loud.

use glam::{Quat, Vec3};
use tracing::debug;

use crate::color::hsl_to_rgb;
use crate::features::{FeatureFrame, MAX_FRAME_DT, MIN_FRAME_DT};
use crate::params::Tuning;
use crate::structure::StructureNode;

use super::{EdgeVertex, ModeKind, NodeInstance, RenderGeometry, VisualMode};

pub struct MicroMode {
    tuning: Tuning,
    structure: Option<Vec<StructureNode>>,

    // Base positions cached at build time; instances are recomputed from
    // them every frame so rotation never accumulates error
    base_positions: Vec<Vec3>,
    nodes: Vec<NodeInstance>,
    edges: Vec<EdgeVertex>,

    spin: f32,
    disposed: bool,
}

impl MicroMode {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            structure: None,
            base_positions: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            spin: 0.0,
            disposed: false,
        }
    }

    fn rebuild_geometry(&mut self) {
        let Some(structure) = &self.structure else {
            self.base_positions.clear();
            self.nodes.clear();
            self.edges.clear();
            return;
        };
        let micro = &self.tuning.micro;

        self.base_positions = structure.iter().map(|n| n.position).collect();

        self.nodes = structure
            .iter()
            .map(|node| NodeInstance {
                position: node.position.to_array(),
                scale: micro.node_base_scale,
                color: hsl_to_rgb(node.hue, micro.saturation, micro.lum_floor),
                pulse_phase: node.id as f32 * 0.61,
            })
            .collect();

        // Line list: one segment per directed connection
        self.edges.clear();
        for node in structure {
            for &j in &node.connections {
                let color = hsl_to_rgb(node.hue, micro.saturation, micro.edge_luminance);
                self.edges.push(EdgeVertex {
                    position: node.position.to_array(),
                    color,
                });
                self.edges.push(EdgeVertex {
                    position: structure[j].position.to_array(),
                    color,
                });
            }
        }

        debug!(
            nodes = self.nodes.len(),
            edge_vertices = self.edges.len(),
            "micro geometry rebuilt"
        );
    }
}

impl VisualMode for MicroMode {
    fn kind(&self) -> ModeKind {
        ModeKind::Micro
    }

    fn on_new_audio(&mut self, structure: Vec<StructureNode>, _seed: &str) {
        self.structure = Some(structure);
        self.spin = 0.0;
        self.disposed = false;
        self.rebuild_geometry();
    }

    fn export_structure(&self) -> Option<Vec<StructureNode>> {
        self.structure.clone()
    }

    fn update(&mut self, frame: &FeatureFrame, dt_s: f32, sensitivity: f32) {
        if self.disposed {
            return;
        }
        let Some(structure) = &self.structure else {
            return;
        };
        let dt = dt_s.clamp(MIN_FRAME_DT, MAX_FRAME_DT);
        let micro = &self.tuning.micro;

        self.spin += micro.spin_rate * (1.0 + frame.loudness) * dt;
        let rotation = Quat::from_rotation_y(self.spin);

        for (instance, (node, base)) in self
            .nodes
            .iter_mut()
            .zip(structure.iter().zip(&self.base_positions))
        {
            let ripple = (instance.pulse_phase + self.spin * 3.0).sin() * 0.5 + 0.5;
            instance.position = (rotation * *base).to_array();
            instance.scale = micro.node_base_scale
                * (1.0
                    + frame.bass_envelope * micro.bass_pulse_gain * node.amplitude
                    + frame.bass_hit * micro.hit_pulse_gain * ripple);

            let luminance = (micro.lum_floor
                + frame.loudness * micro.lum_loudness_gain
                + frame.mid_pulse * 0.15)
                .clamp(0.0, 1.0);
            let saturation = micro.saturation * (0.6 + 0.4 * sensitivity.clamp(0.0, 1.0));
            instance.color = hsl_to_rgb(node.hue, saturation, luminance);
        }

        // Edge endpoints follow the rotated nodes; brightness tracks the
        // treble envelope so the lattice glitters on highs
        let mut edge = self.edges.iter_mut();
        for node in structure.iter() {
            for &j in &node.connections {
                let luminance =
                    (micro.edge_luminance + frame.treble_envelope * 0.3).clamp(0.0, 1.0);
                let color = hsl_to_rgb(node.hue, micro.saturation, luminance);
                if let Some(start) = edge.next() {
                    start.position = (rotation * self.base_positions[node.id]).to_array();
                    start.color = color;
                }
                if let Some(end) = edge.next() {
                    end.position = (rotation * self.base_positions[j]).to_array();
                    end.color = color;
                }
            }
        }
    }

    fn geometry(&self) -> RenderGeometry<'_> {
        if self.disposed {
            return RenderGeometry::Empty;
        }
        RenderGeometry::Graph {
            nodes: &self.nodes,
            edges: &self.edges,
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.nodes = Vec::new();
        self.edges = Vec::new();
        self.base_positions = Vec::new();
        debug!("micro mode disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure;

    fn build_mode() -> (MicroMode, Vec<StructureNode>) {
        let tuning = Tuning::default();
        let samples: Vec<f32> = (0..44_100 * 3)
            .map(|i| (i as f32 * 0.019).sin() * 0.6)
            .collect();
        let nodes = structure::generate(&samples, 3.0, "micro", &tuning.structure);
        let mut mode = MicroMode::new(tuning);
        mode.on_new_audio(nodes.clone(), "micro");
        (mode, nodes)
    }

    #[test]
    fn test_geometry_matches_structure() {
        let (mode, nodes) = build_mode();
        match mode.geometry() {
            RenderGeometry::Graph {
                nodes: instances,
                edges,
            } => {
                assert_eq!(instances.len(), nodes.len());
                let edge_count: usize = nodes.iter().map(|n| n.connections.len()).sum();
                assert_eq!(edges.len(), edge_count * 2);
            }
            other => panic!("expected graph geometry, got {:?}", other),
        }
    }

    #[test]
    fn test_export_preserves_count_and_order() {
        let (mode, nodes) = build_mode();
        let exported = mode.export_structure().unwrap();
        assert_eq!(exported, nodes);
    }

    #[test]
    fn test_bass_grows_node_scale() {
        let (mut mode, _) = build_mode();
        let frame = FeatureFrame {
            bass_envelope: 1.0,
            loudness: 0.5,
            ..FeatureFrame::default()
        };
        mode.update(&frame, 1.0 / 60.0, 0.5);

        let base = mode.tuning.micro.node_base_scale;
        match mode.geometry() {
            RenderGeometry::Graph { nodes, .. } => {
                assert!(nodes.iter().any(|n| n.scale > base));
            }
            other => panic!("expected graph geometry, got {:?}", other),
        }
    }

    #[test]
    fn test_dispose_is_idempotent_and_empties_geometry() {
        let (mut mode, _) = build_mode();
        mode.dispose();
        mode.dispose();
        assert!(matches!(mode.geometry(), RenderGeometry::Empty));
        // Structure stays exportable even after disposal, so a switch
        // that disposes early can still hand the structure on
        assert!(mode.export_structure().is_some());
        // Updating a disposed mode is a no-op, not a panic
        mode.update(&FeatureFrame::default(), 1.0 / 60.0, 0.5);
    }
}
