//! Macro mode: the structure as a large deformed point cloud.
//!
//! The heavy lifting happens in
//! [`DeformationEngine`](crate::deform::DeformationEngine); this mode owns
//! the structure, the engine, and the output vertex buffer, and wires them
//! to the [`VisualMode`] capability set.

use tracing::debug;

use crate::deform::{DeformationEngine, RenderPoint};
use crate::features::FeatureFrame;
use crate::params::Tuning;
use crate::structure::StructureNode;

use super::{ModeKind, RenderGeometry, VisualMode};

pub struct MacroMode {
    structure: Option<Vec<StructureNode>>,
    engine: DeformationEngine,
    points: Vec<RenderPoint>,
    disposed: bool,
}

impl MacroMode {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            structure: None,
            engine: DeformationEngine::new(tuning),
            points: Vec::new(),
            disposed: false,
        }
    }

    /// Whether the cloud is running the neutral-spiral fallback.
    pub fn is_fallback(&self) -> bool {
        self.engine.is_fallback()
    }
}

impl VisualMode for MacroMode {
    fn kind(&self) -> ModeKind {
        ModeKind::Macro
    }

    fn on_new_audio(&mut self, structure: Vec<StructureNode>, seed: &str) {
        self.engine.rebuild(&structure, seed);
        self.structure = if structure.is_empty() {
            None
        } else {
            Some(structure)
        };
        self.points.clear();
        self.disposed = false;
        debug!(
            points = self.engine.point_count(),
            fallback = self.engine.is_fallback(),
            "macro cloud rebuilt"
        );
    }

    fn export_structure(&self) -> Option<Vec<StructureNode>> {
        self.structure.clone()
    }

    fn update(&mut self, frame: &FeatureFrame, dt_s: f32, sensitivity: f32) {
        if self.disposed {
            return;
        }
        self.engine.advance(frame, dt_s, sensitivity, &mut self.points);
    }

    fn geometry(&self) -> RenderGeometry<'_> {
        if self.disposed {
            return RenderGeometry::Empty;
        }
        RenderGeometry::Cloud {
            points: &self.points,
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.points = Vec::new();
        debug!("macro mode disposed");
    }
}
