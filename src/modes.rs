//! View modes over the shared structure.
//!
//! Both modes derive their renderable geometry from the same
//! [`StructureNode`](crate::structure::StructureNode) sequence and expose
//! it as plain vertex data; the rendering substrate owns everything from
//! there. A mode exclusively owns the structure while active and hands it
//! back (by value) when the orchestrator switches modes.

pub mod macro_cloud;
pub mod micro;

use bytemuck::{Pod, Zeroable};

use crate::deform::RenderPoint;
use crate::features::FeatureFrame;
use crate::structure::StructureNode;

pub use macro_cloud::MacroMode;
pub use micro::MicroMode;

/// Which view mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Connected-graph close-up of the structure
    Micro,

    /// Large deformed point cloud
    Macro,
}

/// One graph node instance for the micro view.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct NodeInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 3],
    /// Per-node pulse phase so hits ripple instead of firing in unison
    pub pulse_phase: f32,
}

/// One endpoint of a connection line segment for the micro view.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct EdgeVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Borrowed geometry buffers handed to the rendering substrate.
#[derive(Debug)]
pub enum RenderGeometry<'a> {
    /// Micro view: instanced nodes plus line-list edges
    Graph {
        nodes: &'a [NodeInstance],
        edges: &'a [EdgeVertex],
    },

    /// Macro view: one point per [`RenderPoint`]
    Cloud { points: &'a [RenderPoint] },

    /// Mode has been disposed; nothing to draw
    Empty,
}

/// Capability set every view mode implements.
///
/// Callers rely on this interface instead of probing for methods; a mode
/// that holds no structure simply returns `None` from
/// [`export_structure`](VisualMode::export_structure).
pub trait VisualMode {
    fn kind(&self) -> ModeKind;

    /// Accept a freshly generated (or imported) structure and rebuild all
    /// derived geometry. The seed is the audio content hash (or the
    /// fallback literal) and feeds every seed-dependent choice the mode
    /// makes.
    fn on_new_audio(&mut self, structure: Vec<StructureNode>, seed: &str);

    /// Hand the held structure to a successor mode. Must be callable
    /// before `dispose`; returns `None` when no structure is held.
    fn export_structure(&self) -> Option<Vec<StructureNode>>;

    /// Per-frame update from extracted features. `dt_s` is the measured
    /// frame delta; `sensitivity` is the UI control in [0,1].
    fn update(&mut self, frame: &FeatureFrame, dt_s: f32, sensitivity: f32);

    /// Current geometry buffers for the substrate to draw.
    fn geometry(&self) -> RenderGeometry<'_>;

    /// Release derived geometry. Idempotent; the mode must not be updated
    /// afterwards, and `geometry` returns [`RenderGeometry::Empty`].
    fn dispose(&mut self);
}
