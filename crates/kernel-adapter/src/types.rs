use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Opaque handle to a shape held by the kernel.
/// NEVER persisted. Not `Clone`: a handle is released exactly once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub(crate) u64);

impl ShapeHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal identifier of a face or edge.
/// Stable within a single kernel session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(pub u64);

/// Orientation of a face relative to its underlying surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
}

impl Orientation {
    pub fn is_reversed(self) -> bool {
        self == Orientation::Reversed
    }

    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
        }
    }
}

/// Rigid placement mapping local triangulation/polygon coordinates into shape space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location(Isometry3<f64>);

impl Location {
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    pub fn from_isometry(iso: Isometry3<f64>) -> Self {
        Self(iso)
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self(Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::identity(),
        ))
    }

    /// Rotation of `angle` radians about `axis` through the origin.
    /// A zero axis yields the identity.
    pub fn rotation(axis: Vector3<f64>, angle: f64) -> Self {
        match Unit::try_new(axis, 1e-15) {
            Some(axis) => Self(Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&axis, angle),
            )),
            None => Self::identity(),
        }
    }

    pub fn isometry(&self) -> &Isometry3<f64> {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == Isometry3::identity()
    }

    /// `self` applied after `inner`.
    pub fn compose(&self, inner: &Location) -> Location {
        Location(self.0 * inner.0)
    }

    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.0.transform_point(p)
    }

    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.0.transform_vector(v)
    }

    /// Translation and quaternion (x, y, z, w) components.
    pub fn to_parts(&self) -> ([f64; 3], [f64; 4]) {
        let t = self.0.translation.vector;
        let q = self.0.rotation.quaternion().coords;
        ([t.x, t.y, t.z], [q.x, q.y, q.z, q.w])
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::identity()
    }
}

/// Triangulation attached to a face: nodes, optional UV parameters, and
/// triangles as triples of 1-based node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    nodes: Vec<Point3<f64>>,
    uv_nodes: Option<Vec<[f64; 2]>>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    pub fn new(nodes: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            nodes,
            uv_nodes: None,
            triangles,
        }
    }

    /// Attach per-node UV parameters. Must match the node count.
    pub fn with_uv_nodes(mut self, uv_nodes: Vec<[f64; 2]>) -> Result<Self, KernelError> {
        if uv_nodes.len() != self.nodes.len() {
            return Err(KernelError::InvalidShape {
                reason: format!(
                    "{} uv nodes for {} nodes",
                    uv_nodes.len(),
                    self.nodes.len()
                ),
            });
        }
        self.uv_nodes = Some(uv_nodes);
        Ok(self)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn has_uv_nodes(&self) -> bool {
        self.uv_nodes.is_some()
    }

    /// Node by 1-based index.
    pub fn node(&self, index: usize) -> Option<Point3<f64>> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i)).copied()
    }

    /// UV parameter of a node by 1-based index.
    pub fn uv_node(&self, index: usize) -> Option<[f64; 2]> {
        let uv = self.uv_nodes.as_ref()?;
        index.checked_sub(1).and_then(|i| uv.get(i)).copied()
    }

    /// Triangle by 1-based index; its entries are 1-based node indices.
    pub fn triangle(&self, index: usize) -> Option<[usize; 3]> {
        index.checked_sub(1).and_then(|i| self.triangles.get(i)).copied()
    }
}

/// Borrowed view of a face's triangulation with its placement.
#[derive(Debug, Clone, Copy)]
pub struct FaceTriangulation<'a> {
    pub triangulation: &'a Triangulation,
    pub location: Location,
}

/// Borrowed view of an edge's precomputed 3D polygon with its placement.
#[derive(Debug, Clone, Copy)]
pub struct EdgePolygon<'a> {
    pub nodes: &'a [Point3<f64>],
    pub location: Location,
}

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("geometry kernel unavailable: {reason}")]
    KernelUnavailable { reason: String },

    #[error("shape handle {handle} not found")]
    ShapeNotFound { handle: u64 },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("invalid shape data: {reason}")]
    InvalidShape { reason: String },

    #[error("invalid primitive: {reason}")]
    InvalidPrimitive { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("edge {id:?} has no usable curve")]
    DegenerateCurve { id: KernelId },

    #[error("evaluation failed: {reason}")]
    EvaluationFailed { reason: String },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
}
