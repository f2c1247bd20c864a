use nalgebra::{Point3, Vector3};

use crate::types::*;

/// Shape construction, loading, meshing and release.
/// Implemented by AnalyticKernel; a native kernel binding plugs in the same way.
pub trait Kernel {
    /// Axis-aligned box with one corner at the origin, extending to (dx, dy, dz).
    fn make_box(&mut self, dx: f64, dy: f64, dz: f64) -> Result<ShapeHandle, KernelError>;

    /// Sphere centered at the origin.
    fn make_sphere(&mut self, radius: f64) -> Result<ShapeHandle, KernelError>;

    /// Torus centered at the origin around +Z.
    fn make_torus(&mut self, major_radius: f64, minor_radius: f64)
        -> Result<ShapeHandle, KernelError>;

    /// Cylinder with its base centered at the origin, extending along +Z.
    fn make_cylinder(&mut self, radius: f64, height: f64) -> Result<ShapeHandle, KernelError>;

    /// Load a shape from serialized bytes in the kernel's native format.
    fn read_shape(&mut self, data: &[u8]) -> Result<ShapeHandle, KernelError>;

    /// Attach triangulations to every face that can be meshed.
    /// Idempotent: calling again with the same or coarser tolerances is a no-op.
    fn tessellate(
        &mut self,
        shape: &ShapeHandle,
        linear_deflection: f64,
        angular_deflection: f64,
    ) -> Result<(), KernelError>;

    /// Free the shape and everything derived from it.
    fn release(&mut self, shape: ShapeHandle);
}

/// Read-only topology and geometry queries used during extraction.
pub trait KernelIntrospect {
    /// Faces of a shape in topological enumeration order.
    fn faces(&self, shape: &ShapeHandle) -> Result<Vec<KernelId>, KernelError>;

    /// Edges of a shape in topological enumeration order, each listed once.
    fn edges(&self, shape: &ShapeHandle) -> Result<Vec<KernelId>, KernelError>;

    fn face_orientation(&self, face: KernelId) -> Result<Orientation, KernelError>;

    /// Triangulation and placement, or `None` when the face carries no mesh.
    fn face_triangulation(&self, face: KernelId)
        -> Result<Option<FaceTriangulation<'_>>, KernelError>;

    /// Surface normal at a UV parameter, in shape space, pointing away from
    /// the material (already flipped for reversed faces). Not necessarily unit.
    fn surface_normal(&self, face: KernelId, uv: [f64; 2]) -> Result<Vector3<f64>, KernelError>;

    /// Precomputed 3D polygon of an edge, if the shape carries one.
    fn edge_polygon(&self, edge: KernelId) -> Result<Option<EdgePolygon<'_>>, KernelError>;

    /// Curve adaptor over the edge's 3D curve, already placed in shape space.
    fn edge_curve(&self, edge: KernelId) -> Result<Box<dyn CurveAdaptor + '_>, KernelError>;
}

/// Parametric view of a bounded 3D curve.
pub trait CurveAdaptor {
    fn first_parameter(&self) -> f64;

    fn last_parameter(&self) -> f64;

    /// Point at parameter `t`.
    fn value(&self, t: f64) -> Result<Point3<f64>, KernelError>;

    /// Point and first derivative at parameter `t`.
    fn d1(&self, t: f64) -> Result<(Point3<f64>, Vector3<f64>), KernelError>;
}

/// Combined trait for callers that need both mutable Kernel access and
/// read-only KernelIntrospect access on the same object.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;
}

impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}
