//! AnalyticKernel: deterministic in-process kernel over analytic geometry.
//!
//! Shapes are loaded from [`ShapeDocument`]s. Tessellation attaches UV-grid
//! triangulations to faces that carry a surface; faces loaded with a stored
//! triangulation keep it unchanged.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument, warn};

use crate::document::{FaceDomain, ShapeDocument};
use crate::geometry::{arc_segments, Curve, Surface};
use crate::primitives;
use crate::traits::{CurveAdaptor, Kernel, KernelIntrospect};
use crate::types::*;

#[derive(Debug, Clone)]
struct StoredFace {
    id: KernelId,
    surface: Option<Surface>,
    domain: FaceDomain,
    orientation: Orientation,
    location: Location,
    triangulation: Option<Triangulation>,
    /// Triangulation came with the document and is never regenerated.
    fixed: bool,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    id: KernelId,
    curve: Option<Curve>,
    range: [f64; 2],
    polygon: Option<Vec<Point3<f64>>>,
    location: Location,
}

#[derive(Debug, Clone)]
struct StoredShape {
    faces: Vec<StoredFace>,
    edges: Vec<StoredEdge>,
    /// Tolerances of the last tessellation, if any.
    meshed_with: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy)]
enum Entity {
    Face { shape: u64, index: usize },
    Edge { shape: u64, index: usize },
}

/// Reference kernel implementing [`Kernel`] and [`KernelIntrospect`].
#[derive(Debug)]
pub struct AnalyticKernel {
    next_id: u64,
    next_handle: u64,
    shapes: HashMap<u64, StoredShape>,
    entities: HashMap<KernelId, Entity>,
}

impl Default for AnalyticKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            shapes: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    /// Number of shapes loaded and not yet released.
    pub fn live_shape_count(&self) -> usize {
        self.shapes.len()
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Load a parsed document as a new shape.
    #[instrument(skip(self, doc), fields(name = doc.name.as_deref().unwrap_or("")))]
    pub fn load_document(&mut self, doc: &ShapeDocument) -> Result<ShapeHandle, KernelError> {
        let placement = doc
            .placement
            .map(|p| p.to_location())
            .unwrap_or_default();

        // Validate everything before allocating ids.
        let mut faces = Vec::with_capacity(doc.faces.len());
        for (index, def) in doc.faces.iter().enumerate() {
            let surface = def.surface.as_ref().map(|s| s.to_surface()).transpose()?;
            if let (FaceDomain::Disk { radius }, Some(s)) = (def.domain, surface.as_ref()) {
                if s.plane_frame().is_none() {
                    return Err(KernelError::InvalidShape {
                        reason: format!("face {}: disk domain on a {} surface", index, s.type_name()),
                    });
                }
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(KernelError::InvalidShape {
                        reason: format!("face {}: disk radius {}", index, radius),
                    });
                }
            }
            if let FaceDomain::Rect { u, v } = def.domain {
                if !u.iter().chain(v.iter()).all(|x| x.is_finite()) {
                    return Err(KernelError::InvalidShape {
                        reason: format!("face {}: non-finite parameter domain", index),
                    });
                }
            }
            let triangulation = def
                .triangulation
                .as_ref()
                .map(|t| t.to_triangulation())
                .transpose()?;
            let local = def.location.map(|p| p.to_location()).unwrap_or_default();
            faces.push((surface, def.domain, def.orientation, placement.compose(&local), triangulation));
        }

        let mut edges = Vec::with_capacity(doc.edges.len());
        for def in &doc.edges {
            let curve = def.curve.as_ref().map(|c| c.to_curve()).transpose()?;
            let range = match (def.range, def.curve.as_ref()) {
                (Some(r), _) => r,
                (None, Some(c)) => c.default_range(),
                (None, None) => [0.0, 0.0],
            };
            let polygon = def.polygon.as_ref().map(|nodes| {
                nodes
                    .iter()
                    .map(|p| Point3::new(p[0], p[1], p[2]))
                    .collect::<Vec<_>>()
            });
            let local = def.location.map(|p| p.to_location()).unwrap_or_default();
            edges.push((curve, range, polygon, placement.compose(&local)));
        }

        let handle = self.next_handle;
        self.next_handle += 1;

        let mut shape = StoredShape {
            faces: Vec::with_capacity(faces.len()),
            edges: Vec::with_capacity(edges.len()),
            meshed_with: None,
        };
        for (index, (surface, domain, orientation, location, triangulation)) in
            faces.into_iter().enumerate()
        {
            let id = self.alloc_id();
            self.entities.insert(id, Entity::Face { shape: handle, index });
            shape.faces.push(StoredFace {
                id,
                surface,
                domain,
                orientation,
                location,
                fixed: triangulation.is_some(),
                triangulation,
            });
        }
        for (index, (curve, range, polygon, location)) in edges.into_iter().enumerate() {
            let id = self.alloc_id();
            self.entities.insert(id, Entity::Edge { shape: handle, index });
            shape.edges.push(StoredEdge {
                id,
                curve,
                range,
                polygon,
                location,
            });
        }

        info!(
            handle,
            faces = shape.faces.len(),
            edges = shape.edges.len(),
            "shape loaded"
        );
        self.shapes.insert(handle, shape);
        Ok(ShapeHandle(handle))
    }

    fn shape(&self, handle: &ShapeHandle) -> Result<&StoredShape, KernelError> {
        self.shapes
            .get(&handle.0)
            .ok_or(KernelError::ShapeNotFound { handle: handle.0 })
    }

    fn face(&self, id: KernelId) -> Result<&StoredFace, KernelError> {
        match self.entities.get(&id) {
            Some(Entity::Face { shape, index }) => self
                .shapes
                .get(shape)
                .and_then(|s| s.faces.get(*index))
                .ok_or(KernelError::EntityNotFound { id }),
            _ => Err(KernelError::EntityNotFound { id }),
        }
    }

    fn edge(&self, id: KernelId) -> Result<&StoredEdge, KernelError> {
        match self.entities.get(&id) {
            Some(Entity::Edge { shape, index }) => self
                .shapes
                .get(shape)
                .and_then(|s| s.edges.get(*index))
                .ok_or(KernelError::EntityNotFound { id }),
            _ => Err(KernelError::EntityNotFound { id }),
        }
    }
}

/// UV-grid triangulation of a face domain within the given tolerances.
fn mesh_face(
    surface: &Surface,
    domain: FaceDomain,
    linear: f64,
    angular: f64,
) -> Result<Triangulation, KernelError> {
    match domain {
        FaceDomain::Rect { u, v } => mesh_rect(surface, u, v, linear, angular),
        FaceDomain::Disk { radius } => mesh_disk(surface, radius, linear, angular),
    }
}

fn segments_along(radius: Option<f64>, span: f64, linear: f64, angular: f64) -> usize {
    match radius {
        Some(r) => arc_segments(r, span, linear, angular),
        None => 1,
    }
}

fn mesh_rect(
    surface: &Surface,
    u: [f64; 2],
    v: [f64; 2],
    linear: f64,
    angular: f64,
) -> Result<Triangulation, KernelError> {
    let (u_span, v_span) = (u[1] - u[0], v[1] - v[0]);
    if !(u_span > 0.0 && v_span > 0.0) {
        return Err(KernelError::TessellationFailed {
            reason: format!("empty parameter domain u {:?} v {:?}", u, v),
        });
    }
    let nu = segments_along(surface.u_radius(), u_span, linear, angular);
    let nv = segments_along(surface.v_radius(), v_span, linear, angular);

    let mut nodes = Vec::with_capacity((nu + 1) * (nv + 1));
    let mut uv_nodes = Vec::with_capacity((nu + 1) * (nv + 1));
    for j in 0..=nv {
        let pv = v[0] + v_span * (j as f64 / nv as f64);
        for i in 0..=nu {
            let pu = u[0] + u_span * (i as f64 / nu as f64);
            nodes.push(surface.evaluate(pu, pv));
            uv_nodes.push([pu, pv]);
        }
    }

    // 1-based node index of grid point (i, j).
    let node = |i: usize, j: usize| j * (nu + 1) + i + 1;
    let mut triangles = Vec::with_capacity(nu * nv * 2);
    for j in 0..nv {
        for i in 0..nu {
            let (n00, n10, n11, n01) = (node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1));
            for tri in [[n00, n10, n11], [n00, n11, n01]] {
                if !is_degenerate(&nodes, tri) {
                    triangles.push(tri);
                }
            }
        }
    }

    Triangulation::new(nodes, triangles).with_uv_nodes(uv_nodes)
}

fn mesh_disk(
    surface: &Surface,
    radius: f64,
    linear: f64,
    angular: f64,
) -> Result<Triangulation, KernelError> {
    let n = arc_segments(radius, std::f64::consts::TAU, linear, angular).max(4);
    let mut nodes = Vec::with_capacity(n + 1);
    let mut uv_nodes = Vec::with_capacity(n + 1);
    nodes.push(surface.evaluate(0.0, 0.0));
    uv_nodes.push([0.0, 0.0]);
    for k in 0..n {
        let angle = std::f64::consts::TAU * (k as f64 / n as f64);
        let uv = [radius * angle.cos(), radius * angle.sin()];
        nodes.push(surface.evaluate(uv[0], uv[1]));
        uv_nodes.push(uv);
    }
    let triangles = (0..n)
        .map(|k| [1, k + 2, (k + 1) % n + 2])
        .collect();
    Triangulation::new(nodes, triangles).with_uv_nodes(uv_nodes)
}

fn is_degenerate(nodes: &[Point3<f64>], tri: [usize; 3]) -> bool {
    let (a, b, c) = (nodes[tri[0] - 1], nodes[tri[1] - 1], nodes[tri[2] - 1]);
    let (ab, ac) = (b - a, c - a);
    let scale = ab.norm_squared().max(ac.norm_squared());
    ab.cross(&ac).norm() <= 1e-12 * scale
}

impl Kernel for AnalyticKernel {
    fn make_box(&mut self, dx: f64, dy: f64, dz: f64) -> Result<ShapeHandle, KernelError> {
        let doc = primitives::box_document(dx, dy, dz)?;
        self.load_document(&doc)
    }

    fn make_sphere(&mut self, radius: f64) -> Result<ShapeHandle, KernelError> {
        let doc = primitives::sphere_document(radius)?;
        self.load_document(&doc)
    }

    fn make_torus(&mut self, major_radius: f64, minor_radius: f64) -> Result<ShapeHandle, KernelError> {
        let doc = primitives::torus_document(major_radius, minor_radius)?;
        self.load_document(&doc)
    }

    fn make_cylinder(&mut self, radius: f64, height: f64) -> Result<ShapeHandle, KernelError> {
        let doc = primitives::cylinder_document(radius, height)?;
        self.load_document(&doc)
    }

    fn read_shape(&mut self, data: &[u8]) -> Result<ShapeHandle, KernelError> {
        let doc = ShapeDocument::from_json(data)?;
        self.load_document(&doc)
    }

    #[instrument(skip(self, shape), fields(handle = shape.0))]
    fn tessellate(
        &mut self,
        shape: &ShapeHandle,
        linear_deflection: f64,
        angular_deflection: f64,
    ) -> Result<(), KernelError> {
        if !(linear_deflection.is_finite() && linear_deflection > 0.0)
            || !(angular_deflection.is_finite() && angular_deflection > 0.0)
        {
            return Err(KernelError::TessellationFailed {
                reason: format!(
                    "deflections must be positive, got linear {} angular {}",
                    linear_deflection, angular_deflection
                ),
            });
        }
        let stored = self
            .shapes
            .get_mut(&shape.0)
            .ok_or(KernelError::ShapeNotFound { handle: shape.0 })?;
        if let Some((linear, angular)) = stored.meshed_with {
            if linear <= linear_deflection && angular <= angular_deflection {
                debug!("already meshed at equal or finer tolerance");
                return Ok(());
            }
        }

        let (mut meshed, mut failed) = (0usize, 0usize);
        for face in stored.faces.iter_mut().filter(|f| !f.fixed) {
            let Some(surface) = &face.surface else { continue };
            match mesh_face(surface, face.domain, linear_deflection, angular_deflection) {
                Ok(triangulation) => {
                    face.triangulation = Some(triangulation);
                    meshed += 1;
                }
                Err(e) => {
                    // The face stays untriangulated; the rest of the shape still meshes.
                    warn!(face = ?face.id, error = %e, "face tessellation failed");
                    face.triangulation = None;
                    failed += 1;
                }
            }
        }
        stored.meshed_with = Some((linear_deflection, angular_deflection));
        debug!(meshed, failed, "faces triangulated");
        Ok(())
    }

    fn release(&mut self, shape: ShapeHandle) {
        if let Some(stored) = self.shapes.remove(&shape.0) {
            for face in &stored.faces {
                self.entities.remove(&face.id);
            }
            for edge in &stored.edges {
                self.entities.remove(&edge.id);
            }
            debug!(handle = shape.0, "shape released");
        }
    }
}

/// Curve of an edge evaluated in shape space.
struct PlacedCurve {
    curve: Curve,
    range: [f64; 2],
    location: Location,
}

impl PlacedCurve {
    fn check(&self, t: f64) -> Result<(), KernelError> {
        if t.is_finite() {
            Ok(())
        } else {
            Err(KernelError::EvaluationFailed {
                reason: format!("{} curve at parameter {}", self.curve.type_name(), t),
            })
        }
    }
}

impl CurveAdaptor for PlacedCurve {
    fn first_parameter(&self) -> f64 {
        self.range[0]
    }

    fn last_parameter(&self) -> f64 {
        self.range[1]
    }

    fn value(&self, t: f64) -> Result<Point3<f64>, KernelError> {
        self.check(t)?;
        Ok(self.location.transform_point(&self.curve.evaluate(t)))
    }

    fn d1(&self, t: f64) -> Result<(Point3<f64>, Vector3<f64>), KernelError> {
        self.check(t)?;
        Ok((
            self.location.transform_point(&self.curve.evaluate(t)),
            self.location.transform_vector(&self.curve.derivative(t)),
        ))
    }
}

impl KernelIntrospect for AnalyticKernel {
    fn faces(&self, shape: &ShapeHandle) -> Result<Vec<KernelId>, KernelError> {
        Ok(self.shape(shape)?.faces.iter().map(|f| f.id).collect())
    }

    fn edges(&self, shape: &ShapeHandle) -> Result<Vec<KernelId>, KernelError> {
        Ok(self.shape(shape)?.edges.iter().map(|e| e.id).collect())
    }

    fn face_orientation(&self, face: KernelId) -> Result<Orientation, KernelError> {
        Ok(self.face(face)?.orientation)
    }

    fn face_triangulation(&self, face: KernelId) -> Result<Option<FaceTriangulation<'_>>, KernelError> {
        let face = self.face(face)?;
        Ok(face.triangulation.as_ref().map(|triangulation| FaceTriangulation {
            triangulation,
            location: face.location,
        }))
    }

    fn surface_normal(&self, face: KernelId, uv: [f64; 2]) -> Result<Vector3<f64>, KernelError> {
        let stored = self.face(face)?;
        let surface = stored.surface.as_ref().ok_or_else(|| KernelError::EvaluationFailed {
            reason: format!("face {:?} has no surface", face),
        })?;
        if !(uv[0].is_finite() && uv[1].is_finite()) {
            return Err(KernelError::EvaluationFailed {
                reason: format!("{} normal at {:?}", surface.type_name(), uv),
            });
        }
        let normal = stored
            .location
            .transform_vector(&surface.normal_at(uv[0], uv[1]));
        Ok(if stored.orientation.is_reversed() {
            -normal
        } else {
            normal
        })
    }

    fn edge_polygon(&self, edge: KernelId) -> Result<Option<EdgePolygon<'_>>, KernelError> {
        let edge = self.edge(edge)?;
        Ok(edge.polygon.as_deref().map(|nodes| EdgePolygon {
            nodes,
            location: edge.location,
        }))
    }

    fn edge_curve(&self, edge: KernelId) -> Result<Box<dyn CurveAdaptor + '_>, KernelError> {
        let stored = self.edge(edge)?;
        match stored.curve {
            Some(curve) if !curve.is_degenerated() => Ok(Box::new(PlacedCurve {
                curve,
                range: stored.range,
                location: stored.location,
            })),
            _ => Err(KernelError::DegenerateCurve { id: edge }),
        }
    }
}
