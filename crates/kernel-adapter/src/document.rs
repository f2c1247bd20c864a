//! Serialized shape format read by [`AnalyticKernel`](crate::AnalyticKernel).
//!
//! A document lists faces (analytic surface with a parameter domain, or a stored
//! triangulation) and edges (analytic curve, or a stored polygon). Primitive
//! builders produce the same structure, so imported and generated shapes take
//! one path through the kernel.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::{Circle, Curve, Cylinder, Frame, Line, Plane, Sphere, Surface, Torus};
use crate::types::{KernelError, Location, Orientation, Triangulation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub faces: Vec<FaceDef>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
    /// Placement applied on top of every face and edge location.
    #[serde(default)]
    pub placement: Option<PlacementDef>,
}

impl ShapeDocument {
    pub fn from_json(data: &[u8]) -> Result<Self, KernelError> {
        serde_json::from_slice(data).map_err(|e| KernelError::InvalidShape {
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, KernelError> {
        serde_json::to_string_pretty(self).map_err(|e| KernelError::InvalidShape {
            reason: e.to_string(),
        })
    }

    /// Place the whole shape, composing with any existing placement.
    pub fn located(mut self, placement: PlacementDef) -> Self {
        self.placement = Some(match self.placement.take() {
            Some(inner) => PlacementDef::composed(&placement, &inner),
            None => placement,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDef {
    /// Underlying surface. Faces without one can only carry a stored triangulation.
    #[serde(default)]
    pub surface: Option<SurfaceDef>,
    #[serde(default)]
    pub domain: FaceDomain,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub location: Option<PlacementDef>,
    /// Pre-computed mesh, kept as-is by tessellation.
    #[serde(default)]
    pub triangulation: Option<TriangulationDef>,
}

/// Parameter domain of a face on its surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FaceDomain {
    /// Rectangle `[u0, u1] x [v0, v1]`.
    Rect { u: [f64; 2], v: [f64; 2] },
    /// Disk of `radius` around the origin of a plane's parameter space.
    Disk { radius: f64 },
}

impl Default for FaceDomain {
    fn default() -> Self {
        FaceDomain::Rect {
            u: [0.0, 1.0],
            v: [0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceDef {
    Plane {
        origin: [f64; 3],
        normal: [f64; 3],
        x_dir: [f64; 3],
    },
    Cylinder {
        origin: [f64; 3],
        axis: [f64; 3],
        x_dir: [f64; 3],
        radius: f64,
    },
    Sphere {
        center: [f64; 3],
        radius: f64,
    },
    Torus {
        center: [f64; 3],
        axis: [f64; 3],
        major_radius: f64,
        minor_radius: f64,
    },
}

impl SurfaceDef {
    pub fn to_surface(&self) -> Result<Surface, KernelError> {
        let surface = match self {
            SurfaceDef::Plane {
                origin,
                normal,
                x_dir,
            } => Surface::Plane(Plane {
                frame: frame(origin, normal, x_dir)?,
            }),
            SurfaceDef::Cylinder {
                origin,
                axis,
                x_dir,
                radius,
            } => Surface::Cylinder(Cylinder {
                frame: frame(origin, axis, x_dir)?,
                radius: positive("cylinder radius", *radius)?,
            }),
            SurfaceDef::Sphere { center, radius } => Surface::Sphere(Sphere {
                frame: frame(center, &[0.0, 0.0, 1.0], &[1.0, 0.0, 0.0])?,
                radius: positive("sphere radius", *radius)?,
            }),
            SurfaceDef::Torus {
                center,
                axis,
                major_radius,
                minor_radius,
            } => {
                let frame = Frame::from_normal(point(center), vector(axis)).ok_or_else(|| {
                    KernelError::InvalidShape {
                        reason: "torus axis is zero".to_string(),
                    }
                })?;
                Surface::Torus(Torus {
                    frame,
                    major_radius: positive("torus major radius", *major_radius)?,
                    minor_radius: positive("torus minor radius", *minor_radius)?,
                })
            }
        };
        Ok(surface)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangulationDef {
    pub nodes: Vec<[f64; 3]>,
    #[serde(default)]
    pub uv: Option<Vec<[f64; 2]>>,
    /// 1-based node indices.
    pub triangles: Vec<[usize; 3]>,
}

impl TriangulationDef {
    pub fn to_triangulation(&self) -> Result<Triangulation, KernelError> {
        let tri = Triangulation::new(
            self.nodes.iter().map(point).collect(),
            self.triangles.clone(),
        );
        match &self.uv {
            Some(uv) => tri.with_uv_nodes(uv.clone()),
            None => Ok(tri),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
    #[serde(default)]
    pub curve: Option<CurveDef>,
    /// Parameter range on the curve.
    #[serde(default)]
    pub range: Option<[f64; 2]>,
    /// Pre-computed 3D polygon, in edge-local coordinates.
    #[serde(default)]
    pub polygon: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub location: Option<PlacementDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveDef {
    Line {
        origin: [f64; 3],
        direction: [f64; 3],
    },
    Circle {
        center: [f64; 3],
        normal: [f64; 3],
        x_dir: [f64; 3],
        radius: f64,
    },
    Degenerated {
        point: [f64; 3],
    },
}

impl CurveDef {
    pub fn to_curve(&self) -> Result<Curve, KernelError> {
        let curve = match self {
            CurveDef::Line { origin, direction } => {
                let direction = vector(direction).try_normalize(1e-15).ok_or_else(|| {
                    KernelError::InvalidShape {
                        reason: "line direction is zero".to_string(),
                    }
                })?;
                Curve::Line(Line {
                    origin: point(origin),
                    direction,
                })
            }
            CurveDef::Circle {
                center,
                normal,
                x_dir,
                radius,
            } => Curve::Circle(Circle {
                frame: frame(center, normal, x_dir)?,
                radius: positive("circle radius", *radius)?,
            }),
            CurveDef::Degenerated { point: p } => Curve::Degenerated(point(p)),
        };
        Ok(curve)
    }

    /// Natural parameter range when the edge does not specify one.
    pub fn default_range(&self) -> [f64; 2] {
        match self {
            CurveDef::Line { .. } => [0.0, 1.0],
            CurveDef::Circle { .. } => [0.0, std::f64::consts::TAU],
            CurveDef::Degenerated { .. } => [0.0, 0.0],
        }
    }
}

/// Rigid placement: rotation of `angle` radians about `axis`, then translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementDef {
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub axis: Option<[f64; 3]>,
    #[serde(default)]
    pub angle: f64,
}

impl PlacementDef {
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            translation: [x, y, z],
            axis: None,
            angle: 0.0,
        }
    }

    pub fn to_location(&self) -> Location {
        let [x, y, z] = self.translation;
        let rotation = match self.axis {
            Some(axis) => Location::rotation(vector(&axis), self.angle),
            None => Location::identity(),
        };
        Location::translation(x, y, z).compose(&rotation)
    }

    fn composed(outer: &PlacementDef, inner: &PlacementDef) -> PlacementDef {
        let loc = outer.to_location().compose(&inner.to_location());
        let iso = loc.isometry();
        let t = iso.translation.vector;
        let (axis, angle) = match iso.rotation.axis_angle() {
            Some((axis, angle)) => (Some([axis.x, axis.y, axis.z]), angle),
            None => (None, 0.0),
        };
        PlacementDef {
            translation: [t.x, t.y, t.z],
            axis,
            angle,
        }
    }
}

fn point(p: &[f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}

fn vector(v: &[f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

fn frame(origin: &[f64; 3], z: &[f64; 3], x: &[f64; 3]) -> Result<Frame, KernelError> {
    Frame::new(point(origin), vector(z), vector(x)).ok_or_else(|| KernelError::InvalidShape {
        reason: format!("degenerate frame: normal {:?}, x {:?}", z, x),
    })
}

fn positive(what: &str, value: f64) -> Result<f64, KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(KernelError::InvalidShape {
            reason: format!("{} must be positive, got {}", what, value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_minimal_document() {
        let json = br#"{
            "faces": [{
                "orientation": "reversed",
                "triangulation": {
                    "nodes": [[0,0,0],[1,0,0],[0,1,0]],
                    "triangles": [[1,2,3]]
                }
            }],
            "edges": [{ "polygon": [[0,0,0],[1,0,0]] }]
        }"#;
        let doc = ShapeDocument::from_json(json).unwrap();
        assert_eq!(doc.faces.len(), 1);
        assert_eq!(doc.faces[0].orientation, Orientation::Reversed);
        assert!(doc.faces[0].surface.is_none());
        let tri = doc.faces[0].triangulation.as_ref().unwrap().to_triangulation().unwrap();
        assert_eq!(tri.node_count(), 3);
        assert_eq!(doc.edges[0].polygon.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_document_is_invalid_shape() {
        let err = ShapeDocument::from_json(b"{ not json").unwrap_err();
        assert!(matches!(err, KernelError::InvalidShape { .. }));
    }

    #[test]
    fn test_surface_validation() {
        let bad = SurfaceDef::Torus {
            center: [0.0; 3],
            axis: [0.0, 0.0, 1.0],
            major_radius: 30.0,
            minor_radius: -1.0,
        };
        assert!(bad.to_surface().is_err());
        let plane = SurfaceDef::Plane {
            origin: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            x_dir: [0.0, 0.0, 2.0],
        };
        assert!(plane.to_surface().is_err());
    }

    #[test]
    fn test_located_composes_placements() {
        let doc = ShapeDocument {
            name: None,
            faces: vec![],
            edges: vec![],
            placement: Some(PlacementDef::translation(1.0, 0.0, 0.0)),
        }
        .located(PlacementDef::translation(0.0, 2.0, 0.0));
        let loc = doc.placement.unwrap().to_location();
        let p = loc.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }
}
