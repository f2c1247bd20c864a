//! Primitive solids expressed as shape documents.
//!
//! Every builder returns a [`ShapeDocument`]; the kernel loads it the same way
//! it loads an imported file.

use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::{info, instrument};

use crate::document::{CurveDef, EdgeDef, FaceDef, FaceDomain, ShapeDocument, SurfaceDef};
use crate::types::{KernelError, Orientation};

fn check_dimension(what: &str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidPrimitive {
            reason: format!("{} must be positive and finite, got {}", what, value),
        })
    }
}

fn plane_face(
    origin: [f64; 3],
    normal: [f64; 3],
    x_dir: [f64; 3],
    u: [f64; 2],
    v: [f64; 2],
    orientation: Orientation,
) -> FaceDef {
    FaceDef {
        surface: Some(SurfaceDef::Plane {
            origin,
            normal,
            x_dir,
        }),
        domain: FaceDomain::Rect { u, v },
        orientation,
        location: None,
        triangulation: None,
    }
}

fn line_edge(origin: [f64; 3], direction: [f64; 3], length: f64) -> EdgeDef {
    EdgeDef {
        curve: Some(CurveDef::Line { origin, direction }),
        range: Some([0.0, length]),
        polygon: None,
        location: None,
    }
}

fn circle_edge(
    center: [f64; 3],
    normal: [f64; 3],
    x_dir: [f64; 3],
    radius: f64,
    range: [f64; 2],
) -> EdgeDef {
    EdgeDef {
        curve: Some(CurveDef::Circle {
            center,
            normal,
            x_dir,
            radius,
        }),
        range: Some(range),
        polygon: None,
        location: None,
    }
}

/// Axis-aligned box from the origin to (dx, dy, dz): 6 planar faces, 12 line edges.
///
/// Faces on the min side of each axis share the parametric normal of their
/// opposite face and are marked reversed.
#[instrument]
pub fn box_document(dx: f64, dy: f64, dz: f64) -> Result<ShapeDocument, KernelError> {
    check_dimension("box dx", dx)?;
    check_dimension("box dy", dy)?;
    check_dimension("box dz", dz)?;
    info!("building box document");

    use Orientation::{Forward, Reversed};
    let (x, y, z) = ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
    let faces = vec![
        plane_face([0.0, 0.0, 0.0], z, x, [0.0, dx], [0.0, dy], Reversed),
        plane_face([0.0, 0.0, dz], z, x, [0.0, dx], [0.0, dy], Forward),
        plane_face([0.0, 0.0, 0.0], x, y, [0.0, dy], [0.0, dz], Reversed),
        plane_face([dx, 0.0, 0.0], x, y, [0.0, dy], [0.0, dz], Forward),
        plane_face([0.0, 0.0, 0.0], y, z, [0.0, dz], [0.0, dx], Reversed),
        plane_face([0.0, dy, 0.0], y, z, [0.0, dz], [0.0, dx], Forward),
    ];

    let mut edges = Vec::with_capacity(12);
    for &(a, b) in &[(0.0, 0.0), (dy, 0.0), (0.0, dz), (dy, dz)] {
        edges.push(line_edge([0.0, a, b], x, dx));
    }
    for &(a, b) in &[(0.0, 0.0), (dx, 0.0), (0.0, dz), (dx, dz)] {
        edges.push(line_edge([a, 0.0, b], y, dy));
    }
    for &(a, b) in &[(0.0, 0.0), (dx, 0.0), (0.0, dy), (dx, dy)] {
        edges.push(line_edge([a, b, 0.0], z, dz));
    }

    Ok(ShapeDocument {
        name: Some("box".to_string()),
        faces,
        edges,
        placement: None,
    })
}

/// Sphere centered at the origin: one face, a half-circle seam and two
/// degenerated pole edges.
#[instrument]
pub fn sphere_document(radius: f64) -> Result<ShapeDocument, KernelError> {
    check_dimension("sphere radius", radius)?;
    info!("building sphere document");

    let face = FaceDef {
        surface: Some(SurfaceDef::Sphere {
            center: [0.0; 3],
            radius,
        }),
        domain: FaceDomain::Rect {
            u: [0.0, TAU],
            v: [-FRAC_PI_2, FRAC_PI_2],
        },
        orientation: Orientation::Forward,
        location: None,
        triangulation: None,
    };
    let pole = |z: f64| EdgeDef {
        curve: Some(CurveDef::Degenerated {
            point: [0.0, 0.0, z],
        }),
        range: None,
        polygon: None,
        location: None,
    };
    let edges = vec![
        pole(-radius),
        circle_edge(
            [0.0; 3],
            [0.0, -1.0, 0.0],
            [1.0, 0.0, 0.0],
            radius,
            [-FRAC_PI_2, FRAC_PI_2],
        ),
        pole(radius),
    ];

    Ok(ShapeDocument {
        name: Some("sphere".to_string()),
        faces: vec![face],
        edges,
        placement: None,
    })
}

/// Torus centered at the origin around +Z: one face, the seam circle of the
/// tube at angle 0 and the outer equator.
#[instrument]
pub fn torus_document(major_radius: f64, minor_radius: f64) -> Result<ShapeDocument, KernelError> {
    check_dimension("torus major radius", major_radius)?;
    check_dimension("torus minor radius", minor_radius)?;
    if minor_radius >= major_radius {
        return Err(KernelError::InvalidPrimitive {
            reason: format!(
                "torus minor radius {} must be smaller than major radius {}",
                minor_radius, major_radius
            ),
        });
    }
    info!("building torus document");

    let face = FaceDef {
        surface: Some(SurfaceDef::Torus {
            center: [0.0; 3],
            axis: [0.0, 0.0, 1.0],
            major_radius,
            minor_radius,
        }),
        domain: FaceDomain::Rect {
            u: [0.0, TAU],
            v: [0.0, TAU],
        },
        orientation: Orientation::Forward,
        location: None,
        triangulation: None,
    };
    let edges = vec![
        circle_edge(
            [major_radius, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [1.0, 0.0, 0.0],
            minor_radius,
            [0.0, TAU],
        ),
        circle_edge(
            [0.0; 3],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            major_radius + minor_radius,
            [0.0, TAU],
        ),
    ];

    Ok(ShapeDocument {
        name: Some("torus".to_string()),
        faces: vec![face],
        edges,
        placement: None,
    })
}

/// Cylinder with its base centered at the origin, extending along +Z.
/// Lateral face plus two disk caps; bottom circle, top circle and a seam line.
#[instrument]
pub fn cylinder_document(radius: f64, height: f64) -> Result<ShapeDocument, KernelError> {
    check_dimension("cylinder radius", radius)?;
    check_dimension("cylinder height", height)?;
    info!("building cylinder document");

    let (x, z) = ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
    let cap = |origin: [f64; 3], orientation| FaceDef {
        surface: Some(SurfaceDef::Plane {
            origin,
            normal: z,
            x_dir: x,
        }),
        domain: FaceDomain::Disk { radius },
        orientation,
        location: None,
        triangulation: None,
    };
    let faces = vec![
        FaceDef {
            surface: Some(SurfaceDef::Cylinder {
                origin: [0.0; 3],
                axis: z,
                x_dir: x,
                radius,
            }),
            domain: FaceDomain::Rect {
                u: [0.0, TAU],
                v: [0.0, height],
            },
            orientation: Orientation::Forward,
            location: None,
            triangulation: None,
        },
        cap([0.0, 0.0, 0.0], Orientation::Reversed),
        cap([0.0, 0.0, height], Orientation::Forward),
    ];
    let edges = vec![
        circle_edge([0.0; 3], z, x, radius, [0.0, TAU]),
        circle_edge([0.0, 0.0, height], z, x, radius, [0.0, TAU]),
        line_edge([radius, 0.0, 0.0], z, height),
    ];

    Ok(ShapeDocument {
        name: Some("cylinder".to_string()),
        faces,
        edges,
        placement: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_document_topology() {
        let doc = box_document(1.0, 2.0, 3.0).unwrap();
        assert_eq!(doc.faces.len(), 6);
        assert_eq!(doc.edges.len(), 12);
        let reversed = doc
            .faces
            .iter()
            .filter(|f| f.orientation == Orientation::Reversed)
            .count();
        assert_eq!(reversed, 3);
        for face in &doc.faces {
            assert!(face.surface.as_ref().unwrap().to_surface().is_ok());
        }
    }

    #[test]
    fn test_sphere_has_degenerated_poles() {
        let doc = sphere_document(5.0).unwrap();
        let degenerated = doc
            .edges
            .iter()
            .filter(|e| matches!(e.curve, Some(CurveDef::Degenerated { .. })))
            .count();
        assert_eq!(degenerated, 2);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(matches!(
            box_document(0.0, 1.0, 1.0),
            Err(KernelError::InvalidPrimitive { .. })
        ));
        assert!(sphere_document(f64::NAN).is_err());
        assert!(torus_document(10.0, 10.0).is_err());
        assert!(torus_document(10.0, -1.0).is_err());
        assert!(cylinder_document(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_documents_serialize() {
        let doc = cylinder_document(2.0, 4.0).unwrap();
        let json = doc.to_json().unwrap();
        let back = ShapeDocument::from_json(json.as_bytes()).unwrap();
        assert_eq!(back.name.as_deref(), Some("cylinder"));
        assert_eq!(back.faces.len(), 3);
        assert_eq!(back.faces[1].domain, FaceDomain::Disk { radius: 2.0 });
        assert_eq!(back.edges.len(), 3);
    }
}
