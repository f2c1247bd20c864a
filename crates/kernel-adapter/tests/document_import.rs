use approx::assert_relative_eq;
use kernel_adapter::*;
use nalgebra::Point3;

const DOCUMENT: &str = r#"{
    "name": "bracket",
    "placement": { "translation": [0, 0, 5] },
    "faces": [
        {
            "orientation": "forward",
            "triangulation": {
                "nodes": [[0,0,0],[2,0,0],[2,2,0],[0,2,0]],
                "uv": [[0,0],[2,0],[2,2],[0,2]],
                "triangles": [[1,2,3],[1,3,4]]
            },
            "surface": { "type": "plane", "origin": [0,0,0], "normal": [0,0,1], "x_dir": [1,0,0] }
        },
        { "orientation": "reversed" },
        {
            "surface": { "type": "cylinder", "origin": [0,0,0], "axis": [0,0,1], "x_dir": [1,0,0], "radius": 1 },
            "domain": { "type": "rect", "u": [0, 3.141592653589793], "v": [0, 2] },
            "location": { "translation": [10, 0, 0] }
        }
    ],
    "edges": [
        { "polygon": [[0,0,0],[2,0,0],[2,2,0]] },
        { "curve": { "type": "line", "origin": [0,0,0], "direction": [0,1,0] }, "range": [0, 2] },
        {}
    ]
}"#;

#[test]
fn test_import_document_with_mixed_faces() {
    let mut kernel = AnalyticKernel::new();
    let h = kernel.read_shape(DOCUMENT.as_bytes()).unwrap();
    kernel.tessellate(&h, 0.1, 0.5).unwrap();
    let faces = kernel.faces(&h).unwrap();
    assert_eq!(faces.len(), 3);

    // Stored triangulation survives tessellation and picks up the document placement.
    let stored = kernel.face_triangulation(faces[0]).unwrap().unwrap();
    assert_eq!(stored.triangulation.node_count(), 4);
    let p = stored
        .location
        .transform_point(&stored.triangulation.node(3).unwrap());
    assert_relative_eq!(p, Point3::new(2.0, 2.0, 5.0), epsilon = 1e-12);

    // A face with neither surface nor triangulation stays unmeshed.
    assert!(kernel.face_triangulation(faces[1]).unwrap().is_none());
    assert!(kernel.surface_normal(faces[1], [0.0, 0.0]).is_err());

    // Half cylinder is meshed in place.
    let half = kernel.face_triangulation(faces[2]).unwrap().unwrap();
    assert!(half.triangulation.triangle_count() >= 2);
    let first = half.location.transform_point(&half.triangulation.node(1).unwrap());
    assert_relative_eq!(first, Point3::new(11.0, 0.0, 5.0), epsilon = 1e-12);
}

#[test]
fn test_import_edges() {
    let mut kernel = AnalyticKernel::new();
    let h = kernel.read_shape(DOCUMENT.as_bytes()).unwrap();
    let edges = kernel.edges(&h).unwrap();
    assert_eq!(edges.len(), 3);

    let polygon = kernel.edge_polygon(edges[0]).unwrap().unwrap();
    assert_eq!(polygon.nodes.len(), 3);
    assert!(kernel.edge_polygon(edges[1]).unwrap().is_none());

    let line = kernel.edge_curve(edges[1]).unwrap();
    assert_eq!(line.first_parameter(), 0.0);
    assert_eq!(line.last_parameter(), 2.0);
    let (p, d) = line.d1(1.0).unwrap();
    assert_relative_eq!(p, Point3::new(0.0, 1.0, 5.0), epsilon = 1e-12);
    assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);

    assert!(matches!(
        kernel.edge_curve(edges[2]),
        Err(KernelError::DegenerateCurve { .. })
    ));
}

#[test]
fn test_invalid_surface_rejects_whole_document() {
    let mut kernel = AnalyticKernel::new();
    let bad = br#"{ "faces": [ { "surface": { "type": "sphere", "center": [0,0,0], "radius": 0 } } ] }"#;
    assert!(matches!(
        kernel.read_shape(bad),
        Err(KernelError::InvalidShape { .. })
    ));
    assert_eq!(kernel.live_shape_count(), 0);
}

#[test]
fn test_primitive_document_matches_primitive() {
    let doc = kernel_adapter::primitives::torus_document(30.0, 10.0).unwrap();
    let json = doc.to_json().unwrap();
    let mut kernel = AnalyticKernel::new();
    let from_doc = kernel.read_shape(json.as_bytes()).unwrap();
    let direct = kernel.make_torus(30.0, 10.0).unwrap();
    assert_eq!(
        kernel.faces(&from_doc).unwrap().len(),
        kernel.faces(&direct).unwrap().len()
    );
    assert_eq!(kernel.live_shape_count(), 2);
    kernel.release(from_doc);
    kernel.release(direct);
    assert_eq!(kernel.live_shape_count(), 0);
}

#[test]
fn test_unknown_handle() {
    let mut kernel = AnalyticKernel::new();
    let h = kernel.make_box(1.0, 1.0, 1.0).unwrap();
    let id = h.id();
    kernel.release(h);
    let mut other = AnalyticKernel::new();
    let h2 = other.make_box(1.0, 1.0, 1.0).unwrap();
    assert_eq!(h2.id(), id);
    assert!(kernel.faces(&h2).is_err());
}
