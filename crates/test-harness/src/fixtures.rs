//! Shape documents covering the awkward inputs a converter meets.

/// One forward triangle in the XY plane.
pub const SINGLE_TRIANGLE: &str = r#"{
    "name": "triangle",
    "faces": [ {
        "triangulation": { "nodes": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[1,2,3]] }
    } ]
}"#;

/// The same triangle on a reversed face.
pub const REVERSED_TRIANGLE: &str = r#"{
    "name": "reversed",
    "faces": [ {
        "orientation": "reversed",
        "triangulation": { "nodes": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[1,2,3]] }
    } ]
}"#;

/// No faces and no edges.
pub const EMPTY_SHAPE: &str = r#"{ "name": "empty", "faces": [], "edges": [] }"#;

/// A triangle whose edges are degenerate, zero-length, or too short to
/// draw, plus one valid line.
pub const DEGENERATE_EDGES: &str = r#"{
    "name": "degenerate-edges",
    "faces": [ {
        "triangulation": { "nodes": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[1,2,3]] }
    } ],
    "edges": [
        { "curve": { "type": "degenerated", "point": [0,0,0] } },
        { "curve": { "type": "line", "origin": [0,0,0], "direction": [1,0,0] }, "range": [0, 1] },
        { "curve": { "type": "line", "origin": [0,0,0], "direction": [0,1,0] }, "range": [1, 1] },
        { "polygon": [[0,0,0]] },
        {}
    ]
}"#;

/// Faces with nothing to mesh next to a good one, and a triangle that
/// references a missing node.
pub const BROKEN_FACES: &str = r#"{
    "name": "broken-faces",
    "faces": [
        { "orientation": "forward" },
        {
            "triangulation": {
                "nodes": [[0,0,0],[1,0,0],[1,1,0],[0,1,0]],
                "triangles": [[1,2,3],[1,3,9]]
            }
        }
    ]
}"#;

/// A half cylinder placed away from the origin, with a stored polygon edge.
pub const PLACED_HALF_CYLINDER: &str = r#"{
    "name": "half-cylinder",
    "placement": { "translation": [0, 0, 5] },
    "faces": [ {
        "surface": { "type": "cylinder", "origin": [0,0,0], "axis": [0,0,1], "x_dir": [1,0,0], "radius": 1 },
        "domain": { "type": "rect", "u": [0, 3.141592653589793], "v": [0, 2] },
        "location": { "translation": [10, 0, 0] }
    } ],
    "edges": [
        { "polygon": [[11,0,0],[9,0,0]] }
    ]
}"#;
