//! Mesh bytes survive every transport unchanged.

use approx::assert_relative_eq;
use proptest::prelude::*;

use brep_mesh::{MeshAssembler, TessellationParams};
use kernel_adapter::AnalyticKernel;
use mesh_export::*;
use mesh_types::{
    BoundingBox, ModelDescription, Part, PartKind, Placement, RenderMesh, MODEL_FORMAT_VERSION,
};

fn torus_model() -> ModelDescription {
    let mut kernel = AnalyticKernel::new();
    MeshAssembler::new()
        .with_color("#3366cc")
        .assemble_torus(&mut kernel, 30.0, 10.0)
        .unwrap()
}

#[test]
fn json_and_glb_carry_identical_mesh() {
    let model = torus_model();
    let body = &model.parts[0].shape;

    let from_json = load_model(&save_model(&model).unwrap()).unwrap();
    let from_glb = read_glb(&model_to_glb(&model).unwrap()).unwrap();

    assert_eq!(&from_json.parts[0].shape, body);
    assert_eq!(&from_glb, body);
    assert_eq!(from_json.bounding_box, model.bounding_box);
}

#[test]
fn glb_positions_accessor_matches_bounding_box() {
    let model = torus_model();
    let glb = model_to_glb(&model).unwrap();
    let json_len = u32::from_le_bytes([glb[12], glb[13], glb[14], glb[15]]) as usize;
    let json: serde_json::Value = serde_json::from_slice(&glb[20..20 + json_len]).unwrap();
    let max = json["accessors"][1]["max"].as_array().unwrap();
    let min = json["accessors"][1]["min"].as_array().unwrap();
    assert_relative_eq!(max[0].as_f64().unwrap(), model.bounding_box.xmax);
    assert_relative_eq!(max[2].as_f64().unwrap(), model.bounding_box.zmax);
    assert_relative_eq!(min[0].as_f64().unwrap(), model.bounding_box.xmin);
    assert_relative_eq!(min[2].as_f64().unwrap(), -10.0);
    assert!(json["extras"]["edgeAccessor"].is_u64());
}

#[test]
fn stl_has_one_facet_per_triangle() {
    let model = torus_model();
    let body = &model.parts[0].shape;
    let stl = export_binary_stl(body, &model.name).unwrap();
    assert_eq!(stl.len(), 84 + body.triangle_count() * 50);
    let ascii = export_ascii_stl(body, &model.name).unwrap();
    assert_eq!(ascii.matches("endfacet").count(), body.triangle_count());
}

#[test]
fn model_without_parts_cannot_be_exported() {
    let mut model = torus_model();
    model.parts.clear();
    assert!(matches!(model_to_glb(&model), Err(ExportError::NoParts)));
}

#[test]
fn cached_conversion_returns_published_hash() {
    let dir = std::env::temp_dir().join(format!("mesh-export-transport-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let cache = ArtifactCache::new(&dir).unwrap();

    let source = br#"{ "faces": [ {
        "triangulation": { "nodes": [[0,0,0],[1,0,0],[0,1,0]], "triangles": [[1,2,3]] }
    } ] }"#;
    let params = TessellationParams::default();
    let key = ArtifactCache::generate_key(source, &params).unwrap();

    let convert = || -> Result<Vec<u8>, ExportError> {
        let mut kernel = AnalyticKernel::new();
        let model = MeshAssembler::new()
            .with_params(params)
            .assemble_document(&mut kernel, source)
            .map_err(|e| ExportError::MalformedGlb { reason: e.to_string() })?;
        model_to_glb(&model)
    };
    let first = cache.get_or_insert_with(&key, convert).unwrap();
    let second = cache.get_or_insert_with(&key, || -> Result<Vec<u8>, ExportError> {
        panic!("second lookup must hit the cache")
    });
    assert_eq!(second.unwrap(), first);

    let status = CompletionStatus {
        progress: 100.0,
        timed_out: false,
        sha256: content_hash(&first),
    };
    assert!(status.accept(&first).is_ok());
    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Random meshes survive JSON and GLB bit for bit
// ---------------------------------------------------------------------------

/// Coordinates on a 1/64 grid are exact in f32 and in decimal.
fn arb_coord() -> impl Strategy<Value = f32> {
    (-100_000i32..100_000).prop_map(|i| i as f32 / 64.0)
}

fn arb_mesh() -> impl Strategy<Value = RenderMesh> {
    (1usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_coord(), n * 3),
            prop::collection::vec(arb_coord(), n * 3),
            prop::collection::vec(prop::array::uniform3(0..n as u32), 0..20),
            prop::collection::vec(prop::array::uniform6(arb_coord()), 0..8),
        )
            .prop_map(|(vertices, normals, triangles, edges)| RenderMesh {
                vertices,
                normals,
                triangles: triangles.concat(),
                edge_segments: edges.concat(),
            })
    })
}

fn single_part_model(mesh: RenderMesh) -> ModelDescription {
    ModelDescription {
        version: MODEL_FORMAT_VERSION,
        name: "random".to_string(),
        id: "/random".to_string(),
        parts: vec![Part {
            id: "/random/body".to_string(),
            name: "body".to_string(),
            kind: PartKind::Shapes,
            shape: mesh,
            color: "#999999".to_string(),
            loc: Placement::identity(),
        }],
        bounding_box: BoundingBox::fallback(),
    }
}

fn bits(values: &[f32]) -> Vec<u32> {
    values.iter().map(|v| v.to_bits()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_mesh_bytes_identical_across_transports(mesh in arb_mesh()) {
        let model = single_part_model(mesh.clone());
        let from_json = load_model(&save_model(&model).unwrap()).unwrap();
        let json_mesh = &from_json.parts[0].shape;
        let glb_mesh = read_glb(&model_to_glb(&model).unwrap()).unwrap();

        for decoded in [json_mesh, &glb_mesh] {
            prop_assert_eq!(bits(&decoded.vertices), bits(&mesh.vertices));
            prop_assert_eq!(bits(&decoded.normals), bits(&mesh.normals));
            prop_assert_eq!(&decoded.triangles, &mesh.triangles);
            prop_assert_eq!(bits(&decoded.edge_segments), bits(&mesh.edge_segments));
        }
    }
}
