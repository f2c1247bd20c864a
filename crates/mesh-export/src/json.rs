//! Viewer JSON: the serde layout of [`ModelDescription`].

use mesh_types::{ModelDescription, MODEL_FORMAT_VERSION};

use crate::errors::ExportError;

/// Serialize a model to compact JSON.
pub fn save_model(model: &ModelDescription) -> Result<String, ExportError> {
    Ok(serde_json::to_string(model)?)
}

/// Deserialize a model, rejecting layouts newer than this build understands.
pub fn load_model(json: &str) -> Result<ModelDescription, ExportError> {
    let model: ModelDescription = serde_json::from_str(json)?;
    if model.version > MODEL_FORMAT_VERSION {
        return Err(ExportError::FutureVersion {
            file_version: model.version,
            supported_version: MODEL_FORMAT_VERSION,
        });
    }
    for part in &model.parts {
        let vertex_count = part.shape.vertex_count();
        if let Some(&index) = part.shape.triangles.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(ExportError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{BoundingBox, Part, PartKind, Placement, RenderMesh};

    fn triangle_model() -> ModelDescription {
        ModelDescription {
            version: MODEL_FORMAT_VERSION,
            name: "tri".to_string(),
            id: "/tri".to_string(),
            parts: vec![Part {
                id: "/tri/body".to_string(),
                name: "body".to_string(),
                kind: PartKind::Shapes,
                shape: RenderMesh {
                    vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                    normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
                    triangles: vec![0, 1, 2],
                    edge_segments: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
                },
                color: "#999999".to_string(),
                loc: Placement::identity(),
            }],
            bounding_box: BoundingBox {
                xmin: 0.0,
                xmax: 1.0,
                ymin: 0.0,
                ymax: 1.0,
                zmin: 0.0,
                zmax: 0.0,
            },
        }
    }

    #[test]
    fn save_then_load_preserves_model() {
        let model = triangle_model();
        let json = save_model(&model).unwrap();
        assert_eq!(load_model(&json).unwrap(), model);
    }

    #[test]
    fn saved_json_uses_viewer_keys() {
        let json = save_model(&triangle_model()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["parts"][0]["type"], "shapes");
        assert!(value["parts"][0]["shape"]["edges"].is_array());
        assert_eq!(value["bb"]["xmax"], 1.0);
    }

    #[test]
    fn future_version_rejected() {
        let mut model = triangle_model();
        model.version = MODEL_FORMAT_VERSION + 1;
        let json = save_model(&model).unwrap();
        assert!(matches!(
            load_model(&json),
            Err(ExportError::FutureVersion { file_version: 4, .. })
        ));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let mut model = triangle_model();
        model.parts[0].shape.triangles = vec![0, 1, 7];
        let json = save_model(&model).unwrap();
        assert!(matches!(
            load_model(&json),
            Err(ExportError::IndexOutOfRange { index: 7, vertex_count: 3 })
        ));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(load_model("{ nope"), Err(ExportError::Json(_))));
    }
}
