//! Binary glTF (GLB) transport for a [`RenderMesh`].
//!
//! Buffer layout, each view aligned to 4 bytes:
//! `indices | positions | normals | edges`.
//!
//! Indices are `u16` when every vertex fits, `u32` otherwise. Edge segments
//! are stored as a VEC3 accessor that no primitive references; its index is
//! published in the root `extras.edgeAccessor`. The material is unlit
//! (`KHR_materials_unlit`) and carries the part color.

use std::collections::BTreeMap;

use gltf_json as json;
use json::accessor::{ComponentType, GenericComponentType, Type};
use json::buffer::Target;
use json::mesh::{Mode, Semantic};
use json::validation::{Checked, Checked::Valid, USize64};
use mesh_types::{color_to_rgba, ModelDescription, RenderMesh};
use serde_json::value::RawValue;
use serde_json::Value;
use tracing::debug;

use crate::errors::ExportError;

pub const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: &[u8; 4] = b"JSON";
const CHUNK_BIN: &[u8; 4] = b"BIN\0";
const UNLIT: &str = "KHR_materials_unlit";

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BinWriter {
    bin: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BinWriter {
    fn push_view(&mut self, bytes: &[u8], target: Option<Target>) -> u32 {
        pad_to_4(&mut self.bin, 0);
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64(bytes.len() as u64),
            byte_offset: Some(USize64(self.bin.len() as u64)),
            byte_stride: None,
            name: None,
            target: target.map(Valid),
            extensions: None,
            extras: Default::default(),
        });
        self.bin.extend_from_slice(bytes);
        (self.views.len() - 1) as u32
    }

    fn push_accessor(
        &mut self,
        view: u32,
        count: usize,
        component_type: ComponentType,
        type_: Type,
        bounds: Option<(Value, Value)>,
    ) -> u32 {
        let (min, max) = bounds.unzip();
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(view)),
            byte_offset: Some(USize64(0)),
            count: USize64(count as u64),
            component_type: Valid(GenericComponentType(component_type)),
            type_: Valid(type_),
            extensions: None,
            extras: Default::default(),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });
        (self.accessors.len() - 1) as u32
    }

    fn push_vec3(&mut self, values: &[f32], target: Option<Target>, bounds: bool) -> u32 {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(&bytes, target);
        let bounds = bounds.then(|| vec3_bounds(values));
        self.push_accessor(view, values.len() / 3, ComponentType::F32, Type::Vec3, bounds)
    }
}

fn pad_to_4(buf: &mut Vec<u8>, fill: u8) {
    while buf.len() % 4 != 0 {
        buf.push(fill);
    }
}

fn vec3_bounds(values: &[f32]) -> (Value, Value) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for v in values.chunks_exact(3) {
        for k in 0..3 {
            min[k] = min[k].min(v[k]);
            max[k] = max[k].max(v[k]);
        }
    }
    (serde_json::json!(min), serde_json::json!(max))
}

fn unlit_material(name: &str, color: &str) -> Value {
    serde_json::json!({
        "name": name,
        "extensions": { "KHR_materials_unlit": {} },
        "pbrMetallicRoughness": {
            "baseColorFactor": color_to_rgba(color),
            "metallicFactor": 0.0,
            "roughnessFactor": 1.0
        },
        "alphaMode": "OPAQUE",
        "doubleSided": true
    })
}

/// Encode one mesh with the given part color as a GLB asset.
pub fn write_glb(mesh: &RenderMesh, name: &str, color: &str) -> Result<Vec<u8>, ExportError> {
    let vertex_count = mesh.vertex_count();
    if let Some(&index) = mesh.triangles.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ExportError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }

    let mut w = BinWriter::default();
    let mut root = json::Root::default();
    root.asset.version = "2.0".to_string();
    root.asset.generator = Some(concat!("mesh-export ", env!("CARGO_PKG_VERSION")).to_string());

    if vertex_count > 0 {
        let indices = if mesh.triangles.is_empty() {
            None
        } else if vertex_count <= u16::MAX as usize {
            let bytes: Vec<u8> = mesh
                .triangles
                .iter()
                .flat_map(|&i| (i as u16).to_le_bytes())
                .collect();
            Some((bytes, ComponentType::U16))
        } else {
            let bytes: Vec<u8> = mesh.triangles.iter().flat_map(|i| i.to_le_bytes()).collect();
            Some((bytes, ComponentType::U32))
        };
        let indices = indices.map(|(bytes, component_type)| {
            let view = w.push_view(&bytes, Some(Target::ElementArrayBuffer));
            let accessor =
                w.push_accessor(view, mesh.triangles.len(), component_type, Type::Scalar, None);
            json::Index::new(accessor)
        });

        let mut attributes = BTreeMap::new();
        let positions = w.push_vec3(&mesh.vertices, Some(Target::ArrayBuffer), true);
        attributes.insert(Valid(Semantic::Positions), json::Index::new(positions));
        if mesh.normals.len() == mesh.vertices.len() {
            let normals = w.push_vec3(&mesh.normals, Some(Target::ArrayBuffer), false);
            attributes.insert(Valid(Semantic::Normals), json::Index::new(normals));
        }

        root.meshes.push(json::Mesh {
            extensions: None,
            extras: Default::default(),
            name: Some(name.to_string()),
            primitives: vec![json::mesh::Primitive {
                attributes,
                indices,
                extensions: None,
                extras: Default::default(),
                material: None,
                mode: Valid(Mode::Triangles),
                targets: None,
            }],
            weights: None,
        });
        root.nodes.push(json::Node {
            mesh: Some(json::Index::new(0)),
            name: Some(name.to_string()),
            ..Default::default()
        });
    }
    root.scenes.push(json::Scene {
        extensions: None,
        extras: Default::default(),
        name: None,
        nodes: (0..root.nodes.len() as u32).map(json::Index::new).collect(),
    });
    root.scene = Some(json::Index::new(0));

    if !mesh.edge_segments.is_empty() {
        let edges = w.push_vec3(&mesh.edge_segments, None, false);
        let extras = serde_json::to_string(&serde_json::json!({ "edgeAccessor": edges }))?;
        root.extras = Some(RawValue::from_string(extras)?);
    }

    let BinWriter {
        mut bin,
        views,
        accessors,
    } = w;
    pad_to_4(&mut bin, 0);
    if !bin.is_empty() {
        root.buffers.push(json::Buffer {
            byte_length: USize64(bin.len() as u64),
            name: None,
            uri: None,
            extensions: None,
            extras: Default::default(),
        });
    }
    root.buffer_views = views;
    root.accessors = accessors;

    // The unlit material is injected after serialization so it does not
    // depend on the KHR_materials_unlit feature of gltf-json.
    let mut doc: Value = serde_json::from_str(&json::serialize::to_string(&root)?)?;
    if !root.meshes.is_empty() {
        doc["extensionsUsed"] = serde_json::json!([UNLIT]);
        doc["materials"] = serde_json::json!([unlit_material(name, color)]);
        doc["meshes"][0]["primitives"][0]["material"] = serde_json::json!(0);
    }
    let mut json_chunk = serde_json::to_vec(&doc)?;
    pad_to_4(&mut json_chunk, b' ');

    let mut total = 12 + 8 + json_chunk.len();
    if !bin.is_empty() {
        total += 8 + bin.len();
    }
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(CHUNK_JSON);
    out.extend_from_slice(&json_chunk);
    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(CHUNK_BIN);
        out.extend_from_slice(&bin);
    }
    debug!(
        vertices = vertex_count,
        triangles = mesh.triangle_count(),
        segments = mesh.segment_count(),
        size = out.len(),
        "GLB written"
    );
    Ok(out)
}

/// Encode the first part of a model as GLB.
pub fn model_to_glb(model: &ModelDescription) -> Result<Vec<u8>, ExportError> {
    let part = model.parts.first().ok_or(ExportError::NoParts)?;
    write_glb(&part.shape, &model.name, &part.color)
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ExportError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| ExportError::malformed(format!("truncated at byte {}", offset)))
}

struct Chunks<'a> {
    json: &'a [u8],
    bin: &'a [u8],
}

fn split_chunks(bytes: &[u8]) -> Result<Chunks<'_>, ExportError> {
    if bytes.len() < 20 || &bytes[0..4] != GLB_MAGIC {
        return Err(ExportError::malformed("missing glTF header"));
    }
    let version = read_u32(bytes, 4)?;
    if version != GLB_VERSION {
        return Err(ExportError::malformed(format!("unsupported version {}", version)));
    }
    let total = read_u32(bytes, 8)? as usize;
    if total != bytes.len() {
        return Err(ExportError::malformed(format!(
            "declared length {} but got {} bytes",
            total,
            bytes.len()
        )));
    }

    let json_len = read_u32(bytes, 12)? as usize;
    if &bytes[16..20] != CHUNK_JSON {
        return Err(ExportError::malformed("first chunk is not JSON"));
    }
    let json = bytes
        .get(20..20 + json_len)
        .ok_or_else(|| ExportError::malformed("JSON chunk overruns file"))?;

    let mut bin: &[u8] = &[];
    let next = 20 + json_len;
    if next < bytes.len() {
        let bin_len = read_u32(bytes, next)? as usize;
        if bytes.get(next + 4..next + 8) != Some(&CHUNK_BIN[..]) {
            return Err(ExportError::malformed("second chunk is not BIN"));
        }
        bin = bytes
            .get(next + 8..next + 8 + bin_len)
            .ok_or_else(|| ExportError::malformed("BIN chunk overruns file"))?;
    }
    Ok(Chunks { json, bin })
}

fn component_width(component_type: &Checked<GenericComponentType>) -> Option<usize> {
    match component_type {
        Valid(GenericComponentType(ComponentType::U16)) => Some(2),
        Valid(GenericComponentType(ComponentType::U32 | ComponentType::F32)) => Some(4),
        _ => None,
    }
}

fn accessor_bytes<'a, 'd>(
    root: &'d json::Root,
    bin: &'a [u8],
    index: usize,
    expect: Type,
) -> Result<(&'a [u8], &'d json::Accessor), ExportError> {
    let accessor = root
        .accessors
        .get(index)
        .ok_or_else(|| ExportError::malformed(format!("no accessor {}", index)))?;
    let components = match (&accessor.type_, expect) {
        (Valid(Type::Vec3), Type::Vec3) => 3,
        (Valid(Type::Scalar), Type::Scalar) => 1,
        _ => {
            return Err(ExportError::malformed(format!(
                "accessor {} has the wrong element type",
                index
            )))
        }
    };
    let view_index = accessor
        .buffer_view
        .as_ref()
        .ok_or_else(|| ExportError::malformed(format!("accessor {} has no buffer view", index)))?
        .value();
    let view = root
        .buffer_views
        .get(view_index)
        .ok_or_else(|| ExportError::malformed(format!("no buffer view {}", view_index)))?;
    let width = component_width(&accessor.component_type).ok_or_else(|| {
        ExportError::malformed(format!("accessor {} has an unsupported component type", index))
    })?;
    let start = (view.byte_offset.as_ref().map_or(0, |o| o.0)
        + accessor.byte_offset.as_ref().map_or(0, |o| o.0))
        as usize;
    let len = accessor.count.0 as usize * components * width;
    if len as u64 > view.byte_length.0 {
        return Err(ExportError::malformed(format!("accessor {} overruns its view", index)));
    }
    let data = bin
        .get(start..start + len)
        .ok_or_else(|| ExportError::malformed(format!("accessor {} overruns buffer", index)))?;
    Ok((data, accessor))
}

fn read_floats(root: &json::Root, bin: &[u8], index: usize) -> Result<Vec<f32>, ExportError> {
    let (data, accessor) = accessor_bytes(root, bin, index, Type::Vec3)?;
    if !matches!(
        accessor.component_type,
        Valid(GenericComponentType(ComponentType::F32))
    ) {
        return Err(ExportError::malformed(format!("accessor {} is not float", index)));
    }
    Ok(data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn read_indices(root: &json::Root, bin: &[u8], index: usize) -> Result<Vec<u32>, ExportError> {
    let (data, accessor) = accessor_bytes(root, bin, index, Type::Scalar)?;
    match accessor.component_type {
        Valid(GenericComponentType(ComponentType::U16)) => Ok(data
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as u32)
            .collect()),
        Valid(GenericComponentType(ComponentType::U32)) => Ok(data
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()),
        _ => Err(ExportError::malformed(format!(
            "index accessor {} is not u16 or u32",
            index
        ))),
    }
}

fn edge_accessor(root: &json::Root) -> Result<Option<usize>, ExportError> {
    let Some(raw) = root.extras.as_ref() else {
        return Ok(None);
    };
    let extras: Value = serde_json::from_str(raw.get())?;
    Ok(extras
        .get("edgeAccessor")
        .and_then(Value::as_u64)
        .map(|i| i as usize))
}

/// Decode a GLB written by [`write_glb`] back into a mesh.
///
/// Reads the first primitive of the first mesh and the edge accessor named
/// in `extras.edgeAccessor`.
pub fn read_glb(bytes: &[u8]) -> Result<RenderMesh, ExportError> {
    let chunks = split_chunks(bytes)?;
    let root = json::Root::from_slice(chunks.json)
        .map_err(|e| ExportError::malformed(format!("invalid glTF JSON: {}", e)))?;
    let mut mesh = RenderMesh::new();

    if let Some(primitive) = root.meshes.first().and_then(|m| m.primitives.first()) {
        if !matches!(primitive.mode, Valid(Mode::Triangles)) {
            return Err(ExportError::malformed("primitive mode is not triangles"));
        }
        let position = primitive
            .attributes
            .get(&Valid(Semantic::Positions))
            .ok_or_else(|| ExportError::malformed("primitive has no POSITION"))?;
        mesh.vertices = read_floats(&root, chunks.bin, position.value())?;
        if let Some(normal) = primitive.attributes.get(&Valid(Semantic::Normals)) {
            mesh.normals = read_floats(&root, chunks.bin, normal.value())?;
        }
        if let Some(indices) = &primitive.indices {
            mesh.triangles = read_indices(&root, chunks.bin, indices.value())?;
        }
    }
    if let Some(edges) = edge_accessor(&root)? {
        mesh.edge_segments = read_floats(&root, chunks.bin, edges)?;
    }

    let vertex_count = mesh.vertex_count();
    if let Some(&index) = mesh.triangles.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ExportError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> RenderMesh {
        RenderMesh {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.5],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            triangles: vec![0, 1, 2],
            edge_segments: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }

    fn json_of(glb: &[u8]) -> Value {
        let chunks = split_chunks(glb).unwrap();
        serde_json::from_slice(chunks.json).unwrap()
    }

    #[test]
    fn test_header_and_chunks_aligned() {
        let glb = write_glb(&triangle(), "tri", "#ff0000").unwrap();
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(read_u32(&glb, 4).unwrap(), 2);
        assert_eq!(read_u32(&glb, 8).unwrap() as usize, glb.len());
        let json_len = read_u32(&glb, 12).unwrap() as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(&glb[16..20], b"JSON");
        assert_eq!(&glb[20 + json_len + 4..20 + json_len + 8], b"BIN\0");
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_small_mesh_uses_u16_indices() {
        let glb = write_glb(&triangle(), "tri", "#999999").unwrap();
        let json = json_of(&glb);
        assert_eq!(json["accessors"][0]["componentType"], ComponentType::U16.as_gl_enum());
        assert_eq!(json["accessors"][0]["type"], "SCALAR");
        assert_eq!(json["bufferViews"][0]["byteLength"], 6);
        // Positions start on the next 4-byte boundary.
        assert_eq!(json["bufferViews"][1]["byteOffset"], 8);
        assert_eq!(json["accessors"][1]["max"], serde_json::json!([1.0, 2.0, 0.5]));
        assert_eq!(json["accessors"][1]["min"], serde_json::json!([0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_large_mesh_uses_u32_indices() {
        let n = u16::MAX as usize + 2;
        let mesh = RenderMesh {
            vertices: vec![0.0; n * 3],
            normals: vec![0.0; n * 3],
            triangles: vec![0, 1, (n - 1) as u32],
            edge_segments: vec![],
        };
        let glb = write_glb(&mesh, "big", "#999999").unwrap();
        assert_eq!(
            json_of(&glb)["accessors"][0]["componentType"],
            ComponentType::U32.as_gl_enum()
        );
        assert_eq!(read_glb(&glb).unwrap(), mesh);
    }

    #[test]
    fn test_edges_are_an_orphan_accessor() {
        let glb = write_glb(&triangle(), "tri", "#999999").unwrap();
        let json = json_of(&glb);
        let edge = json["extras"]["edgeAccessor"].as_u64().unwrap();
        assert_eq!(edge, 3);
        assert_eq!(json["accessors"][3]["count"], 2);
        assert!(json["bufferViews"][3].get("target").is_none());
        let attributes = &json["meshes"][0]["primitives"][0]["attributes"];
        assert!(attributes
            .as_object()
            .unwrap()
            .values()
            .all(|v| v.as_u64() != Some(edge)));
    }

    #[test]
    fn test_material_is_unlit_with_part_color() {
        let glb = write_glb(&triangle(), "tri", "#ff0000").unwrap();
        let json = json_of(&glb);
        assert_eq!(json["extensionsUsed"], serde_json::json!(["KHR_materials_unlit"]));
        let material = &json["materials"][0];
        assert_eq!(
            material["pbrMetallicRoughness"]["baseColorFactor"],
            serde_json::json!([1.0, 0.0, 0.0, 1.0])
        );
        assert_eq!(material["pbrMetallicRoughness"]["metallicFactor"], 0.0);
        assert_eq!(material["pbrMetallicRoughness"]["roughnessFactor"], 1.0);
        assert_eq!(material["alphaMode"], "OPAQUE");
        assert_eq!(material["doubleSided"], true);
        assert!(material["extensions"]["KHR_materials_unlit"].is_object());
    }

    #[test]
    fn test_document_parses_as_gltf_root() {
        let glb = write_glb(&triangle(), "tri", "#999999").unwrap();
        let root = json::Root::from_slice(split_chunks(&glb).unwrap().json).unwrap();
        assert_eq!(root.asset.version, "2.0");
        assert_eq!(root.accessors.len(), 4);
        assert_eq!(root.buffer_views.len(), 4);
        assert_eq!(root.buffers.len(), 1);
        let primitive = &root.meshes[0].primitives[0];
        assert!(matches!(primitive.mode, Valid(Mode::Triangles)));
        assert_eq!(primitive.attributes[&Valid(Semantic::Positions)].value(), 1);
        assert_eq!(primitive.attributes[&Valid(Semantic::Normals)].value(), 2);
        assert_eq!(edge_accessor(&root).unwrap(), Some(3));
        for view in &root.buffer_views {
            assert_eq!(view.byte_offset.as_ref().map_or(0, |o| o.0) % 4, 0);
        }
    }

    #[test]
    fn test_read_back_is_identical() {
        let mesh = triangle();
        let glb = write_glb(&mesh, "tri", "#999999").unwrap();
        assert_eq!(read_glb(&glb).unwrap(), mesh);
    }

    #[test]
    fn test_empty_mesh_has_no_buffer() {
        let glb = write_glb(&RenderMesh::new(), "empty", "#999999").unwrap();
        let json = json_of(&glb);
        assert!(json.get("buffers").is_none());
        assert!(json.get("meshes").is_none());
        assert!(json["scenes"][0]["nodes"]
            .as_array()
            .map_or(true, |nodes| nodes.is_empty()));
        assert!(json.get("materials").is_none());
        assert_eq!(read_u32(&glb, 8).unwrap() as usize, glb.len());
        assert!(read_glb(&glb).unwrap().is_empty());
    }

    #[test]
    fn test_edges_without_faces() {
        let mesh = RenderMesh {
            edge_segments: vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            ..RenderMesh::new()
        };
        let glb = write_glb(&mesh, "wire", "#999999").unwrap();
        assert_eq!(json_of(&glb)["extras"]["edgeAccessor"], 0);
        assert_eq!(read_glb(&glb).unwrap(), mesh);
    }

    #[test]
    fn test_bad_index_rejected_on_write() {
        let mut mesh = triangle();
        mesh.triangles[2] = 3;
        assert!(matches!(
            write_glb(&mesh, "bad", "#999999"),
            Err(ExportError::IndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_malformed_input_rejected() {
        assert!(matches!(read_glb(b"nope"), Err(ExportError::MalformedGlb { .. })));
        let mut glb = write_glb(&triangle(), "tri", "#999999").unwrap();
        glb.truncate(glb.len() - 4);
        assert!(matches!(read_glb(&glb), Err(ExportError::MalformedGlb { .. })));
        let mut glb = write_glb(&triangle(), "tri", "#999999").unwrap();
        glb[4] = 1;
        assert!(matches!(read_glb(&glb), Err(ExportError::MalformedGlb { .. })));
    }
}
