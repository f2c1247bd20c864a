//! B-Rep to render-mesh conversion.
//!
//! [`MeshAssembler`] drives one conversion: tessellate the shape, walk its
//! faces ([`face_mesh`]) and edges ([`edge_lines`]), finalize the bounding box
//! and package a [`mesh_types::ModelDescription`] with a single `body` part.

pub mod assembler;
pub mod bounding_box;
pub mod deflection;
pub mod edge_lines;
pub mod error;
pub mod face_mesh;
pub mod params;

pub use assembler::{MeshAssembler, BODY_PART_NAME, DEFAULT_COLOR, DEFAULT_MODEL_NAME};
pub use bounding_box::BoundingBoxAccumulator;
pub use deflection::sample_curve;
pub use edge_lines::{extract_edges, EdgeLineStats};
pub use error::ConvertError;
pub use face_mesh::{extract_faces, FaceMeshStats, FALLBACK_NORMAL};
pub use params::TessellationParams;
