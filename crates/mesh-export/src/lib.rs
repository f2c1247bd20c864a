//! Serialized forms of a converted model: viewer JSON, GLB and STL, plus
//! content hashing and a content-addressed artifact cache.

pub mod cache;
pub mod content_hash;
pub mod errors;
pub mod glb;
pub mod json;
pub mod stl;

pub use cache::ArtifactCache;
pub use content_hash::{content_hash, verify_artifact, CompletionStatus};
pub use errors::ExportError;
pub use glb::{model_to_glb, read_glb, write_glb, GLB_MAGIC};
pub use json::{load_model, save_model};
pub use stl::{export_ascii_stl, export_binary_stl};
