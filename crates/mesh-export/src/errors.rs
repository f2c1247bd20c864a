/// Errors while writing, reading or verifying an exported model.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index {index} out of range (vertex count = {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("model has no parts")]
    NoParts,

    #[error("model version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("malformed GLB: {reason}")]
    MalformedGlb { reason: String },

    #[error("artifact hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("conversion incomplete ({progress}%)")]
    Incomplete { progress: f64 },
}

impl ExportError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ExportError::MalformedGlb {
            reason: reason.into(),
        }
    }
}
