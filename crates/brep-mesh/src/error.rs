use kernel_adapter::KernelError;

/// Errors that abort a whole conversion. Per-face and per-edge problems are
/// recovered inside the extractors and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid tessellation parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("conversion superseded by a newer request")]
    Superseded,

    #[error("mesh exceeds {limit} vertices")]
    MeshTooLarge { limit: u64 },

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl ConvertError {
    /// Short status line for end users.
    pub fn status(&self) -> String {
        match self {
            ConvertError::Kernel(KernelError::KernelUnavailable { .. }) => {
                "geometry kernel could not be started".to_string()
            }
            ConvertError::Kernel(KernelError::InvalidShape { .. }) => {
                "shape could not be loaded".to_string()
            }
            ConvertError::Superseded => "cancelled".to_string(),
            other => other.to_string(),
        }
    }
}
