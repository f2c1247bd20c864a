//! SHA-256 content hashes for artifacts and acceptance of remotely produced
//! artifacts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::ExportError;

/// Lowercase hex SHA-256 of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check `data` against an expected hex digest (case-insensitive).
pub fn verify_artifact(data: &[u8], expected: &str) -> Result<(), ExportError> {
    let actual = content_hash(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(ExportError::HashMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Completion report from a remote conversion worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    /// Percent complete, 0 to 100.
    pub progress: f64,
    /// Set when the worker stopped waiting, whatever `progress` says.
    #[serde(default)]
    pub timed_out: bool,
    /// Expected SHA-256 of the finished artifact.
    pub sha256: String,
}

impl CompletionStatus {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100.0
    }

    /// Accept `artifact` as the finished result.
    ///
    /// Requires the reported progress to have reached 100 and the artifact
    /// to hash to `sha256`. A timeout flag never substitutes for either.
    pub fn accept(&self, artifact: &[u8]) -> Result<(), ExportError> {
        if !self.is_complete() {
            debug!(progress = self.progress, "completion rejected: incomplete");
            return Err(ExportError::Incomplete {
                progress: self.progress,
            });
        }
        verify_artifact(artifact, &self.sha256).map_err(|e| {
            warn!(timed_out = self.timed_out, error = %e, "completion rejected");
            e
        })
    }
}
