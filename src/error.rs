// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error taxonomy for the deployment engine.
//!
//! Every variant is caught at the smallest unit of work (one target or one
//! artifact) and turned into a failed [`DeploymentResult`](crate::deploy::DeploymentResult);
//! none of them aborts a batch.

use thiserror::Error;

/// Error raised while deploying an artifact to a target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Missing transport capability, archive creation failure, unusable credentials.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote host could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The remote host rejected the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A remote directory could not be entered, listed or created.
    #[error("Remote path error: {0}")]
    Path(String),

    /// Upload or download failure.
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Corrupt or unreadable archive, or an entry that could not be written.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A local artifact directory or a target record is missing.
    #[error("{0}")]
    NotFound(String),
}

impl DeployError {
    /// Short machine-friendly name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Configuration(_) => "configuration",
            DeployError::Connection(_) => "connection",
            DeployError::Authentication(_) => "authentication",
            DeployError::Path(_) => "path",
            DeployError::Transfer(_) => "transfer",
            DeployError::Extraction(_) => "extraction",
            DeployError::NotFound(_) => "not_found",
        }
    }

    pub(crate) fn target_not_found() -> Self {
        DeployError::NotFound("Target not found".to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_is_bare() {
        let err = DeployError::target_not_found();
        assert_eq!(err.to_string(), "Target not found");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_category_prefix() {
        let err = DeployError::Transfer("Failed to upload file: a.php".to_string());
        assert_eq!(err.to_string(), "Transfer failed: Failed to upload file: a.php");
        assert_eq!(err.kind(), "transfer");
    }
}
