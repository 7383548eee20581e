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

//! Resolution of artifact names to local directories.

use crate::security::validate_artifact_name;
use std::path::{Path, PathBuf};

/// Maps an artifact name to the local directory that holds it.
pub trait ArtifactProvider: Send + Sync {
    /// Returns `None` when the name is unknown or unsafe.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Artifacts are the immediate subdirectories of a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactProvider {
    root: PathBuf,
}

impl DirectoryArtifactProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all artifact directories under the root, sorted.
    pub fn available(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_artifact_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl ArtifactProvider for DirectoryArtifactProvider {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if let Err(e) = validate_artifact_name(name) {
            tracing::warn!("Rejected artifact name: {}", e);
            return None;
        }
        Some(self.root.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_and_list() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("demo")).unwrap();
        std::fs::create_dir(root.path().join("alpha")).unwrap();
        std::fs::write(root.path().join("notes.txt"), b"x").unwrap();

        let provider = DirectoryArtifactProvider::new(root.path());
        assert_eq!(provider.available().unwrap(), vec!["alpha", "demo"]);
        assert_eq!(provider.resolve("demo"), Some(root.path().join("demo")));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let provider = DirectoryArtifactProvider::new("/srv/plugins");
        assert_eq!(provider.resolve("../etc"), None);
        assert_eq!(provider.resolve(".."), None);
        assert_eq!(provider.resolve(""), None);
    }
}
