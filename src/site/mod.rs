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

//! Deployment targets and the repository the engine reads them from.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::{SiteDraft, SiteError, SiteStore};

/// Identifier of a persisted target.
pub type TargetId = u64;

/// Port used when a site record does not name one.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Base path used when a site record leaves it empty.
pub const DEFAULT_REMOTE_PATH: &str = "/wp-content/plugins/";

/// A remote host that artifacts are deployed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,

    /// Display name
    pub name: String,

    /// Site URL, informational only
    pub url: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    /// Vault blob; empty when no secret is stored
    #[serde(default)]
    pub secret_ciphertext: String,

    /// Always ends with exactly one `/`
    #[serde(default = "default_remote_path")]
    pub remote_base_path: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    /// Remote path of the uploaded archive for `artifact_name`.
    pub fn remote_archive_path(&self, artifact_name: &str) -> String {
        format!("{}{}.zip", self.remote_base_path, artifact_name)
    }

    /// Remote directory that holds the extracted `artifact_name`.
    pub fn remote_artifact_dir(&self, artifact_name: &str) -> String {
        format!("{}{}", self.remote_base_path, artifact_name)
    }
}

/// Read-only view of persisted targets used by the deployment engine.
pub trait SiteRepository: Send + Sync {
    fn get_target(&self, id: TargetId) -> Option<Target>;
}

/// Normalize a remote base path so it ends with exactly one separator.
///
/// An empty path becomes [`DEFAULT_REMOTE_PATH`].
pub fn normalize_remote_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return DEFAULT_REMOTE_PATH.to_string();
    }
    format!("{}/", trimmed.trim_end_matches('/'))
}

fn default_port() -> u16 {
    DEFAULT_FTP_PORT
}

fn default_remote_path() -> String {
    DEFAULT_REMOTE_PATH.to_string()
}
