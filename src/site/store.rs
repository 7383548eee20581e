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

//! In-memory site store backed by the configuration file.
//!
//! Saving a record enforces the secret update-in-place rule: an update that
//! supplies an empty secret keeps the stored blob untouched, while creating a
//! record without a secret is rejected.

use super::{
    normalize_remote_path, SiteRepository, Target, TargetId, DEFAULT_FTP_PORT, DEFAULT_REMOTE_PATH,
};
use crate::security::{validate_hostname, validate_remote_path, validate_username};
use crate::vault::CredentialVault;
use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SiteError {
    #[error("Invalid site record: {0}")]
    Validation(String),

    #[error("A password is required when adding a site")]
    EmptySecret,

    #[error("Site not found: {0}")]
    NotFound(TargetId),
}

/// Fields supplied when creating (`id == None`) or updating a site.
#[derive(Default)]
pub struct SiteDraft {
    pub id: Option<TargetId>,
    pub name: String,
    pub url: String,
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    /// Plaintext secret; empty on update means "keep the stored one"
    pub secret: Zeroizing<String>,
    pub remote_base_path: String,
}

#[derive(Debug, Default, Clone)]
pub struct SiteStore {
    records: BTreeMap<TargetId, Target>,
}

impl SiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_targets(targets: impl IntoIterator<Item = Target>) -> Self {
        Self {
            records: targets
                .into_iter()
                .map(|mut t| {
                    t.remote_base_path = normalize_remote_path(&t.remote_base_path);
                    (t.id, t)
                })
                .collect(),
        }
    }

    /// All records ordered by id, for persisting.
    pub fn targets(&self) -> Vec<Target> {
        self.records.values().cloned().collect()
    }

    /// All records ordered by display name.
    pub fn list(&self) -> Vec<&Target> {
        let mut targets: Vec<&Target> = self.records.values().collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        targets
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Create or update a record and return its id.
    ///
    /// Nothing is stored when validation fails.
    pub fn save(&mut self, draft: SiteDraft, vault: &CredentialVault) -> Result<TargetId, SiteError> {
        let name = required("name", &draft.name)?;
        let url = required("url", &draft.url)?;
        let host = required("host", &draft.host)?;
        let username = required("username", &draft.username)?;

        validate_hostname(&host).map_err(|e| SiteError::Validation(e.to_string()))?;
        validate_username(&username).map_err(|e| SiteError::Validation(e.to_string()))?;
        validate_remote_path(draft.remote_base_path.trim())
            .map_err(|e| SiteError::Validation(e.to_string()))?;

        if draft.port == Some(0) {
            return Err(SiteError::Validation("port cannot be 0".to_string()));
        }
        // Unset on update keeps the stored value, unset on create takes the default
        let remote_base_path = (!draft.remote_base_path.trim().is_empty())
            .then(|| normalize_remote_path(&draft.remote_base_path));
        let now = Utc::now();

        match draft.id {
            Some(id) => {
                let existing = self.records.get_mut(&id).ok_or(SiteError::NotFound(id))?;
                if !draft.secret.is_empty() {
                    existing.secret_ciphertext = vault.encrypt(&draft.secret);
                }
                existing.name = name;
                existing.url = url;
                existing.host = host;
                existing.port = draft.port.unwrap_or(existing.port);
                existing.username = username;
                if let Some(path) = remote_base_path {
                    existing.remote_base_path = path;
                }
                existing.updated_at = now;
                tracing::debug!("Updated site {} ({})", id, existing.name);
                Ok(id)
            }
            None => {
                if draft.secret.is_empty() {
                    return Err(SiteError::EmptySecret);
                }
                let id = self.records.keys().next_back().map_or(1, |last| last + 1);
                let target = Target {
                    id,
                    name,
                    url,
                    host,
                    port: draft.port.unwrap_or(DEFAULT_FTP_PORT),
                    username,
                    secret_ciphertext: vault.encrypt(&draft.secret),
                    remote_base_path: remote_base_path
                        .unwrap_or_else(|| DEFAULT_REMOTE_PATH.to_string()),
                    created_at: now,
                    updated_at: now,
                };
                tracing::debug!("Added site {} ({})", id, target.name);
                self.records.insert(id, target);
                Ok(id)
            }
        }
    }

    pub fn remove(&mut self, id: TargetId) -> Result<Target, SiteError> {
        self.records.remove(&id).ok_or(SiteError::NotFound(id))
    }
}

impl SiteRepository for SiteStore {
    fn get_target(&self, id: TargetId) -> Option<Target> {
        self.records.get(&id).cloned()
    }
}

fn required(field: &str, value: &str) -> Result<String, SiteError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SiteError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}
