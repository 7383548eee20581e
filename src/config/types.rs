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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::utils::expand_tilde;
use crate::deploy::DeployOptions;
use crate::site::{SiteStore, Target};
use crate::transport::host_key::StrictHostKeyChecking;

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Persisted deployment targets.
    #[serde(default)]
    pub sites: Vec<Target>,
}

/// Global default settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Defaults {
    /// Directory holding one subdirectory per deployable plugin.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: String,

    /// Seconds allowed for connecting and logging in.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Targets processed at the same time. 1 keeps the batch sequential.
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    #[serde(default)]
    pub strict_host_key_checking: StrictHostKeyChecking,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            plugins_dir: default_plugins_dir(),
            connect_timeout: default_connect_timeout(),
            parallel: default_parallel(),
            strict_host_key_checking: StrictHostKeyChecking::default(),
        }
    }
}

impl Config {
    /// Site records as a store, with base paths normalized.
    pub fn site_store(&self) -> SiteStore {
        SiteStore::from_targets(self.sites.iter().cloned())
    }

    /// Replace the persisted site records with the contents of `store`.
    pub fn set_sites(&mut self, store: &SiteStore) {
        self.sites = store.targets();
    }

    pub fn plugins_dir(&self) -> PathBuf {
        expand_tilde(std::path::Path::new(&self.defaults.plugins_dir))
    }

    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            connect_timeout: Duration::from_secs(self.defaults.connect_timeout),
            max_parallel: self.defaults.parallel.max(1),
        }
    }
}

pub(super) fn default_plugins_dir() -> String {
    "./plugins".to_string()
}

pub(super) fn default_connect_timeout() -> u64 {
    10
}

pub(super) fn default_parallel() -> usize {
    1
}
