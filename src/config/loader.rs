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

//! Configuration loading and saving.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::Config;
use super::utils::expand_tilde;

/// Default configuration path, before tilde expansion.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/bdeploy/config.yaml";

impl Config {
    /// Load configuration from a file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read configuration file at {}",
                    expanded_path.display()
                )
            })?;

        let config: Config = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}. Please check the YAML syntax is valid.",
                expanded_path.display()
            )
        })?;

        tracing::debug!(
            "Loaded {} site(s) from {}",
            config.sites.len(),
            expanded_path.display()
        );
        Ok(config)
    }

    /// Save the configuration to a file, creating parent directories.
    ///
    /// On Unix the file is written with mode 0600 since it holds encrypted
    /// credentials.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let expanded_path = expand_tilde(path);

        if let Some(parent) = expanded_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory {parent:?}"))?;
            }
        }

        let yaml =
            serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")?;

        fs::write(&expanded_path, yaml)
            .await
            .with_context(|| format!("Failed to write configuration to {expanded_path:?}"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&expanded_path, std::fs::Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("Failed to restrict permissions on {expanded_path:?}"))?;
        }

        Ok(())
    }

    /// Path the configuration is read from and written back to.
    ///
    /// An explicit path always wins. Otherwise `./bdeploy.yaml` is used when
    /// present, then the per-user config directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return expand_tilde(path);
        }

        let current_dir_config = PathBuf::from("bdeploy.yaml");
        if current_dir_config.exists() {
            tracing::debug!("Found bdeploy.yaml in current directory");
            return current_dir_config;
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", "bdeploy") {
            return proj_dirs.config_dir().join("config.yaml");
        }
        expand_tilde(Path::new(DEFAULT_CONFIG_PATH))
    }
}
