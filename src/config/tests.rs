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

use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use super::types::Config;
use super::utils::expand_tilde;
use crate::site::SiteDraft;
use crate::transport::host_key::StrictHostKeyChecking;
use crate::vault::CredentialVault;

#[test]
fn test_expand_tilde() {
    let original_home = std::env::var("HOME").ok();
    std::env::set_var("HOME", "/home/user");

    let expanded = expand_tilde(Path::new("~/.config/bdeploy/config.yaml"));
    let untouched = expand_tilde(Path::new("/etc/bdeploy.yaml"));

    if let Some(home) = original_home {
        std::env::set_var("HOME", home);
    } else {
        std::env::remove_var("HOME");
    }

    assert_eq!(
        expanded,
        PathBuf::from("/home/user/.config/bdeploy/config.yaml")
    );
    assert_eq!(untouched, PathBuf::from("/etc/bdeploy.yaml"));
}

#[test]
fn test_config_parsing() {
    let yaml = r#"
defaults:
  plugins_dir: /srv/plugins
  connect_timeout: 30
  parallel: 4
  strict_host_key_checking: "yes"

sites:
  - id: 1
    name: staging
    url: https://staging.example.com
    host: staging.example.com
    username: deploy
    secret_ciphertext: ""
    remote_base_path: /wp-content/plugins
    created_at: 2025-01-01T00:00:00Z
    updated_at: 2025-01-02T00:00:00Z
  - id: 2
    name: production
    url: https://www.example.com
    host: sftp.example.com
    port: 22
    username: deploy
    created_at: 2025-01-01T00:00:00Z
    updated_at: 2025-01-01T00:00:00Z
"#;

    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.defaults.plugins_dir, "/srv/plugins");
    assert_eq!(
        config.defaults.strict_host_key_checking,
        StrictHostKeyChecking::Yes
    );

    let options = config.deploy_options();
    assert_eq!(options.connect_timeout, Duration::from_secs(30));
    assert_eq!(options.max_parallel, 4);

    assert_eq!(config.sites.len(), 2);
    assert_eq!(config.sites[0].port, 21);
    assert_eq!(config.sites[1].remote_base_path, "/wp-content/plugins/");

    let store = config.site_store();
    let staging = store.targets().into_iter().find(|t| t.id == 1).unwrap();
    assert_eq!(staging.remote_base_path, "/wp-content/plugins/");
}

#[test]
fn test_empty_config_uses_defaults() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.defaults.plugins_dir, "./plugins");
    assert_eq!(config.defaults.connect_timeout, 10);
    assert_eq!(config.defaults.parallel, 1);
    assert_eq!(
        config.defaults.strict_host_key_checking,
        StrictHostKeyChecking::AcceptNew
    );
    assert!(config.sites.is_empty());
}

#[test]
fn test_parallel_zero_is_sequential() {
    let config: Config = serde_yaml::from_str("defaults:\n  parallel: 0\n").unwrap();
    assert_eq!(config.deploy_options().max_parallel, 1);
}

#[test]
fn test_explicit_path_wins() {
    let path = Config::resolve_path(Some(Path::new("/tmp/custom.yaml")));
    assert_eq!(path, PathBuf::from("/tmp/custom.yaml"));
}

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load(&tmp.path().join("absent.yaml")).await.unwrap();
    assert_eq!(config, Config::default());
}

#[tokio::test]
async fn test_save_and_reload_sites() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("config.yaml");
    let vault = CredentialVault::from_secret("test-key");

    let mut store = crate::site::SiteStore::new();
    store
        .save(
            SiteDraft {
                name: "staging".into(),
                url: "https://staging.example.com".into(),
                host: "staging.example.com".into(),
                username: "deploy".into(),
                secret: String::from("hunter2").into(),
                ..SiteDraft::default()
            },
            &vault,
        )
        .unwrap();

    let mut config = Config::default();
    config.set_sites(&store);
    config.save(&path).await.unwrap();

    let reloaded = Config::load(&path).await.unwrap();
    assert_eq!(reloaded, config);
    let secret = vault
        .decrypt(&reloaded.sites[0].secret_ciphertext)
        .unwrap();
    assert_eq!(secret.as_str(), "hunter2");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_invalid_yaml_is_reported() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, "sites: [unterminated").unwrap();
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse YAML"));
}
