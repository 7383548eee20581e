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

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;
use zeroize::Zeroizing;

use crate::cli::SiteArgs;
use crate::config::Config;
use crate::site::{SiteDraft, SiteError, Target, TargetId};
use crate::transport::TransportKind;
use crate::ui::OutputFormatter;
use crate::vault::CredentialVault;

/// Site record as shown to users. The stored secret is left out.
#[derive(Debug, Serialize)]
pub struct SiteView<'a> {
    pub id: TargetId,
    pub name: &'a str,
    pub url: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub protocol: String,
    pub username: &'a str,
    pub remote_base_path: &'a str,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Target> for SiteView<'a> {
    fn from(target: &'a Target) -> Self {
        Self {
            id: target.id,
            name: &target.name,
            url: &target.url,
            host: &target.host,
            port: target.port,
            protocol: TransportKind::select(target.port).to_string(),
            username: &target.username,
            remote_base_path: &target.remote_base_path,
            has_password: !target.secret_ciphertext.is_empty(),
            created_at: target.created_at,
            updated_at: target.updated_at,
        }
    }
}

pub fn list_sites(config: &Config, json: bool) -> Result<()> {
    let store = config.site_store();
    let sites = store.list();

    if json {
        let views: Vec<SiteView> = sites.iter().map(|t| SiteView::from(*t)).collect();
        let rendered = serde_json::to_string_pretty(&views).context("Failed to serialize sites")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("\n{} {}\n", "▶".cyan(), "Registered sites".bold());
    print!("{}", OutputFormatter::format_site_table(&sites));
    println!();
    Ok(())
}

pub async fn add_site(
    config: &mut Config,
    config_path: &Path,
    vault: &CredentialVault,
    args: &SiteArgs,
) -> Result<TargetId> {
    let secret = read_password(args, true)?;
    let draft = build_draft(None, args, secret);

    let mut store = config.site_store();
    let id = store.save(draft, vault)?;
    config.set_sites(&store);
    config.save(config_path).await?;

    println!("{} Site #{} added", "✓".green(), id);
    Ok(id)
}

pub async fn update_site(
    config: &mut Config,
    config_path: &Path,
    vault: &CredentialVault,
    id: TargetId,
    args: &SiteArgs,
) -> Result<()> {
    let mut store = config.site_store();
    let existing = store
        .targets()
        .into_iter()
        .find(|t| t.id == id)
        .ok_or(SiteError::NotFound(id))?;

    let secret = read_password(args, false)?;
    store.save(build_draft(Some(&existing), args, secret), vault)?;
    config.set_sites(&store);
    config.save(config_path).await?;

    println!("{} Site #{} updated", "✓".green(), id);
    Ok(())
}

pub async fn remove_site(config: &mut Config, config_path: &Path, id: TargetId) -> Result<()> {
    let mut store = config.site_store();
    let removed = store.remove(id)?;
    config.set_sites(&store);
    config.save(config_path).await?;

    println!("{} Site #{} ({}) removed", "✓".green(), id, removed.name);
    Ok(())
}

/// Merge command-line fields over an existing record, if any.
///
/// An empty `secret` on update keeps the stored password.
pub fn build_draft(
    existing: Option<&Target>,
    args: &SiteArgs,
    secret: Zeroizing<String>,
) -> SiteDraft {
    let pick = |value: &Option<String>, current: Option<&String>| {
        value
            .clone()
            .or_else(|| current.cloned())
            .unwrap_or_default()
    };

    SiteDraft {
        id: existing.map(|t| t.id),
        name: pick(&args.name, existing.map(|t| &t.name)),
        url: pick(&args.url, existing.map(|t| &t.url)),
        host: pick(&args.host, existing.map(|t| &t.host)),
        port: args.port.or(existing.map(|t| t.port)),
        username: pick(&args.username, existing.map(|t| &t.username)),
        secret,
        remote_base_path: pick(&args.remote_path, existing.map(|t| &t.remote_base_path)),
    }
}

fn read_password(args: &SiteArgs, required: bool) -> Result<Zeroizing<String>> {
    if let Some(var) = &args.password_env {
        let value = std::env::var(var)
            .with_context(|| format!("Environment variable {var} is not set"))?;
        return Ok(Zeroizing::new(value));
    }

    if args.password || required {
        let password = rpassword::prompt_password("Site password: ")
            .context("Failed to read password")?;
        return Ok(Zeroizing::new(password));
    }

    Ok(Zeroizing::new(String::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> Target {
        let now = Utc::now();
        Target {
            id: 5,
            name: "staging".to_string(),
            url: "https://staging.example.com".to_string(),
            host: "ftp.example.com".to_string(),
            port: 21,
            username: "deploy".to_string(),
            secret_ciphertext: "blob".to_string(),
            remote_base_path: "/wp-content/plugins/".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_draft_keeps_unset_fields() {
        let target = existing();
        let args = SiteArgs {
            port: Some(22),
            name: Some("staging-sftp".to_string()),
            ..SiteArgs::default()
        };
        let draft = build_draft(Some(&target), &args, Zeroizing::new(String::new()));
        assert_eq!(draft.id, Some(5));
        assert_eq!(draft.name, "staging-sftp");
        assert_eq!(draft.host, "ftp.example.com");
        assert_eq!(draft.port, Some(22));
        assert_eq!(draft.remote_base_path, "/wp-content/plugins/");
        assert!(draft.secret.is_empty());
    }

    #[test]
    fn test_password_from_environment() {
        std::env::set_var("BDEPLOY_TEST_SITE_PASSWORD", "s3cret");
        let args = SiteArgs {
            password_env: Some("BDEPLOY_TEST_SITE_PASSWORD".to_string()),
            ..SiteArgs::default()
        };
        assert_eq!(read_password(&args, true).unwrap().as_str(), "s3cret");
    }

    #[test]
    fn test_update_without_password_keeps_secret() {
        let args = SiteArgs::default();
        assert!(read_password(&args, false).unwrap().is_empty());
    }

    #[test]
    fn test_site_view_hides_secret() {
        let target = existing();
        let value = serde_json::to_value(SiteView::from(&target)).unwrap();
        assert!(value.get("secret_ciphertext").is_none());
        assert_eq!(value["has_password"], true);
        assert_eq!(value["protocol"], "FTP");
    }
}
