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
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bdeploy::{
    artifact::DirectoryArtifactProvider,
    cli::{Cli, Commands, SiteCommands},
    commands::{
        connection::test_site,
        deploy::deploy_plugins,
        plugins::list_plugins,
        site::{add_site, list_sites, remove_site, update_site},
    },
    config::Config,
    deploy::{DeployOptions, Deployer},
    transport::NetworkTransportFactory,
    utils::init_logging,
    vault::CredentialVault,
};

fn load_vault(cli: &Cli) -> Result<CredentialVault> {
    match &cli.secret_key_file {
        Some(path) => CredentialVault::from_file(path)
            .with_context(|| format!("Failed to load secret key from {path:?}")),
        None => CredentialVault::from_env()
            .context("Set BDEPLOY_SECRET_KEY or pass --secret-key-file to unlock site passwords"),
    }
}

fn build_deployer(
    cli: &Cli,
    config: &Config,
    plugins_dir: PathBuf,
    options: DeployOptions,
) -> Result<Deployer> {
    let strict_mode = cli
        .strict_host_key_checking
        .unwrap_or(config.defaults.strict_host_key_checking);
    let vault = load_vault(cli)?;

    Ok(Deployer::new(
        Arc::new(config.site_store()),
        Arc::new(DirectoryArtifactProvider::new(plugins_dir)),
        Arc::new(NetworkTransportFactory::new(strict_mode)),
        Arc::new(vault),
    )
    .with_options(options))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(path) = &cli.config {
        let expanded = bdeploy::config::expand_tilde(path);
        if !expanded.exists() && !matches!(cli.command, Commands::Site { .. }) {
            anyhow::bail!("Config file not found: {:?}", expanded);
        }
    }
    let config_path = Config::resolve_path(cli.config.as_deref());
    let mut config = Config::load(&config_path).await?;
    tracing::debug!("Using configuration at {:?}", config_path);

    match &cli.command {
        Commands::Deploy {
            plugins,
            sites,
            all_sites,
            plugins_dir,
            parallel,
            connect_timeout,
            json,
        } => {
            let mut options = config.deploy_options();
            if let Some(parallel) = parallel {
                options.max_parallel = (*parallel).max(1);
            }
            if let Some(seconds) = connect_timeout {
                options.connect_timeout = Duration::from_secs(*seconds);
            }
            let plugins_dir = plugins_dir.clone().unwrap_or_else(|| config.plugins_dir());
            let site_ids = if *all_sites {
                config.site_store().list().iter().map(|t| t.id).collect()
            } else {
                sites.clone()
            };

            let deployer = build_deployer(&cli, &config, plugins_dir, options)?;
            let report = deploy_plugins(&deployer, plugins, &site_ids, *json).await?;
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Test { site } => {
            let label = config
                .sites
                .iter()
                .find(|t| t.id == *site)
                .map(|t| format!("{} (#{})", t.name, t.id))
                .unwrap_or_else(|| format!("#{site}"));
            let deployer = build_deployer(
                &cli,
                &config,
                config.plugins_dir(),
                config.deploy_options(),
            )?;
            if !test_site(&deployer, *site, &label).await {
                std::process::exit(1);
            }
        }
        Commands::Site { action } => match action {
            SiteCommands::List { json } => list_sites(&config, *json)?,
            SiteCommands::Add(args) => {
                let vault = load_vault(&cli)?;
                add_site(&mut config, &config_path, &vault, args).await?;
            }
            SiteCommands::Update { id, fields } => {
                let vault = load_vault(&cli)?;
                update_site(&mut config, &config_path, &vault, *id, fields).await?;
            }
            SiteCommands::Remove { id } => {
                remove_site(&mut config, &config_path, *id).await?;
            }
        },
        Commands::Plugins { plugins_dir } => {
            let root = plugins_dir.clone().unwrap_or_else(|| config.plugins_dir());
            list_plugins(&DirectoryArtifactProvider::new(root))?;
        }
    }

    Ok(())
}
