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

//! Deployment orchestration.
//!
//! A batch is the product of a target list and an artifact list. Targets are
//! processed independently, each over a single connection that is opened
//! once and closed after its last artifact. Artifacts within a target always
//! run one after another. Every failure is turned into a
//! [`DeploymentResult`]; nothing aborts the batch.

pub mod result;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::artifact::ArtifactProvider;
use crate::error::{DeployError, Result};
use crate::packager;
use crate::replacer::RemoteReplacer;
use crate::site::{SiteRepository, Target, TargetId};
use crate::transport::{Transport, TransportFactory, TransportKind};
use crate::vault::CredentialVault;

pub use result::{DeploymentReport, DeploymentResult, Summary, DEPLOYED_MESSAGE};

/// Connect timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    /// Bound on connecting (TCP plus protocol greeting). Transfers are unbounded.
    pub connect_timeout: Duration,
    /// Maximum number of targets processed at the same time.
    pub max_parallel: usize,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_parallel: 1,
        }
    }
}

/// Drives packaging, upload and replacement for a batch of targets.
pub struct Deployer {
    sites: Arc<dyn SiteRepository>,
    artifacts: Arc<dyn ArtifactProvider>,
    transports: Arc<dyn TransportFactory>,
    vault: Arc<CredentialVault>,
    options: DeployOptions,
}

impl Deployer {
    pub fn new(
        sites: Arc<dyn SiteRepository>,
        artifacts: Arc<dyn ArtifactProvider>,
        transports: Arc<dyn TransportFactory>,
        vault: Arc<CredentialVault>,
    ) -> Self {
        Self {
            sites,
            artifacts,
            transports,
            vault,
            options: DeployOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DeployOptions) -> Self {
        self.options = options;
        self
    }

    /// Deploy every artifact to every target.
    ///
    /// Results are ordered by target, then by artifact, in request order.
    pub async fn deploy(&self, artifacts: &[String], target_ids: &[TargetId]) -> DeploymentReport {
        let semaphore = Semaphore::new(self.options.max_parallel.max(1));

        tracing::info!(
            "Deploying {} artifact(s) to {} target(s)",
            artifacts.len(),
            target_ids.len()
        );

        let tasks = target_ids.iter().map(|&target_id| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.deploy_target(target_id, artifacts).await
            }
        });

        let results: Vec<DeploymentResult> = join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect();
        let report = DeploymentReport::new(results);

        tracing::info!(
            "Deployment finished: {} succeeded, {} failed",
            report.summary.success_count,
            report.summary.failure_count
        );
        report
    }

    /// Connect, log in and enter the base path of one target, then close.
    pub async fn test_connection(&self, target_id: TargetId) -> Result<()> {
        let target = self
            .sites
            .get_target(target_id)
            .ok_or_else(DeployError::target_not_found)?;
        let mut transport = self.open(&target).await?;
        transport.close().await;
        Ok(())
    }

    async fn deploy_target(
        &self,
        target_id: TargetId,
        artifacts: &[String],
    ) -> Vec<DeploymentResult> {
        let Some(target) = self.sites.get_target(target_id) else {
            tracing::warn!("Target #{} not found", target_id);
            let err = DeployError::target_not_found();
            return artifacts
                .iter()
                .map(|artifact| DeploymentResult::failed(target_id, None, artifact, &err))
                .collect();
        };
        let target_name = Some(target.name.clone());

        let mut transport = match self.open(&target).await {
            Ok(transport) => transport,
            Err(err) => {
                tracing::warn!("{} (#{}): {}", target.name, target_id, err);
                return artifacts
                    .iter()
                    .map(|artifact| {
                        DeploymentResult::failed(target_id, target_name.clone(), artifact, &err)
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let result = match self.deploy_artifact(transport.as_mut(), &target, artifact).await {
                Ok(()) => {
                    tracing::info!("{} -> {}: deployed", artifact, target.name);
                    DeploymentResult::deployed(target_id, target_name.clone(), artifact)
                }
                Err(err) => {
                    tracing::warn!("{} -> {}: {}", artifact, target.name, err);
                    DeploymentResult::failed(target_id, target_name.clone(), artifact, &err)
                }
            };
            results.push(result);
        }

        transport.close().await;
        results
    }

    /// Open an authenticated transport positioned at the target base path.
    async fn open(&self, target: &Target) -> Result<Box<dyn Transport>> {
        let secret = self
            .vault
            .decrypt(&target.secret_ciphertext)
            .map_err(|e| DeployError::Configuration(format!("Stored password is unusable ({e})")))?;

        let kind = TransportKind::select(target.port);
        tracing::debug!(
            "Opening {} connection to {}:{} for {}",
            kind,
            target.host,
            target.port,
            target.name
        );
        let mut transport = self.transports.create(kind)?;

        let login = async {
            transport
                .connect(&target.host, target.port, self.options.connect_timeout)
                .await?;
            transport.authenticate(&target.username, &secret).await?;
            transport.change_directory(&target.remote_base_path).await
        };
        let logged_in = login.await;
        if let Err(err) = logged_in {
            transport.close().await;
            return Err(err);
        }
        Ok(transport)
    }

    async fn deploy_artifact(
        &self,
        transport: &mut dyn Transport,
        target: &Target,
        artifact: &str,
    ) -> Result<()> {
        let local_dir = self
            .artifacts
            .resolve(artifact)
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| {
                DeployError::NotFound(format!("Plugin directory not found locally: {artifact}"))
            })?;

        let name = artifact.to_string();
        let archive = tokio::task::spawn_blocking(move || packager::package(&local_dir, &name))
            .await
            .map_err(|e| DeployError::Configuration(format!("Packaging task failed ({e})")))??;

        let remote_archive = target.remote_archive_path(artifact);
        let result = async {
            if let Err(e) = transport.delete_file(&remote_archive).await {
                tracing::debug!("No previous archive removed at {}: {}", remote_archive, e);
            }
            transport.upload(&archive, &remote_archive).await?;
            RemoteReplacer::new(&mut *transport)
                .replace(
                    &remote_archive,
                    &target.remote_artifact_dir(artifact),
                    artifact,
                )
                .await
        }
        .await;

        if let Err(e) = archive.close() {
            tracing::warn!("Could not remove local archive: {}", e);
        }
        result
    }
}
