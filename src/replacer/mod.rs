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

//! Force-overwrite replacement of a remote artifact directory.
//!
//! The remote directory is emptied and recreated, then filled from an archive
//! that has already been uploaded next to it. When the server can unzip on
//! its own the work stays remote; otherwise the archive is downloaded,
//! extracted locally and uploaded file by file.
//!
//! There is no staging directory: between the removal and the last upload
//! the remote directory is incomplete.

pub mod extract;
pub mod tree;

use crate::error::{DeployError, Result};
use crate::transport::Transport;
use crate::utils::fs::{remote_file_name, remote_parent};

pub use extract::{extract_archive, find_effective_root};
pub use tree::{remove_tree, upload_tree};

/// Replaces remote directories over one live transport.
pub struct RemoteReplacer<'a> {
    transport: &'a mut dyn Transport,
}

impl<'a> RemoteReplacer<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self { transport }
    }

    /// Leave `remote_dir` holding exactly the contents of the archive at
    /// `remote_archive`.
    ///
    /// The remote archive is deleted on every exit path.
    pub async fn replace(
        &mut self,
        remote_archive: &str,
        remote_dir: &str,
        artifact_name: &str,
    ) -> Result<()> {
        let failures = remove_tree(&mut *self.transport, remote_dir).await;
        if failures > 0 {
            tracing::debug!("{} call(s) failed while clearing {}", failures, remote_dir);
        }

        if let Err(e) = self.transport.make_directory(remote_dir, true).await {
            tracing::warn!("Could not recreate {}: {}", remote_dir, e);
        }

        let result = if self.extract_remotely(remote_archive, remote_dir).await {
            Ok(())
        } else {
            self.extract_locally(remote_archive, remote_dir, artifact_name)
                .await
        };

        if let Err(e) = self.transport.delete_file(remote_archive).await {
            tracing::warn!("Could not delete remote archive {}: {}", remote_archive, e);
        }
        result
    }

    /// Ask the server to unzip in place. Any failure means "use the fallback".
    async fn extract_remotely(&mut self, remote_archive: &str, remote_dir: &str) -> bool {
        let base = remote_parent(remote_dir.trim_end_matches('/'));
        if base.is_empty() || base != remote_parent(remote_archive) {
            return false;
        }
        if let Err(e) = self.transport.change_directory(base).await {
            tracing::debug!("Skipping server-side unzip: {}", e);
            return false;
        }

        let command = format!(
            "cd {} && unzip -o ../{}",
            remote_file_name(remote_dir),
            remote_file_name(remote_archive)
        );
        match self.transport.execute_remote_command(&command).await {
            Some(true) => {
                tracing::debug!("Server-side unzip succeeded for {}", remote_dir);
                true
            }
            Some(false) => {
                tracing::debug!("Server-side unzip failed for {}, extracting locally", remote_dir);
                false
            }
            None => false,
        }
    }

    /// Download, extract into scratch space, and upload the effective root.
    async fn extract_locally(
        &mut self,
        remote_archive: &str,
        remote_dir: &str,
        artifact_name: &str,
    ) -> Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("bdeploy-extract-")
            .tempdir()
            .map_err(|e| DeployError::Extraction(format!("Cannot create scratch directory ({e})")))?;

        let result = self
            .fill_from_scratch(scratch.path(), remote_archive, remote_dir, artifact_name)
            .await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!("Could not remove {}: {}", scratch_path.display(), e);
        }
        result
    }

    async fn fill_from_scratch(
        &mut self,
        scratch: &std::path::Path,
        remote_archive: &str,
        remote_dir: &str,
        artifact_name: &str,
    ) -> Result<()> {
        let local_archive = scratch.join("archive.zip");
        self.transport.download(remote_archive, &local_archive).await?;

        let extracted = scratch.join("extracted");
        let name = artifact_name.to_string();
        let root = tokio::task::spawn_blocking(move || {
            extract_archive(&local_archive, &extracted)?;
            Ok::<_, DeployError>(find_effective_root(&extracted, &name))
        })
        .await
        .map_err(|e| DeployError::Extraction(format!("Extraction task failed ({e})")))??;

        let uploaded = upload_tree(&mut *self.transport, &root, remote_dir).await?;
        tracing::debug!("Uploaded {} extracted file(s) to {}", uploaded, remote_dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packager;
    use crate::transport::memory::MemoryNetwork;
    use crate::transport::{TransportFactory, TransportKind};
    use std::time::Duration;
    use tempfile::TempDir;

    const HOST: &str = "h";
    const BASE: &str = "/wp-content/plugins";

    async fn setup(network: &MemoryNetwork, kind: TransportKind) -> Box<dyn Transport> {
        network.add_host(HOST, "u", "p");
        network.seed_dir(HOST, BASE);
        let mut transport = network.create(kind).unwrap();
        transport
            .connect(HOST, 21, Duration::from_secs(1))
            .await
            .unwrap();
        transport.authenticate("u", "p").await.unwrap();
        transport
    }

    fn artifact() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("demo.php"), b"<?php // v2").unwrap();
        dir
    }

    async fn upload_archive(transport: &mut dyn Transport, local_dir: &std::path::Path) -> String {
        let archive = packager::package(local_dir, "demo").unwrap();
        let remote = format!("{BASE}/demo.zip");
        transport.upload(&archive, &remote).await.unwrap();
        remote
    }

    #[tokio::test]
    async fn test_primary_path_skips_download() {
        let network = MemoryNetwork::new();
        let mut transport = setup(&network, TransportKind::Ftp).await;
        network.set_remote_command(HOST, Some(true));
        let local = artifact();
        let remote = upload_archive(transport.as_mut(), local.path()).await;

        RemoteReplacer::new(transport.as_mut())
            .replace(&remote, &format!("{BASE}/demo"), "demo")
            .await
            .unwrap();

        assert_eq!(network.commands(HOST), vec!["cd demo && unzip -o ../demo.zip"]);
        assert!(!network.operations(HOST).iter().any(|op| op.starts_with("get ")));
        assert!(network.file(HOST, &remote).is_none());
    }

    #[tokio::test]
    async fn test_failed_remote_unzip_falls_back() {
        let network = MemoryNetwork::new();
        let mut transport = setup(&network, TransportKind::Ftp).await;
        network.set_remote_command(HOST, Some(false));
        let local = artifact();
        let remote = upload_archive(transport.as_mut(), local.path()).await;

        RemoteReplacer::new(transport.as_mut())
            .replace(&remote, &format!("{BASE}/demo"), "demo")
            .await
            .unwrap();

        let files = network.files_under(HOST, &format!("{BASE}/demo"));
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["demo.php"]);
        assert!(network.file(HOST, &remote).is_none());
    }

    #[tokio::test]
    async fn test_flat_archive_with_named_subdirectory_keeps_every_file() {
        use std::io::Write;

        let network = MemoryNetwork::new();
        let mut transport = setup(&network, TransportKind::Sftp).await;

        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in [
            ("readme.txt", &b"read me"[..]),
            ("loader.php", &b"<?php // loader"[..]),
            ("shop/helper.php", &b"<?php // helper"[..]),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        let bytes = zip.finish().unwrap().into_inner();
        let remote = format!("{BASE}/shop.zip");
        network.seed_file(HOST, &remote, &bytes);

        RemoteReplacer::new(transport.as_mut())
            .replace(&remote, &format!("{BASE}/shop"), "shop")
            .await
            .unwrap();

        let files = network.files_under(HOST, &format!("{BASE}/shop"));
        assert_eq!(
            files.keys().collect::<Vec<_>>(),
            vec!["loader.php", "readme.txt", "shop/helper.php"]
        );
        assert_eq!(files["readme.txt"], b"read me");
    }

    #[tokio::test]
    async fn test_corrupt_archive_still_removes_remote_archive() {
        let network = MemoryNetwork::new();
        let mut transport = setup(&network, TransportKind::Sftp).await;
        let remote = format!("{BASE}/demo.zip");
        network.seed_file(HOST, &remote, b"not a zip");

        let err = RemoteReplacer::new(transport.as_mut())
            .replace(&remote, &format!("{BASE}/demo"), "demo")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "extraction");
        assert!(network.file(HOST, &remote).is_none());
        assert!(network.dir_exists(HOST, &format!("{BASE}/demo")));
    }
}
