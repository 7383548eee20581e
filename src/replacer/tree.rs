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

//! Recursive remote tree operations written once against [`Transport`].

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::{DeployError, Result};
use crate::transport::Transport;
use crate::utils::fs::{join_remote, relative_remote_path, remote_parent, walk_directory};

/// Remove `dir` and everything below it, depth-first.
///
/// Every delete is attempted even after a failure. Returns the number of
/// calls that failed; a directory that does not exist counts as none.
pub fn remove_tree<'a>(
    transport: &'a mut dyn Transport,
    dir: &'a str,
) -> Pin<Box<dyn Future<Output = usize> + Send + 'a>> {
    Box::pin(async move {
        let entries = match transport.list(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Nothing to remove at {}: {}", dir, e);
                return 0;
            }
        };

        let mut failures = 0;
        for entry in entries {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            let path = join_remote(dir, &entry.name);
            if entry.is_dir {
                failures += remove_tree(&mut *transport, &path).await;
            } else if let Err(e) = transport.delete_file(&path).await {
                tracing::debug!("delete {} failed: {}", path, e);
                failures += 1;
            }
        }

        if let Err(e) = transport.remove_directory(dir).await {
            tracing::debug!("rmdir {} failed: {}", dir, e);
            failures += 1;
        }
        failures
    })
}

/// Upload every file under `local_root` to the same relative path under
/// `remote_dir`, creating remote subdirectories on demand.
///
/// Stops at the first failed upload. Returns the number of files uploaded.
pub async fn upload_tree(
    transport: &mut dyn Transport,
    local_root: &Path,
    remote_dir: &str,
) -> Result<usize> {
    let files = walk_directory(local_root).map_err(|e| {
        DeployError::Extraction(format!("Cannot read {} ({e})", local_root.display()))
    })?;

    let root = remote_dir.trim_end_matches('/');
    let mut created: HashSet<String> = HashSet::new();
    let mut uploaded = 0;

    for file in &files {
        let Some(relative) = relative_remote_path(local_root, file) else {
            tracing::warn!("Skipping file with non UTF-8 path: {}", file.display());
            continue;
        };
        let remote_path = join_remote(root, &relative);

        let parent = remote_parent(&remote_path);
        if parent != root && !created.contains(parent) {
            // A failure here surfaces as the upload failure below
            if let Err(e) = transport.make_directory(parent, true).await {
                tracing::debug!("mkdir {} failed: {}", parent, e);
            }
            created.insert(parent.to_string());
        }

        if let Err(e) = transport.upload(file, &remote_path).await {
            tracing::warn!("{}", e);
            return Err(DeployError::Transfer(format!(
                "Failed to upload file: {relative}"
            )));
        }
        tracing::debug!("Uploaded {}", remote_path);
        uploaded += 1;
    }

    Ok(uploaded)
}
