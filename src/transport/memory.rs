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

//! In-memory transport for exercising deployments without a network.
//!
//! A [`MemoryNetwork`] holds a set of fake hosts, each with its own
//! credentials and filesystem. It doubles as a [`TransportFactory`], so a
//! [`Deployer`](crate::deploy::Deployer) can be pointed at it directly.
//!
//! ```
//! use bdeploy::transport::memory::MemoryNetwork;
//!
//! let network = MemoryNetwork::new();
//! network.add_host("ftp.example.com", "deploy", "secret");
//! network.seed_file("ftp.example.com", "/wp-content/plugins/old/stale.php", b"<?php");
//! assert!(network.dir_exists("ftp.example.com", "/wp-content/plugins/old"));
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{RemoteEntry, Transport, TransportFactory, TransportKind};
use crate::error::{DeployError, Result};

#[derive(Debug, Default)]
struct MemoryHost {
    username: String,
    secret: String,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    remote_command: Option<bool>,
    fail_uploads: bool,
    failing_deletes: BTreeSet<String>,
    operations: Vec<String>,
    commands: Vec<String>,
}

impl MemoryHost {
    fn has_dir(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn add_dir_all(&mut self, path: &str) {
        let mut current = path.to_string();
        while current != "/" && !current.is_empty() {
            self.dirs.insert(current.clone());
            current = parent_of(&current);
        }
    }

    fn children(&self, path: &str) -> Vec<RemoteEntry> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        let direct = |candidate: &str| -> Option<String> {
            let rest = candidate.strip_prefix(&prefix)?;
            (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
        };

        let mut entries: Vec<RemoteEntry> = self
            .dirs
            .iter()
            .filter_map(|d| direct(d).map(RemoteEntry::dir))
            .collect();
        entries.extend(
            self.files
                .keys()
                .filter_map(|f| direct(f).map(RemoteEntry::file)),
        );
        entries
    }
}

#[derive(Debug, Default)]
struct NetworkState {
    hosts: BTreeMap<String, MemoryHost>,
    transports_created: usize,
}

/// A set of fake hosts shared by every transport it creates.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        // A panicking test must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_host<T>(&self, host: &str, f: impl FnOnce(&mut MemoryHost) -> T) -> Option<T> {
        self.lock().hosts.get_mut(host).map(f)
    }

    /// Register a reachable host accepting `username`/`secret`.
    pub fn add_host(&self, host: &str, username: &str, secret: &str) {
        self.lock().hosts.insert(
            host.to_string(),
            MemoryHost {
                username: username.to_string(),
                secret: secret.to_string(),
                ..MemoryHost::default()
            },
        );
    }

    /// Outcome reported for server-side commands; `None` means unsupported.
    pub fn set_remote_command(&self, host: &str, outcome: Option<bool>) {
        self.with_host(host, |h| h.remote_command = outcome);
    }

    /// Make every upload to `host` fail.
    pub fn fail_uploads(&self, host: &str, fail: bool) {
        self.with_host(host, |h| h.fail_uploads = fail);
    }

    /// Make deleting the file at `path` fail while leaving it in place.
    pub fn fail_delete(&self, host: &str, path: &str) {
        let path = normalize(path);
        self.with_host(host, |h| {
            h.failing_deletes.insert(path);
        });
    }

    /// Create `path` and all its parents.
    pub fn seed_dir(&self, host: &str, path: &str) {
        let path = normalize(path);
        self.with_host(host, |h| h.add_dir_all(&path));
    }

    /// Store a file, creating its parent directories.
    pub fn seed_file(&self, host: &str, path: &str, contents: &[u8]) {
        let path = normalize(path);
        self.with_host(host, |h| {
            h.add_dir_all(&parent_of(&path));
            h.files.insert(path, contents.to_vec());
        });
    }

    pub fn file(&self, host: &str, path: &str) -> Option<Vec<u8>> {
        let path = normalize(path);
        self.with_host(host, |h| h.files.get(&path).cloned()).flatten()
    }

    pub fn dir_exists(&self, host: &str, path: &str) -> bool {
        let path = normalize(path);
        self.with_host(host, |h| h.has_dir(&path)).unwrap_or(false)
    }

    /// Files below `dir`, keyed by their path relative to it.
    pub fn files_under(&self, host: &str, dir: &str) -> BTreeMap<String, Vec<u8>> {
        let prefix = format!("{}/", normalize(dir).trim_end_matches('/'));
        self.with_host(host, |h| {
            h.files
                .iter()
                .filter_map(|(path, data)| {
                    path.strip_prefix(&prefix)
                        .map(|rel| (rel.to_string(), data.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Every operation issued against `host`, in order.
    pub fn operations(&self, host: &str) -> Vec<String> {
        self.with_host(host, |h| h.operations.clone())
            .unwrap_or_default()
    }

    /// Server-side commands issued against `host`.
    pub fn commands(&self, host: &str) -> Vec<String> {
        self.with_host(host, |h| h.commands.clone())
            .unwrap_or_default()
    }

    /// Number of transports handed out by this factory.
    pub fn transports_created(&self) -> usize {
        self.lock().transports_created
    }
}

impl TransportFactory for MemoryNetwork {
    fn create(&self, kind: TransportKind) -> Result<Box<dyn Transport>> {
        self.lock().transports_created += 1;
        Ok(Box::new(MemoryTransport {
            network: self.clone(),
            kind,
            host: None,
            authenticated: false,
        }))
    }
}

/// A transport connected to one host of a [`MemoryNetwork`].
#[derive(Debug)]
pub struct MemoryTransport {
    network: MemoryNetwork,
    kind: TransportKind,
    host: Option<String>,
    authenticated: bool,
}

impl MemoryTransport {
    /// Record `operation` and run `f` against the connected host.
    fn session<T>(
        &self,
        operation: String,
        f: impl FnOnce(&mut MemoryHost) -> Result<T>,
    ) -> Result<T> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| DeployError::Connection("not connected".to_string()))?;
        if !self.authenticated {
            return Err(DeployError::Connection("not logged in".to_string()));
        }
        let mut state = self.network.lock();
        let remote = state
            .hosts
            .get_mut(host)
            .ok_or_else(|| DeployError::Connection(format!("{host} went away")))?;
        remote.operations.push(operation);
        f(remote)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn connect(&mut self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        let mut state = self.network.lock();
        let remote = state.hosts.get_mut(host).ok_or_else(|| {
            DeployError::Connection(format!("Could not connect to {host}:{port}"))
        })?;
        remote.operations.push(format!("connect {port}"));
        self.host = Some(host.to_string());
        Ok(())
    }

    async fn authenticate(&mut self, username: &str, secret: &str) -> Result<()> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| DeployError::Connection("not connected".to_string()))?;
        let mut state = self.network.lock();
        let remote = state
            .hosts
            .get_mut(host)
            .ok_or_else(|| DeployError::Connection(format!("{host} went away")))?;
        remote.operations.push(format!("login {username}"));
        if remote.username != username || remote.secret != secret {
            return Err(DeployError::Authentication(format!(
                "login rejected for {username}"
            )));
        }
        drop(state);
        self.authenticated = true;
        Ok(())
    }

    async fn change_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        self.session(format!("cwd {path}"), |h| {
            if h.has_dir(&path) {
                Ok(())
            } else {
                Err(DeployError::Path(format!("Cannot access directory {path}")))
            }
        })
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let path = normalize(path);
        self.session(format!("list {path}"), |h| {
            if h.has_dir(&path) {
                Ok(h.children(&path))
            } else {
                Err(DeployError::Path(format!("Cannot list {path}")))
            }
        })
    }

    async fn make_directory(&mut self, path: &str, recursive: bool) -> Result<()> {
        let path = normalize(path);
        self.session(format!("mkdir {path}"), |h| {
            if h.has_dir(&path) {
                return Ok(());
            }
            if h.files.contains_key(&path) {
                return Err(DeployError::Path(format!("{path} is a file")));
            }
            if recursive {
                h.add_dir_all(&path);
            } else if h.has_dir(&parent_of(&path)) {
                h.dirs.insert(path);
            } else {
                return Err(DeployError::Path(format!("Cannot create directory {path}")));
            }
            Ok(())
        })
    }

    async fn remove_directory(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        self.session(format!("rmdir {path}"), |h| {
            if !h.dirs.contains(&path) {
                return Err(DeployError::Path(format!("No such directory {path}")));
            }
            if !h.children(&path).is_empty() {
                return Err(DeployError::Path(format!("Directory not empty: {path}")));
            }
            h.dirs.remove(&path);
            Ok(())
        })
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        self.session(format!("delete {path}"), |h| {
            if h.failing_deletes.contains(&path) {
                return Err(DeployError::Path(format!("Permission denied: {path}")));
            }
            h.files
                .remove(&path)
                .map(|_| ())
                .ok_or_else(|| DeployError::Path(format!("No such file {path}")))
        })
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<()> {
        let contents = tokio::fs::read(local).await.map_err(|e| {
            DeployError::Transfer(format!("Cannot read {} ({e})", local.display()))
        })?;
        let remote = normalize(remote);
        self.session(format!("put {remote}"), |h| {
            if h.fail_uploads {
                return Err(DeployError::Transfer(format!("Upload of {remote} refused")));
            }
            if !h.has_dir(&parent_of(&remote)) {
                return Err(DeployError::Transfer(format!(
                    "Upload of {remote} failed (no parent directory)"
                )));
            }
            h.files.insert(remote.clone(), contents);
            Ok(())
        })
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<()> {
        let remote = normalize(remote);
        let contents = self.session(format!("get {remote}"), |h| {
            h.files
                .get(&remote)
                .cloned()
                .ok_or_else(|| DeployError::Transfer(format!("Download of {remote} failed")))
        })?;
        tokio::fs::write(local, contents).await.map_err(|e| {
            DeployError::Transfer(format!("Cannot write {} ({e})", local.display()))
        })
    }

    async fn execute_remote_command(&mut self, command: &str) -> Option<bool> {
        // SFTP has no server-side command channel
        if self.kind == TransportKind::Sftp {
            return None;
        }
        self.session(format!("exec {command}"), |h| {
            h.commands.push(command.to_string());
            Ok(h.remote_command)
        })
        .ok()
        .flatten()
    }

    async fn close(&mut self) {
        if let Some(host) = self.host.take() {
            self.network.with_host(&host, |h| h.operations.push("close".to_string()));
        }
        self.authenticated = false;
    }
}

/// Absolute, `/`-separated form of `path` with `.` and `..` resolved.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
