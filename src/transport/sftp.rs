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

//! SFTP backend built on `russh` and `russh-sftp`.
//!
//! Some sshd_config does not enable sftp by default. A line like
//! `Subsystem sftp internal-sftp` is needed on the remote machine.

use async_trait::async_trait;
use russh::client::{Config, Handle, Handler};
use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::host_key::ServerCheckMethod;
use super::{RemoteEntry, Transport, TransportKind};
use crate::error::{DeployError, Result};

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("{0}")]
    Ssh(#[from] russh::Error),

    #[error("Host key verification failed for {0}")]
    ServerCheckFailed(String),
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    host: SocketAddr,
    server_check: ServerCheckMethod,
}

impl Handler for ClientHandler {
    type Error = HandshakeError;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = || {
            russh::keys::check_known_hosts(&self.hostname, self.host.port(), server_public_key)
        };

        match self.server_check {
            ServerCheckMethod::NoCheck => Ok(true),
            ServerCheckMethod::DefaultKnownHostsFile => {
                known().map_err(|_| HandshakeError::ServerCheckFailed(self.hostname.clone()))
            }
            ServerCheckMethod::AcceptNew => match known() {
                Ok(true) => Ok(true),
                Ok(false) => {
                    tracing::info!("Accepting new host key for {}", self.hostname);
                    Ok(true)
                }
                // A listed host presenting a different key
                Err(_) => Err(HandshakeError::ServerCheckFailed(self.hostname.clone())),
            },
        }
    }
}

/// One SSH session carrying one SFTP subsystem channel.
pub struct SftpTransport {
    server_check: ServerCheckMethod,
    handle: Option<Handle<ClientHandler>>,
    sftp: Option<SftpSession>,
    host: String,
}

impl SftpTransport {
    pub fn new(server_check: ServerCheckMethod) -> Self {
        Self {
            server_check,
            handle: None,
            sftp: None,
            host: String::new(),
        }
    }

    fn session(&self) -> Result<&SftpSession> {
        self.sftp
            .as_ref()
            .ok_or_else(|| DeployError::Connection("SFTP session is not open".to_string()))
    }

    async fn is_dir(&self, path: &str) -> bool {
        match self.session() {
            Ok(sftp) => sftp.metadata(path).await.map(|m| m.is_dir()).unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn handshake(
        &self,
        host: &str,
        port: u16,
    ) -> std::result::Result<Handle<ClientHandler>, String> {
        let config = Arc::new(Config::default());
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| e.to_string())?;

        let mut last_error = "no addresses resolved".to_string();
        for socket_addr in addrs {
            let handler = ClientHandler {
                hostname: host.to_string(),
                host: socket_addr,
                server_check: self.server_check.clone(),
            };
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(handle) => return Ok(handle),
                Err(e) => {
                    tracing::debug!("SSH connect to {} failed: {}", socket_addr, e);
                    last_error = e.to_string();
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl Transport for SftpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Sftp
    }

    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let handle = tokio::time::timeout(timeout, self.handshake(host, port))
            .await
            .map_err(|_| {
                DeployError::Connection(format!(
                    "Could not connect to SFTP server {host}:{port} (timed out after {}s)",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                DeployError::Connection(format!(
                    "Could not connect to SFTP server {host}:{port} ({e})"
                ))
            })?;

        tracing::debug!("Connected to SFTP server {}:{}", host, port);
        self.handle = Some(handle);
        self.host = host.to_string();
        Ok(())
    }

    async fn authenticate(&mut self, username: &str, secret: &str) -> Result<()> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| DeployError::Connection("SSH connection is not open".to_string()))?;

        let auth = handle
            .authenticate_password(username, secret)
            .await
            .map_err(|e| DeployError::Authentication(format!("SFTP login failed ({e})")))?;
        if !auth.success() {
            return Err(DeployError::Authentication(
                "SFTP login failed (password rejected)".to_string(),
            ));
        }

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| DeployError::Connection(format!("Cannot open SSH channel ({e})")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| DeployError::Connection(format!("SFTP subsystem unavailable ({e})")))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| DeployError::Connection(format!("SFTP subsystem unavailable ({e})")))?;

        self.sftp = Some(sftp);
        Ok(())
    }

    async fn change_directory(&mut self, path: &str) -> Result<()> {
        // SFTP has no working directory; every path is absolute, so this only
        // checks that the directory is reachable.
        let metadata = self
            .session()?
            .metadata(path)
            .await
            .map_err(|e| DeployError::Path(format!("Cannot access directory {path} ({e})")))?;
        if !metadata.is_dir() {
            return Err(DeployError::Path(format!("{path} is not a directory")));
        }
        Ok(())
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self
            .session()?
            .read_dir(path)
            .await
            .map_err(|e| DeployError::Path(format!("Cannot list {path} ({e})")))?;

        Ok(entries
            .filter(|entry| entry.file_name() != "." && entry.file_name() != "..")
            .map(|entry| RemoteEntry {
                is_dir: entry.metadata().file_type().is_dir(),
                name: entry.file_name(),
            })
            .collect())
    }

    async fn make_directory(&mut self, path: &str, recursive: bool) -> Result<()> {
        let path = path.trim_end_matches('/');
        if recursive {
            let mut prefix = String::new();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                if path.starts_with('/') || !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(segment);
                if prefix != path && !self.is_dir(&prefix).await {
                    if let Err(e) = self.session()?.create_dir(prefix.as_str()).await {
                        tracing::debug!("mkdir {} failed: {}", prefix, e);
                    }
                }
            }
        }

        if let Err(e) = self.session()?.create_dir(path).await {
            if !self.is_dir(path).await {
                return Err(DeployError::Path(format!(
                    "Cannot create directory {path} ({e})"
                )));
            }
        }
        Ok(())
    }

    async fn remove_directory(&mut self, path: &str) -> Result<()> {
        self.session()?
            .remove_dir(path)
            .await
            .map_err(|e| DeployError::Path(format!("Cannot remove directory {path} ({e})")))
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        self.session()?
            .remove_file(path)
            .await
            .map_err(|e| DeployError::Path(format!("Cannot delete {path} ({e})")))
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<()> {
        let transfer_error = |e: &dyn std::fmt::Display| {
            DeployError::Transfer(format!("Upload of {remote} failed ({e})"))
        };

        let contents = tokio::fs::read(local).await.map_err(|e| {
            DeployError::Transfer(format!("Cannot read {} ({e})", local.display()))
        })?;

        let mut file = self
            .session()?
            .open_with_flags(
                remote,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| transfer_error(&e))?;
        file.write_all(&contents).await.map_err(|e| transfer_error(&e))?;
        file.flush().await.map_err(|e| transfer_error(&e))?;
        file.shutdown().await.map_err(|e| transfer_error(&e))?;

        tracing::debug!("Uploaded {} ({} bytes)", remote, contents.len());
        Ok(())
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<()> {
        let transfer_error = |e: &dyn std::fmt::Display| {
            DeployError::Transfer(format!("Download of {remote} failed ({e})"))
        };

        let mut file = self
            .session()?
            .open_with_flags(remote, OpenFlags::READ)
            .await
            .map_err(|e| transfer_error(&e))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .await
            .map_err(|e| transfer_error(&e))?;

        tokio::fs::write(local, contents).await.map_err(|e| {
            DeployError::Transfer(format!("Cannot write {} ({e})", local.display()))
        })
    }

    async fn close(&mut self) {
        self.sftp = None;
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(russh::Disconnect::ByApplication, "", "")
                .await
            {
                tracing::debug!("SSH disconnect from {} failed: {}", self.host, e);
            }
        }
    }
}
