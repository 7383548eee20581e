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

//! Uniform remote filesystem access over FTP and SFTP.
//!
//! A [`Transport`] value owns at most one live connection. It is created by a
//! [`TransportFactory`], used by exactly one target's deployment and closed
//! afterwards; it is never shared between targets.

#[cfg(feature = "ftp")]
pub mod ftp;
pub mod host_key;
pub mod memory;
#[cfg(feature = "sftp")]
pub mod sftp;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{DeployError, Result};
use host_key::StrictHostKeyChecking;

/// Port that selects the SFTP backend. Every other port selects FTP.
pub const SFTP_PORT: u16 = 22;

/// The two available transport families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Ftp,
    Sftp,
}

impl TransportKind {
    /// Choose the transport for a target port.
    pub fn select(port: u16) -> Self {
        if port == SFTP_PORT {
            TransportKind::Sftp
        } else {
            TransportKind::Ftp
        }
    }

    /// Whether this build carries a backend for the kind.
    pub fn is_available(self) -> bool {
        match self {
            TransportKind::Ftp => cfg!(feature = "ftp"),
            TransportKind::Sftp => cfg!(feature = "sftp"),
        }
    }

    pub(crate) fn unavailable(self) -> DeployError {
        DeployError::Configuration(format!("{self} support is not available in this build"))
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Ftp => write!(f, "FTP"),
            TransportKind::Sftp => write!(f, "SFTP"),
        }
    }
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Remote filesystem operations shared by every backend.
///
/// Paths are `/`-separated. Every method returns a typed error; the caller
/// decides which failures are ignorable.
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Open the connection. Only this step is bounded by `timeout`.
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()>;

    async fn authenticate(&mut self, username: &str, secret: &str) -> Result<()>;

    async fn change_directory(&mut self, path: &str) -> Result<()>;

    /// List `path` without `.` and `..`.
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Create `path`. An existing directory is not an error.
    async fn make_directory(&mut self, path: &str, recursive: bool) -> Result<()>;

    /// Remove an empty directory.
    async fn remove_directory(&mut self, path: &str) -> Result<()>;

    async fn delete_file(&mut self, path: &str) -> Result<()>;

    /// Upload a whole local file in binary mode.
    async fn upload(&mut self, local: &Path, remote: &str) -> Result<()>;

    async fn download(&mut self, remote: &str, local: &Path) -> Result<()>;

    /// Run a server-side command.
    ///
    /// `None` means the backend has no such capability; `Some(false)` means
    /// the server refused or the command failed.
    async fn execute_remote_command(&mut self, _command: &str) -> Option<bool> {
        None
    }

    /// Close the connection. Never fails; problems are logged.
    async fn close(&mut self);
}

/// Creates unconnected transports.
pub trait TransportFactory: Send + Sync {
    fn create(&self, kind: TransportKind) -> Result<Box<dyn Transport>>;
}

/// Factory for the real FTP and SFTP backends compiled into this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTransportFactory {
    #[cfg_attr(not(feature = "sftp"), allow(dead_code))]
    host_key_checking: StrictHostKeyChecking,
}

impl NetworkTransportFactory {
    pub fn new(host_key_checking: StrictHostKeyChecking) -> Self {
        Self { host_key_checking }
    }
}

impl TransportFactory for NetworkTransportFactory {
    fn create(&self, kind: TransportKind) -> Result<Box<dyn Transport>> {
        match kind {
            #[cfg(feature = "ftp")]
            TransportKind::Ftp => Ok(Box::new(ftp::FtpTransport::new())),
            #[cfg(feature = "sftp")]
            TransportKind::Sftp => Ok(Box::new(sftp::SftpTransport::new(
                host_key::get_check_method(self.host_key_checking),
            ))),
            #[allow(unreachable_patterns)]
            other => Err(other.unavailable()),
        }
    }
}
