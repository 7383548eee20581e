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

//! FTP backend.
//!
//! `suppaftp`'s stream is synchronous, so every call runs on the blocking
//! pool. The stream moves into the blocking task and back out again, which
//! keeps it owned by exactly one task at a time.

use async_trait::async_trait;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;
use suppaftp::list::File as ListEntry;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use super::{RemoteEntry, Transport, TransportKind};
use crate::error::{DeployError, Result};

/// FTP connection in passive, binary mode.
#[derive(Default)]
pub struct FtpTransport {
    stream: Option<FtpStream>,
    host: String,
}

impl FtpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` against the live stream on the blocking pool.
    async fn run<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> Result<T> + Send + 'static,
    {
        let mut stream = self
            .stream
            .take()
            .ok_or_else(|| DeployError::Connection("FTP connection is not open".to_string()))?;

        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut stream);
            (stream, result)
        })
        .await
        .map_err(|e| DeployError::Connection(format!("FTP worker failed: {e}")))?;

        self.stream = Some(stream);
        result
    }
}

/// Open the control connection and read the server greeting.
///
/// The read timeout stays set until login finishes, so a server that accepts
/// TCP but never greets cannot hold the caller past `timeout`.
fn open_control(addr: SocketAddr, timeout: Duration) -> std::io::Result<FtpStream> {
    let tcp = TcpStream::connect_timeout(&addr, timeout)?;
    tcp.set_read_timeout(Some(timeout))?;
    FtpStream::connect_with_stream(tcp).map_err(|e| std::io::Error::other(e.to_string()))
}

fn directory_exists(stream: &mut FtpStream, path: &str) -> bool {
    let Ok(previous) = stream.pwd() else {
        return false;
    };
    let exists = stream.cwd(path).is_ok();
    if exists {
        if let Err(e) = stream.cwd(&previous) {
            tracing::debug!("Could not return to {}: {}", previous, e);
        }
    }
    exists
}

#[async_trait]
impl Transport for FtpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ftp
    }

    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let unreachable = |detail: String| {
            DeployError::Connection(format!(
                "Could not connect to FTP server {host}:{port} ({detail})"
            ))
        };

        let addrs: Vec<_> = tokio::time::timeout(timeout, tokio::net::lookup_host((host, port)))
            .await
            .map_err(|_| unreachable("address lookup timed out".to_string()))?
            .map_err(|e| unreachable(e.to_string()))?
            .collect();

        let handshake = tokio::task::spawn_blocking(move || {
            let mut last_error = "no addresses resolved".to_string();
            for addr in addrs {
                match open_control(addr, timeout) {
                    Ok(stream) => return Ok(stream),
                    Err(e) => {
                        tracing::debug!("FTP connect to {} failed: {}", addr, e);
                        last_error = e.to_string();
                    }
                }
            }
            Err(last_error)
        });
        let stream = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| {
                unreachable(format!("timed out after {}s", timeout.as_secs_f32()))
            })?
            .map_err(|e| unreachable(e.to_string()))?
            .map_err(unreachable)?;

        tracing::debug!("Connected to FTP server {}:{}", host, port);
        self.stream = Some(stream);
        self.host = host.to_string();
        Ok(())
    }

    async fn authenticate(&mut self, username: &str, secret: &str) -> Result<()> {
        let username = username.to_string();
        let secret = zeroize::Zeroizing::new(secret.to_string());
        self.run(move |stream| {
            stream
                .login(username.as_str(), secret.as_str())
                .map_err(|e| DeployError::Authentication(format!("FTP login failed ({e})")))?;
            stream.set_mode(Mode::Passive);
            stream
                .transfer_type(FileType::Binary)
                .map_err(|e| DeployError::Connection(format!("Cannot switch to binary mode ({e})")))?;
            // Transfers are unbounded once logged in
            stream
                .get_ref()
                .set_read_timeout(None)
                .map_err(|e| DeployError::Connection(format!("Cannot reset read timeout ({e})")))
        })
        .await
    }

    async fn change_directory(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |stream| {
            stream
                .cwd(&path)
                .map_err(|e| DeployError::Path(format!("Cannot access directory {path} ({e})")))
        })
        .await
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        let path = path.to_string();
        self.run(move |stream| {
            let lines = stream
                .list(Some(path.as_str()))
                .map_err(|e| DeployError::Path(format!("Cannot list {path} ({e})")))?;

            let mut entries = Vec::with_capacity(lines.len());
            for line in lines {
                match line.parse::<ListEntry>() {
                    Ok(entry) if entry.name() == "." || entry.name() == ".." => {}
                    Ok(entry) => entries.push(RemoteEntry {
                        name: entry.name().to_string(),
                        is_dir: entry.is_directory(),
                    }),
                    Err(e) => tracing::trace!("Skipping LIST line {:?}: {}", line, e),
                }
            }
            Ok(entries)
        })
        .await
    }

    async fn make_directory(&mut self, path: &str, recursive: bool) -> Result<()> {
        let path = path.trim_end_matches('/').to_string();
        self.run(move |stream| {
            if recursive {
                let mut prefix = String::new();
                for segment in path.split('/').filter(|s| !s.is_empty()) {
                    if path.starts_with('/') || !prefix.is_empty() {
                        prefix.push('/');
                    }
                    prefix.push_str(segment);
                    if prefix != path && !directory_exists(stream, &prefix) {
                        if let Err(e) = stream.mkdir(&prefix) {
                            tracing::debug!("mkdir {} failed: {}", prefix, e);
                        }
                    }
                }
            }

            match stream.mkdir(&path) {
                Ok(()) => Ok(()),
                Err(_) if directory_exists(stream, &path) => Ok(()),
                Err(e) => Err(DeployError::Path(format!("Cannot create directory {path} ({e})"))),
            }
        })
        .await
    }

    async fn remove_directory(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |stream| {
            stream
                .rmdir(&path)
                .map_err(|e| DeployError::Path(format!("Cannot remove directory {path} ({e})")))
        })
        .await
    }

    async fn delete_file(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |stream| {
            stream
                .rm(&path)
                .map_err(|e| DeployError::Path(format!("Cannot delete {path} ({e})")))
        })
        .await
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<()> {
        let local: PathBuf = local.to_path_buf();
        let remote = remote.to_string();
        self.run(move |stream| {
            let mut file = std::fs::File::open(&local).map_err(|e| {
                DeployError::Transfer(format!("Cannot read {} ({e})", local.display()))
            })?;
            let written = stream
                .put_file(&remote, &mut file)
                .map_err(|e| DeployError::Transfer(format!("Upload of {remote} failed ({e})")))?;
            tracing::debug!("Uploaded {} ({} bytes)", remote, written);
            Ok(())
        })
        .await
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<()> {
        let local: PathBuf = local.to_path_buf();
        let remote = remote.to_string();
        self.run(move |stream| {
            let buffer = stream
                .retr_as_buffer(&remote)
                .map_err(|e| DeployError::Transfer(format!("Download of {remote} failed ({e})")))?;
            std::fs::write(&local, buffer.into_inner()).map_err(|e| {
                DeployError::Transfer(format!("Cannot write {} ({e})", local.display()))
            })
        })
        .await
    }

    async fn execute_remote_command(&mut self, command: &str) -> Option<bool> {
        let site_command = format!("EXEC {command}");
        let outcome = self
            .run(move |stream| {
                stream
                    .site(&site_command)
                    .map_err(|e| DeployError::Extraction(e.to_string()))
            })
            .await;

        match outcome {
            Ok(_) => Some(true),
            Err(e) => {
                tracing::debug!("SITE EXEC on {} was refused: {}", self.host, e);
                Some(false)
            }
        }
    }

    async fn close(&mut self) {
        if self.stream.is_none() {
            return;
        }
        let host = self.host.clone();
        let quit = self
            .run(|stream| {
                stream
                    .quit()
                    .map_err(|e| DeployError::Connection(e.to_string()))
            })
            .await;
        if let Err(e) = quit {
            tracing::debug!("FTP QUIT on {} failed: {}", host, e);
        }
        self.stream = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[tokio::test]
    async fn test_connect_gives_up_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept and hold the socket without ever sending a greeting
        std::thread::spawn(move || {
            if let Ok((socket, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(10));
                drop(socket);
            }
        });

        let mut transport = FtpTransport::new();
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            transport.connect("127.0.0.1", port, Duration::from_millis(300)),
        )
        .await
        .expect("connect must give up before the outer deadline");

        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), "connection");
        assert!(err.to_string().contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut transport = FtpTransport::new();
        let err = transport
            .connect("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "connection");
    }
}
