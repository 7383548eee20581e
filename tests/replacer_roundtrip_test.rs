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

//! Packaging followed by the local-extraction fallback reproduces the
//! artifact byte for byte, however the archive nests it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use bdeploy::packager;
use bdeploy::replacer::RemoteReplacer;
use bdeploy::transport::memory::MemoryNetwork;
use bdeploy::transport::{Transport, TransportFactory, TransportKind};
use bdeploy::utils::fs::{relative_remote_path, walk_directory};
use tempfile::TempDir;

const HOST: &str = "files.example.com";
const BASE: &str = "/wp-content/plugins";

async fn session(network: &MemoryNetwork) -> Box<dyn Transport> {
    network.add_host(HOST, "deploy", "pw");
    network.seed_dir(HOST, BASE);
    let mut transport = network.create(TransportKind::Sftp).unwrap();
    transport
        .connect(HOST, 22, Duration::from_secs(1))
        .await
        .unwrap();
    transport.authenticate("deploy", "pw").await.unwrap();
    transport
}

fn sample_artifact() -> TempDir {
    let dir = TempDir::new().unwrap();
    let files: &[(&str, &[u8])] = &[
        ("shop.php", &b"<?php /* Plugin Name: Shop */"[..]),
        ("assets/logo.png", &[0x89u8, b'P', b'N', b'G', 0x00, 0xff, 0x10][..]),
        ("includes/cart/cart.php", &b"<?php class Cart {}"[..]),
        ("languages/shop-ko.mo", &[0xdeu8, 0x12, 0x04, 0x95][..]),
    ];
    for (rel, data) in files {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }
    dir
}

fn local_files(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walk_directory(root)
        .unwrap()
        .into_iter()
        .map(|path| {
            let rel = relative_remote_path(root, &path).unwrap();
            (rel, std::fs::read(&path).unwrap())
        })
        .collect()
}

/// Zip `root` with entry names relative to it, without any prefix.
fn flat_archive(root: &Path, dest: &Path) {
    let mut zip = zip::ZipWriter::new(std::fs::File::create(dest).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for (rel, data) in local_files(root) {
        zip.start_file(rel, options).unwrap();
        zip.write_all(&data).unwrap();
    }
    zip.finish().unwrap();
}

#[tokio::test]
async fn test_packaged_artifact_round_trips() {
    let network = MemoryNetwork::new();
    let mut transport = session(&network).await;
    let artifact = sample_artifact();
    network.seed_file(HOST, &format!("{BASE}/shop/obsolete.php"), b"old");

    let archive = packager::package(artifact.path(), "shop").unwrap();
    let remote_archive = format!("{BASE}/shop.zip");
    transport.upload(&archive, &remote_archive).await.unwrap();

    RemoteReplacer::new(transport.as_mut())
        .replace(&remote_archive, &format!("{BASE}/shop"), "shop")
        .await
        .unwrap();

    assert_eq!(
        network.files_under(HOST, &format!("{BASE}/shop")),
        local_files(artifact.path())
    );
    assert!(network.file(HOST, &remote_archive).is_none());
}

#[tokio::test]
async fn test_flat_archive_round_trips() {
    let network = MemoryNetwork::new();
    let mut transport = session(&network).await;
    let artifact = sample_artifact();

    let scratch = TempDir::new().unwrap();
    let archive = scratch.path().join("shop.zip");
    flat_archive(artifact.path(), &archive);
    let remote_archive = format!("{BASE}/shop.zip");
    transport.upload(&archive, &remote_archive).await.unwrap();

    RemoteReplacer::new(transport.as_mut())
        .replace(&remote_archive, &format!("{BASE}/shop"), "shop")
        .await
        .unwrap();

    assert_eq!(
        network.files_under(HOST, &format!("{BASE}/shop")),
        local_files(artifact.path())
    );
}
