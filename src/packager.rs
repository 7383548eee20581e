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

//! Builds a zip archive from a local artifact directory.
//!
//! Every regular file becomes an entry named `<artifact>/<relative path>`.
//! Directories are implied by the file entries and never stored on their own.

use crate::error::{DeployError, Result};
use crate::utils::fs::{relative_remote_path, walk_directory};
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

/// Package `local_dir` into a temporary zip file.
///
/// The archive is removed when the returned [`TempPath`] is dropped, or
/// earlier through [`TempPath::close`].
pub fn package(local_dir: &Path, artifact_name: &str) -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("bdeploy-")
        .suffix(".zip")
        .tempfile()
        .map_err(|e| archive_error(format!("scratch file: {e}")))?;

    let files = walk_directory(local_dir)
        .map_err(|e| archive_error(format!("{}: {e}", local_dir.display())))?;

    let (handle, path) = file.into_parts();
    let mut zip = zip::ZipWriter::new(handle);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for source in &files {
        let Some(relative) = relative_remote_path(local_dir, source) else {
            tracing::warn!("Skipping file with non UTF-8 path: {}", source.display());
            continue;
        };
        let entry_name = format!("{artifact_name}/{relative}");

        let data = std::fs::read(source)
            .map_err(|e| archive_error(format!("{}: {e}", source.display())))?;
        zip.start_file(entry_name.as_str(), options)
            .map_err(|e| archive_error(format!("{entry_name}: {e}")))?;
        zip.write_all(&data)
            .map_err(|e| archive_error(format!("{entry_name}: {e}")))?;
    }

    zip.finish().map_err(|e| archive_error(e.to_string()))?;

    tracing::debug!(
        "Packaged {} file(s) from {} into {}",
        files.len(),
        local_dir.display(),
        path.display()
    );
    Ok(path)
}

fn archive_error(detail: String) -> DeployError {
    DeployError::Configuration(format!("Failed to create plugin zip: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn entries(archive: &Path) -> Vec<(String, Vec<u8>)> {
        let file = std::fs::File::open(archive).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let mut out = Vec::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            out.push((entry.name().to_string(), data));
        }
        out.sort();
        out
    }

    #[test]
    fn test_entry_names_are_prefixed() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.php"), b"<?php // a").unwrap();
        std::fs::write(dir.path().join("sub/b.php"), b"<?php // b").unwrap();

        let archive = package(dir.path(), "demo").unwrap();
        let names: Vec<String> = entries(&archive).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["demo/a.php", "demo/sub/b.php"]);
    }

    #[test]
    fn test_empty_directories_are_not_stored() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        std::fs::write(dir.path().join("x.txt"), b"x").unwrap();

        let archive = package(dir.path(), "demo").unwrap();
        assert_eq!(entries(&archive), vec![("demo/x.txt".to_string(), b"x".to_vec())]);
    }

    #[test]
    fn test_archive_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"x").unwrap();

        let archive = package(dir.path(), "demo").unwrap();
        let path = archive.to_path_buf();
        assert!(path.exists());
        drop(archive);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let err = package(Path::new("/nonexistent/bdeploy/artifact"), "demo").unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
