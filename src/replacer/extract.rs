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

//! Local archive extraction and effective-root detection.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};

/// Files whose presence marks a directory as an artifact root.
const ROOT_MARKERS: &[&str] = &["plugin.php", "index.php", "style.css"];

/// Extract the zip archive at `archive` into `dest`.
///
/// Entries whose names would escape `dest` are skipped. Returns the number
/// of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let file = std::fs::File::open(archive).map_err(|e| {
        DeployError::Extraction(format!("Cannot open {} ({e})", archive.display()))
    })?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| DeployError::Extraction(format!("Not a readable zip archive ({e})")))?;

    std::fs::create_dir_all(dest).map_err(|e| {
        DeployError::Extraction(format!("Cannot create {} ({e})", dest.display()))
    })?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| DeployError::Extraction(format!("Cannot read entry {i} ({e})")))?;

        let Some(outpath) = entry.enclosed_name().map(|name| dest.join(name)) else {
            tracing::warn!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| write_error(&outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(|e| {
            DeployError::Extraction(format!("Cannot read entry {} ({e})", entry.name()))
        })?;
        std::fs::write(&outpath, &data).map_err(|e| write_error(&outpath, e))?;
        written += 1;
    }

    tracing::debug!("Extracted {} file(s) into {}", written, dest.display());
    Ok(written)
}

fn write_error(path: &Path, e: std::io::Error) -> DeployError {
    DeployError::Extraction(format!("Cannot write {} ({e})", path.display()))
}

/// Locate the directory inside an extracted archive that holds the
/// artifact's own files.
///
/// In order:
/// 1. `scratch` itself when it holds a marker file or `<artifact>.php`
/// 2. a subdirectory named exactly `artifact_name`, when it is the only
///    top-level entry
/// 3. the first subdirectory, by name, holding a marker file or `<subdir>.php`
/// 4. `scratch`
pub fn find_effective_root(scratch: &Path, artifact_name: &str) -> PathBuf {
    let main_file = format!("{artifact_name}.php");
    if has_marker(scratch, Some(&main_file)) {
        return scratch.to_path_buf();
    }

    let entries: Vec<std::fs::DirEntry> = match std::fs::read_dir(scratch) {
        Ok(entries) => entries.filter_map(|entry| entry.ok()).collect(),
        Err(e) => {
            tracing::debug!("Cannot read {}: {}", scratch.display(), e);
            Vec::new()
        }
    };

    // Anything beside the named directory would be lost by descending into it
    let named = scratch.join(artifact_name);
    if entries.len() == 1 && entries[0].path() == named && named.is_dir() {
        return named;
    }

    let mut subdirs: Vec<PathBuf> = entries
        .iter()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    subdirs.sort();

    for dir in subdirs {
        let own_main = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| format!("{n}.php"));
        if has_marker(&dir, own_main.as_deref()) {
            return dir;
        }
    }

    scratch.to_path_buf()
}

fn has_marker(dir: &Path, extra: Option<&str>) -> bool {
    ROOT_MARKERS
        .iter()
        .copied()
        .chain(extra)
        .any(|name| dir.join(name).is_file())
}
