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

use std::path::{Path, PathBuf};

/// Recursively collect every regular file under `dir`, sorted by path.
///
/// Symlinks and other special files are skipped.
pub fn walk_directory(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_into(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_file() {
            files.push(path);
        } else if file_type.is_dir() {
            walk_into(&path, files)?;
        }
    }
    Ok(())
}

/// Path of `path` relative to `root`, joined with `/` whatever the host OS.
///
/// Returns `None` when `path` is not under `root` or is not valid UTF-8.
pub fn relative_remote_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Join a remote directory and a `/`-separated relative path.
pub fn join_remote(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), relative.trim_start_matches('/'))
}

/// Final component of a `/`-separated remote path.
pub fn remote_file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Parent of a `/`-separated remote path, or `""` when it has none.
pub fn remote_parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}
