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

//! Validation of user-supplied names and paths before they reach a remote host

use anyhow::Result;

/// Validate an artifact name.
///
/// Artifact names end up in remote paths and in the server-side unzip
/// command, so they must be a single path component of safe characters:
/// - ASCII alphanumerics, dot, hyphen and underscore only
/// - not `.` or `..`
/// - not starting with a hyphen
pub fn validate_artifact_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        anyhow::bail!("Artifact name cannot be empty");
    }

    const MAX_NAME_LENGTH: usize = 255;
    if name.len() > MAX_NAME_LENGTH {
        anyhow::bail!("Artifact name too long (max {} characters)", MAX_NAME_LENGTH);
    }

    if name == "." || name == ".." {
        anyhow::bail!("Artifact name cannot be '{}'", name);
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_');
    if !valid_chars {
        anyhow::bail!("Artifact name contains invalid characters: {}", name);
    }

    if name.starts_with('-') {
        anyhow::bail!("Artifact name cannot start with a hyphen");
    }

    Ok(name)
}

/// Validate a remote base path to prevent injection attacks
///
/// This function ensures:
/// - No shell metacharacters that could cause command injection
/// - No path traversal sequences
/// - Only valid characters for file paths
///
/// An empty path is accepted; callers substitute the default base path.
pub fn validate_remote_path(path: &str) -> Result<&str> {
    if path.is_empty() {
        return Ok(path);
    }

    const MAX_PATH_LENGTH: usize = 4096;
    if path.len() > MAX_PATH_LENGTH {
        anyhow::bail!("Remote path too long (max {} characters)", MAX_PATH_LENGTH);
    }

    const DANGEROUS_CHARS: &[char] = &[
        ';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', '\n', '\r', '\0', '!', '*', '?',
        '[', ']',
    ];

    for &ch in DANGEROUS_CHARS {
        if path.contains(ch) {
            anyhow::bail!("Remote path contains invalid character: '{}'", ch);
        }
    }

    if path.split('/').any(|segment| segment == "..") {
        anyhow::bail!("Remote path contains path traversal sequence");
    }

    // Trailing separators collapse during normalization; interior ones are suspicious
    if path.trim_end_matches('/').contains("//") {
        anyhow::bail!("Remote path contains double slashes");
    }

    let valid_chars = path.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || c == '/'
            || c == '.'
            || c == '-'
            || c == '_'
            || c == ' '
            || c == '~'
            || c == '='
            || c == ','
            || c == ':'
            || c == '@'
    });

    if !valid_chars {
        anyhow::bail!("Remote path contains invalid characters");
    }

    Ok(path)
}

/// Validate a hostname or IP literal
pub fn validate_hostname(hostname: &str) -> Result<&str> {
    if hostname.is_empty() {
        anyhow::bail!("Hostname cannot be empty");
    }

    // RFC 1123
    const MAX_HOSTNAME_LENGTH: usize = 253;
    if hostname.len() > MAX_HOSTNAME_LENGTH {
        anyhow::bail!("Hostname too long (max {} characters)", MAX_HOSTNAME_LENGTH);
    }

    // Alphanumerics, dots, hyphens, and brackets/colons for IPv6
    let valid_chars = hostname.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == ':' || c == '[' || c == ']'
    });

    if !valid_chars {
        anyhow::bail!("Hostname contains invalid characters");
    }

    if hostname.contains("..") {
        anyhow::bail!("Hostname contains suspicious repeated characters");
    }

    Ok(hostname)
}

/// Validate a login name.
///
/// Hosting accounts frequently log in with an e-mail style name, so `@` and
/// `+` are allowed in addition to the POSIX set.
pub fn validate_username(username: &str) -> Result<&str> {
    if username.is_empty() {
        anyhow::bail!("Username cannot be empty");
    }

    const MAX_USERNAME_LENGTH: usize = 128;
    if username.len() > MAX_USERNAME_LENGTH {
        anyhow::bail!("Username too long (max {} characters)", MAX_USERNAME_LENGTH);
    }

    let valid_chars = username.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '@' || c == '+'
    });

    if !valid_chars {
        anyhow::bail!("Username contains invalid characters");
    }

    if username.starts_with('-') {
        anyhow::bail!("Username cannot start with a hyphen");
    }

    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_artifact_name() {
        assert!(validate_artifact_name("demo-plugin").is_ok());
        assert!(validate_artifact_name("woo_extras.v2").is_ok());

        assert!(validate_artifact_name("").is_err());
        assert!(validate_artifact_name(".").is_err());
        assert!(validate_artifact_name("..").is_err());
        assert!(validate_artifact_name("a/b").is_err());
        assert!(validate_artifact_name("x; rm -rf /").is_err());
        assert!(validate_artifact_name("-rf").is_err());
        assert!(validate_artifact_name(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_remote_path() {
        assert!(validate_remote_path("/wp-content/plugins/").is_ok());
        assert!(validate_remote_path("/home/site/public_html/wp-content/plugins").is_ok());
        assert!(validate_remote_path("/wp-content/plugins///").is_ok());
        assert!(validate_remote_path("").is_ok());

        assert!(validate_remote_path("../etc").is_err());
        assert!(validate_remote_path("/srv/../etc").is_err());
        assert!(validate_remote_path("/tmp/$(whoami)").is_err());
        assert!(validate_remote_path("/tmp/test; rm -rf /").is_err());
        assert!(validate_remote_path("/tmp/test`id`").is_err());
        assert!(validate_remote_path("/tmp//test").is_err());
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("example.com").is_ok());
        assert!(validate_hostname("192.168.1.1").is_ok());
        assert!(validate_hostname("ftp-01.example.com").is_ok());
        assert!(validate_hostname("[::1]").is_ok());

        assert!(validate_hostname("example..com").is_err());
        assert!(validate_hostname("example.com; ls").is_err());
        assert!(validate_hostname("").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("deploy").is_ok());
        assert!(validate_username("user@example.com").is_ok());
        assert!(validate_username("test.user").is_ok());

        assert!(validate_username("-user").is_err());
        assert!(validate_username("user name").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(200)).is_err());
    }
}
