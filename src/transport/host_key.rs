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

//! Host key verification policy for SFTP targets.

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, accept hosts that are not listed yet
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(format!(
                "invalid host key checking mode '{other}' (expected yes, no or accept-new)"
            )),
        }
    }
}

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// How the SFTP client verifies the server key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCheckMethod {
    /// Accept any host key
    NoCheck,
    /// Require a matching entry in the default known_hosts file
    DefaultKnownHostsFile,
    /// Reject changed keys, accept hosts missing from known_hosts
    AcceptNew,
}

/// Create a ServerCheckMethod based on strict host key checking mode
pub fn get_check_method(strict_mode: StrictHostKeyChecking) -> ServerCheckMethod {
    let known_hosts = get_default_known_hosts_path().filter(|path| path.exists());

    match (strict_mode, known_hosts) {
        (StrictHostKeyChecking::No, _) => {
            tracing::debug!("Host key checking disabled (strict mode = no)");
            ServerCheckMethod::NoCheck
        }
        (StrictHostKeyChecking::Yes, Some(path)) => {
            tracing::debug!("Using known_hosts file: {:?} (strict mode)", path);
            ServerCheckMethod::DefaultKnownHostsFile
        }
        (StrictHostKeyChecking::Yes, None) => {
            tracing::warn!("Known hosts file not found; every host key will be rejected");
            ServerCheckMethod::DefaultKnownHostsFile
        }
        (StrictHostKeyChecking::AcceptNew, Some(path)) => {
            tracing::debug!("Using known_hosts file: {:?} (accept-new mode)", path);
            ServerCheckMethod::AcceptNew
        }
        (StrictHostKeyChecking::AcceptNew, None) => {
            tracing::debug!("No known_hosts file, accepting host keys");
            ServerCheckMethod::NoCheck
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_host_key_checking_from_str() {
        assert_eq!("yes".parse(), Ok(StrictHostKeyChecking::Yes));
        assert_eq!("TRUE".parse(), Ok(StrictHostKeyChecking::Yes));
        assert_eq!("no".parse(), Ok(StrictHostKeyChecking::No));
        assert_eq!("accept-new".parse(), Ok(StrictHostKeyChecking::AcceptNew));
        assert_eq!("tofu".parse(), Ok(StrictHostKeyChecking::AcceptNew));
        assert!("maybe".parse::<StrictHostKeyChecking>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let mode: StrictHostKeyChecking = serde_yaml::from_str("accept-new").unwrap();
        assert_eq!(mode, StrictHostKeyChecking::AcceptNew);
        assert_eq!(
            serde_yaml::to_string(&StrictHostKeyChecking::No).unwrap().trim(),
            "no"
        );
    }

    #[test]
    fn test_get_check_method() {
        assert_eq!(
            get_check_method(StrictHostKeyChecking::No),
            ServerCheckMethod::NoCheck
        );
        assert_eq!(
            get_check_method(StrictHostKeyChecking::Yes),
            ServerCheckMethod::DefaultKnownHostsFile
        );
        assert!(matches!(
            get_check_method(StrictHostKeyChecking::AcceptNew),
            ServerCheckMethod::AcceptNew | ServerCheckMethod::NoCheck
        ));
    }
}
