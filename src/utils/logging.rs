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

use tracing_subscriber::EnvFilter;

/// Create an environment filter based on verbosity level
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        // RUST_LOG wins so transport libraries can be debugged directly
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            0 => EnvFilter::new("bdeploy=warn"),
            1 => EnvFilter::new("bdeploy=info"),
            // -vv: protocol chatter from both transport libraries
            2 => EnvFilter::new("bdeploy=debug,russh=debug,suppaftp=debug"),
            _ => EnvFilter::new("bdeploy=trace,russh=trace,russh_sftp=debug,suppaftp=trace"),
        }
    }
}

/// Initialize console logging on stderr.
///
/// Reports go to stdout, so logs must not interleave with `--json` output.
pub fn init_logging(verbosity: u8) {
    let filter = create_env_filter(verbosity);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity > 1)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_env_filter() {
        for verbosity in 0..=3 {
            let _ = create_env_filter(verbosity);
        }
    }
}
