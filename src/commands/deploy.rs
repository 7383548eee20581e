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

use anyhow::{Context, Result};

use crate::deploy::{DeploymentReport, Deployer};
use crate::site::TargetId;
use crate::ui::OutputFormatter;

/// Run a deployment batch and print its results.
///
/// Returns the report so the caller can pick the exit status.
pub async fn deploy_plugins(
    deployer: &Deployer,
    plugins: &[String],
    sites: &[TargetId],
    json: bool,
) -> Result<DeploymentReport> {
    if !json {
        println!(
            "{}",
            OutputFormatter::format_deploy_header(plugins, sites.len())
        );
    }

    let report = deployer.deploy(plugins, sites).await;

    if json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize deployment report")?;
        println!("{rendered}");
    } else {
        for result in &report.results {
            result.print_summary();
        }
        println!("{}", OutputFormatter::format_summary(&report.summary));
    }

    Ok(report)
}
