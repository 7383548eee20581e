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

//! Result types for deployment batches.

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::error::DeployError;
use crate::site::TargetId;

pub const DEPLOYED_MESSAGE: &str = "Plugin deployed successfully";

/// Outcome of deploying one artifact to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub target_id: TargetId,
    /// Display name, absent when the target could not be resolved
    pub target_name: Option<String>,
    pub artifact_name: String,
    pub success: bool,
    pub message: String,
}

impl DeploymentResult {
    pub fn deployed(target_id: TargetId, target_name: Option<String>, artifact: &str) -> Self {
        Self {
            target_id,
            target_name,
            artifact_name: artifact.to_string(),
            success: true,
            message: DEPLOYED_MESSAGE.to_string(),
        }
    }

    pub fn failed(
        target_id: TargetId,
        target_name: Option<String>,
        artifact: &str,
        error: &DeployError,
    ) -> Self {
        Self {
            target_id,
            target_name,
            artifact_name: artifact.to_string(),
            success: false,
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    fn target_label(&self) -> String {
        match &self.target_name {
            Some(name) => format!("{} (#{})", name, self.target_id),
            None => format!("#{}", self.target_id),
        }
    }

    pub fn print_summary(&self) {
        if self.success {
            println!(
                "{} {} {}: {}",
                "●".green(),
                self.target_label().bold(),
                self.artifact_name.cyan(),
                self.message.green()
            );
        } else {
            println!(
                "{} {} {}: {}",
                "●".red(),
                self.target_label().bold(),
                self.artifact_name.cyan(),
                "Deployment failed".red()
            );
            for line in self.message.lines() {
                println!("    {}", line.dimmed());
            }
        }
    }
}

/// Totals over a batch. `total == success_count + failure_count` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

impl Summary {
    pub fn from_results(results: &[DeploymentResult]) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            success_count,
            failure_count: results.len() - success_count,
        }
    }
}

/// Everything a deployment batch produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentReport {
    pub results: Vec<DeploymentResult>,
    pub summary: Summary,
}

impl DeploymentReport {
    pub fn new(results: Vec<DeploymentResult>) -> Self {
        let summary = Summary::from_results(&results);
        Self { results, summary }
    }

    /// True when no unit failed.
    pub fn is_success(&self) -> bool {
        self.summary.failure_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let err = DeployError::target_not_found();
        let results = vec![
            DeploymentResult::deployed(1, Some("a".into()), "demo"),
            DeploymentResult::failed(2, None, "demo", &err),
            DeploymentResult::deployed(3, Some("c".into()), "demo"),
        ];
        let report = DeploymentReport::new(results);
        assert_eq!(
            report.summary,
            Summary {
                total: 3,
                success_count: 2,
                failure_count: 1
            }
        );
        assert!(!report.is_success());
        assert_eq!(report.results[1].message, "Target not found");
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = DeploymentReport::new(Vec::new());
        assert_eq!(report.summary, Summary::default());
        assert!(report.is_success());
    }

    #[test]
    fn test_json_shape() {
        let report = DeploymentReport::new(vec![DeploymentResult::deployed(
            7,
            Some("prod".into()),
            "demo",
        )]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["success_count"], 1);
        assert_eq!(value["results"][0]["target_id"], 7);
        assert_eq!(value["results"][0]["message"], DEPLOYED_MESSAGE);
    }
}
