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

use owo_colors::OwoColorize;

use crate::deploy::Deployer;
use crate::site::TargetId;

/// Check that a site can be reached and logged into. Returns whether it could.
pub async fn test_site(deployer: &Deployer, site: TargetId, label: &str) -> bool {
    println!("\n{} {} {}\n", "▶".cyan(), "Testing".bold(), label.bold());

    match deployer.test_connection(site).await {
        Ok(()) => {
            println!("  {} {}", "●".green(), "Connection successful".green());
            true
        }
        Err(e) => {
            println!("  {} {}", "●".red(), "Connection failed".red());
            println!("    {} {}", "└".dimmed(), e.to_string().dimmed());
            false
        }
    }
}
