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

use crate::deploy::Summary;
use crate::site::Target;
use crate::transport::TransportKind;

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format_deploy_header(plugins: &[String], site_count: usize) -> String {
        format!(
            "\n{} {} {} to {} {}:\n{}\n",
            "►".cyan().bold(),
            "Deploying".cyan(),
            if plugins.len() == 1 { "plugin" } else { "plugins" },
            site_count.to_string().bold(),
            if site_count == 1 { "site" } else { "sites" },
            format!("  {}", plugins.join(", ")).dimmed()
        )
    }

    pub fn format_summary(summary: &Summary) -> String {
        let mut parts = Vec::new();

        parts.push(format!(
            "{} {}",
            summary.total.to_string().bold(),
            if summary.total == 1 { "deployment" } else { "deployments" }
        ));

        if summary.success_count > 0 {
            parts.push(format!(
                "{} {}",
                summary.success_count.to_string().green().bold(),
                "successful".green()
            ));
        }

        if summary.failure_count > 0 {
            parts.push(format!(
                "{} {}",
                summary.failure_count.to_string().red().bold(),
                "failed".red()
            ));
        }

        let rule = "═".repeat(terminal_width());
        format!(
            "\n{}\n{}\n{}\n",
            rule.dimmed(),
            format!(" Summary: {} ", parts.join(" • ")).bold(),
            rule.dimmed()
        )
    }

    /// One line per site; secrets are never shown.
    pub fn format_site_table(sites: &[&Target]) -> String {
        if sites.is_empty() {
            return format!("{}\n", "No sites registered".dimmed());
        }

        let name_width = sites
            .iter()
            .map(|t| t.name.chars().count())
            .max()
            .unwrap_or(0)
            .clamp(4, 32);

        let mut output = String::new();
        for site in sites {
            let name: String = site.name.chars().take(name_width).collect();
            output.push_str(&format!(
                "{:>4}  {:<width$}  {:<4}  {}@{}:{}{}\n",
                format!("#{}", site.id).bold(),
                name,
                TransportKind::select(site.port).to_string().cyan(),
                site.username,
                site.host,
                site.port,
                site.remote_base_path.dimmed(),
                width = name_width
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_only_nonzero_counts() {
        let text = OutputFormatter::format_summary(&Summary {
            total: 3,
            success_count: 3,
            failure_count: 0,
        });
        assert!(text.contains("deployments"));
        assert!(text.contains("successful"));
        assert!(!text.contains("failed"));
    }

    #[test]
    fn test_empty_site_table() {
        assert!(OutputFormatter::format_site_table(&[]).contains("No sites registered"));
    }
}
