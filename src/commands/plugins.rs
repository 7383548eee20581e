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
use owo_colors::OwoColorize;

use crate::artifact::DirectoryArtifactProvider;

pub fn list_plugins(provider: &DirectoryArtifactProvider) -> Result<()> {
    let names = provider.available().with_context(|| {
        format!(
            "Failed to read plugins directory {}",
            provider.root().display()
        )
    })?;

    if names.is_empty() {
        println!(
            "{} {}",
            "No plugins found in".dimmed(),
            provider.root().display().to_string().dimmed()
        );
        return Ok(());
    }

    println!(
        "\n{} {} ({})\n",
        "▶".cyan(),
        "Available plugins".bold(),
        provider.root().display().to_string().dimmed()
    );
    for name in names {
        println!("  {} {}", "•".blue(), name);
    }
    println!();
    Ok(())
}
