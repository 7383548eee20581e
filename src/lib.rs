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

//! Bulk plugin deployment over FTP and SFTP.
//!
//! Local plugin directories are zipped, uploaded to each selected site and
//! unpacked in place of the previous copy. See [`deploy::Deployer`] for the
//! entry point.

pub mod artifact;
pub mod cli;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod packager;
pub mod replacer;
pub mod security;
pub mod site;
pub mod transport;
pub mod ui;
pub mod utils;
pub mod vault;

pub use cli::Cli;
pub use config::Config;
pub use deploy::{DeployOptions, Deployer, DeploymentReport, DeploymentResult, Summary};
pub use error::{DeployError, Result};
pub use site::{SiteRepository, SiteStore, Target, TargetId};
pub use transport::{Transport, TransportFactory, TransportKind};
pub use vault::CredentialVault;
