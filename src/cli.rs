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

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::site::TargetId;
use crate::transport::host_key::StrictHostKeyChecking;

#[derive(Parser, Debug)]
#[command(
    name = "bdeploy",
    version,
    about = "Bulk plugin deployment to remote sites over FTP and SFTP",
    long_about = "bdeploy packages local plugin directories and pushes them to any number of remote sites.\nEach remote plugin directory is replaced as a whole: it is removed, recreated and refilled\nfrom the uploaded archive. Sites on port 22 are reached over SFTP, every other port over FTP.\nSite passwords are stored encrypted in the configuration file.",
    after_help = "EXAMPLES:\n  Register a site:             bdeploy site add --name staging --url https://staging.example.com --host ftp.example.com -u deploy\n  List registered sites:       bdeploy site list\n  Deploy two plugins:          bdeploy deploy -p seo-tools,contact-form -s 1,3\n  Deploy everywhere in parallel: bdeploy deploy -p seo-tools --all-sites --parallel 4\n  Check a site's credentials:  bdeploy test 1\n\nThe vault key is read from BDEPLOY_SECRET_KEY or from --secret-key-file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        help = "Configuration file path\nDefaults to ./bdeploy.yaml when present, otherwise ~/.config/bdeploy/config.yaml"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "BDEPLOY_SECRET_KEY_FILE",
        help = "File holding the key that encrypts stored site passwords\nOverrides the BDEPLOY_SECRET_KEY environment variable"
    )]
    pub secret_key_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Host key checking mode for SFTP sites (yes/no/accept-new)\n  yes        - Strict checking against known_hosts\n  no         - Accept all host keys (insecure, testing only)\n  accept-new - Accept new hosts, reject changed keys\nOverrides defaults.strict_host_key_checking from the config file"
    )]
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Deploy plugins to sites",
        long_about = "Packages each plugin directory and replaces it on every selected site.\nEvery plugin/site pair produces one result; a failure never stops the rest of the batch.\n\nExit codes: 0 (all succeed), 1 (any failures)",
        after_help = "Examples:\n  bdeploy deploy -p seo-tools -s 1\n  bdeploy deploy -p seo-tools,contact-form -s 1,2,3\n  bdeploy deploy -p seo-tools --all-sites --parallel 4 --json"
    )]
    Deploy {
        #[arg(
            short = 'p',
            long = "plugin",
            value_delimiter = ',',
            required = true,
            help = "Plugin directory names under the plugins directory"
        )]
        plugins: Vec<String>,

        #[arg(
            short = 's',
            long = "site",
            value_delimiter = ',',
            required_unless_present = "all_sites",
            conflicts_with = "all_sites",
            help = "Site ids to deploy to (see 'bdeploy site list')"
        )]
        sites: Vec<TargetId>,

        #[arg(long, help = "Deploy to every registered site")]
        all_sites: bool,

        #[arg(long, help = "Local plugins directory (overrides config)")]
        plugins_dir: Option<PathBuf>,

        #[arg(long, help = "Number of sites processed at the same time (overrides config)")]
        parallel: Option<usize>,

        #[arg(long, help = "Connect timeout in seconds (overrides config)")]
        connect_timeout: Option<u64>,

        #[arg(long, help = "Print the deployment report as JSON")]
        json: bool,
    },

    #[command(
        about = "Test the connection to a site",
        long_about = "Connects, logs in and enters the site's remote base path, then disconnects.\n\nExit codes: 0 (reachable), 1 (any failure)"
    )]
    Test {
        #[arg(help = "Site id")]
        site: TargetId,
    },

    #[command(about = "Manage registered sites")]
    Site {
        #[command(subcommand)]
        action: SiteCommands,
    },

    #[command(about = "List plugin directories available for deployment")]
    Plugins {
        #[arg(long, help = "Local plugins directory (overrides config)")]
        plugins_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SiteCommands {
    #[command(about = "List registered sites")]
    List {
        #[arg(long, help = "Print sites as JSON (passwords are never included)")]
        json: bool,
    },

    #[command(
        about = "Register a new site",
        long_about = "Registers a site. name, url, host and username are required.\nThe password is prompted for unless --password-env names an environment variable holding it."
    )]
    Add(SiteArgs),

    #[command(
        about = "Update a registered site",
        long_about = "Updates the given fields of a site. Omitted fields keep their value.\nThe stored password is kept unless --password or --password-env is given."
    )]
    Update {
        #[arg(help = "Site id")]
        id: TargetId,

        #[command(flatten)]
        fields: SiteArgs,
    },

    #[command(about = "Remove a registered site")]
    Remove {
        #[arg(help = "Site id")]
        id: TargetId,
    },
}

/// Site fields accepted by `site add` and `site update`.
#[derive(Args, Debug, Default, Clone)]
pub struct SiteArgs {
    #[arg(long, help = "Display name")]
    pub name: Option<String>,

    #[arg(long, help = "Site URL (informational)")]
    pub url: Option<String>,

    #[arg(long, help = "FTP or SFTP host name")]
    pub host: Option<String>,

    #[arg(long, help = "Port: 22 selects SFTP, anything else FTP [default: 21]")]
    pub port: Option<u16>,

    #[arg(short = 'u', long, help = "Login name")]
    pub username: Option<String>,

    #[arg(
        long,
        help = "Remote directory holding the plugins [default: /wp-content/plugins/]"
    )]
    pub remote_path: Option<String>,

    #[arg(
        short = 'P',
        long,
        help = "Prompt for a new password"
    )]
    pub password: bool,

    #[arg(
        long,
        value_name = "VAR",
        conflicts_with = "password",
        help = "Read the password from this environment variable instead of prompting"
    )]
    pub password_env: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_accepts_delimited_lists() {
        let cli =
            Cli::try_parse_from(["bdeploy", "deploy", "-p", "a,b", "-s", "1,2", "-s", "3"]).unwrap();
        match cli.command {
            Commands::Deploy { plugins, sites, all_sites, .. } => {
                assert_eq!(plugins, vec!["a", "b"]);
                assert_eq!(sites, vec![1, 2, 3]);
                assert!(!all_sites);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_deploy_requires_sites() {
        assert!(Cli::try_parse_from(["bdeploy", "deploy", "-p", "a"]).is_err());
        assert!(Cli::try_parse_from(["bdeploy", "deploy", "-p", "a", "--all-sites"]).is_ok());
        assert!(
            Cli::try_parse_from(["bdeploy", "deploy", "-p", "a", "-s", "1", "--all-sites"]).is_err()
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bdeploy",
            "test",
            "4",
            "-vv",
            "--strict-host-key-checking",
            "no",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.strict_host_key_checking, Some(StrictHostKeyChecking::No));
        assert!(matches!(cli.command, Commands::Test { site: 4 }));
    }

    #[test]
    fn test_invalid_host_key_mode_is_rejected() {
        assert!(Cli::try_parse_from([
            "bdeploy",
            "--strict-host-key-checking",
            "maybe",
            "site",
            "list"
        ])
        .is_err());
    }

    #[test]
    fn test_site_update_fields_are_optional() {
        let cli = Cli::try_parse_from(["bdeploy", "site", "update", "2", "--port", "22"]).unwrap();
        match cli.command {
            Commands::Site {
                action: SiteCommands::Update { id, fields },
            } => {
                assert_eq!(id, 2);
                assert_eq!(fields.port, Some(22));
                assert!(fields.name.is_none());
                assert!(!fields.password);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
