//! TOML configuration parsing.
//!
//! ```toml
//! [project]
//! repo_fullname = "jargonsdev/jargons.dev"
//! main_branch_ref = "refs/heads/main"
//!
//! [github]
//! # api_base = "https://api.github.com"   # override for GitHub Enterprise
//! # timeout_secs = 30
//!
//! [server]
//! bind = "127.0.0.1:8730"
//! ```
//!
//! Credentials never live in the file. The bot token is read from the
//! `JARGONS_BOT_TOKEN` environment variable at server startup; the
//! contributor's token arrives per request (`Authorization: Bearer`) or
//! from `GITHUB_TOKEN` for CLI use.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::ProjectRepo;
use crate::repo_ref::RepoRef;

/// Environment variable holding the privileged bot credential.
pub const BOT_TOKEN_ENV: &str = "JARGONS_BOT_TOKEN";

/// Environment variable holding the contributor token for CLI use.
pub const USER_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The canonical dictionary repository all contributions target.
    pub project: ProjectRepo,
    #[serde(default)]
    pub github: GithubConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// Base URL of the GitHub API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-request timeout for API calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the HTTP endpoint binds to, e.g. `"127.0.0.1:8730"`.
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate project
    config
        .project
        .repo_fullname
        .parse::<RepoRef>()
        .with_context(|| "project.repo_fullname must be \"owner/name\"")?;

    if config.project.main_branch_ref.trim().is_empty() {
        anyhow::bail!("project.main_branch_ref must not be empty");
    }

    // Validate github
    if config.github.timeout_secs == 0 {
        anyhow::bail!("github.timeout_secs must be > 0");
    }

    if !config.github.api_base.starts_with("http") {
        anyhow::bail!(
            "github.api_base must be an http(s) URL, got '{}'",
            config.github.api_base
        );
    }

    // Validate server
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}
