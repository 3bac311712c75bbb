//! # jargons-editor CLI (`jargons`)
//!
//! Operational interface for the contribution workflow service. The HTTP
//! endpoint is the normal path for submissions; the CLI exists for running
//! the server, for maintainers driving the pipeline by hand, and for the
//! stale-branch recovery flow.
//!
//! ## Usage
//!
//! ```bash
//! jargons --config ./config/jargons.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `jargons serve` | Start the HTTP endpoint for the word editor |
//! | `jargons submit` | Run one submission through the pipeline |
//! | `jargons word get <title>` | Fetch an existing dictionary entry |
//! | `jargons branch delete <branch>` | Delete a stale change branch from your fork |
//!
//! ## Credentials
//!
//! `GITHUB_TOKEN` supplies the contributor credential; `JARGONS_BOT_TOKEN`
//! supplies the labeling credential (`serve` and `submit` only).
//!
//! ## Examples
//!
//! ```bash
//! # Start the endpoint
//! jargons serve --config ./config/jargons.toml
//!
//! # Add a word from a file
//! jargons submit --action new --title "API" --content-file ./api.md
//!
//! # Edit a word (path and sha come from `jargons word get`)
//! jargons submit --action edit --title "API" --content-file ./api.md \
//!   --path src/content/dictionary/api.mdx --sha abc123
//!
//! # Clean up after a branch collision
//! jargons branch delete word/new/api
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use jargons_editor::config::{self, Config, BOT_TOKEN_ENV, USER_TOKEN_ENV};
use jargons_editor::contribute;
use jargons_editor::github::GithubClient;
use jargons_editor::models::{Action, WordMetadata, WordSubmission};
use jargons_editor::{server, word_editor};

/// jargons-editor CLI, the contribution workflow service for jargons.dev.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file identifying the canonical dictionary repository.
#[derive(Parser)]
#[command(
    name = "jargons",
    about = "Contribution workflow service for jargons.dev",
    version,
    long_about = "Turns word editor submissions into labeled pull requests against the \
    canonical jargons.dev dictionary repository: fork, change branch, entry commit, \
    pull request, labels."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/jargons.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP endpoint for the word editor.
    ///
    /// Binds to `[server].bind` and serves the submission, recovery, and
    /// entry-read routes. Requires `JARGONS_BOT_TOKEN` in the environment.
    Serve,

    /// Run one submission through the pipeline from the command line.
    ///
    /// Forks the dictionary repository (or reuses and syncs an existing
    /// fork), creates the change branch, commits the entry, and opens a
    /// labeled pull request. Requires `GITHUB_TOKEN` and
    /// `JARGONS_BOT_TOKEN` in the environment.
    Submit {
        /// `new` to add a word, `edit` to update one.
        #[arg(long)]
        action: String,

        /// The word's title, e.g. "Dependency Injection".
        #[arg(long)]
        title: String,

        /// Markdown definition text.
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the definition from a file instead.
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Repository path of the entry being edited (edits only).
        #[arg(long, requires = "sha")]
        path: Option<String>,

        /// Blob SHA of the entry being edited (edits only).
        #[arg(long, requires = "path")]
        sha: Option<String>,
    },

    /// Dictionary entry commands.
    Word {
        #[command(subcommand)]
        action: WordCommand,
    },

    /// Change branch commands.
    Branch {
        #[command(subcommand)]
        action: BranchCommand,
    },
}

#[derive(Subcommand)]
enum WordCommand {
    /// Fetch an existing entry and print its decoded body, path, and blob
    /// SHA (the inputs an edit submission needs).
    Get {
        /// The word's title.
        title: String,
    },
}

#[derive(Subcommand)]
enum BranchCommand {
    /// Delete a stale change branch from your fork.
    ///
    /// The recovery path after a submission fails with "branch already
    /// exists": delete the leftover branch, then resubmit.
    Delete {
        /// Branch name, e.g. `word/new/api`.
        branch: String,
    },
}

fn env_client(config: &Config, var: &str) -> Result<GithubClient> {
    let token =
        std::env::var(var).with_context(|| format!("{} environment variable not set", var))?;
    GithubClient::new(token, &config.github)
        .with_context(|| "failed to construct GitHub client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Submit {
            action,
            title,
            content,
            content_file,
            path,
            sha,
        } => {
            let action: Action = action.parse()?;

            let content = match (content, content_file) {
                (Some(text), None) => text,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                _ => bail!("supply exactly one of --content or --content-file"),
            };

            let metadata = match (path, sha) {
                (Some(path), Some(sha)) => Some(WordMetadata { path, sha }),
                _ => None,
            };

            let user = env_client(&cfg, USER_TOKEN_ENV)?;
            let bot = env_client(&cfg, BOT_TOKEN_ENV)?;
            let word = WordSubmission {
                title,
                content,
                metadata,
            };

            let pr = contribute::submit_word_contribution(&user, &bot, action, &cfg.project, &word)
                .await?;

            println!("Pull request #{} opened: {}", pr.number, pr.html_url);
        }
        Commands::Word {
            action: WordCommand::Get { title },
        } => {
            let user = env_client(&cfg, USER_TOKEN_ENV)?;
            let entry = word_editor::get_existing_word(&user, &cfg.project, &title).await?;

            println!("title: {}", entry.title);
            println!("path:  {}", entry.path);
            println!("sha:   {}", entry.sha);
            println!();
            println!("{}", entry.content_decoded);
        }
        Commands::Branch {
            action: BranchCommand::Delete { branch },
        } => {
            let user = env_client(&cfg, USER_TOKEN_ENV)?;
            let status = contribute::discard_change_branch(&user, &cfg.project, &branch).await?;
            println!("Deleted {} (status {})", branch, status);
        }
    }

    Ok(())
}
