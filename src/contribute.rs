//! The end-to-end contribution pipeline.
//!
//! One submission runs fork -> branch -> commit -> pull request as a
//! strictly sequential pipeline: each step's output is an input to the
//! next, and the first failure propagates to the caller with its variant
//! intact. There is no rollback; a fork, branch, or commit left behind by
//! a later failure stays on the remote, and a resubmission with the same
//! title and action collides on [`Error::BranchAlreadyExists`], which is
//! how the contributor discovers and resolves the partial state.
//!
//! [`discard_change_branch`] is the sanctioned remediation for that
//! collision, exposed as its own operation. Nothing retries automatically.

use crate::branch::{create_branch, delete_branch};
use crate::error::{Error, Result};
use crate::fork::fork_repository;
use crate::github::GithubClient;
use crate::models::{Action, ForkedRepo, ProjectRepo, PullRequest, WordSubmission};
use crate::submit::submit_word;
use crate::word_editor::{title_slug, update_existing_word, write_new_word};

/// The deterministic change branch name for a submission,
/// `word/<action>/<slug>`.
pub fn change_branch_name(action: Action, title: &str) -> String {
    format!("word/{}/{}", action, title_slug(title))
}

/// Run one submission through the full pipeline and return the opened pull
/// request.
///
/// # Workflow
///
/// 1. Resolve the contributor's fork, creating or syncing it as needed.
/// 2. Create the change branch on the fork, based off the fork's copy of
///    the canonical base branch.
/// 3. Commit the entry: a create for [`Action::New`], an update (with the
///    submission's blob SHA) for [`Action::Edit`].
/// 4. Open the pull request and label it.
///
/// # Errors
///
/// Each step's error propagates unmodified. Two cases deserve the caller's
/// attention: [`Error::BranchAlreadyExists`] from step 2, which should be
/// offered to the contributor as a delete-and-resubmit choice, and
/// [`Error::WordSubmission`] from step 4, after which the pull request may
/// already exist unlabeled.
pub async fn submit_word_contribution(
    user_client: &GithubClient,
    bot_client: &GithubClient,
    action: Action,
    project: &ProjectRepo,
    word: &WordSubmission,
) -> Result<PullRequest> {
    let fork_fullname = fork_repository(user_client, project).await?;

    let branch = create_branch(
        user_client,
        &ProjectRepo {
            repo_fullname: fork_fullname.clone(),
            main_branch_ref: project.main_branch_ref.clone(),
        },
        &change_branch_name(action, &word.title),
    )
    .await?;

    let forked = ForkedRepo {
        repo_fullname: fork_fullname,
        change_branch_ref: branch.branch_ref,
    };

    match action {
        Action::New => {
            write_new_word(user_client, &forked, word).await?;
        }
        Action::Edit => {
            let Some(metadata) = &word.metadata else {
                return Err(Error::InvalidSubmission {
                    message: format!(
                        "edit of {:?} is missing the entry path and blob sha",
                        word.title
                    ),
                });
            };
            update_existing_word(user_client, &forked, word, metadata).await?;
        }
    }

    submit_word(bot_client, user_client, action, project, &forked, word).await
}

/// Delete a stale change branch from the contributor's fork so the
/// submission can be retried.
///
/// Resolves the fork the same way a submission does (an existing fork is
/// reused as-is) and removes the named branch. Returns the remote's status
/// code, `204` on success.
pub async fn discard_change_branch(
    user_client: &GithubClient,
    project: &ProjectRepo,
    branch_name: &str,
) -> Result<u16> {
    let fork_fullname = fork_repository(user_client, project).await?;
    delete_branch(user_client, &fork_fullname, branch_name).await
}
