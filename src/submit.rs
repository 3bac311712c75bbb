//! Pull request creation and labeling.
//!
//! The final pipeline step: open a pull request from the submission's
//! change branch on the contributor's fork to the canonical repository's
//! base branch, then attach taxonomy labels.
//!
//! Two credentials are involved. The pull request is opened with the
//! contributor's own token so authorship and contribution stats land on
//! the right account; labels are attached with the bot credential because
//! label management needs permissions user OAuth tokens do not have on
//! the dictionary repository.

use serde_json::json;

use crate::error::{Error, Result};
use crate::github::GithubClient;
use crate::models::{Action, ForkedRepo, ProjectRepo, PullRequest, WordSubmission};
use crate::repo_ref::{self, RepoRef};

/// Label marking a pull request that adds a word.
pub const LABEL_NEW_WORD: &str = "new-word";
/// Label marking a pull request that edits a word.
pub const LABEL_EDIT_WORD: &str = "edit-word";
/// Label marking any pull request produced by the word editor.
pub const LABEL_VIA_EDITOR: &str = "via-editor";

const NEW_WORD_PR_TITLE: &str = "word: add \"$word_title\"";
const NEW_WORD_PR_BODY: &str = "This pull request adds **$word_title** to the dictionary.

## Definition

$word_content

---
Submitted via the jargons.dev word editor.
";

const EDIT_WORD_PR_TITLE: &str = "word: edit \"$word_title\"";
const EDIT_WORD_PR_BODY: &str = "This pull request updates the definition of **$word_title**.

## Updated definition

$word_content

---
Submitted via the jargons.dev word editor.
";

/// The labels applied for an action: its kind label plus the editor marker.
pub fn labels_for(action: Action) -> [&'static str; 2] {
    match action {
        Action::New => [LABEL_NEW_WORD, LABEL_VIA_EDITOR],
        Action::Edit => [LABEL_EDIT_WORD, LABEL_VIA_EDITOR],
    }
}

fn render(template: &str, word: &WordSubmission) -> String {
    template
        .replace("$word_title", &word.title)
        .replace("$word_content", &word.content)
}

/// Open the pull request for a submission and label it.
///
/// `head` is `"<forkOwner>:<changeBranch>"`, `base` is the canonical
/// repository's base branch name. The pull request is created with
/// `maintainers_can_modify` so maintainers can push fixups directly to the
/// contributor's branch.
///
/// # Errors
///
/// Any failure, in pull request creation or label attachment, surfaces as
/// [`Error::WordSubmission`]. A label failure after successful creation
/// still errors even though the pull request exists by then.
pub async fn submit_word(
    bot_client: &GithubClient,
    user_client: &GithubClient,
    action: Action,
    project: &ProjectRepo,
    forked: &ForkedRepo,
    word: &WordSubmission,
) -> Result<PullRequest> {
    finalize(bot_client, user_client, action, project, forked, word)
        .await
        .map_err(|e| Error::WordSubmission {
            title: word.title.clone(),
            source: Box::new(e),
        })
}

async fn finalize(
    bot_client: &GithubClient,
    user_client: &GithubClient,
    action: Action,
    project: &ProjectRepo,
    forked: &ForkedRepo,
    word: &WordSubmission,
) -> Result<PullRequest> {
    let repo: RepoRef = project.repo_fullname.parse()?;
    let fork: RepoRef = forked.repo_fullname.parse()?;

    let base = repo_ref::branch_name(&project.main_branch_ref);
    let head = format!(
        "{}:{}",
        fork.owner,
        repo_ref::branch_name(&forked.change_branch_ref)
    );

    let (title_template, body_template) = match action {
        Action::New => (NEW_WORD_PR_TITLE, NEW_WORD_PR_BODY),
        Action::Edit => (EDIT_WORD_PR_TITLE, EDIT_WORD_PR_BODY),
    };

    let created = user_client
        .post(
            &format!("/repos/{}/{}/pulls", repo.owner, repo.name),
            &json!({
                "head": head,
                "base": base,
                "title": render(title_template, word),
                "body": render(body_template, word),
                "maintainers_can_modify": true,
            }),
        )
        .await?;

    let pull_request: PullRequest = serde_json::from_value(created).map_err(|e| {
        crate::github::ApiError::Decode(format!("malformed pull request response: {}", e))
    })?;

    bot_client
        .post(
            &format!(
                "/repos/{}/{}/issues/{}/labels",
                repo.owner, repo.name, pull_request.number
            ),
            &json!({ "labels": labels_for(action) }),
        )
        .await?;

    Ok(pull_request)
}
