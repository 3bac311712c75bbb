//! Branch (Git ref) operations on a remote repository.
//!
//! Every operation here is a single remote call with no cached state; the
//! branch either exists on the remote or it does not. Failures are
//! classified into the variants callers can act on: `BranchNotFound`,
//! `BranchAccess`, and, for creation, `BranchAlreadyExists`, which is the
//! one with a recovery path (delete the stale branch and resubmit, see
//! [`crate::contribute::discard_change_branch`]).

use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::github::{ApiError, GithubClient};
use crate::models::{BranchInfo, ProjectRepo};
use crate::repo_ref::{self, RepoRef};

/// Wire shape of `GET/POST .../git/ref(s)` responses.
#[derive(Deserialize)]
struct RefResponse {
    #[serde(rename = "ref")]
    branch_ref: String,
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

fn decode_ref(value: serde_json::Value) -> Result<BranchInfo> {
    let resp: RefResponse = serde_json::from_value(value).map_err(|e| Error::BranchOperation {
        source: ApiError::Decode(format!("malformed git ref response: {}", e)),
    })?;

    Ok(BranchInfo {
        branch_ref: resp.branch_ref,
        sha: resp.object.sha,
    })
}

/// Classify an API failure for a ref lookup or creation.
fn classify(branch: &str, source: ApiError) -> Error {
    match source.status() {
        Some(404) => Error::BranchNotFound {
            branch: branch.to_string(),
            source,
        },
        Some(401) | Some(403) => Error::BranchAccess {
            branch: branch.to_string(),
            source,
        },
        Some(422)
            if source
                .remote_message()
                .is_some_and(|m| m.contains("already exists")) =>
        {
            Error::BranchAlreadyExists {
                branch: branch.to_string(),
            }
        }
        _ => Error::BranchOperation { source },
    }
}

/// Fetch ref metadata for a branch.
///
/// `branch_ref` may be in any encoding; it is normalized to the
/// `heads/<name>` form the lookup endpoint expects.
pub async fn get_branch(
    client: &GithubClient,
    repo_fullname: &str,
    branch_ref: &str,
) -> Result<BranchInfo> {
    let repo: RepoRef = repo_fullname.parse()?;
    let name = repo_ref::branch_name(branch_ref);

    let path = format!(
        "/repos/{}/{}/git/ref/{}",
        repo.owner,
        repo.name,
        repo_ref::heads(name)
    );

    let data = client
        .get(&path)
        .await
        .map_err(|e| classify(name, e))?;

    decode_ref(data)
}

/// Create a branch pointing at the current commit of a base branch.
///
/// Looks up `details.main_branch_ref` on `details.repo_fullname` to get the
/// base commit SHA, then creates `refs/heads/<new_branch_name>` at that SHA.
///
/// # Errors
///
/// [`Error::BranchAlreadyExists`] when a ref of that name is already
/// present, which callers surface to the contributor as a
/// delete-and-resubmit choice. Base branch lookup failures propagate from
/// [`get_branch`] unchanged.
pub async fn create_branch(
    client: &GithubClient,
    details: &ProjectRepo,
    new_branch_name: &str,
) -> Result<BranchInfo> {
    let repo: RepoRef = details.repo_fullname.parse()?;
    let base = get_branch(client, &details.repo_fullname, &details.main_branch_ref).await?;

    let path = format!("/repos/{}/{}/git/refs", repo.owner, repo.name);
    let body = json!({
        "ref": repo_ref::refs_heads(new_branch_name),
        "sha": base.sha,
    });

    let data = client
        .post(&path, &body)
        .await
        .map_err(|e| classify(new_branch_name, e))?;

    decode_ref(data)
}

/// Delete a branch ref. Returns the remote's status code (`204` on
/// success).
///
/// Used only by the conflict-recovery path, never by the happy path. Any
/// failure, including "ref does not exist", is a plain
/// [`Error::BranchOperation`]; whether a missing ref is fatal is the
/// caller's call.
pub async fn delete_branch(
    client: &GithubClient,
    repo_fullname: &str,
    branch_name: &str,
) -> Result<u16> {
    let repo: RepoRef = repo_fullname.parse()?;

    let path = format!(
        "/repos/{}/{}/git/refs/{}",
        repo.owner,
        repo.name,
        repo_ref::heads(branch_name)
    );

    client
        .delete(&path)
        .await
        .map_err(|source| Error::BranchOperation { source })
}
