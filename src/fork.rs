//! Fork lifecycle: detect, create, and sync the contributor's fork.
//!
//! Forks are long-lived per-user staging areas; re-forking is wasteful and
//! the remote is noisy about repeat fork requests, so an existing fork is
//! detected and reused. A reused fork's base branch may have fallen behind
//! the canonical repository, and branching from a stale base would produce
//! pull requests dragging unrelated history, so the base branch is
//! fast-forwarded from upstream before it is used.
//!
//! The whole resolution either succeeds with a usable fork fullname or
//! fails as a single [`Error::ForkOperation`]; callers never need to
//! distinguish which step inside failed.

use serde_json::json;

use crate::branch::get_branch;
use crate::error::{Error, Result};
use crate::github::{ApiError, GithubClient};
use crate::models::ProjectRepo;
use crate::repo_ref::{self, RepoRef};

/// How many forks the detection query inspects. Only the first page is
/// fetched; a contributor with more forks than this may not have theirs
/// detected and would get a second fork instead.
pub const FORK_LIST_PAGE_SIZE: u64 = 100;

/// Fork listing goes through GraphQL because the REST fork-list endpoint
/// does not expose parent linkage without one extra request per repository.
const FORK_LIST_QUERY: &str = r#"
query forks($login: String!, $first: Int!) {
  user(login: $login) {
    repositories(first: $first, isFork: true) {
      nodes {
        name
        owner { login }
        parent {
          name
          owner { login }
        }
      }
    }
  }
}
"#;

/// Ensure the acting user has a usable fork of the canonical repository and
/// return its `"owner/name"` fullname.
///
/// # Workflow
///
/// 1. Resolve the acting identity to get the account login.
/// 2. Look for an existing fork whose parent is the canonical repository.
/// 3. No fork: create one (default branch only) and return it immediately;
///    a fresh fork cannot be stale.
/// 4. Fork found: compare its base branch SHA with the canonical
///    repository's and fast-forward from upstream when they differ.
///
/// # Errors
///
/// Every sub-failure is wrapped in a single [`Error::ForkOperation`] with
/// the failing step preserved as the source.
pub async fn fork_repository(client: &GithubClient, project: &ProjectRepo) -> Result<String> {
    resolve_fork(client, project)
        .await
        .map_err(|e| Error::ForkOperation {
            source: Box::new(e),
        })
}

async fn resolve_fork(client: &GithubClient, project: &ProjectRepo) -> Result<String> {
    let repo: RepoRef = project.repo_fullname.parse()?;

    let user = client.get("/user").await?;
    let login = user
        .get("login")
        .and_then(|l| l.as_str())
        .ok_or_else(|| ApiError::Decode("user response without login".into()))?
        .to_string();

    if let Some(fork) = find_existing_fork(client, &repo, &login).await? {
        if !fork_in_sync(client, project, &fork).await? {
            sync_fork(client, &fork, &project.main_branch_ref).await?;
        }
        return Ok(fork);
    }

    let path = format!("/repos/{}/{}/forks", repo.owner, repo.name);
    let created = client
        .post(&path, &json!({ "default_branch_only": true }))
        .await?;

    created
        .get("full_name")
        .and_then(|n| n.as_str())
        .map(|n| n.to_string())
        .ok_or_else(|| ApiError::Decode("fork response without full_name".into()).into())
}

/// Search the user's fork list for one whose parent is the canonical
/// repository. A linear scan over at most [`FORK_LIST_PAGE_SIZE`] entries.
///
/// An absent match is a valid "no fork yet" signal, not an error.
async fn find_existing_fork(
    client: &GithubClient,
    project_repo: &RepoRef,
    login: &str,
) -> Result<Option<String>> {
    let data = client
        .graphql(
            FORK_LIST_QUERY,
            json!({ "login": login, "first": FORK_LIST_PAGE_SIZE }),
        )
        .await?;

    let nodes = data
        .pointer("/user/repositories/nodes")
        .and_then(|n| n.as_array())
        .ok_or_else(|| ApiError::Decode("fork list response without nodes".into()))?;

    for node in nodes {
        let parent_owner = node.pointer("/parent/owner/login").and_then(|v| v.as_str());
        let parent_name = node.pointer("/parent/name").and_then(|v| v.as_str());

        if parent_owner == Some(project_repo.owner.as_str())
            && parent_name == Some(project_repo.name.as_str())
        {
            let owner = node.pointer("/owner/login").and_then(|v| v.as_str());
            let name = node.get("name").and_then(|v| v.as_str());
            if let (Some(owner), Some(name)) = (owner, name) {
                return Ok(Some(format!("{}/{}", owner, name)));
            }
        }
    }

    Ok(None)
}

/// Whether the fork's base branch points at the same commit as the
/// canonical repository's. Two ref lookups, compared by SHA.
async fn fork_in_sync(
    client: &GithubClient,
    project: &ProjectRepo,
    fork_fullname: &str,
) -> Result<bool> {
    // The fork's copy of the base branch is compared against the same ref
    // on the canonical repository.
    let fork_main = get_branch(client, fork_fullname, &project.main_branch_ref).await?;
    let project_main = get_branch(client, &project.repo_fullname, &project.main_branch_ref).await?;

    Ok(fork_main.sha == project_main.sha)
}

/// Fast-forward the fork's base branch from upstream.
async fn sync_fork(
    client: &GithubClient,
    fork_fullname: &str,
    main_branch_ref: &str,
) -> Result<()> {
    let fork: RepoRef = fork_fullname.parse()?;

    let path = format!("/repos/{}/{}/merge-upstream", fork.owner, fork.name);
    client
        .post(
            &path,
            &json!({ "branch": repo_ref::branch_name(main_branch_ref) }),
        )
        .await?;

    Ok(())
}
