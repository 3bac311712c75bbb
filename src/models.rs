//! Shared value types for the contribution pipeline.
//!
//! These are plain value types with no identity; they are freely cloned
//! between pipeline steps. A [`ForkedRepo`] is owned by exactly one
//! in-flight submission and discarded once its pull request is open.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The canonical (upstream) dictionary repository and its default branch.
///
/// Supplied by configuration at startup and never mutated. Also reused to
/// describe a fork paired with the base branch to cut a change branch from.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRepo {
    /// `"owner/name"` fullname of the repository.
    pub repo_fullname: String,
    /// The base branch, in any ref encoding (`main`, `heads/main`,
    /// `refs/heads/main`).
    pub main_branch_ref: String,
}

/// A contributor's fork plus the working branch created for one submission.
#[derive(Debug, Clone)]
pub struct ForkedRepo {
    /// `"owner/name"` fullname of the fork.
    pub repo_fullname: String,
    /// Ref of the freshly created change branch.
    pub change_branch_ref: String,
}

/// What the editor is doing: adding a word or editing an existing one.
///
/// Determines the change branch prefix, the file-write mode (create vs
/// update), the pull request templates, and the applied labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    New,
    Edit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::New => "new",
            Action::Edit => "edit",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Action::New),
            "edit" => Ok(Action::Edit),
            other => Err(Error::InvalidSubmission {
                message: format!("unknown action {:?}, expected \"new\" or \"edit\"", other),
            }),
        }
    }
}

/// Location of the existing entry an edit is based on.
///
/// `sha` is the blob SHA of the file as the editor last saw it and acts as
/// the optimistic concurrency token: the remote rejects the update when the
/// file has changed underneath the contributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordMetadata {
    pub path: String,
    pub sha: String,
}

/// One dictionary entry submission from the editor.
#[derive(Debug, Clone)]
pub struct WordSubmission {
    /// Human-readable term, e.g. `"Dependency Injection"`.
    pub title: String,
    /// Markdown body text.
    pub content: String,
    /// Present only for edits.
    pub metadata: Option<WordMetadata>,
}

/// A branch (Git ref) as reported by the remote.
#[derive(Debug, Clone)]
pub struct BranchInfo {
    /// Fully qualified ref, `refs/heads/<name>`.
    pub branch_ref: String,
    /// Commit SHA the ref points at.
    pub sha: String,
}

/// The remote's pull request record, passed through to the caller.
///
/// The pipeline itself only reads `number` (for label attachment); the
/// remaining fields ride along in `extra` so nothing the remote reports is
/// lost on the way back to the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub html_url: String,
    pub state: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_strings() {
        for action in [Action::New, Action::Edit] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        for bad in ["delete", "NEW", ""] {
            assert!(matches!(
                bad.parse::<Action>(),
                Err(Error::InvalidSubmission { .. })
            ));
        }
    }

    #[test]
    fn pull_request_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": 7,
            "number": 42,
            "html_url": "https://github.com/jargonsdev/jargons.dev/pull/42",
            "state": "open",
            "title": "word: add \"API\"",
        });

        let pr: PullRequest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.extra["title"], "word: add \"API\"");

        let back = serde_json::to_value(&pr).unwrap();
        assert_eq!(back, raw);
    }
}
