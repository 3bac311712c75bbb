//! Dictionary entry reads and commits.
//!
//! Each entry is one MDX file under [`DICTIONARY_DIR`], named after a
//! URL-normalized form of its title. Writes go to the contributor's fork as
//! a single commit on the submission's change branch, in one of two modes:
//!
//! - **create** for new words: no blob SHA is sent, so the remote rejects
//!   the write if a file unexpectedly exists at the path;
//! - **update** for edits: the blob SHA the editor loaded is sent as an
//!   optimistic concurrency token, so the remote rejects the write if the
//!   entry changed underneath the contributor.
//!
//! Title normalization is lossy: `"API"` and `"api"` map to the same path,
//! so differently-cased submissions of one term land on one file. Nothing
//! checks whether an unrelated entry already sits at the colliding path; a
//! create there fails on the missing SHA, an edit overwrites.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::github::{ApiError, GithubClient};
use crate::models::{ForkedRepo, ProjectRepo, WordMetadata, WordSubmission};
use crate::repo_ref::{self, RepoRef};

/// Directory inside the dictionary repository that holds all entry files.
pub const DICTIONARY_DIR: &str = "src/content/dictionary";

/// The document every entry file is rendered from.
const WORD_FILE_TEMPLATE: &str = "---
title: \"$word_title\"
---

$word_content
";

/// An existing dictionary entry as fetched from the remote.
#[derive(Debug, Clone, Serialize)]
pub struct WordEntry {
    /// The title the entry was looked up by.
    pub title: String,
    /// Path of the entry file inside the repository.
    pub path: String,
    /// Blob SHA, needed later as the concurrency token for an update.
    pub sha: String,
    /// Raw base64 body as the remote returned it.
    pub content: String,
    /// Decoded document text.
    pub content_decoded: String,
}

/// Normalize a title for use in paths and branch names: trimmed,
/// lowercased, with whitespace runs collapsed to single hyphens.
pub fn title_slug(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// The deterministic repository path for a title,
/// `src/content/dictionary/<slug>.mdx`.
pub fn word_path(title: &str) -> String {
    format!("{}/{}.mdx", DICTIONARY_DIR, title_slug(title))
}

/// Render the entry document for a title and body.
fn render_word_file(title: &str, content: &str) -> String {
    WORD_FILE_TEMPLATE
        .replace("$word_title", title)
        .replace("$word_content", content)
}

/// Commit a brand new entry to the change branch of the contributor's fork.
///
/// The file path is derived from the title; no blob SHA is supplied, making
/// this a create-only write. Returns the remote's commit result unchanged.
pub async fn write_new_word(
    client: &GithubClient,
    forked: &ForkedRepo,
    word: &WordSubmission,
) -> Result<Value> {
    let repo: RepoRef = forked.repo_fullname.parse()?;
    let path = word_path(&word.title);

    let body = json!({
        "message": format!("word: commit to \"{}\"", word.title),
        "content": BASE64.encode(render_word_file(&word.title, &word.content)),
        "branch": repo_ref::branch_name(&forked.change_branch_ref),
    });

    client
        .put(
            &format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path),
            &body,
        )
        .await
        .map_err(|source| Error::WordWrite {
            title: word.title.clone(),
            source,
        })
}

/// Commit an update to an existing entry on the change branch.
///
/// Writes to the path the entry was loaded from, supplying its blob SHA;
/// the remote answers with a conflict when that SHA is stale.
pub async fn update_existing_word(
    client: &GithubClient,
    forked: &ForkedRepo,
    word: &WordSubmission,
    metadata: &WordMetadata,
) -> Result<Value> {
    let repo: RepoRef = forked.repo_fullname.parse()?;

    let body = json!({
        "message": format!("word: edit commit to \"{}\"", word.title),
        "content": BASE64.encode(render_word_file(&word.title, &word.content)),
        "branch": repo_ref::branch_name(&forked.change_branch_ref),
        "sha": metadata.sha,
    });

    client
        .put(
            &format!(
                "/repos/{}/{}/contents/{}",
                repo.owner, repo.name, metadata.path
            ),
            &body,
        )
        .await
        .map_err(|source| Error::WordEdit {
            title: word.title.clone(),
            source,
        })
}

/// Fetch an existing entry by title from a repository's base branch.
///
/// Returns both the raw base64 body and its decoded form, plus the blob
/// SHA and path an edit submission needs.
///
/// # Errors
///
/// [`Error::WordNotFound`] when no file exists at the derived path;
/// [`Error::WordRead`] for any other failure.
pub async fn get_existing_word(
    client: &GithubClient,
    repo_details: &ProjectRepo,
    title: &str,
) -> Result<WordEntry> {
    let repo: RepoRef = repo_details.repo_fullname.parse()?;
    let path = word_path(title);

    let data = client
        .get(&format!(
            "/repos/{}/{}/contents/{}?ref={}",
            repo.owner,
            repo.name,
            path,
            repo_ref::branch_name(&repo_details.main_branch_ref)
        ))
        .await
        .map_err(|source| match source.status() {
            Some(404) => Error::WordNotFound {
                title: title.to_string(),
            },
            _ => Error::WordRead {
                title: title.to_string(),
                source,
            },
        })?;

    let content = data
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| Error::WordRead {
            title: title.to_string(),
            source: ApiError::Decode("contents response without content".into()),
        })?
        .to_string();

    let sha = data
        .get("sha")
        .and_then(|s| s.as_str())
        .ok_or_else(|| Error::WordRead {
            title: title.to_string(),
            source: ApiError::Decode("contents response without sha".into()),
        })?
        .to_string();

    let file_path = data
        .get("path")
        .and_then(|p| p.as_str())
        .unwrap_or(&path)
        .to_string();

    // The contents API wraps its base64 at 60 columns; strip the line
    // breaks before decoding.
    let packed: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let decoded = BASE64.decode(packed).map_err(|e| Error::WordRead {
        title: title.to_string(),
        source: ApiError::Decode(format!("entry body is not valid base64: {}", e)),
    })?;

    Ok(WordEntry {
        title: title.to_string(),
        path: file_path,
        sha,
        content,
        content_decoded: String::from_utf8_lossy(&decoded).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_trims() {
        assert_eq!(title_slug("  API  "), "api");
        assert_eq!(title_slug("Dependency Injection"), "dependency-injection");
    }

    #[test]
    fn slug_collapses_whitespace_runs() {
        assert_eq!(title_slug("continuous \t  integration"), "continuous-integration");
    }

    #[test]
    fn word_path_is_deterministic() {
        let first = word_path("Dependency Injection");
        let second = word_path("Dependency Injection");
        assert_eq!(first, second);
        assert_eq!(first, "src/content/dictionary/dependency-injection.mdx");
    }

    // Differently-cased titles converging on one path is intentional: the
    // dictionary keys entries by normalized term, and an unrelated entry at
    // the colliding path would be overwritten by the commit.
    #[test]
    fn case_variants_collide_on_the_same_path() {
        assert_eq!(word_path("API"), word_path("api"));
        assert_eq!(word_path("API"), word_path(" Api "));
    }

    #[test]
    fn rendered_file_carries_title_and_content() {
        let doc = render_word_file("API", "Application Programming Interface.");
        assert!(doc.starts_with("---\ntitle: \"API\"\n---\n"));
        assert!(doc.contains("Application Programming Interface."));
        assert!(!doc.contains("$word_title"));
        assert!(!doc.contains("$word_content"));
    }

    #[test]
    fn rendered_file_keeps_multiline_content() {
        let doc = render_word_file("Build", "First line.\n\nSecond paragraph.");
        assert!(doc.contains("First line.\n\nSecond paragraph."));
    }
}
