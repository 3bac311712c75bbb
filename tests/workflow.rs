//! End-to-end pipeline tests against an in-process GitHub API double.
//!
//! The mock implements just enough of the REST + GraphQL surface the
//! pipeline touches (identity, fork list, fork creation, git refs, file
//! contents, merge-upstream, pull requests, labels) and records every
//! mutation so tests can assert on exactly which remote calls a scenario
//! performed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use jargons_editor::config::GithubConfig;
use jargons_editor::contribute::{discard_change_branch, submit_word_contribution};
use jargons_editor::github::GithubClient;
use jargons_editor::models::{Action, ProjectRepo, WordMetadata, WordSubmission};
use jargons_editor::word_editor::get_existing_word;
use jargons_editor::Error;

const CANONICAL: &str = "jargonsdev/jargons.dev";
const CANONICAL_SHA: &str = "canonical-sha-1";
const USER_FORK: &str = "testuser/jargons.dev";

// ============ Mock GitHub ============

#[derive(Default)]
struct MockGithub {
    login: String,
    /// fork fullname -> parent fullname
    forks: HashMap<String, String>,
    /// repo fullname -> branch name -> commit sha
    branches: HashMap<String, HashMap<String, String>>,
    /// "fullname:path" -> (blob sha, base64 content)
    files: HashMap<String, (String, String)>,
    fork_creations: usize,
    /// fork fullnames that received a merge-upstream call, in order
    merge_upstream_calls: Vec<String>,
    /// recorded contents writes: (path, request body)
    content_writes: Vec<(String, Value)>,
    prs: Vec<Value>,
    /// pull request number -> attached labels
    labels: HashMap<u64, Vec<String>>,
}

type Shared = Arc<Mutex<MockGithub>>;

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({ "message": "Not Found" }))
}

async fn mock_user(State(state): State<Shared>) -> Response {
    let s = state.lock().unwrap();
    json_response(StatusCode::OK, json!({ "login": s.login, "id": 12345 }))
}

async fn mock_graphql(State(state): State<Shared>) -> Response {
    let s = state.lock().unwrap();

    let nodes: Vec<Value> = s
        .forks
        .iter()
        .map(|(fork, parent)| {
            let (fork_owner, fork_name) = fork.split_once('/').unwrap();
            let (parent_owner, parent_name) = parent.split_once('/').unwrap();
            json!({
                "name": fork_name,
                "owner": { "login": fork_owner },
                "parent": {
                    "name": parent_name,
                    "owner": { "login": parent_owner },
                },
            })
        })
        .collect();

    json_response(
        StatusCode::OK,
        json!({ "data": { "user": { "repositories": { "nodes": nodes } } } }),
    )
}

async fn mock_create_fork(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    let mut s = state.lock().unwrap();
    s.fork_creations += 1;

    let parent = format!("{}/{}", owner, repo);
    let fork = format!("{}/{}", s.login, repo);
    let parent_branches = s.branches.get(&parent).cloned().unwrap_or_default();

    s.forks.insert(fork.clone(), parent);
    s.branches.insert(fork.clone(), parent_branches);

    json_response(StatusCode::ACCEPTED, json!({ "full_name": fork }))
}

async fn mock_get_ref(
    State(state): State<Shared>,
    Path((owner, repo, r)): Path<(String, String, String)>,
) -> Response {
    let s = state.lock().unwrap();
    let fullname = format!("{}/{}", owner, repo);
    let name = r.strip_prefix("heads/").unwrap_or(&r);

    match s.branches.get(&fullname).and_then(|b| b.get(name)) {
        Some(sha) => json_response(
            StatusCode::OK,
            json!({ "ref": format!("refs/heads/{}", name), "object": { "sha": sha } }),
        ),
        None => not_found(),
    }
}

async fn mock_create_ref(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let fullname = format!("{}/{}", owner, repo);

    let full_ref = body["ref"].as_str().unwrap_or_default().to_string();
    let name = full_ref
        .strip_prefix("refs/heads/")
        .unwrap_or(&full_ref)
        .to_string();
    let sha = body["sha"].as_str().unwrap_or_default().to_string();

    let branches = s.branches.entry(fullname).or_default();
    if branches.contains_key(&name) {
        return json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "message": "Reference already exists" }),
        );
    }

    branches.insert(name, sha.clone());
    json_response(
        StatusCode::CREATED,
        json!({ "ref": full_ref, "object": { "sha": sha } }),
    )
}

async fn mock_delete_ref(
    State(state): State<Shared>,
    Path((owner, repo, r)): Path<(String, String, String)>,
) -> Response {
    let mut s = state.lock().unwrap();
    let fullname = format!("{}/{}", owner, repo);
    let name = r.strip_prefix("heads/").unwrap_or(&r).to_string();

    match s.branches.get_mut(&fullname).and_then(|b| b.remove(&name)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "message": "Reference does not exist" }),
        ),
    }
}

async fn mock_put_contents(
    State(state): State<Shared>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let key = format!("{}/{}:{}", owner, repo, path);

    // Optimistic concurrency: an update whose sha no longer matches the
    // stored blob is rejected.
    if let Some(supplied) = body.get("sha").and_then(|v| v.as_str()) {
        if let Some((current, _)) = s.files.get(&key) {
            if current != supplied {
                return json_response(
                    StatusCode::CONFLICT,
                    json!({ "message": format!("{} does not match", supplied) }),
                );
            }
        }
    }

    let new_sha = format!("blob-sha-{}", s.content_writes.len() + 1);
    let content = body["content"].as_str().unwrap_or_default().to_string();
    s.files.insert(key, (new_sha.clone(), content));
    s.content_writes.push((path, body));

    json_response(
        StatusCode::CREATED,
        json!({ "content": { "sha": new_sha }, "commit": { "sha": format!("commit-{}", new_sha) } }),
    )
}

async fn mock_get_contents(
    State(state): State<Shared>,
    Path((owner, repo, path)): Path<(String, String, String)>,
) -> Response {
    let s = state.lock().unwrap();
    let key = format!("{}/{}:{}", owner, repo, path);

    match s.files.get(&key) {
        Some((sha, content)) => {
            let name = path.rsplit('/').next().unwrap_or(&path);
            json_response(
                StatusCode::OK,
                json!({ "content": content, "sha": sha, "path": path, "name": name }),
            )
        }
        None => not_found(),
    }
}

async fn mock_merge_upstream(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let fork = format!("{}/{}", owner, repo);
    let branch = body["branch"].as_str().unwrap_or_default().to_string();

    let upstream_sha = s
        .forks
        .get(&fork)
        .and_then(|parent| s.branches.get(parent))
        .and_then(|b| b.get(&branch))
        .cloned();

    match upstream_sha {
        Some(sha) => {
            s.merge_upstream_calls.push(fork.clone());
            s.branches.entry(fork).or_default().insert(branch, sha);
            json_response(
                StatusCode::OK,
                json!({ "message": "Successfully fetched and fast-forwarded from upstream", "merge_type": "fast-forward" }),
            )
        }
        None => not_found(),
    }
}

async fn mock_create_pull(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let number = (s.prs.len() + 1) as u64;

    let pr = json!({
        "id": 1000 + number,
        "number": number,
        "html_url": format!("https://github.com/{}/{}/pull/{}", owner, repo, number),
        "state": "open",
        "title": body["title"],
        "body": body["body"],
        "head": body["head"],
        "base": body["base"],
        "maintainers_can_modify": body["maintainers_can_modify"],
    });

    s.prs.push(pr.clone());
    json_response(StatusCode::CREATED, pr)
}

async fn mock_add_labels(
    State(state): State<Shared>,
    Path((_owner, _repo, number)): Path<(String, String, u64)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    let labels: Vec<String> = body["labels"]
        .as_array()
        .map(|l| {
            l.iter()
                .filter_map(|v| v.as_str().map(|v| v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    s.labels.insert(number, labels);
    json_response(StatusCode::OK, json!([]))
}

async fn spawn_mock(state: Shared) -> String {
    let app = Router::new()
        .route("/user", get(mock_user))
        .route("/graphql", post(mock_graphql))
        .route("/repos/{owner}/{repo}/forks", post(mock_create_fork))
        .route("/repos/{owner}/{repo}/git/ref/{*r}", get(mock_get_ref))
        .route("/repos/{owner}/{repo}/git/refs", post(mock_create_ref))
        .route(
            "/repos/{owner}/{repo}/git/refs/{*r}",
            axum::routing::delete(mock_delete_ref),
        )
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            put(mock_put_contents).get(mock_get_contents),
        )
        .route(
            "/repos/{owner}/{repo}/merge-upstream",
            post(mock_merge_upstream),
        )
        .route("/repos/{owner}/{repo}/pulls", post(mock_create_pull))
        .route(
            "/repos/{owner}/{repo}/issues/{number}/labels",
            post(mock_add_labels),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

// ============ Harness ============

struct Harness {
    state: Shared,
    user: GithubClient,
    bot: GithubClient,
    project: ProjectRepo,
}

async fn harness() -> Harness {
    let mut mock = MockGithub {
        login: "testuser".to_string(),
        ..Default::default()
    };
    mock.branches.insert(
        CANONICAL.to_string(),
        HashMap::from([("main".to_string(), CANONICAL_SHA.to_string())]),
    );

    let state = Arc::new(Mutex::new(mock));
    let api_base = spawn_mock(state.clone()).await;

    let github = GithubConfig {
        api_base,
        timeout_secs: 5,
    };

    Harness {
        state,
        user: GithubClient::new("user-token", &github).unwrap(),
        bot: GithubClient::new("bot-token", &github).unwrap(),
        project: ProjectRepo {
            repo_fullname: CANONICAL.to_string(),
            main_branch_ref: "refs/heads/main".to_string(),
        },
    }
}

/// Seed an existing fork whose base branch points at `sha`.
fn seed_fork(harness: &Harness, sha: &str) {
    let mut s = harness.state.lock().unwrap();
    s.forks.insert(USER_FORK.to_string(), CANONICAL.to_string());
    s.branches.insert(
        USER_FORK.to_string(),
        HashMap::from([("main".to_string(), sha.to_string())]),
    );
}

fn word(title: &str, content: &str) -> WordSubmission {
    WordSubmission {
        title: title.to_string(),
        content: content.to_string(),
        metadata: None,
    }
}

// ============ Scenarios ============

#[tokio::test]
async fn new_word_with_no_existing_fork() {
    let h = harness().await;
    let submission = word("API", "Application Programming Interface.");

    let pr = submit_word_contribution(&h.user, &h.bot, Action::New, &h.project, &submission)
        .await
        .unwrap();

    let s = h.state.lock().unwrap();

    // Fork was created exactly once, and a fresh fork is never synced.
    assert_eq!(s.fork_creations, 1);
    assert!(s.merge_upstream_calls.is_empty());

    // Change branch cut from the canonical base commit.
    assert_eq!(s.branches[USER_FORK]["word/new/api"], CANONICAL_SHA);

    // Entry committed in create mode: derived path, no sha field.
    let (path, body) = &s.content_writes[0];
    assert_eq!(path, "src/content/dictionary/api.mdx");
    assert!(body.get("sha").is_none());
    assert_eq!(body["branch"], "word/new/api");
    assert_eq!(body["message"], "word: commit to \"API\"");

    let committed = BASE64
        .decode(body["content"].as_str().unwrap())
        .unwrap();
    let committed = String::from_utf8(committed).unwrap();
    assert!(committed.contains("title: \"API\""));
    assert!(committed.contains("Application Programming Interface."));

    // Pull request from the fork branch to canonical main, labeled by kind.
    assert_eq!(pr.number, 1);
    assert_eq!(pr.state, "open");
    assert_eq!(s.prs[0]["head"], "testuser:word/new/api");
    assert_eq!(s.prs[0]["base"], "main");
    assert_eq!(s.prs[0]["maintainers_can_modify"], true);
    assert_eq!(s.prs[0]["title"], "word: add \"API\"");
    assert_eq!(s.labels[&1], vec!["new-word", "via-editor"]);
}

#[tokio::test]
async fn edit_word_with_stale_fork_syncs_before_branching() {
    let h = harness().await;
    seed_fork(&h, "stale-sha-0");
    {
        let mut s = h.state.lock().unwrap();
        s.files.insert(
            format!("{}:src/content/dictionary/api.mdx", USER_FORK),
            ("abc123".to_string(), BASE64.encode("old definition")),
        );
    }

    let submission = WordSubmission {
        title: "API".to_string(),
        content: "updated".to_string(),
        metadata: Some(WordMetadata {
            path: "src/content/dictionary/api.mdx".to_string(),
            sha: "abc123".to_string(),
        }),
    };

    let pr = submit_word_contribution(&h.user, &h.bot, Action::Edit, &h.project, &submission)
        .await
        .unwrap();

    let s = h.state.lock().unwrap();

    // The existing fork was reused and fast-forwarded exactly once.
    assert_eq!(s.fork_creations, 0);
    assert_eq!(s.merge_upstream_calls, vec![USER_FORK.to_string()]);

    // The sync happened before branching: the change branch points at the
    // canonical commit, not the stale one.
    assert_eq!(s.branches[USER_FORK]["word/edit/api"], CANONICAL_SHA);

    // Entry committed in update mode with the supplied concurrency token.
    let (path, body) = &s.content_writes[0];
    assert_eq!(path, "src/content/dictionary/api.mdx");
    assert_eq!(body["sha"], "abc123");
    assert_eq!(body["message"], "word: edit commit to \"API\"");

    assert_eq!(pr.number, 1);
    assert_eq!(s.prs[0]["title"], "word: edit \"API\"");
    assert_eq!(s.labels[&1], vec!["edit-word", "via-editor"]);
}

#[tokio::test]
async fn in_sync_fork_is_reused_without_merge() {
    let h = harness().await;
    seed_fork(&h, CANONICAL_SHA);

    submit_word_contribution(
        &h.user,
        &h.bot,
        Action::New,
        &h.project,
        &word("Cache", "Fast intermediate storage."),
    )
    .await
    .unwrap();

    let s = h.state.lock().unwrap();
    assert_eq!(s.fork_creations, 0);
    assert!(s.merge_upstream_calls.is_empty());
}

#[tokio::test]
async fn duplicate_submission_collides_then_recovers_via_branch_delete() {
    let h = harness().await;
    let submission = word("API", "Application Programming Interface.");

    submit_word_contribution(&h.user, &h.bot, Action::New, &h.project, &submission)
        .await
        .unwrap();

    // Same title and action again: the change branch still exists.
    let err = submit_word_contribution(&h.user, &h.bot, Action::New, &h.project, &submission)
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::BranchAlreadyExists { ref branch } if branch == "word/new/api"),
        "expected BranchAlreadyExists, got {:?}",
        err
    );

    // The sanctioned recovery: delete the stale branch, then resubmit.
    let status = discard_change_branch(&h.user, &h.project, "word/new/api")
        .await
        .unwrap();
    assert_eq!(status, 204);
    assert!(!h.state.lock().unwrap().branches[USER_FORK].contains_key("word/new/api"));

    let pr = submit_word_contribution(&h.user, &h.bot, Action::New, &h.project, &submission)
        .await
        .unwrap();
    assert_eq!(pr.number, 2);
    assert_eq!(
        h.state.lock().unwrap().labels[&2],
        vec!["new-word", "via-editor"]
    );
}

#[tokio::test]
async fn edit_without_metadata_is_rejected_before_any_commit() {
    let h = harness().await;
    seed_fork(&h, CANONICAL_SHA);

    let err = submit_word_contribution(
        &h.user,
        &h.bot,
        Action::Edit,
        &h.project,
        &word("API", "updated"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::InvalidSubmission { .. }));
    let s = h.state.lock().unwrap();
    assert!(s.content_writes.is_empty());
    assert!(s.prs.is_empty());
}

#[tokio::test]
async fn stale_blob_sha_is_rejected_as_a_conflict() {
    let h = harness().await;
    seed_fork(&h, CANONICAL_SHA);
    {
        let mut s = h.state.lock().unwrap();
        s.files.insert(
            format!("{}:src/content/dictionary/api.mdx", USER_FORK),
            ("current-sha".to_string(), BASE64.encode("old definition")),
        );
    }

    let submission = WordSubmission {
        title: "API".to_string(),
        content: "updated".to_string(),
        metadata: Some(WordMetadata {
            path: "src/content/dictionary/api.mdx".to_string(),
            sha: "stale-sha".to_string(),
        }),
    };

    let err = submit_word_contribution(&h.user, &h.bot, Action::Edit, &h.project, &submission)
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::WordEdit { ref title, .. } if title == "API"),
        "expected WordEdit, got {:?}",
        err
    );
    assert!(h.state.lock().unwrap().prs.is_empty());
}

#[tokio::test]
async fn deleting_a_missing_branch_reports_a_branch_operation_error() {
    let h = harness().await;
    seed_fork(&h, CANONICAL_SHA);

    let err = discard_change_branch(&h.user, &h.project, "word/new/never-existed")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::BranchOperation { .. }));
}

#[tokio::test]
async fn existing_word_is_fetched_and_decoded() {
    let h = harness().await;
    {
        let mut s = h.state.lock().unwrap();
        // The contents API wraps base64 bodies; reproduce the line break.
        let mut encoded = BASE64.encode("---\ntitle: \"API\"\n---\n\nApplication Programming Interface.\n");
        encoded.insert(20, '\n');
        s.files.insert(
            format!("{}:src/content/dictionary/api.mdx", CANONICAL),
            ("file-sha-123".to_string(), encoded),
        );
    }

    let entry = get_existing_word(&h.user, &h.project, "API").await.unwrap();

    assert_eq!(entry.title, "API");
    assert_eq!(entry.path, "src/content/dictionary/api.mdx");
    assert_eq!(entry.sha, "file-sha-123");
    assert!(entry
        .content_decoded
        .contains("Application Programming Interface."));
}

#[tokio::test]
async fn missing_word_is_reported_as_not_found() {
    let h = harness().await;

    let err = get_existing_word(&h.user, &h.project, "No Such Word")
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::WordNotFound { ref title } if title == "No Such Word"),
        "expected WordNotFound, got {:?}",
        err
    );
}
