use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::graphql::SearchVariables;

/// Login shown for pull requests whose author account has been deleted.
pub const GHOST_LOGIN: &str = "ghost";

// GraphQL marks most scalars and connections nullable; a null decodes to
// the empty value instead of failing the whole page.
pub fn deserialize_null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Connection `nodes` lists are nullable and so is every entry in them.
pub fn deserialize_nodes<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let nodes = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(nodes.into_iter().flatten().flatten().collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeableState {
    Mergeable,
    Conflicting,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Pending,
    Commented,
    Approved,
    ChangesRequested,
    Dismissed,
    #[serde(other)]
    Unknown,
}

/// Lifecycle of a check run. GraphQL reports these in UPPERCASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Pending,
    Requested,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckConclusion {
    ActionRequired,
    Cancelled,
    Failure,
    Neutral,
    Skipped,
    Stale,
    StartupFailure,
    Success,
    TimedOut,
    #[serde(other)]
    Unknown,
}

/// State of a legacy commit status context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusState {
    Error,
    Expected,
    Failure,
    Pending,
    Success,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeadRepository {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ref {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name: String,
    pub name_with_owner: String,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: Option<Actor>,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comments {
    #[serde(default, deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<Comment>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author: Option<Actor>,
    pub body: String,
    pub state: ReviewState,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reviews {
    #[serde(default, deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workflow {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowRun {
    pub workflow: Workflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSuite {
    pub creator: Option<Actor>,
    pub workflow_run: Option<WorkflowRun>,
}

/// A modern check run reported by a GitHub App.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRun {
    pub name: String,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    pub check_suite: Option<CheckSuite>,
}

impl CheckRun {
    /// Name of the workflow that produced this run, when it came from
    /// GitHub Actions.
    pub fn workflow_name(&self) -> Option<&str> {
        self.check_suite
            .as_ref()
            .and_then(|suite| suite.workflow_run.as_ref())
            .map(|run| run.workflow.name.as_str())
    }
}

/// A legacy commit status posted through the statuses API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusContext {
    pub context: String,
    pub state: StatusState,
    pub creator: Option<Actor>,
}

/// One entry of a commit's status check rollup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum CheckContext {
    CheckRun(CheckRun),
    StatusContext(StatusContext),
}

impl CheckContext {
    pub fn name(&self) -> &str {
        match self {
            CheckContext::CheckRun(run) => &run.name,
            CheckContext::StatusContext(status) => &status.context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckContexts {
    pub total_count: u64,
    #[serde(default, deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<CheckContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusCheckRollup {
    pub contexts: CheckContexts,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub task: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Deployments {
    #[serde(default, deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub deployments: Deployments,
    pub status_check_rollup: Option<StatusCheckRollup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitNode {
    pub commit: Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commits {
    #[serde(default, deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<CommitNode>,
}

/// A pull request as returned by the search query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: Option<Actor>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub state: PullRequestState,
    pub mergeable: MergeableState,
    pub review_decision: Option<ReviewDecision>,
    pub additions: u64,
    pub deletions: u64,
    pub head_ref_name: String,
    pub base_ref_name: String,
    pub head_repository: Option<HeadRepository>,
    pub head_ref: Option<Ref>,
    pub repository: Repository,
    pub comments: Comments,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub latest_reviews: Reviews,
    pub is_draft: bool,
    pub commits: Commits,
}

impl PullRequest {
    pub fn repo_name_with_owner(&self) -> &str {
        &self.repository.name_with_owner
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn author_login(&self) -> &str {
        self.author
            .as_ref()
            .map_or(GHOST_LOGIN, |author| author.login.as_str())
    }

    /// The most recent commit, which is the only one the query asks for.
    pub fn last_commit(&self) -> Option<&Commit> {
        self.commits.nodes.last().map(|node| &node.commit)
    }

    /// Check runs and status contexts reported on the last commit.
    pub fn check_contexts(&self) -> &[CheckContext] {
        self.last_commit()
            .and_then(|commit| commit.status_check_rollup.as_ref())
            .map_or(&[], |rollup| rollup.contexts.nodes.as_slice())
    }
}

/// Opaque cursor state of one search page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// A search node; anything that is not a pull request (issues can match
/// a search with a loose filter) is kept as `Other` and dropped later.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum SearchNode {
    PullRequest(Box<PullRequest>),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default, deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<SearchNode>,
    pub issue_count: u64,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchResults,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

/// The `{ data, errors }` envelope of a GraphQL reply.
#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

/// Source of pull request search results.
///
/// Production code talks to GitHub through [`crate::GitHub`]; tests
/// substitute an in-memory implementation.
#[async_trait]
pub trait Forge {
    /// Runs one search request and returns the raw page.
    async fn search_pull_requests(&self, variables: &SearchVariables) -> Result<SearchResults>;
}

/// One page of pull requests from a section query.
///
/// `total_count` is the number of matches reported by the search API for
/// the whole query, counted before archived repositories are dropped from
/// `prs`, so it can exceed the number of pull requests a caller will ever
/// see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullRequestsResponse {
    pub prs: Vec<PullRequest>,
    pub total_count: u64,
    pub page_info: PageInfo,
}

/// Rolled-up verdict over a pull request's check contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiVerdict {
    Success,
    Failing,
    Pending,
    Unknown,
}

impl std::fmt::Display for CiVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CiVerdict::Success => write!(f, "Success"),
            CiVerdict::Failing => write!(f, "Failing"),
            CiVerdict::Pending => write!(f, "Pending"),
            CiVerdict::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl CheckSummary {
    pub fn from_contexts(contexts: &[CheckContext]) -> Self {
        let mut summary = CheckSummary::default();

        for context in contexts {
            match context {
                CheckContext::CheckRun(run) => match (run.status, run.conclusion) {
                    (CheckStatus::Completed, Some(conclusion)) => match conclusion {
                        CheckConclusion::Success
                        | CheckConclusion::Neutral
                        | CheckConclusion::Skipped => summary.passed += 1,
                        CheckConclusion::Failure
                        | CheckConclusion::Cancelled
                        | CheckConclusion::TimedOut
                        | CheckConclusion::StartupFailure => summary.failed += 1,
                        CheckConclusion::ActionRequired
                        | CheckConclusion::Stale
                        | CheckConclusion::Unknown => summary.pending += 1,
                    },
                    _ => summary.pending += 1,
                },
                CheckContext::StatusContext(status) => match status.state {
                    StatusState::Success => summary.passed += 1,
                    StatusState::Failure | StatusState::Error => summary.failed += 1,
                    StatusState::Pending | StatusState::Expected | StatusState::Unknown => {
                        summary.pending += 1
                    }
                },
            }
        }

        summary
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.pending
    }

    pub fn verdict(&self) -> CiVerdict {
        if self.total() == 0 {
            CiVerdict::Unknown
        } else if self.failed > 0 {
            CiVerdict::Failing
        } else if self.pending > 0 {
            CiVerdict::Pending
        } else {
            CiVerdict::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_run(status: &str, conclusion: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "__typename": "CheckRun",
            "name": "build",
            "status": status,
            "conclusion": conclusion,
            "checkSuite": {
                "creator": { "login": "github-actions" },
                "workflowRun": { "workflow": { "name": "CI" } }
            }
        })
    }

    fn status_context(state: &str) -> serde_json::Value {
        serde_json::json!({
            "__typename": "StatusContext",
            "context": "ci/prow/unit",
            "state": state,
            "creator": null
        })
    }

    fn contexts(values: Vec<serde_json::Value>) -> Vec<CheckContext> {
        serde_json::from_value(serde_json::Value::Array(values)).unwrap()
    }

    #[test]
    fn test_check_context_is_discriminated_by_typename() {
        let parsed = contexts(vec![
            check_run("COMPLETED", Some("SUCCESS")),
            status_context("PENDING"),
        ]);

        match &parsed[0] {
            CheckContext::CheckRun(run) => {
                assert_eq!(run.name, "build");
                assert_eq!(run.conclusion, Some(CheckConclusion::Success));
                assert_eq!(run.workflow_name(), Some("CI"));
            }
            other => panic!("expected a check run, got {other:?}"),
        }
        match &parsed[1] {
            CheckContext::StatusContext(status) => {
                assert_eq!(status.context, "ci/prow/unit");
                assert_eq!(status.state, StatusState::Pending);
                assert!(status.creator.is_none());
            }
            other => panic!("expected a status context, got {other:?}"),
        }
        assert_eq!(parsed[1].name(), "ci/prow/unit");
    }

    #[test]
    fn test_unrecognised_enum_values_fall_back_to_unknown() {
        let parsed = contexts(vec![check_run("SOMETHING_NEW", Some("BRAND_NEW"))]);

        let CheckContext::CheckRun(run) = &parsed[0] else {
            panic!("expected a check run");
        };
        assert_eq!(run.status, CheckStatus::Unknown);
        assert_eq!(run.conclusion, Some(CheckConclusion::Unknown));
    }

    #[test]
    fn test_summary_counts_each_kind_of_context() {
        let parsed = contexts(vec![
            check_run("COMPLETED", Some("SUCCESS")),
            check_run("COMPLETED", Some("SKIPPED")),
            check_run("COMPLETED", Some("TIMED_OUT")),
            check_run("IN_PROGRESS", None),
            status_context("SUCCESS"),
            status_context("ERROR"),
            status_context("PENDING"),
        ]);

        let summary = CheckSummary::from_contexts(&parsed);

        assert_eq!(
            summary,
            CheckSummary {
                passed: 3,
                failed: 2,
                pending: 2,
            }
        );
        assert_eq!(summary.total(), 7);
        assert_eq!(summary.verdict(), CiVerdict::Failing);
    }

    #[test]
    fn test_summary_verdicts() {
        assert_eq!(CheckSummary::from_contexts(&[]).verdict(), CiVerdict::Unknown);

        let pending = contexts(vec![
            check_run("COMPLETED", Some("SUCCESS")),
            check_run("QUEUED", None),
        ]);
        assert_eq!(
            CheckSummary::from_contexts(&pending).verdict(),
            CiVerdict::Pending
        );

        let green = contexts(vec![
            check_run("COMPLETED", Some("SUCCESS")),
            status_context("SUCCESS"),
        ]);
        assert_eq!(
            CheckSummary::from_contexts(&green).verdict(),
            CiVerdict::Success
        );
    }

    #[test]
    fn test_page_info_accepts_null_cursors() {
        let info: PageInfo = serde_json::from_value(serde_json::json!({
            "hasNextPage": false,
            "startCursor": null,
            "endCursor": null
        }))
        .unwrap();

        assert_eq!(info, PageInfo::default());
    }

    #[test]
    fn test_null_deployments_and_tasks_decode_to_empty_values() {
        let commits: Commits = serde_json::from_value(serde_json::json!({
            "nodes": [
                {
                    "commit": {
                        "deployments": {
                            "nodes": [
                                { "task": null, "description": null },
                                null,
                                { "task": "deploy", "description": "prod" }
                            ]
                        },
                        "statusCheckRollup": null
                    }
                },
                { "commit": { "deployments": null, "statusCheckRollup": null } },
                null
            ]
        }))
        .unwrap();

        assert_eq!(commits.nodes.len(), 2);
        let deployments = &commits.nodes[0].commit.deployments.nodes;
        assert_eq!(deployments.len(), 2);
        assert_eq!(deployments[0].task, "");
        assert_eq!(deployments[1].task, "deploy");
        assert_eq!(deployments[1].description.as_deref(), Some("prod"));
        assert!(commits.nodes[1].commit.deployments.nodes.is_empty());
    }

    #[test]
    fn test_null_connection_nodes_are_empty() {
        let reviews: Reviews = serde_json::from_value(serde_json::json!({ "nodes": null })).unwrap();
        assert!(reviews.nodes.is_empty());

        let comments: Comments =
            serde_json::from_value(serde_json::json!({ "totalCount": 3, "nodes": [null] })).unwrap();
        assert_eq!(comments.total_count, 3);
        assert!(comments.nodes.is_empty());
    }
}
