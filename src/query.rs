use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    config::SectionConfig,
    graphql::SearchVariables,
    types::{Forge, PageInfo, PullRequest, PullRequestsResponse, SearchNode},
};

/// Fetches one page of pull requests matching `query`.
///
/// Issues exactly one search against the forge. Pull requests from
/// archived repositories are dropped without disturbing the order of the
/// rest; `total_count` is passed through from the API untouched. Pass the
/// previous page's `PageInfo` to continue after its end cursor.
pub async fn fetch_pull_requests<F>(
    forge: &F,
    query: &str,
    limit: u32,
    page_info: Option<&PageInfo>,
) -> Result<PullRequestsResponse>
where
    F: Forge + Sync + ?Sized,
{
    let variables = SearchVariables::new(query, limit, page_info);
    debug!(
        query = %variables.query,
        limit,
        cursor = ?variables.end_cursor,
        "searching pull requests"
    );

    let results = forge.search_pull_requests(&variables).await?;

    let received = results.nodes.len();
    let prs: Vec<PullRequest> = results
        .nodes
        .into_iter()
        .filter_map(|node| match node {
            SearchNode::PullRequest(pr) => Some(*pr),
            SearchNode::Other => None,
        })
        .filter(|pr| !pr.repository.is_archived)
        .collect();

    if prs.len() < received {
        debug!(dropped = received - prs.len(), "skipped archived or non-PR nodes");
    }

    Ok(PullRequestsResponse {
        prs,
        total_count: results.issue_count,
        page_info: results.page_info,
    })
}

/// Pull requests gathered for one dashboard section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionResult {
    pub title: String,
    pub prs: Vec<PullRequest>,
    pub total_count: u64,
}

/// Collects up to `pages` pages for a section, following end cursors
/// while the API reports more results.
///
/// When `timeout` is set it bounds each page request separately, so a
/// section of several pages may take longer than one deadline overall.
pub async fn collect_section<F>(
    forge: &F,
    section: &SectionConfig,
    limit: u32,
    pages: usize,
    timeout: Option<Duration>,
) -> Result<SectionResult>
where
    F: Forge + Sync + ?Sized,
{
    let mut prs = Vec::new();
    let mut total_count = 0;
    let mut page_info: Option<PageInfo> = None;

    for _ in 0..pages {
        let request = fetch_pull_requests(forge, &section.filters, limit, page_info.as_ref());
        let page = match timeout {
            Some(deadline) => tokio::time::timeout(deadline, request)
                .await
                .with_context(|| {
                    format!(
                        "Request for section '{}' timed out after {:?}",
                        section.title, deadline
                    )
                })??,
            None => request.await?,
        };
        prs.extend(page.prs);
        total_count = page.total_count;

        if !page.page_info.has_next_page || page.page_info.end_cursor.is_none() {
            break;
        }
        page_info = Some(page.page_info);
    }

    Ok(SectionResult {
        title: section.title.clone(),
        prs,
        total_count,
    })
}
