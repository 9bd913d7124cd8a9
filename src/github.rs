use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use tracing::debug;

use crate::{
    graphql::{SearchVariables, create_graphql_request},
    types::{Forge, GraphQLResponse, SearchData, SearchResults},
};

pub fn get_github_token() -> Result<String> {
    // Prefer environment variables over gh CLI to avoid subprocess overhead.
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        return Ok(token);
    }

    if let Ok(token) = std::env::var("GH_TOKEN") {
        return Ok(token);
    }

    let output = Command::new("gh").args(["auth", "token"]).output()?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// Creates an authenticated GitHub client using available credentials.
pub fn setup_github_client() -> Result<Octocrab> {
    let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
    Octocrab::builder()
        .personal_token(token)
        .build()
        .context("Failed to create GitHub client")
}

/// [`Forge`] backed by GitHub's GraphQL API.
#[derive(Clone)]
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds a client from the credentials found in the environment or
    /// the gh CLI session.
    pub fn from_env() -> Result<Self> {
        setup_github_client().map(Self::new)
    }
}

/// Unwraps a GraphQL envelope, failing when the server reported errors or
/// sent no data.
pub fn into_search_results(response: GraphQLResponse<SearchData>) -> Result<SearchResults> {
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        anyhow::bail!("GraphQL query failed: {}", messages.join("; "));
    }

    response
        .data
        .map(|data| data.search)
        .context("GraphQL response contained no data")
}

#[async_trait]
impl Forge for GitHub {
    async fn search_pull_requests(&self, variables: &SearchVariables) -> Result<SearchResults> {
        let request = create_graphql_request(variables);
        let response: GraphQLResponse<SearchData> = self.client.graphql(&request).await?;
        let results = into_search_results(response)?;

        debug!(
            nodes = results.nodes.len(),
            issue_count = results.issue_count,
            "search page received"
        );

        Ok(results)
    }
}
