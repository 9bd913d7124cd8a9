use serde::Serialize;

use crate::types::PageInfo;

pub const SEARCH_OPERATION_NAME: &str = "SearchPullRequests";

pub const SEARCH_PULL_REQUESTS_QUERY: &str = r#"
    query SearchPullRequests($query: String!, $limit: Int!, $endCursor: String) {
        search(type: ISSUE, first: $limit, after: $endCursor, query: $query) {
            issueCount
            pageInfo {
                hasNextPage
                startCursor
                endCursor
            }
            nodes {
                __typename
                ... on PullRequest {
                    number
                    title
                    body
                    author {
                        login
                    }
                    updatedAt
                    url
                    state
                    mergeable
                    reviewDecision
                    additions
                    deletions
                    headRefName
                    baseRefName
                    headRepository {
                        name
                    }
                    headRef {
                        name
                    }
                    repository {
                        name
                        nameWithOwner
                        isArchived
                    }
                    comments(last: 5, orderBy: { field: UPDATED_AT, direction: DESC }) {
                        totalCount
                        nodes {
                            author {
                                login
                            }
                            body
                            updatedAt
                        }
                    }
                    latestReviews(last: 3) {
                        nodes {
                            author {
                                login
                            }
                            body
                            state
                            updatedAt
                        }
                    }
                    isDraft
                    commits(last: 1) {
                        nodes {
                            commit {
                                deployments(last: 10) {
                                    nodes {
                                        task
                                        description
                                    }
                                }
                                statusCheckRollup {
                                    contexts(last: 20) {
                                        totalCount
                                        nodes {
                                            __typename
                                            ... on CheckRun {
                                                name
                                                status
                                                conclusion
                                                checkSuite {
                                                    creator {
                                                        login
                                                    }
                                                    workflowRun {
                                                        workflow {
                                                            name
                                                        }
                                                    }
                                                }
                                            }
                                            ... on StatusContext {
                                                context
                                                state
                                                creator {
                                                    login
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"#;

/// Wraps a section filter with the qualifiers every dashboard query needs.
///
/// The filter is inserted verbatim; search syntax in it is the caller's
/// responsibility.
pub fn make_pull_requests_query(query: &str) -> String {
    format!("is:pr {} sort:updated", query)
}

/// Variables of the search query. A missing cursor is sent as `null`,
/// which asks for the first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchVariables {
    pub query: String,
    pub limit: u32,
    pub end_cursor: Option<String>,
}

impl SearchVariables {
    pub fn new(query: &str, limit: u32, page_info: Option<&PageInfo>) -> Self {
        Self {
            query: make_pull_requests_query(query),
            limit,
            end_cursor: page_info.and_then(|info| info.end_cursor.clone()),
        }
    }
}

/// Builds the JSON body posted to the GraphQL endpoint.
pub fn create_graphql_request(variables: &SearchVariables) -> serde_json::Value {
    serde_json::json!({
        "query": SEARCH_PULL_REQUESTS_QUERY,
        "operationName": SEARCH_OPERATION_NAME,
        "variables": variables,
    })
}
