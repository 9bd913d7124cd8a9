//! Prdash: a sectioned dashboard of open pull requests.
//!
//! Loads dashboard sections (a title plus a GitHub search filter) from a
//! `sections.yml` kept next to the executable, fetches the matching pull
//! requests through GitHub's GraphQL search API one cursor page at a time,
//! and renders each section as a table. Pull requests from archived
//! repositories are left out.

pub mod cli;
pub mod config;
pub mod display;
pub mod github;
pub mod graphql;
pub mod query;
pub mod types;

pub use cli::{DisplayMode, RunSpec, parse_args};
pub use config::{
    ConfigError, SECTIONS_FILE_NAME, SectionConfig, load_sections_from, parse_sections,
    parse_sections_config, sections_config_path,
};
pub use display::render_section;
pub use github::GitHub;
pub use graphql::{SearchVariables, make_pull_requests_query};
pub use query::{SectionResult, collect_section, fetch_pull_requests};
pub use types::{
    CheckContext, CheckRun, CheckSummary, CiVerdict, Forge, PageInfo, PullRequest,
    PullRequestsResponse, SearchNode, SearchResults, StatusContext,
};
