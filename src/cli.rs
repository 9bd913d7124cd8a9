use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::SectionConfig;

#[derive(Parser, Debug)]
#[command(name = "prdash")]
#[command(version)]
#[command(
    about = "Show open pull requests grouped into the sections defined in sections.yml"
)]
struct CliArgs {
    /// Sections file to read instead of the sections.yml next to the binary
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pull requests to request per page
    #[arg(short = 'L', long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=100))]
    limit: u32,

    /// Pages to fetch per section, following the search cursor
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pages: u64,

    /// Only show sections with this title (can specify multiple)
    #[arg(short = 's', long = "section", value_name = "TITLE")]
    sections: Vec<String>,

    /// Give up on a request after this long (e.g. 30s, 2m)
    #[arg(long, value_name = "DURATION")]
    timeout: Option<String>,

    /// Print pull request URLs only
    #[arg(short = 'q', long)]
    quiet: bool,
}

/// How sections are written to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Normal,
    Quiet,
}

/// Everything the dashboard needs to know about one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub config: Option<PathBuf>,
    pub limit: u32,
    pub pages: usize,
    pub sections: Vec<String>,
    pub timeout: Option<Duration>,
}

impl RunSpec {
    /// Keeps the sections named on the command line, in file order. With
    /// no names given every section is kept.
    pub fn select_sections(&self, sections: Vec<SectionConfig>) -> Vec<SectionConfig> {
        if self.sections.is_empty() {
            return sections;
        }

        sections
            .into_iter()
            .filter(|section| {
                self.sections
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(section.title.trim()))
            })
            .collect()
    }
}

/// Parses a request deadline: a whole number of seconds with an optional
/// `s` suffix, or whole minutes with an `m` suffix.
fn parse_timeout(timeout_str: &str) -> Result<Duration> {
    let timeout_str = timeout_str.trim();

    let (digits, seconds_per_unit) = match timeout_str.strip_suffix('m') {
        Some(minutes) => (minutes, 60),
        None => (timeout_str.strip_suffix('s').unwrap_or(timeout_str), 1),
    };

    let amount: u64 = digits.parse().with_context(|| {
        format!(
            "Cannot parse timeout '{}': use seconds (45, 45s) or minutes (2m)",
            timeout_str
        )
    })?;
    let seconds = amount
        .checked_mul(seconds_per_unit)
        .with_context(|| format!("Timeout '{}' is too long", timeout_str))?;

    Ok(Duration::from_secs(seconds))
}

fn determine_display_mode(cli: &CliArgs) -> DisplayMode {
    if cli.quiet {
        DisplayMode::Quiet
    } else {
        DisplayMode::Normal
    }
}

fn create_run_spec(cli: CliArgs) -> Result<RunSpec> {
    let timeout = cli
        .timeout
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(parse_timeout)
        .transpose()?;

    Ok(RunSpec {
        config: cli.config,
        limit: cli.limit,
        pages: usize::try_from(cli.pages).context("--pages is too large")?,
        sections: cli.sections,
        timeout,
    })
}

/// Parses command-line arguments into a run specification and display
/// mode.
pub fn parse_args<I, T>(args: I) -> Result<(RunSpec, DisplayMode)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    let display_mode = determine_display_mode(&cli);
    let spec = create_run_spec(cli)?;
    Ok((spec, display_mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str) -> SectionConfig {
        SectionConfig {
            title: title.to_string(),
            filters: "is:open".to_string(),
            repos: vec![],
        }
    }

    #[test]
    fn test_defaults() {
        let (spec, mode) = parse_args(["prdash"]).unwrap();

        assert_eq!(
            spec,
            RunSpec {
                config: None,
                limit: 20,
                pages: 1,
                sections: vec![],
                timeout: None,
            }
        );
        assert_eq!(mode, DisplayMode::Normal);
    }

    #[test]
    fn test_all_options() {
        let (spec, mode) = parse_args([
            "prdash",
            "--config",
            "/tmp/sections.yml",
            "-L",
            "5",
            "--pages",
            "3",
            "-s",
            "Mine",
            "--section",
            "Review",
            "--timeout",
            "2m",
            "-q",
        ])
        .unwrap();

        assert_eq!(spec.config, Some(PathBuf::from("/tmp/sections.yml")));
        assert_eq!(spec.limit, 5);
        assert_eq!(spec.pages, 3);
        assert_eq!(spec.sections, vec!["Mine", "Review"]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(120)));
        assert_eq!(mode, DisplayMode::Quiet);
    }

    #[test]
    fn test_limit_must_fit_a_search_page() {
        assert!(parse_args(["prdash", "--limit", "0"]).is_err());
        assert!(parse_args(["prdash", "--limit", "101"]).is_err());
        assert!(parse_args(["prdash", "--pages", "0"]).is_err());
    }

    #[test]
    fn test_timeout_formats() {
        assert_eq!(parse_timeout("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_timeout(" 30s ").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_timeout("1h").is_err());
        assert!(parse_timeout("soon").is_err());
        assert!(parse_timeout("m").is_err());
        assert!(parse_timeout("-5s").is_err());
    }

    #[test]
    fn test_timeout_errors_name_the_accepted_forms() {
        let err = parse_timeout("1h").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Cannot parse timeout '1h': use seconds (45, 45s) or minutes (2m)"
        );
    }

    #[test]
    fn test_timeout_that_overflows_is_rejected() {
        let err = parse_timeout("999999999999999999m").unwrap_err();

        assert_eq!(err.to_string(), "Timeout '999999999999999999m' is too long");
        assert_eq!(
            parse_timeout("999999999999999999s").unwrap(),
            Duration::from_secs(999_999_999_999_999_999)
        );
    }

    #[test]
    fn test_blank_timeout_means_no_deadline() {
        let (spec, _) = parse_args(["prdash", "--timeout", "  "]).unwrap();

        assert_eq!(spec.timeout, None);
    }

    #[test]
    fn test_select_sections_matches_titles_case_insensitively() {
        let (spec, _) = parse_args(["prdash", "-s", "needs review"]).unwrap();
        let sections = vec![section("Mine"), section("Needs Review"), section("Team")];

        let selected = spec.select_sections(sections);

        assert_eq!(selected, vec![section("Needs Review")]);
    }

    #[test]
    fn test_select_sections_keeps_everything_without_names() {
        let (spec, _) = parse_args(["prdash"]).unwrap();
        let sections = vec![section("Mine"), section("Mine")];

        assert_eq!(spec.select_sections(sections.clone()), sections);
    }
}
