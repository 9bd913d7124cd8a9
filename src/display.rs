use std::io::{self, IsTerminal, Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;

use crate::{
    cli::DisplayMode,
    query::SectionResult,
    types::{CheckSummary, CiVerdict, PullRequest, ReviewDecision},
};

const TABLE_HEADERS: &[&str] = &["PR", "REPO", "CI", "REVIEW", "AUTHOR", "UPDATED", "TITLE"];
const TITLE_COLUMN_INDEX: usize = TABLE_HEADERS.len() - 1;
const COLUMN_SEPARATOR: &str = "  ";
const TITLE_TRUNCATION_SUFFIX: &str = "...";
const MIN_TITLE_WIDTH_FOR_TRUNCATION: usize = 3;
const DRAFT_PREFIX: &str = "[draft] ";

/// Width to lay tables out in, or `None` when stdout is not a terminal.
pub fn terminal_width() -> Option<usize> {
    if io::stdout().is_terminal() {
        terminal_size::terminal_size().map(|(w, _)| w.0 as usize)
    } else {
        None
    }
}

pub fn format_relative_time(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    HumanTime::from(time - now).to_string()
}

pub fn format_ci(pr: &PullRequest) -> String {
    let summary = CheckSummary::from_contexts(pr.check_contexts());
    match summary.verdict() {
        CiVerdict::Unknown => "-".to_string(),
        CiVerdict::Success => format!("{} ({})", CiVerdict::Success, summary.passed),
        CiVerdict::Failing => format!(
            "{} ({}/{})",
            CiVerdict::Failing,
            summary.failed,
            summary.total()
        ),
        CiVerdict::Pending => format!(
            "{} ({}/{})",
            CiVerdict::Pending,
            summary.pending,
            summary.total()
        ),
    }
}

pub fn format_review(decision: Option<ReviewDecision>) -> &'static str {
    match decision {
        Some(ReviewDecision::Approved) => "approved",
        Some(ReviewDecision::ChangesRequested) => "changes",
        Some(ReviewDecision::ReviewRequired) => "required",
        Some(ReviewDecision::Unknown) | None => "-",
    }
}

fn pr_to_table_row(pr: &PullRequest, now: DateTime<Utc>) -> Vec<String> {
    let title = if pr.is_draft {
        format!("{DRAFT_PREFIX}{}", pr.title)
    } else {
        pr.title.clone()
    };

    vec![
        format!("#{}", pr.number()),
        pr.repo_name_with_owner().to_string(),
        format_ci(pr),
        format_review(pr.review_decision).to_string(),
        pr.author_login().to_string(),
        format_relative_time(pr.updated_at(), now),
        title,
    ]
}

fn cell_width(cell: &str) -> usize {
    cell.chars().count()
}

fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h)).collect();

    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell_width(cell));
        }
    }

    widths
}

fn apply_title_truncation(rows: &mut [Vec<String>], widths: &mut [usize], terminal_width: usize) {
    let separator_width = COLUMN_SEPARATOR.len() * (widths.len() - 1);
    let non_title_width: usize =
        widths[..TITLE_COLUMN_INDEX].iter().sum::<usize>() + separator_width;

    if non_title_width >= terminal_width {
        return;
    }

    let available_title_width = terminal_width - non_title_width;
    if widths[TITLE_COLUMN_INDEX] <= available_title_width
        || available_title_width <= MIN_TITLE_WIDTH_FOR_TRUNCATION
    {
        return;
    }

    widths[TITLE_COLUMN_INDEX] = available_title_width;
    let keep = available_title_width - TITLE_TRUNCATION_SUFFIX.len();

    for row in rows {
        if let Some(title) = row.get_mut(TITLE_COLUMN_INDEX)
            && cell_width(title) > available_title_width
        {
            let truncated: String = title.chars().take(keep).collect();
            *title = format!("{truncated}{TITLE_TRUNCATION_SUFFIX}");
        }
    }
}

fn render_row<W: Write>(cells: &[&str], widths: &[usize], writer: &mut W) -> Result<()> {
    let last = cells.len() - 1;
    for (i, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if i == last {
            write!(writer, "{cell}")?;
        } else {
            write!(writer, "{cell:<width$}{COLUMN_SEPARATOR}")?;
        }
    }
    writeln!(writer)?;
    Ok(())
}

fn render_table_separator<W: Write>(widths: &[usize], writer: &mut W) -> Result<()> {
    let dashes: Vec<String> = widths.iter().map(|&width| "-".repeat(width)).collect();
    writeln!(writer, "{}", dashes.join(COLUMN_SEPARATOR))?;
    Ok(())
}

fn display_prs_table<W: Write>(
    prs: &[PullRequest],
    width: Option<usize>,
    now: DateTime<Utc>,
    writer: &mut W,
) -> Result<()> {
    let mut rows: Vec<Vec<String>> = prs.iter().map(|pr| pr_to_table_row(pr, now)).collect();
    let mut widths = calculate_column_widths(TABLE_HEADERS, &rows);

    if let Some(width) = width {
        apply_title_truncation(&mut rows, &mut widths, width);
    }

    render_row(TABLE_HEADERS, &widths, writer)?;
    render_table_separator(&widths, writer)?;
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        render_row(&cells, &widths, writer)?;
    }

    Ok(())
}

fn display_prs_quiet<W: Write>(prs: &[PullRequest], writer: &mut W) -> Result<()> {
    for pr in prs {
        writeln!(writer, "{}", pr.url())?;
    }
    Ok(())
}

/// Writes one section: a header line with the shown and total counts,
/// then a table, or bare URLs in quiet mode.
pub fn render_section<W: Write>(
    section: &SectionResult,
    mode: DisplayMode,
    width: Option<usize>,
    now: DateTime<Utc>,
    writer: &mut W,
) -> Result<()> {
    if mode == DisplayMode::Quiet {
        return display_prs_quiet(&section.prs, writer);
    }

    writeln!(
        writer,
        "{} ({} of {})",
        section.title,
        section.prs.len(),
        section.total_count
    )?;

    if section.prs.is_empty() {
        writeln!(writer, "No pull requests")?;
    } else {
        display_prs_table(&section.prs, width, now, writer)?;
    }
    writeln!(writer)?;

    Ok(())
}
