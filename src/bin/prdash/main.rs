use std::{io::IsTerminal, process::ExitCode};

use chrono::Utc;
use prdash::{
    GitHub, RunSpec, SectionConfig, collect_section, display::terminal_width, load_sections_from,
    parse_args, parse_sections_config, render_section,
};
use tracing::{error, info};

fn handle_clap_help_version(clap_err: &clap::Error) -> ExitCode {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            ExitCode::SUCCESS
        }
        _ => {
            eprint!("{clap_err}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn load_sections(spec: &RunSpec) -> Result<Vec<SectionConfig>, prdash::ConfigError> {
    match &spec.config {
        Some(path) => load_sections_from(path),
        None => parse_sections_config(),
    }
}

async fn run(spec: RunSpec, mode: prdash::DisplayMode) -> anyhow::Result<ExitCode> {
    let sections = match load_sections(&spec) {
        Ok(sections) => sections,
        Err(err) => {
            error!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let sections = spec.select_sections(sections);
    info!(count = sections.len(), "sections loaded");

    let forge = GitHub::from_env()?;
    let width = terminal_width();
    let mut stdout = std::io::stdout();

    for section in &sections {
        let result =
            collect_section(&forge, section, spec.limit, spec.pages, spec.timeout).await?;
        render_section(&result, mode, width, Utc::now(), &mut stdout)?;
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let (spec, mode) = match parse_args(std::env::args()) {
        Ok(result) => result,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                return Ok(handle_clap_help_version(clap_err));
            }
            return Err(err);
        }
    };

    run(spec, mode).await
}
