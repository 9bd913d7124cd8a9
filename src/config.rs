//! Dashboard section definitions loaded from `sections.yml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name of the sections config, looked up next to the executable.
pub const SECTIONS_FILE_NAME: &str = "sections.yml";

/// One dashboard section: a titled search filter.
///
/// Fields absent from the file are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub title: String,
    pub filters: String,
    pub repos: Vec<String>,
}

/// Failure to locate, read or parse the sections config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine executable location: {0}")]
    ExecutablePath(#[source] std::io::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid sections config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Path of the sections config in the directory holding the running
/// executable. The working directory plays no part.
pub fn sections_config_path() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::ExecutablePath)?;
    let dir = exe.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(SECTIONS_FILE_NAME))
}

/// Loads the sections config that ships alongside the executable.
pub fn parse_sections_config() -> Result<Vec<SectionConfig>, ConfigError> {
    let path = sections_config_path()?;
    load_sections_from(&path)
}

pub fn load_sections_from(path: &Path) -> Result<Vec<SectionConfig>, ConfigError> {
    debug!(path = %path.display(), "loading sections config");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sections(&content)
}

/// Parses a YAML sequence of sections, keeping file order.
pub fn parse_sections(content: &str) -> Result<Vec<SectionConfig>, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}
