//! Configuration for the pr binary

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::index::{IndexOptions, NotFoundPolicy};
use crate::location::IdentityPolicy;

/// Project-local config file name
pub const LOCAL_CONFIG: &str = "promptrepo.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory, git repository path or remote URL to read prompts from
    pub source: Option<String>,

    /// Branch, tag or commit (HEAD when unset)
    pub revision: Option<String>,

    /// Only index prompts under this directory
    pub scope: Option<String>,

    pub identity: IdentityPolicy,

    #[serde(rename = "not-found")]
    pub not_found: NotFoundPolicy,

    /// TRACE, DEBUG, INFO, WARN or ERROR
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// File this config was read from, if any
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load; otherwise `./promptrepo.yml`, then the user
    /// config directory, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let candidates = [
            Some(PathBuf::from(LOCAL_CONFIG)),
            dirs::config_dir().map(|dir| dir.join("promptrepo").join(LOCAL_CONFIG)),
        ];
        for path in candidates.iter().flatten() {
            if path.exists() {
                match Self::load_from_file(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to load config from {}: {}", path.display(), e),
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let mut config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.loaded_from = Some(path.as_ref().to_path_buf());
        tracing::debug!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Root-relative path of the loaded config file when it lives under `root`
    pub fn path_within(&self, root: &Path) -> Option<String> {
        let file = self.loaded_from.as_ref()?.canonicalize().ok()?;
        let root = root.canonicalize().ok()?;
        let relative = file.strip_prefix(&root).ok()?;
        Some(relative.to_string_lossy().replace('\\', "/"))
    }

    /// Index options described by this config
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            revision: self.revision.clone(),
            scope: self.scope.clone(),
            identity: self.identity,
            not_found: self.not_found,
            ..Default::default()
        }
    }
}
