//! Prompt identity
//!
//! A prompt is addressed by its [`Location`]: an optional application and a
//! name, written `application/name` or just `name`. A location can be derived
//! from a file path (`pirates/first.txt` -> `pirates/first`) or declared by
//! the prompt file itself; [`IdentityPolicy`] decides which one wins.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PromptError, Result};
use crate::record::PromptRecord;

/// Application/name pair identifying one prompt
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub application: Option<String>,
    pub name: String,
}

impl Location {
    pub fn new(application: Option<String>, name: impl Into<String>) -> Self {
        Self {
            application,
            name: name.into(),
        }
    }

    /// Derive a location from a file path
    ///
    /// The name is the file stem. The application is the parent directory
    /// name, present only when the path has at least two segments.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let segments: Vec<_> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let application = if segments.len() > 1 {
            Some(segments[segments.len() - 2].to_string_lossy().into_owned())
        } else {
            None
        };

        Self { application, name }
    }

    /// Parse a location string (`name` or `application/name`)
    pub fn parse(location: &str) -> Result<Self> {
        let mut parts = location.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) if !name.is_empty() => Ok(Self::new(None, name)),
            (Some(application), Some(name), None) if !application.is_empty() && !name.is_empty() => {
                Ok(Self::new(Some(application.to_string()), name))
            }
            _ => Err(PromptError::InvalidLocationString(location.to_string())),
        }
    }
}

impl FromStr for Location {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.application {
            Some(application) => write!(f, "{}/{}", application, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Which identity wins when a prompt file declares its own application/name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    /// Declared fields win; the path fills in only what the record left unset
    #[default]
    PreferDeclared,
    /// The file hierarchy is the source of truth; path-derived values always win
    PreferPath,
}

/// Merge a path-derived location into a record's declared identity
///
/// Presence is decided by `Option`, not by emptiness: a record that declares
/// `application: ""` keeps no application under [`IdentityPolicy::PreferDeclared`].
pub fn resolve_identity(record: &mut PromptRecord, derived: &Location, policy: IdentityPolicy) {
    debug!(%derived, ?policy, "resolve_identity: called");
    let (application, name) = match policy {
        IdentityPolicy::PreferDeclared => (
            record
                .application()
                .map(str::to_string)
                .or_else(|| derived.application.clone()),
            record
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| derived.name.clone()),
        ),
        IdentityPolicy::PreferPath => (derived.application.clone(), derived.name.clone()),
    };
    record.set_identity(application, name);
}
