//! Where prompt files come from
//!
//! A [`PromptSource`] enumerates candidate files at one point in time and,
//! when it has history, reports which files changed relative to the parent
//! revision. Two local backends exist:
//!
//! - [`GitSource`]: blobs in the tree of a selected commit
//! - [`DirectorySource`]: files on disk, skipping hidden paths
//!
//! Remote addresses are first materialized into a local checkout, see
//! [`remote`].

mod dir;
mod git;
pub mod remote;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PromptError, Result};
use crate::format::ParserTable;

pub use dir::DirectorySource;
pub use git::GitSource;
pub use remote::{GitCloner, Materializer};

/// Address prefixes treated as remote repositories
const REMOTE_PREFIXES: &[&str] = &["git@", "git://", "ssh://", "http://", "https://", "file://"];

/// One candidate prompt file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path relative to the source root, `/`-separated
    pub path: String,
    pub content: Vec<u8>,
}

/// Backend that can list prompt files and, optionally, recent changes
pub trait PromptSource {
    /// Candidate files under `scope` (a root-relative directory)
    fn entries(&self, scope: Option<&str>, parsers: &ParserTable) -> Result<Vec<SourceEntry>>;

    /// Paths added or modified by the selected revision; `None` without history
    fn changed_paths(&self) -> Result<Option<Vec<String>>>;

    /// Identifier of the selected revision, if the source is versioned
    fn revision(&self) -> Option<String>;
}

/// A prompt source address as given by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    Remote(String),
}

impl SourceLocation {
    /// Classify an address: known scheme prefixes are remote, anything else is a path
    pub fn parse(address: &str) -> Self {
        if REMOTE_PREFIXES.iter().any(|prefix| address.starts_with(prefix)) {
            Self::Remote(address.to_string())
        } else {
            Self::Local(PathBuf::from(address))
        }
    }
}

impl From<&str> for SourceLocation {
    fn from(address: &str) -> Self {
        Self::parse(address)
    }
}

impl From<String> for SourceLocation {
    fn from(address: String) -> Self {
        Self::parse(&address)
    }
}

impl From<&Path> for SourceLocation {
    fn from(path: &Path) -> Self {
        Self::Local(path.to_path_buf())
    }
}

impl From<PathBuf> for SourceLocation {
    fn from(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

/// Open a local tree, as a git repository when possible
///
/// A root that is not a repository falls back to a plain directory, unless a
/// specific revision was requested.
pub fn open_local(root: &Path, revision: Option<&str>) -> Result<Box<dyn PromptSource>> {
    debug!(?root, ?revision, "open_local: called");
    if !root.exists() {
        return Err(PromptError::InvalidSource {
            path: root.to_path_buf(),
            reason: "does not exist".to_string(),
        });
    }
    if !root.is_dir() {
        return Err(PromptError::InvalidSource {
            path: root.to_path_buf(),
            reason: "is not a directory".to_string(),
        });
    }

    match git2::Repository::open(root) {
        Ok(repo) => Ok(Box::new(GitSource::new(repo, revision)?)),
        Err(e) => match revision {
            Some(revision) => Err(PromptError::UnsupportedRevision {
                revision: revision.to_string(),
                reason: format!("{} is not a git repository ({})", root.display(), e.message()),
            }),
            None => {
                info!("{} is not a git repository, reading it as a plain directory", root.display());
                Ok(Box::new(DirectorySource::new(root)))
            }
        },
    }
}

/// Normalize a scope to a root-relative `/`-separated directory; empty means no scope
pub fn normalize_scope(scope: &str) -> Option<String> {
    let mut s = scope.trim().replace('\\', "/");
    while let Some(stripped) = s.strip_prefix("./") {
        s = stripped.to_string();
    }
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    let s = s.trim_matches('/');
    if s.is_empty() || s == "." { None } else { Some(s.to_string()) }
}

/// Whether a `/`-separated path lies under a normalized scope
pub(crate) fn in_scope(path: &str, scope: Option<&str>) -> bool {
    match scope {
        None => true,
        Some(scope) => path
            .strip_prefix(scope)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_location_parse() {
        assert_eq!(
            SourceLocation::parse("https://github.com/tvaroska/promptest.git"),
            SourceLocation::Remote("https://github.com/tvaroska/promptest.git".to_string())
        );
        assert!(matches!(SourceLocation::parse("git@github.com:a/b.git"), SourceLocation::Remote(_)));
        assert!(matches!(SourceLocation::parse("file:///tmp/repo"), SourceLocation::Remote(_)));
        assert_eq!(
            SourceLocation::parse("gitprompts/app"),
            SourceLocation::Local(PathBuf::from("gitprompts/app"))
        );
    }

    #[test]
    fn test_normalize_scope() {
        assert_eq!(normalize_scope("prompts/"), Some("prompts".to_string()));
        assert_eq!(normalize_scope("./a//b/"), Some("a/b".to_string()));
        assert_eq!(normalize_scope(" . "), None);
        assert_eq!(normalize_scope(""), None);
    }

    #[test]
    fn test_in_scope() {
        assert!(in_scope("prompts/a.txt", Some("prompts")));
        assert!(!in_scope("promptsx/a.txt", Some("prompts")));
        assert!(!in_scope("other/a.txt", Some("prompts")));
        assert!(in_scope("anything.txt", None));
    }

    #[test]
    fn test_open_local_missing_root() {
        let temp = TempDir::new().unwrap();
        let err = open_local(&temp.path().join("missing"), None).err().unwrap();
        assert!(matches!(err, PromptError::InvalidSource { .. }));
    }

    #[test]
    fn test_open_local_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("prompt.txt");
        std::fs::write(&file, "hi").unwrap();
        let err = open_local(&file, None).err().unwrap();
        assert!(matches!(err, PromptError::InvalidSource { .. }));
    }

    #[test]
    fn test_open_local_plain_directory_falls_back() {
        let temp = TempDir::new().unwrap();
        let source = open_local(temp.path(), None).unwrap();
        assert!(source.revision().is_none());
        assert!(source.changed_paths().unwrap().is_none());
    }

    #[test]
    fn test_open_local_revision_requires_repository() {
        let temp = TempDir::new().unwrap();
        let err = open_local(temp.path(), Some("v1.0")).err().unwrap();
        assert!(matches!(err, PromptError::UnsupportedRevision { ref revision, .. } if revision == "v1.0"));
    }
}
