//! Plain directory backend

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::{PromptSource, SourceEntry};
use crate::error::Result;
use crate::format::ParserTable;

/// Files on disk under a root directory
///
/// Every regular file is a candidate regardless of extension; paths with a
/// dot-prefixed segment below the root are skipped.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_hidden(&self, entry: &DirEntry) -> bool {
        entry
            .path()
            .strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            })
            .unwrap_or(false)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

impl PromptSource for DirectorySource {
    fn entries(&self, scope: Option<&str>, _parsers: &ParserTable) -> Result<Vec<SourceEntry>> {
        let base = match scope {
            Some(scope) => self.root.join(scope),
            None => self.root.clone(),
        };
        debug!(?base, "DirectorySource::entries: called");
        if !base.is_dir() {
            warn!("Scope {} is not a directory, no prompts to read", base.display());
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_hidden(e));
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = self.relative(entry.path());
            debug!(%path, "DirectorySource::entries: found file");
            entries.push(SourceEntry {
                content: fs::read(entry.path())?,
                path,
            });
        }
        Ok(entries)
    }

    fn changed_paths(&self) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    fn revision(&self) -> Option<String> {
        None
    }
}
