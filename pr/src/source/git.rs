//! Git backend: prompt files read from the tree of one commit

use git2::{Delta, FileMode, ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use tracing::debug;

use super::{PromptSource, SourceEntry, in_scope};
use crate::error::{PromptError, Result};
use crate::format::ParserTable;

/// A repository pinned to one resolved commit
///
/// Only the committed tree is read, so uncommitted edits in the working
/// directory are invisible.
pub struct GitSource {
    repo: Repository,
    commit: Oid,
}

impl GitSource {
    /// Resolve `revision` (branch, tag, or commit id; `HEAD` when absent)
    pub fn new(repo: Repository, revision: Option<&str>) -> Result<Self> {
        let spec = revision.unwrap_or("HEAD");
        debug!(%spec, "GitSource::new: called");
        let unsupported = |e: git2::Error| PromptError::UnsupportedRevision {
            revision: spec.to_string(),
            reason: e.message().to_string(),
        };
        let commit = repo
            .revparse_single(spec)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(unsupported)?
            .id();
        debug!(%commit, "GitSource::new: resolved");
        Ok(Self { repo, commit })
    }

    pub fn commit_id(&self) -> Oid {
        self.commit
    }
}

impl PromptSource for GitSource {
    fn entries(&self, scope: Option<&str>, parsers: &ParserTable) -> Result<Vec<SourceEntry>> {
        debug!(?scope, commit = %self.commit, "GitSource::entries: called");
        let tree = self.repo.find_commit(self.commit)?.tree()?;

        let mut blobs: Vec<(String, Oid)> = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            // Symlinks are stored as blobs too
            if entry.kind() != Some(ObjectType::Blob) || entry.filemode() == i32::from(FileMode::Link) {
                return TreeWalkResult::Ok;
            }
            let Some(name) = entry.name() else {
                return TreeWalkResult::Ok;
            };
            let path = format!("{}{}", dir, name);
            if parsers.recognizes(&path) && in_scope(&path, scope) {
                blobs.push((path, entry.id()));
            }
            TreeWalkResult::Ok
        })?;

        blobs
            .into_iter()
            .map(|(path, oid)| {
                let content = self.repo.find_blob(oid)?.content().to_vec();
                debug!(%path, "GitSource::entries: found blob");
                Ok(SourceEntry { path, content })
            })
            .collect()
    }

    fn changed_paths(&self) -> Result<Option<Vec<String>>> {
        let commit = self.repo.find_commit(self.commit)?;
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() == 0 {
            None
        } else {
            Some(commit.parent(0)?.tree()?)
        };

        let diff = self.repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let paths: Vec<String> = diff
            .deltas()
            .filter(|delta| matches!(delta.status(), Delta::Added | Delta::Modified))
            .filter_map(|delta| delta.new_file().path().map(|p| p.to_string_lossy().replace('\\', "/")))
            .collect();
        debug!(?paths, "GitSource::changed_paths: diff against first parent");
        Ok(Some(paths))
    }

    fn revision(&self) -> Option<String> {
        Some(self.commit.to_string())
    }
}
