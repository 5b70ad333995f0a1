//! Remote repositories
//!
//! A remote address is cloned into a private temporary directory which is
//! then opened like any local repository. The directory lives exactly as
//! long as the returned [`TempDir`].

use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{PromptError, Result};

/// Produces a local copy of a remote repository
pub trait Materializer {
    /// Populate `dest` (an existing, empty directory) from `url`
    fn materialize(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Full clone through libgit2
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCloner;

impl Materializer for GitCloner {
    fn materialize(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(%url, ?dest, "GitCloner::materialize: called");
        git2::Repository::clone(url, dest).map_err(|e| PromptError::Materialize {
            url: url.to_string(),
            reason: e.message().to_string(),
        })?;
        Ok(())
    }
}

/// Materialize `url` into a fresh temporary directory
///
/// On failure the directory is removed before the error is returned.
pub fn checkout(url: &str, materializer: &dyn Materializer) -> Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("promptrepo-").tempdir()?;
    info!("Fetching {} into {}", url, dir.path().display());
    materializer.materialize(url, dir.path())?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;

    struct FailingMaterializer {
        dest: RefCell<Option<PathBuf>>,
    }

    impl Materializer for FailingMaterializer {
        fn materialize(&self, url: &str, dest: &Path) -> Result<()> {
            fs::write(dest.join("partial.txt"), "half").unwrap();
            *self.dest.borrow_mut() = Some(dest.to_path_buf());
            Err(PromptError::Materialize {
                url: url.to_string(),
                reason: "network unreachable".to_string(),
            })
        }
    }

    #[test]
    fn test_checkout_failure_removes_directory() {
        let materializer = FailingMaterializer {
            dest: RefCell::new(None),
        };
        let err = checkout("https://example.invalid/repo.git", &materializer).unwrap_err();
        assert!(matches!(err, PromptError::Materialize { .. }));

        let dest = materializer.dest.borrow().clone().unwrap();
        assert!(!dest.exists());
    }

    #[test]
    fn test_git_cloner_local_url() {
        let upstream = TempDir::new().unwrap();
        let repo = git2::Repository::init(upstream.path()).unwrap();
        fs::write(upstream.path().join("a.txt"), "hello").unwrap();
        let mut idx = repo.index().unwrap();
        idx.add_path(Path::new("a.txt")).unwrap();
        idx.write().unwrap();
        let tree = repo.find_tree(idx.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("Tester", "tester@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();

        let url = format!("file://{}", upstream.path().display());
        let dir = checkout(&url, &GitCloner).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hello");

        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_git_cloner_bad_url() {
        let missing = TempDir::new().unwrap();
        let url = format!("file://{}", missing.path().join("nope").display());
        let err = checkout(&url, &GitCloner).unwrap_err();
        assert!(matches!(err, PromptError::Materialize { ref url, .. } if url.ends_with("nope")));
    }
}
