//! Shared fixtures: throwaway git repositories built with git2

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;

pub struct TestRepo {
    tempdir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("tempdir");
        let repo = Repository::init(tempdir.path()).expect("init repo");
        Self { tempdir, repo }
    }

    pub fn path(&self) -> &Path {
        self.tempdir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.tempdir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.join(rel)).unwrap();
        let mut idx = self.repo.index().unwrap();
        idx.remove_path(Path::new(rel)).unwrap();
        idx.write().unwrap();
    }

    /// Stage everything in the working tree and commit on HEAD
    pub fn commit(&self, msg: &str) -> Oid {
        let mut idx = self.repo.index().unwrap();
        idx.add_all(["."], IndexAddOption::DEFAULT, None).unwrap();
        idx.write().unwrap();
        let tree_id = idx.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Tester", "tester@example.com").unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo.commit(Some("HEAD"), &sig, &sig, msg, &tree, &parents).unwrap()
    }

    pub fn tag(&self, name: &str, oid: Oid) {
        let obj = self.repo.find_object(oid, None).unwrap();
        self.repo.tag_lightweight(name, &obj, false).unwrap();
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }
}

pub const PIRATE_PROMPT: &str = "Answer question in pirate voice.\nQuestion: {question}\nAnswer:";

pub const MARKDOWN_PROMPT: &str = "# Prompt\nHi. How are you doing?\n# Application\ndebugger\n\n# Description\nJust a stupid test\n# Use Case\ncreative";

/// Two commits: a base with one prompt, then `first` and `second` added
pub fn pirate_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.write("test.md", MARKDOWN_PROMPT);
    repo.write("README", "not a prompt");
    let base = repo.commit("base");
    repo.tag("v1.0", base);

    repo.write("pirates/first.txt", PIRATE_PROMPT);
    repo.write("pirates/second.yaml", "content: Tell a {adjective} story about {topic}\nmodels: gpt-4\n");
    repo.commit("add pirates");
    repo
}
