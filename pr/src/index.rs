//! Repository index: every prompt in a source, addressable by location

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{PromptError, Result};
use crate::format::{FileFormat, ParserTable, malformed};
use crate::location::{IdentityPolicy, Location, resolve_identity};
use crate::record::PromptRecord;
use crate::source::{self, GitCloner, Materializer, PromptSource, SourceEntry, SourceLocation, remote};

/// What a lookup miss returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotFoundPolicy {
    /// Fail with [`PromptError::NotFound`]
    #[default]
    Raise,
    /// Return `Ok(None)`
    Empty,
}

/// Options for [`RepositoryIndex::open`]
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Branch, tag or commit to read; `HEAD` when unset
    pub revision: Option<String>,
    /// Root-relative directory to restrict enumeration to
    pub scope: Option<String>,
    pub identity: IdentityPolicy,
    pub not_found: NotFoundPolicy,
    pub parsers: ParserTable,
    /// Root-relative `/`-separated paths that are never indexed
    pub exclude: Vec<String>,
}

impl IndexOptions {
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_not_found(mut self, not_found: NotFoundPolicy) -> Self {
        self.not_found = not_found;
        self
    }

    pub fn with_parsers(mut self, parsers: ParserTable) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_exclude(mut self, path: impl Into<String>) -> Self {
        self.exclude.push(path.into());
        self
    }
}

#[derive(Debug)]
struct Indexed {
    path: String,
    record: PromptRecord,
}

/// Immutable lookup table built eagerly from one source at one revision
pub struct RepositoryIndex {
    source: Box<dyn PromptSource>,
    entries: Vec<Indexed>,
    by_location: BTreeMap<String, usize>,
    by_path: BTreeMap<String, usize>,
    not_found: NotFoundPolicy,
    // Dropped after `source` so the repository is closed before its checkout goes away
    checkout: Option<TempDir>,
}

impl fmt::Debug for RepositoryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryIndex")
            .field("revision", &self.source.revision())
            .field("locations", &self.by_location.keys().collect::<Vec<_>>())
            .field("not_found", &self.not_found)
            .field("checkout", &self.checkout.as_ref().map(TempDir::path))
            .finish()
    }
}

impl RepositoryIndex {
    /// Open a local path or remote address, cloning remotes with [`GitCloner`]
    pub fn open(source: impl Into<SourceLocation>, options: IndexOptions) -> Result<Self> {
        Self::open_with(source, options, &GitCloner)
    }

    /// Open with a caller-provided materializer for remote addresses
    pub fn open_with(
        source: impl Into<SourceLocation>,
        options: IndexOptions,
        materializer: &dyn Materializer,
    ) -> Result<Self> {
        let location = source.into();
        debug!(?location, ?options, "RepositoryIndex::open_with: called");
        match location {
            SourceLocation::Local(root) => {
                let backend = source::open_local(&root, options.revision.as_deref())?;
                Self::build(backend, options, None)
            }
            SourceLocation::Remote(url) => {
                let checkout = remote::checkout(&url, materializer)?;
                let backend = source::open_local(checkout.path(), options.revision.as_deref())?;
                Self::build(backend, options, Some(checkout))
            }
        }
    }

    /// Index an already opened backend
    pub fn from_source(source: Box<dyn PromptSource>, options: IndexOptions) -> Result<Self> {
        Self::build(source, options, None)
    }

    fn build(source: Box<dyn PromptSource>, options: IndexOptions, checkout: Option<TempDir>) -> Result<Self> {
        let scope = options.scope.as_deref().and_then(source::normalize_scope);
        let mut files = source.entries(scope.as_deref(), &options.parsers)?;
        files.retain(|file| {
            let excluded = options.exclude.iter().any(|path| *path == file.path);
            if excluded {
                debug!(path = %file.path, "RepositoryIndex::build: excluded");
            }
            !excluded
        });
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut index = Self {
            source,
            entries: Vec::with_capacity(files.len()),
            by_location: BTreeMap::new(),
            by_path: BTreeMap::new(),
            not_found: options.not_found,
            checkout,
        };
        for file in files {
            let record = load(&file, &options).map_err(|e| PromptError::in_file(file.path.as_str(), e))?;
            index.insert(file.path, record)?;
        }

        info!(
            "Indexed {} prompts at {}",
            index.len(),
            index.revision().unwrap_or_else(|| "working tree".to_string())
        );
        Ok(index)
    }

    fn insert(&mut self, path: String, record: PromptRecord) -> Result<()> {
        let key = record
            .location()
            .ok_or_else(|| PromptError::in_file(path.as_str(), PromptError::InvalidRecord("no name".to_string())))?
            .to_string();

        match self.by_location.get(&key).copied() {
            Some(slot) => {
                let previous = std::mem::replace(&mut self.entries[slot], Indexed { path, record });
                warn!(
                    "{} and {} both resolve to {}, keeping {}",
                    previous.path, self.entries[slot].path, key, self.entries[slot].path
                );
                self.by_path.remove(&previous.path);
                self.by_path.insert(self.entries[slot].path.clone(), slot);
            }
            None => {
                let slot = self.entries.len();
                self.by_location.insert(key, slot);
                self.by_path.insert(path.clone(), slot);
                self.entries.push(Indexed { path, record });
            }
        }
        Ok(())
    }

    /// Rendered content of the prompt at `location`
    pub fn get(&self, location: &str) -> Result<Option<String>> {
        self.render_with(location, |record| record.content().to_string())
    }

    /// Apply `render` to the prompt at `location`
    pub fn render_with<T>(&self, location: &str, render: impl FnOnce(&PromptRecord) -> T) -> Result<Option<T>> {
        Ok(self.record(location)?.map(render))
    }

    pub fn record(&self, location: &str) -> Result<Option<&PromptRecord>> {
        debug!(%location, "RepositoryIndex::record: called");
        let location = Location::parse(location)?;
        match self.by_location.get(&location.to_string()) {
            Some(&slot) => Ok(Some(&self.entries[slot].record)),
            None => match self.not_found {
                NotFoundPolicy::Raise => Err(PromptError::NotFound {
                    location: location.to_string(),
                }),
                NotFoundPolicy::Empty => Ok(None),
            },
        }
    }

    /// The record loaded from a source-relative path, if it survived collisions
    pub fn record_for_path(&self, path: &str) -> Option<&PromptRecord> {
        self.by_path.get(path).map(|&slot| &self.entries[slot].record)
    }

    /// Canonical location strings in sorted order
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.by_location.keys().map(String::as_str)
    }

    /// Records in the order their location was first seen
    ///
    /// A record that replaced an earlier one at the same location takes over
    /// that earlier position.
    pub fn records(&self) -> impl Iterator<Item = &PromptRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commit id of the indexed revision; `None` for plain directories
    pub fn revision(&self) -> Option<String> {
        self.source.revision()
    }

    pub fn is_versioned(&self) -> bool {
        self.revision().is_some()
    }

    /// Local checkout backing a remote source, while the index is alive
    pub fn checkout_path(&self) -> Option<&Path> {
        self.checkout.as_ref().map(TempDir::path)
    }

    /// Prompts added or modified by the indexed revision relative to its parent
    ///
    /// `None` when the source has no history. Changed files that are not
    /// indexed prompts are skipped.
    pub fn changes(&self) -> Result<Option<Vec<&PromptRecord>>> {
        debug!("RepositoryIndex::changes: called");
        let Some(paths) = self.source.changed_paths()? else {
            return Ok(None);
        };

        let mut changed = Vec::new();
        for path in paths {
            match self.by_path.get(&path) {
                Some(&slot) => changed.push(&self.entries[slot].record),
                None => debug!(%path, "RepositoryIndex::changes: not an indexed prompt"),
            }
        }
        Ok(Some(changed))
    }
}

fn load(file: &SourceEntry, options: &IndexOptions) -> Result<PromptRecord> {
    debug!(path = %file.path, "load: called");
    let text = std::str::from_utf8(&file.content).map_err(|e| malformed(FileFormat::for_path(&file.path), e))?;
    let fields = options.parsers.parse(&file.path, text)?;
    let mut record = PromptRecord::from_fields(fields)?;
    resolve_identity(&mut record, &Location::from_path(&file.path), options.identity);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemorySource {
        files: Vec<(String, Vec<u8>)>,
        changed: Option<Vec<&'static str>>,
    }

    impl MemorySource {
        fn new(files: &[(&str, &str)]) -> Self {
            Self::raw(files.iter().map(|(p, c)| (p.to_string(), c.as_bytes().to_vec())).collect())
        }

        fn raw(files: Vec<(String, Vec<u8>)>) -> Self {
            Self { files, changed: None }
        }
    }

    impl PromptSource for MemorySource {
        fn entries(&self, scope: Option<&str>, _parsers: &ParserTable) -> Result<Vec<SourceEntry>> {
            Ok(self
                .files
                .iter()
                .filter(|(path, _)| source::in_scope(path, scope))
                .map(|(path, content)| SourceEntry {
                    path: path.clone(),
                    content: content.clone(),
                })
                .collect())
        }

        fn changed_paths(&self) -> Result<Option<Vec<String>>> {
            Ok(self
                .changed
                .as_ref()
                .map(|paths| paths.iter().map(|p| p.to_string()).collect()))
        }

        fn revision(&self) -> Option<String> {
            self.changed.as_ref().map(|_| "abc123".to_string())
        }
    }

    fn index(files: &[(&str, &str)], options: IndexOptions) -> Result<RepositoryIndex> {
        RepositoryIndex::from_source(Box::new(MemorySource::new(files)), options)
    }

    #[test]
    fn test_lookup_by_path_derived_location() {
        let idx = index(&[("pirates/first.txt", "Arr {question}")], IndexOptions::default()).unwrap();

        assert_eq!(idx.get("pirates/first").unwrap().as_deref(), Some("Arr {question}"));
        let record = idx.record("pirates/first").unwrap().unwrap();
        assert_eq!(record.variables(), ["question"]);
        assert_eq!(record.application(), Some("pirates"));
        assert_eq!(idx.locations().collect::<Vec<_>>(), vec!["pirates/first"]);
        assert!(!idx.is_versioned());
    }

    #[test]
    fn test_not_found_policies() {
        let files = [("a.txt", "x")];
        let err = index(&files, IndexOptions::default()).unwrap().get("missing").unwrap_err();
        assert!(err.is_not_found());

        let idx = index(&files, IndexOptions::default().with_not_found(NotFoundPolicy::Empty)).unwrap();
        assert_eq!(idx.get("missing").unwrap(), None);
        assert_eq!(idx.get("a").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_invalid_location_string_even_with_empty_policy() {
        let idx = index(&[], IndexOptions::default().with_not_found(NotFoundPolicy::Empty)).unwrap();
        let err = idx.get("a/b/c").unwrap_err();
        assert!(matches!(err, PromptError::InvalidLocationString(_)));
        assert!(idx.is_empty());
    }

    #[test]
    fn test_declared_identity_wins_by_default() {
        let files = [("misc/greeting.yaml", "content: Hello {name}\napplication: bots\nname: hello\n")];
        let idx = index(&files, IndexOptions::default()).unwrap();
        assert!(idx.record("bots/hello").unwrap().is_some());

        let idx = index(&files, IndexOptions::default().with_identity(IdentityPolicy::PreferPath)).unwrap();
        assert!(idx.record("misc/greeting").unwrap().is_some());
    }

    #[test]
    fn test_collision_later_path_wins() {
        let files = [
            ("b/dup.txt", "from b"),
            ("a/x.yaml", "content: from a\napplication: b\nname: dup\n"),
        ];
        let idx = index(&files, IndexOptions::default()).unwrap();

        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("b/dup").unwrap().as_deref(), Some("from b"));
        assert!(idx.record_for_path("a/x.yaml").is_none());
        assert!(idx.record_for_path("b/dup.txt").is_some());
    }

    #[test]
    fn test_records_keep_first_seen_position_after_collision() {
        let files = [
            ("b/dup.txt", "from b"),
            ("a/x.yaml", "content: from a\napplication: b\nname: dup\n"),
            ("a/y.txt", "y"),
        ];
        let idx = index(&files, IndexOptions::default()).unwrap();

        let contents: Vec<String> = idx.records().map(|r| r.content().to_string()).collect();
        assert_eq!(contents, vec!["from b", "y"]);
    }

    #[test]
    fn test_exclude_skips_paths() {
        let files = [("promptrepo.yml", "not-found: empty\n"), ("hello.txt", "Hello {name}")];
        let err = index(&files, IndexOptions::default()).unwrap_err();
        assert!(err.to_string().contains("promptrepo.yml"));

        let idx = index(&files, IndexOptions::default().with_exclude("promptrepo.yml")).unwrap();
        assert_eq!(idx.locations().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn test_malformed_file_aborts_with_path() {
        let files = [("ok.txt", "fine"), ("bad/broken.json", "{\"content\":")];
        let err = index(&files, IndexOptions::default()).unwrap_err();

        assert!(err.to_string().contains("bad/broken.json"));
        assert!(matches!(err.root(), PromptError::MalformedContent { format: FileFormat::Json, .. }));
    }

    #[test]
    fn test_non_utf8_is_malformed() {
        let source = MemorySource::raw(vec![("bin.txt".to_string(), vec![0xff, 0xfe])]);
        let err = RepositoryIndex::from_source(Box::new(source), IndexOptions::default()).unwrap_err();
        assert!(matches!(err.root(), PromptError::MalformedContent { format: FileFormat::Text, .. }));
    }

    #[test]
    fn test_scope_is_normalized_before_enumeration() {
        let files = [("prompts/a/one.txt", "1"), ("other/two.txt", "2")];
        let idx = index(&files, IndexOptions::default().with_scope("./prompts/")).unwrap();
        assert_eq!(idx.locations().collect::<Vec<_>>(), vec!["a/one"]);

        let idx = index(&files, IndexOptions::default().with_scope(".")).unwrap();
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_changes_maps_paths_and_skips_misses() {
        let mut source = MemorySource::new(&[("p/one.txt", "1"), ("p/two.txt", "2")]);
        source.changed = Some(vec!["p/two.txt", "README.rst"]);
        let idx = RepositoryIndex::from_source(Box::new(source), IndexOptions::default()).unwrap();

        let changed = idx.changes().unwrap().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name(), Some("two"));
        assert_eq!(idx.revision().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_changes_without_history() {
        let idx = index(&[("a.txt", "a")], IndexOptions::default()).unwrap();
        assert!(idx.changes().unwrap().is_none());
    }

    #[test]
    fn test_render_with() {
        let files = [("chat.json", r#"{"content": [{"role": "system", "content": "Be {tone}"}]}"#)];
        let idx = index(&files, IndexOptions::default()).unwrap();
        let vars = idx
            .render_with("chat", |record| record.variables().to_vec())
            .unwrap()
            .unwrap();
        assert_eq!(vars, vec!["tone"]);
    }
}
