//! promptrepo - prompt files loaded from a directory or git repository
//!
//! Prompts live as individual files (`.txt`, `.json`, `.yaml`/`.yml`,
//! `.md`/`.markdown`). Each file is parsed into a [`PromptRecord`], given an
//! identity (`application/name`) from its declared fields and its path, and
//! indexed for lookup. For git sources the index also reports which prompts
//! the selected revision added or modified.
//!
//! # Layout convention
//!
//! ```text
//! repo/
//! ├── pirates/
//! │   ├── first.txt      # pirates/first
//! │   └── second.yaml    # pirates/second (unless it declares otherwise)
//! └── greeting.md        # greeting
//! ```
//!
//! # Example
//!
//! ```ignore
//! use promptrepo::{IndexOptions, RepositoryIndex};
//!
//! let index = RepositoryIndex::open("prompts", IndexOptions::default().with_revision("v1.0"))?;
//! let text = index.get("pirates/first")?;
//! for record in index.changes()?.unwrap_or_default() {
//!     println!("{}", record.location().unwrap());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
mod index;
mod location;
mod record;
pub mod source;
mod variables;

pub use error::{PromptError, Result};
pub use format::{FieldMap, FileFormat, ParseFn, ParserTable};
pub use index::{IndexOptions, NotFoundPolicy, RepositoryIndex};
pub use location::{IdentityPolicy, Location, resolve_identity};
pub use record::{Content, Models, PromptRecord, Role, Turn};
pub use source::{DirectorySource, GitCloner, GitSource, Materializer, PromptSource, SourceEntry, SourceLocation};
pub use variables::extract_variables;
