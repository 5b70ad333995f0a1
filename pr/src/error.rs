//! Error types for prompt loading and indexing

use std::path::PathBuf;
use thiserror::Error;

use crate::format::FileFormat;

/// Result alias used throughout the library
pub type Result<T, E = PromptError> = std::result::Result<T, E>;

/// Errors that can occur while parsing, indexing or looking up prompts
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt {location} does not exist")]
    NotFound { location: String },

    #[error("Invalid location '{0}': expected 'name' or 'application/name'")]
    InvalidLocationString(String),

    #[error("Invalid source {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    #[error("Unsupported revision '{revision}': {reason}")]
    UnsupportedRevision { revision: String, reason: String },

    #[error("Malformed {format} content: {reason}")]
    MalformedContent { format: FileFormat, reason: String },

    #[error("Invalid role '{0}', expected one of: system, user, human, model, ai")]
    InvalidRole(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid prompt record: {0}")]
    InvalidRecord(String),

    #[error("{path}")]
    InFile {
        path: String,
        #[source]
        source: Box<PromptError>,
    },

    #[error("Failed to materialize {url}: {reason}")]
    Materialize { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

impl PromptError {
    /// Attach the source file path to an error raised while loading that file
    pub fn in_file(path: impl Into<String>, err: PromptError) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(err),
        }
    }

    /// The underlying error with any file-path context stripped
    pub fn root(&self) -> &PromptError {
        match self {
            Self::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_file_message_is_path_with_cause_chained() {
        let err = PromptError::in_file("pirates/first.json", PromptError::InvalidRole("robot".to_string()));

        assert_eq!(err.to_string(), "pirates/first.json");
        let cause = std::error::Error::source(&err).unwrap().to_string();
        assert!(cause.contains("robot"));
    }

    #[test]
    fn test_root_unwraps_nested_context() {
        let err = PromptError::in_file(
            "a.md",
            PromptError::in_file("b.md", PromptError::InvalidRecord("missing content".to_string())),
        );

        assert!(matches!(err.root(), PromptError::InvalidRecord(_)));
    }

    #[test]
    fn test_is_not_found() {
        let err = PromptError::NotFound {
            location: "pirates/first".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!PromptError::InvalidLocationString("a/b/c".to_string()).is_not_found());
    }
}
