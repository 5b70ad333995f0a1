//! Prompt file formats
//!
//! Each format decodes raw file content into a flat [`FieldMap`] whose keys
//! are prompt record field names. Dispatch is by file extension through a
//! [`ParserTable`]; an unknown or missing extension falls back to plain text.
//!
//! | Extension | Format |
//! |---|---|
//! | `txt` | whole file is the prompt content |
//! | `json` | top-level object |
//! | `yaml`, `yml` | top-level mapping |
//! | `md`, `markdown` | heading-delimited sections, see [`markdown`] |

pub mod markdown;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{PromptError, Result};

pub use markdown::parse_markdown;

/// Decoded fields of one prompt file
pub type FieldMap = serde_json::Map<String, Value>;

/// Decoder from file content to fields
pub type ParseFn = fn(&str) -> Result<FieldMap>;

/// Built-in formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Text,
    Json,
    Yaml,
    Markdown,
}

const BUILTIN_EXTENSIONS: &[(&str, FileFormat)] = &[
    ("txt", FileFormat::Text),
    ("json", FileFormat::Json),
    ("yaml", FileFormat::Yaml),
    ("yml", FileFormat::Yaml),
    ("md", FileFormat::Markdown),
    ("markdown", FileFormat::Markdown),
];

impl FileFormat {
    /// Look up a built-in format by extension (case-insensitive, no dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        BUILTIN_EXTENSIONS.iter().find(|(e, _)| *e == ext).map(|(_, f)| *f)
    }

    /// Built-in format for a path, plain text when the extension is unknown
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        extension(path.as_ref())
            .and_then(|ext| Self::from_extension(&ext))
            .unwrap_or(Self::Text)
    }

    pub fn parser(self) -> ParseFn {
        match self {
            Self::Text => parse_text,
            Self::Json => parse_json,
            Self::Yaml => parse_yaml,
            Self::Markdown => parse_markdown,
        }
    }

    pub fn parse(self, content: &str) -> Result<FieldMap> {
        (self.parser())(content)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Markdown => "markdown",
        };
        write!(f, "{}", name)
    }
}

/// Plain text: the entire content is the prompt, verbatim
pub fn parse_text(content: &str) -> Result<FieldMap> {
    let mut fields = FieldMap::new();
    fields.insert("content".to_string(), Value::String(content.to_string()));
    Ok(fields)
}

pub fn parse_json(content: &str) -> Result<FieldMap> {
    let value: Value = serde_json::from_str(content).map_err(|e| malformed(FileFormat::Json, e))?;
    into_fields(FileFormat::Json, value)
}

pub fn parse_yaml(content: &str) -> Result<FieldMap> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| malformed(FileFormat::Yaml, e))?;
    into_fields(FileFormat::Yaml, value)
}

fn into_fields(format: FileFormat, value: Value) -> Result<FieldMap> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(malformed(
            format,
            format!("expected a mapping at the top level, found {}", kind(&other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

pub(crate) fn malformed(format: FileFormat, reason: impl ToString) -> PromptError {
    PromptError::MalformedContent {
        format,
        reason: reason.to_string(),
    }
}

/// Extension to decoder mapping
///
/// The default table holds the built-in formats. Extra extensions can be
/// registered; registered extensions also make files candidates when
/// enumerating a git tree.
#[derive(Debug, Clone)]
pub struct ParserTable {
    parsers: BTreeMap<String, ParseFn>,
}

impl Default for ParserTable {
    fn default() -> Self {
        let parsers = BUILTIN_EXTENSIONS
            .iter()
            .map(|(ext, format)| (ext.to_string(), format.parser()))
            .collect();
        Self { parsers }
    }
}

impl ParserTable {
    /// Register (or replace) the decoder for an extension
    pub fn register(mut self, ext: &str, parser: ParseFn) -> Self {
        self.parsers.insert(ext.trim_start_matches('.').to_lowercase(), parser);
        self
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    /// Whether the path has an extension with a registered decoder
    pub fn recognizes(&self, path: impl AsRef<Path>) -> bool {
        extension(path.as_ref()).is_some_and(|ext| self.parsers.contains_key(&ext))
    }

    /// Decoder for a path, falling back to plain text
    pub fn parser_for(&self, path: impl AsRef<Path>) -> ParseFn {
        extension(path.as_ref())
            .and_then(|ext| self.parsers.get(&ext).copied())
            .unwrap_or(parse_text)
    }

    pub fn parse(&self, path: impl AsRef<Path>, content: &str) -> Result<FieldMap> {
        let path = path.as_ref();
        debug!(?path, "ParserTable::parse: called");
        (self.parser_for(path))(content)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_lowercase)
}
