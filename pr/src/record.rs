//! Canonical prompt record
//!
//! Every source format is decoded into a [`FieldMap`] and validated here into
//! a [`PromptRecord`]. The record's `variables` are derived from its content
//! and recomputed whenever the content changes; they cannot be set directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PromptError, Result};
use crate::format::FieldMap;
use crate::location::Location;
use crate::variables::extract_variables;

/// Speaker of one turn in a multi-turn prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Human,
    Model,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Human => "human",
            Self::Model => "model",
            Self::Ai => "ai",
        }
    }
}

impl FromStr for Role {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "human" => Ok(Self::Human),
            "model" => Ok(Self::Model),
            "ai" => Ok(Self::Ai),
            _ => Err(PromptError::InvalidRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Prompt body: a single template or an ordered conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Turns(Vec<Turn>),
}

impl Content {
    /// Template texts in order, one per turn for multi-turn content
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Turns(turns) => turns.iter().map(|t| t.content.as_str()).collect(),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Turn>> for Content {
    fn from(turns: Vec<Turn>) -> Self {
        Self::Turns(turns)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Turns(turns) => {
                for (i, turn) in turns.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}: {}", turn.role, turn.content)?;
                }
                Ok(())
            }
        }
    }
}

/// A validated prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptRecord {
    content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    use_case: Option<String>,
    variables: Vec<String>,
}

impl PromptRecord {
    /// Create a record with only content set
    pub fn new(content: impl Into<Content>) -> Result<Self> {
        let content = content.into();
        let variables = extract_variables(content.texts())?;
        Ok(Self {
            content,
            application: None,
            name: None,
            models: Vec::new(),
            description: None,
            use_case: None,
            variables,
        })
    }

    /// Validate a decoded field map into a record
    pub fn from_fields(fields: FieldMap) -> Result<Self> {
        debug!(keys = ?fields.keys().collect::<Vec<_>>(), "PromptRecord::from_fields: called");
        let raw: RawRecord = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| PromptError::InvalidRecord(e.to_string()))?;

        // `content` wins when a file declares both spellings
        let content = match raw.content.or(raw.prompt) {
            Some(RawContent::Text(text)) => Content::Text(text),
            Some(RawContent::Turns(turns)) => Content::Turns(
                turns
                    .into_iter()
                    .map(|t| -> Result<Turn> { Ok(Turn::new(t.role.parse()?, t.content)) })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => return Err(PromptError::InvalidRecord("missing content".to_string())),
        };

        if raw.name.as_deref() == Some("") {
            return Err(PromptError::InvalidRecord("name must not be empty".to_string()));
        }
        for (field, value) in [("name", &raw.name), ("application", &raw.application)] {
            if let Some(value) = value.as_deref().filter(|v| v.contains('/')) {
                return Err(PromptError::InvalidRecord(format!("{} '{}' must not contain '/'", field, value)));
            }
        }

        let mut record = Self::new(content)?;
        record.application = raw.application;
        record.name = raw.name;
        record.models = raw.models.map(Models::into_vec).unwrap_or_default();
        record.description = raw.description;
        record.use_case = raw.use_case;
        Ok(record)
    }

    /// Replace the content, recomputing variables
    ///
    /// On error the record is left unchanged.
    pub fn set_content(&mut self, content: impl Into<Content>) -> Result<()> {
        let content = content.into();
        self.variables = extract_variables(content.texts())?;
        self.content = content;
        Ok(())
    }

    pub fn with_models(mut self, models: impl Into<Models>) -> Self {
        self.models = models.into().into_vec();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_use_case(mut self, use_case: impl Into<String>) -> Self {
        self.use_case = Some(use_case.into());
        self
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn use_case(&self) -> Option<&str> {
        self.use_case.as_deref()
    }

    /// Variable names in first-occurrence order; empty when there are none
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Canonical location, once a name is known
    ///
    /// An explicitly empty application is rendered as no application.
    pub fn location(&self) -> Option<Location> {
        let name = self.name.as_ref()?;
        let application = self.application.clone().filter(|a| !a.is_empty());
        Some(Location::new(application, name.clone()))
    }

    pub(crate) fn set_identity(&mut self, application: Option<String>, name: String) {
        self.application = application;
        self.name = Some(name);
    }
}

impl fmt::Display for PromptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Model list as declared in a source file: a single name or a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Models {
    One(String),
    Many(Vec<String>),
}

impl Models {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(model) => vec![model],
            Self::Many(models) => models,
        }
    }
}

impl From<&str> for Models {
    fn from(model: &str) -> Self {
        Self::One(model.to_string())
    }
}

impl From<String> for Models {
    fn from(model: String) -> Self {
        Self::One(model)
    }
}

impl From<Vec<String>> for Models {
    fn from(models: Vec<String>) -> Self {
        Self::Many(models)
    }
}

impl From<Vec<&str>> for Models {
    fn from(models: Vec<&str>) -> Self {
        Self::Many(models.into_iter().map(str::to_string).collect())
    }
}

/// Field map shape accepted from source files; unknown keys are ignored
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    prompt: Option<RawContent>,
    #[serde(default)]
    models: Option<Models>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    application: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    use_case: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Turns(Vec<RawTurn>),
}

#[derive(Debug, Deserialize)]
struct RawTurn {
    role: String,
    content: String,
}
