//! Heading-delimited prompt format
//!
//! ```text
//! # Prompt
//! Hi. How are you doing?
//!
//! # Application
//! debugger
//!
//! # Models
//! - gpt-4
//! - claude
//! ```
//!
//! The document is split into blocks (headings, paragraphs, fenced code) and
//! parsed recursively. At each level the shallowest heading depth present
//! marks the section boundaries. A section without sub-headings takes the
//! text of its blocks; a section with sub-headings is parsed again as its own
//! level. Heading text becomes the field key: lowercased, spaces and dashes
//! turned into underscores (`# Use Case` -> `use_case`).
//!
//! Sub-sections under the prompt itself are conversation turns:
//!
//! ```text
//! # Prompt
//! ## System
//! You are a pirate.
//! ## User
//! {question}
//! ```

use serde_json::{Value, json};
use tracing::debug;

use super::{FieldMap, FileFormat, malformed};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Heading { depth: usize, text: String },
    Paragraph(String),
    Fence(String),
}

impl Block {
    fn heading_depth(&self) -> Option<usize> {
        match self {
            Self::Heading { depth, .. } => Some(*depth),
            _ => None,
        }
    }

    fn text(&self) -> &str {
        match self {
            Self::Heading { text, .. } => text,
            Self::Paragraph(text) | Self::Fence(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    Text(String),
    Nested(Vec<(String, Section)>),
}

/// Parse heading-delimited content into fields
///
/// Text before the first heading is the prompt content, so a document
/// without headings is entirely content.
pub fn parse_markdown(text: &str) -> Result<FieldMap> {
    let blocks = lex(text)?;
    debug!(blocks = blocks.len(), "parse_markdown: lexed");
    if blocks.is_empty() {
        return Ok(FieldMap::new());
    }
    let sections = parse_level(&blocks, true)?;
    Ok(into_fields(sections))
}

fn lex(text: &str) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        if let Some(fence) = fence_marker(line) {
            flush(&mut paragraph, &mut blocks);
            let mut body = Vec::new();
            loop {
                match lines.next() {
                    None => return Err(malformed(FileFormat::Markdown, "unterminated code fence")),
                    Some(inner) if is_fence_close(inner, fence) => break,
                    Some(inner) => body.push(inner.trim_end_matches('\r')),
                }
            }
            blocks.push(Block::Fence(body.join("\n")));
        } else if let Some((depth, heading)) = heading(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading { depth, text: heading });
        } else if line.trim().is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else {
            paragraph.push(line.trim_end());
        }
    }
    flush(&mut paragraph, &mut blocks);
    Ok(blocks)
}

fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(paragraph.join("\n")));
        paragraph.clear();
    }
}

/// Leading indentation allowed before a heading or fence marker
fn unindent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}

fn heading(line: &str) -> Option<(usize, String)> {
    let line = unindent(line)?;
    let depth = line.chars().take_while(|c| *c == '#').count();
    if depth == 0 || depth > 6 {
        return None;
    }
    let rest = &line[depth..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim();
    // Optional closing sequence: "## Title ##"
    let unclosed = text.trim_end_matches('#');
    let text = if unclosed.is_empty() || unclosed.ends_with([' ', '\t']) {
        unclosed.trim_end()
    } else {
        text
    };
    Some((depth, text.to_string()))
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let line = unindent(line)?;
    ["```", "~~~"].into_iter().find(|marker| line.starts_with(marker))
}

fn is_fence_close(line: &str, marker: &str) -> bool {
    let Some(line) = unindent(line) else {
        return false;
    };
    let line = line.trim_end();
    let fence_char = marker.chars().next().unwrap_or('`');
    line.starts_with(marker) && line.chars().all(|c| c == fence_char)
}

fn parse_level(blocks: &[Block], top: bool) -> Result<Vec<(String, Section)>> {
    let Some(depth) = blocks.iter().filter_map(Block::heading_depth).min() else {
        return Ok(vec![("content".to_string(), Section::Text(join(blocks)))]);
    };
    let boundaries: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.heading_depth() == Some(depth))
        .map(|(i, _)| i)
        .collect();

    let mut sections = Vec::new();
    let first = boundaries[0];
    if first > 0 {
        if !top {
            return Err(malformed(
                FileFormat::Markdown,
                format!("text '{}' appears before the first sub-heading", preview(blocks[0].text())),
            ));
        }
        sections.push(("content".to_string(), Section::Text(join(&blocks[..first]))));
    }

    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(blocks.len());
        let title = blocks[start].text();
        let key = normalize_key(title);
        if key.is_empty() {
            return Err(malformed(FileFormat::Markdown, "heading without text"));
        }

        let body = &blocks[start + 1..end];
        if body.is_empty() {
            return Err(malformed(
                FileFormat::Markdown,
                format!("section '{}' has no content", title),
            ));
        }

        let section = if body.iter().any(|b| b.heading_depth().is_some()) {
            Section::Nested(parse_level(body, false)?)
        } else {
            Section::Text(join(body))
        };
        sections.push((key, section));
    }
    Ok(sections)
}

fn join(blocks: &[Block]) -> String {
    blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n\n")
}

fn normalize_key(title: &str) -> String {
    let key = title.trim().to_lowercase().replace([' ', '-'], "_");
    if key == "prompt" { "content".to_string() } else { key }
}

fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default();
    if first.chars().count() > 40 {
        format!("{}...", first.chars().take(40).collect::<String>())
    } else {
        first.to_string()
    }
}

fn into_fields(sections: Vec<(String, Section)>) -> FieldMap {
    let mut fields = FieldMap::new();
    for (key, section) in sections {
        let value = match (key.as_str(), section) {
            ("models", Section::Text(text)) => Value::Array(split_models(&text)),
            ("content", Section::Nested(turns)) => Value::Array(
                turns
                    .into_iter()
                    .map(|(role, section)| json!({ "role": role, "content": section_value(section) }))
                    .collect(),
            ),
            (_, section) => section_value(section),
        };
        fields.insert(key, value);
    }
    fields
}

fn section_value(section: Section) -> Value {
    match section {
        Section::Text(text) => Value::String(text),
        Section::Nested(inner) => Value::Object(into_fields(inner)),
    }
}

fn split_models(text: &str) -> Vec<Value> {
    text.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix(['-', '*', '+']).map(str::trim_start).unwrap_or(line)
        })
        .filter(|line| !line.is_empty())
        .map(|line| Value::String(line.to_string()))
        .collect()
}
