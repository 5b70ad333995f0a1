//! Template variable extraction
//!
//! Templates use `str.format`-style replacement fields:
//! `{name}`, `{name!r}`, `{name:>10}`, `{name:{width}}`, with `{{` and `}}`
//! as literal braces. The variable is the field's argument name, so
//! `{user.name}` and `{items[0]}` yield `user` and `items`. Empty (`{}`) and
//! positional (`{0}`) fields are not variables.

use std::collections::HashSet;
use std::iter::Peekable;
use std::str::Chars;

use tracing::debug;

use crate::error::{PromptError, Result};

/// Nesting allowed inside a format spec, matching `str.format`
const MAX_SPEC_DEPTH: usize = 1;

/// Extract distinct variable names from one or more templates
///
/// Names are returned in first-occurrence order across all texts, in the
/// order the texts are given.
pub fn extract_variables<'a, I>(texts: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut collector = Collector::default();
    for text in texts {
        collector.scan(text)?;
    }
    debug!(count = collector.names.len(), "extract_variables: done");
    Ok(collector.names)
}

#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    names: Vec<String>,
}

impl Collector {
    fn scan(&mut self, text: &str) -> Result<()> {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                }
                '{' => self.replacement_field(&mut chars, 0)?,
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                }
                '}' => return Err(invalid("single '}' encountered in format string")),
                _ => {}
            }
        }
        Ok(())
    }

    /// Parse one field after its opening brace, through its closing brace
    fn replacement_field(&mut self, chars: &mut Peekable<Chars<'_>>, depth: usize) -> Result<()> {
        let mut field = String::new();
        loop {
            match chars.next() {
                None => return Err(invalid("expected '}' before end of string")),
                Some('{') => return Err(invalid("unexpected '{' in field name")),
                Some('[') => {
                    field.push('[');
                    loop {
                        match chars.next() {
                            None => return Err(invalid("missing ']' in format string")),
                            Some(']') => {
                                field.push(']');
                                break;
                            }
                            Some(c) => field.push(c),
                        }
                    }
                }
                Some('}') => {
                    self.record(&field);
                    return Ok(());
                }
                Some('!') => {
                    self.record(&field);
                    if chars.next().is_none() {
                        return Err(invalid("end of string while looking for conversion specifier"));
                    }
                    return match chars.next() {
                        Some('}') => Ok(()),
                        Some(':') => self.format_spec(chars, depth),
                        _ => Err(invalid("expected ':' after conversion specifier")),
                    };
                }
                Some(':') => {
                    self.record(&field);
                    return self.format_spec(chars, depth);
                }
                Some(c) => field.push(c),
            }
        }
    }

    fn format_spec(&mut self, chars: &mut Peekable<Chars<'_>>, depth: usize) -> Result<()> {
        loop {
            match chars.next() {
                None => return Err(invalid("expected '}' before end of string")),
                Some('}') => return Ok(()),
                Some('{') => {
                    if depth >= MAX_SPEC_DEPTH {
                        return Err(invalid("max string recursion exceeded"));
                    }
                    self.replacement_field(chars, depth + 1)?;
                }
                Some(_) => {}
            }
        }
    }

    fn record(&mut self, field: &str) {
        let arg = field.split(['.', '[']).next().unwrap_or_default();
        if arg.is_empty() || arg.chars().all(|c| c.is_ascii_digit()) {
            return;
        }
        if self.seen.insert(arg.to_string()) {
            self.names.push(arg.to_string());
        }
    }
}

fn invalid(reason: &str) -> PromptError {
    PromptError::InvalidTemplate(reason.to_string())
}
