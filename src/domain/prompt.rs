//! Fixed prompt text with named substitution points.
//!
//! Templates are versioned data, not code: both pipeline stages consume
//! instances of [`PromptTemplate`], whether built-in or loaded from a file.

use crate::domain::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub id: String,
    pub version: String,
    text: String,
}

impl PromptTemplate {
    pub fn new(id: &str, version: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            text: text.to_string(),
        }
    }

    /// Placeholder names appearing in the template, in order of first use.
    pub fn placeholders(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for capture in PLACEHOLDER.captures_iter(&self.text) {
            let name = capture[1].to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Substitute every placeholder. Substitution is a single pass over the
    /// template text, so braces inside substituted values are never
    /// re-scanned. An unresolved placeholder is an error.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> Result<String> {
        let mut missing = Vec::new();
        let rendered = PLACEHOLDER.replace_all(&self.text, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.to_string(),
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        });

        if !missing.is_empty() {
            return Err(AppError::ParseError(format!(
                "Template '{}' (version {}) has unresolved placeholders: {}",
                self.id,
                self.version,
                missing.join(", ")
            )));
        }

        Ok(rendered.into_owned())
    }
}
