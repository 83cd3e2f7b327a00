//! Built-in versioned prompt templates for the two pipeline stages.
//!
//! Both catalog presets run over the same two templates; the catalog block
//! and the prior stage's output are the only substitution points. Either
//! template can be overridden from a file named in the settings.

use crate::domain::error::{AppError, Result};
use crate::domain::prompt::PromptTemplate;
use std::path::Path;

pub const SCHEMA_SELECTOR_ID: &str = "schema_selector";
pub const CODE_GENERATOR_ID: &str = "code_generator";
const TEMPLATE_VERSION: &str = "v1";

const SCHEMA_SELECTOR_TEXT: &str = r#"As an AI assistant, thoroughly understand the request as described by the user: {user_input}. Suggest the appropriate schema for the query generation. You should follow these steps:

1. Understand the table definitions: familiarize yourself with each table, its columns and their properties.

2. Analyze the issue: identify what data is required to satisfy the request, and determine the specific attributes or properties that need to be present.

3. Evaluate each table definition against the request and compare the compatibility and relevance of each one.

4. Define criteria for selection: data type compatibility, required attributes, constraints, and any business rules stated in the column descriptions.

5: AVOID REDUNDANT JOINS: if a SINGLE TABLE CONTAINS ALL NECESSARY DATA, EXCLUDE the other tables to avoid confusion for query generation. Prioritize clarity and simplicity by recommending only the most relevant table.

6: Output contains two parts:
    a: Give the chosen table name(s), and the column names with properties as the output.
    b: Provide the summary of the user request in the output.

Below are the table definitions for you to analyze and accurately comprehend based on the above rules.

{catalog}"#;

const CODE_GENERATOR_TEXT: &str = r#"You are an AI assistant that is well versed in writing SQL queries. Generate the query based on the schema and the user request provided here: {schema_selection}

When generating SQL, here are some RULES YOU MUST FOLLOW to generate a successful query:

a. Use standard, consistently formatted SQL with uppercase keywords.
b. Use descriptive and meaningful aliases. Avoid single-letter or ambiguous names.
c. EXCLUDE error-handling and procedural constructs; produce a plain query only.
d: DEFER to the schema selection above for TABLE and COLUMN NAMES. Use the provided names as the authoritative source.
e: ASSUME the tables ALREADY EXIST; DO NOT create, attach, or load any tables or files.
f: AVOID ASSUMPTIONS ABOUT UNDEFINED COLUMN NAMES. Only rely on columns explicitly listed in the schema selection.
g: AVOID REDUNDANT JOINS: if a SINGLE TABLE CONTAINS ALL NECESSARY DATA, EXCLUDE joining other tables.
h: ALIAS every joined table before use, and qualify every column reference with its alias, e.g. orders AS o JOIN payments AS p ON p.order_id = o.order_id.
i: ELIMINATE WINDOW FUNCTIONS. Always express the query with filtering, joining, and aggregation alone; common table expressions are allowed for intermediate steps.
j: Do not filter the query down to a single record. The query must apply across all rows affected by the issue.
k: Generate the query exclusively, placing any additional notes strictly within SQL comments.
l: Craft the query within a single ```sql code block.
m: Finish with exactly one SELECT statement producing the final result table."#;

pub fn schema_selector() -> PromptTemplate {
    PromptTemplate::new(SCHEMA_SELECTOR_ID, TEMPLATE_VERSION, SCHEMA_SELECTOR_TEXT)
}

pub fn code_generator() -> PromptTemplate {
    PromptTemplate::new(CODE_GENERATOR_ID, TEMPLATE_VERSION, CODE_GENERATOR_TEXT)
}

/// Load a template override from disk, keeping the built-in id.
pub fn from_file(id: &str, path: &Path) -> Result<PromptTemplate> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::IoError(format!(
            "Failed to read template '{}' from {}: {}",
            id,
            path.display(),
            e
        ))
    })?;
    Ok(PromptTemplate::new(id, &format!("file:{}", path.display()), &text))
}

/// Resolve a stage template: file override when configured, built-in
/// otherwise.
pub fn resolve(id: &str, override_path: Option<&Path>) -> Result<PromptTemplate> {
    match override_path {
        Some(path) => from_file(id, path),
        None => match id {
            SCHEMA_SELECTOR_ID => Ok(schema_selector()),
            CODE_GENERATOR_ID => Ok(code_generator()),
            other => Err(AppError::Internal(format!("Unknown template id '{}'", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_placeholders() {
        let template = schema_selector();
        assert_eq!(template.placeholders(), vec!["user_input", "catalog"]);
    }

    #[test]
    fn test_generator_placeholders() {
        let template = code_generator();
        assert_eq!(template.placeholders(), vec!["schema_selection"]);
    }

    #[test]
    fn test_resolve_unknown_id() {
        assert!(resolve("reviewer", None).is_err());
    }
}
