//! Pre-execution checks on an extracted query.
//!
//! This module enforces the executor's obligations before the query touches
//! the session:
//! - single statement, SELECT (or WITH) only
//! - mutating and session statements rejected
//! - every referenced table must be registered in the session
//! - alias-qualified column references checked against the registry
//!
//! It is a targeted allow-list over the registry, not a SQL validator; what
//! it cannot resolve statically is left for the session to reject.

use crate::domain::error::{AppError, Result};
use crate::domain::table_registry::TableRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const DENY_STATEMENTS: [&str; 12] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE",
    "PRAGMA", "ATTACH", "DETACH",
];

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'").unwrap());
static TABLE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:from|join)\s+([a-z_][a-z0-9_]*)").unwrap());
static TABLE_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:from|join)\s+([a-z_][a-z0-9_]*)(?:\s+as)?\s+([a-z_][a-z0-9_]*)").unwrap()
});
static CTE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-z_][a-z0-9_]*)\s+as\s*\(").unwrap());
static QUALIFIED_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z_][a-z0-9_]*)\.([a-z_][a-z0-9_]*)\b").unwrap());

/// Words that follow a table name without being its alias.
const NON_ALIAS_WORDS: [&str; 20] = [
    "where", "on", "join", "inner", "left", "right", "full", "outer", "cross", "group", "order",
    "having", "limit", "union", "intersect", "except", "natural", "using", "as", "set",
];

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn add_error(&mut self, code: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(AppError::ValidationError(
                self.errors
                    .iter()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            ))
        }
    }
}

pub struct ReferenceValidator;

impl ReferenceValidator {
    /// Validate an extracted query against the session registry.
    pub fn validate(sql: &str, registry: &TableRegistry) -> ValidationResult {
        let mut result = ValidationResult::valid();

        let trimmed = sql.trim().trim_end_matches(';').trim();
        if trimmed.is_empty() {
            result.add_error("EMPTY_QUERY", "Extracted query is empty");
            return result;
        }

        // Literal text must not trip keyword or reference scans.
        let scrubbed = STRING_LITERAL.replace_all(trimmed, "''").to_string();

        if scrubbed.contains(';') {
            result.add_error(
                "MULTIPLE_STATEMENTS",
                "Exactly one statement is allowed per generated query",
            );
        }

        let upper = scrubbed.to_uppercase();
        if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
            result.add_error("NOT_A_SELECT", "Generated query must start with SELECT or WITH");
        }

        for keyword in DENY_STATEMENTS {
            if contains_whole_word(&upper, keyword) {
                result.add_error(
                    "FORBIDDEN_STATEMENT",
                    &format!("Statement '{}' is not allowed", keyword),
                );
            }
        }

        let lower = scrubbed.to_lowercase();
        let cte_names: HashSet<String> = CTE_NAME
            .captures_iter(&lower)
            .map(|c| c[1].to_string())
            .collect();

        for capture in TABLE_REF.captures_iter(&lower) {
            let table = &capture[1];
            if cte_names.contains(table) || table == "select" {
                continue;
            }
            if !registry.contains_table(table) {
                result.add_error(
                    "TABLE_NOT_REGISTERED",
                    &format!(
                        "Table '{}' is not bound in the session. Available tables: {:?}",
                        table,
                        registry.table_names()
                    ),
                );
            }
        }

        // alias -> underlying table, for the column check below
        let mut aliases: HashMap<String, String> = HashMap::new();
        for capture in TABLE_ALIAS.captures_iter(&lower) {
            let table = capture[1].to_string();
            let alias = capture[2].to_string();
            if NON_ALIAS_WORDS.contains(&alias.as_str()) {
                continue;
            }
            aliases.insert(alias, table);
        }
        for table in registry.table_names() {
            aliases.insert(table.to_string(), table.to_string());
        }

        for capture in QUALIFIED_COLUMN.captures_iter(&lower) {
            let qualifier = &capture[1];
            let column = &capture[2];
            let Some(table) = aliases.get(qualifier) else {
                continue;
            };
            // Aliases over CTEs or unresolved qualifiers are left to the session.
            if !registry.contains_table(table) {
                continue;
            }
            if !registry.contains_column(table, column) {
                result.add_error(
                    "COLUMN_NOT_REGISTERED",
                    &format!("Column '{}' does not exist on table '{}'", column, table),
                );
            }
        }

        result
    }
}

/// Whole-word keyword scan; substrings like `CREATED_AT` must not match
/// `CREATE`.
fn contains_whole_word(text: &str, keyword: &str) -> bool {
    let text_bytes = text.as_bytes();
    let keyword_bytes = keyword.as_bytes();
    let keyword_len = keyword_bytes.len();

    if keyword_len > text_bytes.len() {
        return false;
    }

    for i in 0..=(text_bytes.len() - keyword_len) {
        if &text_bytes[i..i + keyword_len] == keyword_bytes {
            let before_ok = i == 0 || !text_bytes[i - 1].is_ascii_alphanumeric();
            let after_ok = i + keyword_len == text_bytes.len()
                || !text_bytes[i + keyword_len].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TableRegistry {
        let mut registry = TableRegistry::new();
        registry.register(
            "orders",
            vec![
                "order_id".to_string(),
                "customer_id".to_string(),
                "order_status".to_string(),
            ],
        );
        registry.register(
            "payments",
            vec!["order_id".to_string(), "payment_value".to_string()],
        );
        registry
    }

    #[test]
    fn test_accepts_aliased_join() {
        let sql = "SELECT o.order_id, p.payment_value \
                   FROM orders AS o \
                   JOIN payments AS p ON p.order_id = o.order_id \
                   WHERE o.order_status = 'delivered'";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_rejects_unregistered_table() {
        let sql = "SELECT v.id FROM vouchers AS v";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.code == "TABLE_NOT_REGISTERED"));
        assert!(result.errors[0].message.contains("vouchers"));
    }

    #[test]
    fn test_rejects_unknown_qualified_column() {
        let sql = "SELECT o.total FROM orders AS o";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.code == "COLUMN_NOT_REGISTERED"));
    }

    #[test]
    fn test_rejects_mutating_statement() {
        let sql = "DELETE FROM orders";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.code == "FORBIDDEN_STATEMENT"));
    }

    #[test]
    fn test_rejects_multiple_statements() {
        let sql = "SELECT o.order_id FROM orders AS o; SELECT 1";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.code == "MULTIPLE_STATEMENTS"));
    }

    #[test]
    fn test_cte_names_are_not_table_references() {
        let sql = "WITH order_totals AS ( \
                       SELECT p.order_id, SUM(p.payment_value) AS total_paid \
                       FROM payments AS p GROUP BY p.order_id \
                   ) \
                   SELECT o.order_id, ot.total_paid \
                   FROM orders AS o \
                   JOIN order_totals AS ot ON ot.order_id = o.order_id";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_keywords_in_literals_do_not_trip_the_scan() {
        let sql = "SELECT o.order_id FROM orders AS o WHERE o.order_status = 'update pending'";
        let result = ReferenceValidator::validate(sql, &registry());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_whole_word_detection() {
        assert!(contains_whole_word("DROP TABLE X", "DROP"));
        assert!(!contains_whole_word("CREATED_AT", "CREATE"));
        assert!(!contains_whole_word("DROPDOWN", "DROP"));
    }
}
