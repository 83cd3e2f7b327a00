use crate::domain::error::{AppError, Result};
use std::collections::BTreeMap;

/// Key the user's request is seeded under.
pub const USER_INPUT: &str = "user_input";
/// Key the schema-selection stage writes.
pub const SCHEMA_SELECTION: &str = "schema_selection";
/// Key the code-generation stage writes.
pub const GENERATED_QUERY: &str = "generated_query";

/// Accumulating record of named text values produced by successive pipeline
/// stages. Keys are write-once; the map grows monotonically and is never
/// pruned within an invocation.
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    values: BTreeMap<String, String>,
}

impl ChainState {
    /// Seed a fresh state with the user's request.
    pub fn new(user_input: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(USER_INPUT.to_string(), user_input.to_string());
        Self { values }
    }

    /// Record a stage output. Writing a key twice is a bug in the caller.
    pub fn insert(&mut self, key: &str, value: String) -> Result<()> {
        if self.values.contains_key(key) {
            return Err(AppError::Internal(format!(
                "Chain state key '{}' is write-once and already set",
                key
            )));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Fetch a key that a later stage depends on.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            AppError::Internal(format!("Chain state is missing required key '{}'", key))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_user_input() {
        let state = ChainState::new("show me declined orders");
        assert_eq!(state.get(USER_INPUT), Some("show me declined orders"));
        assert!(!state.contains(SCHEMA_SELECTION));
    }

    #[test]
    fn test_insert_is_write_once() {
        let mut state = ChainState::new("q");
        state
            .insert(SCHEMA_SELECTION, "orders table".to_string())
            .unwrap();
        let err = state.insert(SCHEMA_SELECTION, "other".to_string());
        assert!(err.is_err());
        assert_eq!(state.get(SCHEMA_SELECTION), Some("orders table"));
    }

    #[test]
    fn test_require_missing_key() {
        let state = ChainState::new("q");
        assert!(state.require(GENERATED_QUERY).is_err());
    }
}
