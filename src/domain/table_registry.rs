use std::collections::BTreeMap;

/// Enumeration of the tables (and their columns) bound in the execution
/// session. Built up front so invalid references fail before execution
/// instead of surfacing from ambient session state.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: BTreeMap<String, Vec<String>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: &str, columns: Vec<String>) {
        self.tables.insert(table.to_string(), columns);
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(|c| c.as_slice())
    }

    pub fn contains_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|columns| columns.iter().any(|c| c == column))
            .unwrap_or(false)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TableRegistry::new();
        registry.register("orders", vec!["order_id".to_string(), "status".to_string()]);

        assert!(registry.contains_table("orders"));
        assert!(!registry.contains_table("payments"));
        assert!(registry.contains_column("orders", "status"));
        assert!(!registry.contains_column("orders", "total"));
        assert!(!registry.contains_column("payments", "status"));
    }
}
