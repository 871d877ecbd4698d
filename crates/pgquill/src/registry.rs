//! Process-wide record of materialized tables.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, RwLock};

/// Tracks which tables have had their `CREATE TABLE IF NOT EXISTS` issued.
///
/// The set only grows: a table stays registered even after it is dropped,
/// so a later [`Db::table`](crate::Db::table) call for the same name will not
/// recreate it within this process.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: RwLock<HashSet<String>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every [`Db`](crate::Db) that was not given its own.
    pub fn global() -> Arc<SchemaRegistry> {
        static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SchemaRegistry::new())).clone()
    }

    /// Returns true if `table` has been materialized.
    pub fn contains(&self, table: &str) -> bool {
        self.tables
            .read()
            .map(|t| t.contains(table))
            .unwrap_or_else(|poisoned| poisoned.into_inner().contains(table))
    }

    /// Record `table` as materialized. Returns false if it already was.
    pub fn insert(&self, table: &str) -> bool {
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tables.insert(table.to_string())
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .map(|t| t.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    /// Returns true if no table has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Vec<String> {
        let tables = self
            .tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = tables.iter().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_only_grows() {
        let registry = SchemaRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.insert("users"));
        assert!(!registry.insert("users"));
        assert!(registry.insert("notes"));
        assert!(registry.contains("users"));
        assert!(!registry.contains("other"));
        assert_eq!(registry.tables(), ["notes", "users"]);
    }

    #[test]
    fn global_is_shared() {
        let a = SchemaRegistry::global();
        let b = SchemaRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
