//! In-memory catalog
//!
//! A builder-style `IndexCatalog` for tests and embedded use. Symbols are
//! assigned sequential ids at registration, so compiled statements are
//! deterministic for a given registration order.

use std::collections::BTreeMap;

use super::mapped_key::{FieldInfo, FieldType, IndexModel, MappedKey};
use super::IndexCatalog;
use crate::query::Query;
use crate::sql::layout::RecordColumn;

/// Default index table version for fields registered without an explicit
/// index model.
const DEFAULT_INDEX_VERSION: u8 = 3;

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    keys: BTreeMap<String, MappedKey>,
    symbols: BTreeMap<String, i64>,
    next_symbol_id: i64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
            symbols: BTreeMap::new(),
            next_symbol_id: 1,
        }
    }

    /// Registers a fully-specified mapped key.
    pub fn with_key(mut self, key: impl Into<String>, mapped: MappedKey) -> Self {
        let key = key.into();
        if let Some(symbol) = &mapped.symbol {
            self.register_symbol(symbol.clone());
        }
        self.keys.insert(key, mapped);
        self
    }

    /// Registers a scalar field with a single-field index at the default
    /// table version. The key doubles as internal name and symbol.
    pub fn with_field(self, key: &str, field_type: FieldType) -> Self {
        let mapped = MappedKey::for_field(
            key,
            FieldInfo::new(key, field_type),
            vec![IndexModel::new(
                format!("k_{key}"),
                [key],
                DEFAULT_INDEX_VERSION,
            )],
        );
        self.with_key(key, mapped)
    }

    /// Registers a collection-valued field with a single-field index.
    pub fn with_collection(self, key: &str, field_type: FieldType, version: u8) -> Self {
        let mapped = MappedKey::for_field(
            key,
            FieldInfo::collection(key, field_type),
            vec![IndexModel::new(format!("k_{key}"), [key], version)],
        );
        self.with_key(key, mapped)
    }

    /// Registers a field with no index at all; comparisons fall back to
    /// index-table access without a key pre-filter.
    pub fn with_unindexed_field(self, key: &str, field_type: FieldType) -> Self {
        let mapped = MappedKey::for_field(key, FieldInfo::new(key, field_type), Vec::new());
        self.with_key(key, mapped)
    }

    /// Adds a compound index as a candidate for every listed key.
    pub fn with_compound_index(
        mut self,
        name: &str,
        keys: &[&str],
        version: u8,
    ) -> Self {
        let index = IndexModel::new(name, keys.iter().copied(), version);
        for key in keys {
            if let Some(mapped) = self.keys.get_mut(*key) {
                mapped.indexes.push(index.clone());
            }
        }
        self
    }

    fn register_symbol(&mut self, symbol: String) {
        if !self.symbols.contains_key(&symbol) {
            self.symbols.insert(symbol, self.next_symbol_id);
            self.next_symbol_id += 1;
        }
    }
}

impl IndexCatalog for MemoryCatalog {
    fn map_key(&self, _query: &Query, key: &str) -> Option<MappedKey> {
        match key {
            "_id" => Some(MappedKey::for_record_column(RecordColumn::Id)),
            "_type" => Some(MappedKey::for_record_column(RecordColumn::TypeId)),
            _ => self.keys.get(key).cloned(),
        }
    }

    fn symbol_id(&self, symbol: &str) -> i64 {
        self.symbols.get(symbol).copied().unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_registration() {
        let catalog = MemoryCatalog::new()
            .with_field("title", FieldType::Text)
            .with_field("published", FieldType::Number);

        let query = Query::from_all();
        let mapped = catalog.map_key(&query, "title").unwrap();
        assert_eq!(mapped.internal_type, FieldType::Text);
        assert_eq!(mapped.indexes.len(), 1);
        assert!(!mapped.is_collection());

        assert!(catalog.map_key(&query, "unknown").is_none());
    }

    #[test]
    fn test_intrinsic_record_keys() {
        let catalog = MemoryCatalog::new();
        let query = Query::from_all();
        assert!(catalog.map_key(&query, "_id").is_some());
        assert!(catalog.map_key(&query, "_type").is_some());
    }

    #[test]
    fn test_symbol_ids_are_sequential() {
        let catalog = MemoryCatalog::new()
            .with_field("title", FieldType::Text)
            .with_field("author", FieldType::Uuid);

        assert_eq!(catalog.symbol_id("title"), 1);
        assert_eq!(catalog.symbol_id("author"), 2);
        assert_eq!(catalog.symbol_id("nope"), -1);
    }

    #[test]
    fn test_compound_index_attaches_to_each_key() {
        let catalog = MemoryCatalog::new()
            .with_field("title", FieldType::Text)
            .with_field("author", FieldType::Uuid)
            .with_compound_index("k_title_author", &["title", "author"], 3);

        let query = Query::from_all();
        let title = catalog.map_key(&query, "title").unwrap();
        let author = catalog.map_key(&query, "author").unwrap();
        assert_eq!(title.indexes.len(), 2);
        assert_eq!(author.indexes.len(), 2);
    }
}
