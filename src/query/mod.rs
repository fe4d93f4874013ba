//! Generic entity query model
//!
//! A query is a predicate tree over dot-path field keys plus a sort
//! specification and option flags. It is schema-agnostic: nothing here knows
//! which physical tables hold a field; that resolution happens against the
//! index catalog during compilation.
//!
//! Queries are immutable once built and compare structurally; the compiler
//! relies on structural identity to cache correlated sub-queries.

mod options;
mod predicate;
mod sorter;
mod value;

pub use options::QueryOptions;
pub use predicate::{ComparisonOperator, ComparisonPredicate, CompoundOperator, Predicate};
pub use sorter::Sorter;
pub use value::{Location, QueryValue, Region};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A generic entity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Root of the predicate tree, if any filtering is requested.
    pub predicate: Option<Predicate>,
    /// Sort clauses, applied in order.
    pub sorters: Vec<Sorter>,
    /// Requested output fields. `None` projects the full data column;
    /// an empty list projects identifiers only.
    pub fields: Option<Vec<String>>,
    /// Concrete record type ids the query may match.
    pub concrete_type_ids: Vec<Uuid>,
    /// When set, the query ranges over every record type and the type-id
    /// restriction is skipped entirely.
    pub from_all: bool,
    pub options: QueryOptions,
}

impl Query {
    /// Creates a query restricted to an explicit set of concrete types.
    pub fn new() -> Self {
        Self {
            predicate: None,
            sorters: Vec::new(),
            fields: None,
            concrete_type_ids: Vec::new(),
            from_all: false,
            options: QueryOptions::default(),
        }
    }

    /// Creates a query ranging over all record types.
    pub fn from_all() -> Self {
        Self {
            from_all: true,
            ..Self::new()
        }
    }

    pub fn with_type_id(mut self, type_id: Uuid) -> Self {
        self.concrete_type_ids.push(type_id);
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_sorter(mut self, sorter: Sorter) -> Self {
        self.sorters.push(sorter);
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Restricts projection to record identifiers only.
    pub fn identifiers_only(mut self) -> Self {
        self.fields = Some(Vec::new());
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Every query key referenced by the predicate tree and the sorters,
    /// in first-use order, deduplicated.
    pub fn referenced_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(predicate) = &self.predicate {
            predicate.collect_keys(&mut keys);
        }
        for sorter in &self.sorters {
            let key = sorter.key().to_string();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}
