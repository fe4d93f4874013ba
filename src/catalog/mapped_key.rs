//! Mapped keys and index metadata
//!
//! A `MappedKey` is the resolution of a dot-path query key against the
//! catalog: which field it names, what its internal storage type is, which
//! composite indexes could serve it, and, when the path traverses a
//! reference field, the correlated sub-query shell that continues the path
//! on the referenced type.

use serde::{Deserialize, Serialize};

use crate::query::{ComparisonPredicate, Predicate, Query, Sorter};
use crate::sql::layout::RecordColumn;

/// Internal storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Uuid,
    Location,
}

/// Resolved field metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Internal field name, as it appears in index definitions.
    pub name: String,
    pub field_type: FieldType,
    /// Collection-valued fields project one index row per element.
    pub collection: bool,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            collection: false,
        }
    }

    pub fn collection(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            collection: true,
        }
    }
}

/// A composite index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexModel {
    pub name: String,
    /// Internal names of the constituent fields, in index order.
    pub fields: Vec<String>,
    /// Physical table layout version, 1 through 4.
    pub version: u8,
}

impl IndexModel {
    pub fn new(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
        version: u8,
    ) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            version,
        }
    }
}

/// Continuation of a reference-traversing key path: the child query shell
/// over the referenced type, plus the remaining key within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQueryPath {
    pub shell: Query,
    pub tail_key: String,
}

/// Resolution of a dot-path query key to physical storage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedKey {
    /// Resolved field metadata; absent for keys that bind to base record
    /// columns rather than an indexed field.
    pub field: Option<FieldInfo>,
    /// Candidate composite indexes covering this key.
    pub indexes: Vec<IndexModel>,
    pub internal_type: FieldType,
    /// Symbol identifying this field in the shared index tables.
    pub symbol: Option<String>,
    /// Base record column this key binds to directly, if any.
    pub record_column: Option<RecordColumn>,
    /// Correlated sub-query continuation for reference paths.
    pub sub_query: Option<SubQueryPath>,
}

impl MappedKey {
    /// A key resolving to an indexed field.
    pub fn for_field(
        symbol: impl Into<String>,
        field: FieldInfo,
        indexes: Vec<IndexModel>,
    ) -> Self {
        let internal_type = field.field_type;
        Self {
            field: Some(field),
            indexes,
            internal_type,
            symbol: Some(symbol.into()),
            record_column: None,
            sub_query: None,
        }
    }

    /// A key resolving to a base record column (`_id` / `_type`).
    pub fn for_record_column(column: RecordColumn) -> Self {
        Self {
            field: None,
            indexes: Vec::new(),
            internal_type: FieldType::Uuid,
            symbol: None,
            record_column: Some(column),
            sub_query: None,
        }
    }

    /// Attaches a correlated sub-query continuation.
    pub fn with_sub_query(mut self, shell: Query, tail_key: impl Into<String>) -> Self {
        self.sub_query = Some(SubQueryPath {
            shell,
            tail_key: tail_key.into(),
        });
        self
    }

    pub fn is_collection(&self) -> bool {
        self.field.as_ref().is_some_and(|f| f.collection)
    }

    /// The symbol to pre-filter the key column with, available only when an
    /// index was actually selected. Unindexed keys fall back to index-table
    /// access without a pre-filter.
    pub fn index_key(&self, selected: Option<&IndexModel>) -> Option<&str> {
        selected?;
        self.symbol.as_deref()
    }

    /// Child query applying `comparison` to the tail of a reference path.
    pub fn sub_query_with_comparison(&self, comparison: &ComparisonPredicate) -> Option<Query> {
        let path = self.sub_query.as_ref()?;
        let mut child = path.shell.clone();
        child.predicate = Some(Predicate::comparison(
            path.tail_key.clone(),
            comparison.op,
            comparison.values.clone(),
        ));
        Some(child)
    }

    /// Child query applying `sorter` to the tail of a reference path.
    pub fn sub_query_with_sorter(&self, sorter: &Sorter) -> Option<Query> {
        let path = self.sub_query.as_ref()?;
        let mut child = path.shell.clone();
        child.sorters.push(sorter.retargeted(path.tail_key.clone()));
        Some(child)
    }

    /// Child query grouping by the tail of a reference path. The tail is
    /// carried as an ascending sort so the child materializes a join for it;
    /// the parent hoists that join's value column into its GROUP BY.
    pub fn sub_query_with_group_by(&self) -> Option<Query> {
        let path = self.sub_query.as_ref()?;
        let mut child = path.shell.clone();
        child
            .sorters
            .push(Sorter::ascending(path.tail_key.clone()));
        Some(child)
    }
}
