//! Index-table joins
//!
//! One `Join` per index-table access the statement needs. Joins are reused
//! within a disjunction branch when two comparisons hit the same key, and
//! sorters reuse any join that already carries their key. A join's kind only
//! ever moves from inner to left-outer; nothing downgrades it back.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::{CompileResult, SqlCompiler};
use crate::catalog::IndexCatalog;
use crate::query::QueryValue;
use crate::sql::layout::{IndexKind, RecordColumn, VALUE_COLUMN};
use crate::sql::{Expr, SqlLiteral};
use crate::vendor::Vendor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum JoinKind {
    Inner,
    LeftOuter,
}

/// What a join reads from: a base record column (no table is added to FROM)
/// or a versioned index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum JoinTarget {
    Record(RecordColumn),
    Index { kind: IndexKind, version: u8 },
}

#[derive(Debug, Clone)]
pub(super) struct Join {
    pub(super) alias: String,
    pub(super) kind: JoinKind,
    pub(super) target: JoinTarget,
    /// Field symbols served by this join; rendered into the ON clause's
    /// key-column filter.
    pub(super) keys: BTreeSet<String>,
    /// Disjunction branch this join belongs to. Joins are never shared
    /// across branches.
    pub(super) branch: Option<usize>,
}

impl Join {
    pub(super) fn is_index(&self) -> bool {
        matches!(self.target, JoinTarget::Index { .. })
    }

    pub(super) fn version(&self) -> u8 {
        match self.target {
            JoinTarget::Record(_) => 0,
            JoinTarget::Index { version, .. } => version,
        }
    }

    /// The expression comparisons and sorters read from.
    pub(super) fn value_expr(&self, record_alias: &str) -> Expr {
        match self.target {
            JoinTarget::Record(column) => Expr::column(record_alias, column.column_name()),
            JoinTarget::Index { .. } => Expr::column(self.alias.as_str(), VALUE_COLUMN),
        }
    }

    /// Converts a logical value into the physical literal this join's table
    /// stores, or `None` when the value has no representation there.
    pub(super) fn convert_value(
        &self,
        vendor: &dyn Vendor,
        value: &QueryValue,
    ) -> Option<SqlLiteral> {
        match self.target {
            JoinTarget::Record(_) => match value {
                QueryValue::Uuid(id) => Some(SqlLiteral::Raw(vendor.uuid_literal(*id))),
                QueryValue::Text(text) => Uuid::parse_str(text)
                    .ok()
                    .map(|id| SqlLiteral::Raw(vendor.uuid_literal(id))),
                _ => None,
            },
            JoinTarget::Index { kind, .. } => match kind {
                IndexKind::Text => match value {
                    QueryValue::Text(text) => Some(SqlLiteral::Text(text.clone())),
                    QueryValue::Number(number) => Some(SqlLiteral::Text(number.to_string())),
                    QueryValue::Bool(flag) => Some(SqlLiteral::Text(flag.to_string())),
                    QueryValue::Uuid(id) => Some(SqlLiteral::Text(id.to_string())),
                    _ => None,
                },
                IndexKind::Number => match value {
                    QueryValue::Number(number) => Some(SqlLiteral::Number(*number)),
                    QueryValue::Bool(flag) => Some(SqlLiteral::Integer(i64::from(*flag))),
                    QueryValue::Text(text) => text.parse().ok().map(SqlLiteral::Number),
                    _ => None,
                },
                IndexKind::Uuid => match value {
                    QueryValue::Uuid(id) => Some(SqlLiteral::Raw(vendor.uuid_literal(*id))),
                    QueryValue::Text(text) => Uuid::parse_str(text)
                        .ok()
                        .map(|id| SqlLiteral::Raw(vendor.uuid_literal(id))),
                    _ => None,
                },
                // Geospatial comparisons go through vendor expressions, not
                // literal conversion.
                IndexKind::Location => None,
            },
        }
    }

    /// Converts a field symbol into this join's key-column literal: the
    /// numeric symbol id for version 2+ layouts, the field name before that.
    pub(super) fn convert_index_key(&self, catalog: &dyn IndexCatalog, symbol: &str) -> SqlLiteral {
        if self.version() >= 2 {
            SqlLiteral::Integer(catalog.symbol_id(symbol))
        } else {
            SqlLiteral::Text(symbol.to_string())
        }
    }
}

impl<'a> SqlCompiler<'a> {
    /// Reuses a join already serving `key` on the same branch, or creates one.
    pub(super) fn find_or_create_join(
        &mut self,
        key: &str,
        branch: Option<usize>,
    ) -> CompileResult<usize> {
        let mapped = self.mapped_key_cloned(key)?;

        if let Some(column) = mapped.record_column {
            if let Some(idx) = self
                .joins
                .iter()
                .position(|join| join.target == JoinTarget::Record(column))
            {
                return Ok(idx);
            }
            return self.create_join(key, branch);
        }

        if let Some(symbol) = &mapped.symbol {
            if let Some(idx) = self
                .joins
                .iter()
                .position(|join| join.branch == branch && join.keys.contains(symbol))
            {
                return Ok(idx);
            }
        }
        self.create_join(key, branch)
    }

    /// Always creates a fresh join for `key`. Collection fields go through
    /// here so each comparison sees an independent element row.
    pub(super) fn create_join(&mut self, key: &str, branch: Option<usize>) -> CompileResult<usize> {
        let mapped = self.mapped_key_cloned(key)?;

        if let Some(column) = mapped.record_column {
            self.joins.push(Join {
                alias: self.record_alias(),
                kind: JoinKind::Inner,
                target: JoinTarget::Record(column),
                keys: BTreeSet::new(),
                branch,
            });
            return Ok(self.joins.len() - 1);
        }

        let kind = IndexKind::for_field_type(mapped.internal_type);
        let version = self
            .selected_indexes
            .get(key)
            .map(|index| index.version)
            .or_else(|| mapped.indexes.iter().map(|index| index.version).max())
            .unwrap_or(1);

        // Old layouts make the base-table primary hint unsafe for the whole
        // statement.
        if version < kind.hint_min_version() {
            self.ignore_primary_disabled = true;
        }

        let mut keys = BTreeSet::new();
        if let Some(symbol) = &mapped.symbol {
            keys.insert(symbol.clone());
        }
        self.joins.push(Join {
            alias: format!("{}i{}", self.alias_prefix, self.joins.len()),
            kind: JoinKind::Inner,
            target: JoinTarget::Index { kind, version },
            keys,
            branch,
        });
        Ok(self.joins.len() - 1)
    }

    /// Join used by a sorter: any existing join carrying the key qualifies,
    /// regardless of branch. The first sort join receives the index hint.
    pub(super) fn find_or_create_sort_join(&mut self, key: &str) -> CompileResult<usize> {
        let mapped = self.mapped_key_cloned(key)?;

        let idx = if let Some(column) = mapped.record_column {
            match self
                .joins
                .iter()
                .position(|join| join.target == JoinTarget::Record(column))
            {
                Some(idx) => idx,
                None => self.create_join(key, None)?,
            }
        } else {
            let existing = mapped.symbol.as_ref().and_then(|symbol| {
                self.joins.iter().position(|join| join.keys.contains(symbol))
            });
            match existing {
                Some(idx) => idx,
                None => self.create_join(key, None)?,
            }
        };

        if self.index_hint_join.is_none() && self.joins[idx].is_index() {
            self.index_hint_join = Some(idx);
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, MemoryCatalog};
    use crate::query::{Predicate, Query, QueryValue};
    use crate::vendor::MysqlVendor;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_field("title", FieldType::Text)
            .with_field("published", FieldType::Boolean)
    }

    #[test]
    fn test_join_reuse_on_same_branch() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let query = Query::from_all();
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);

        let a = compiler.find_or_create_join("title", None).unwrap();
        let b = compiler.find_or_create_join("title", None).unwrap();
        assert_eq!(a, b);

        let c = compiler.find_or_create_join("title", Some(1)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_boolean_converts_in_number_table() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let query = Query::from_all()
            .with_predicate(Predicate::eq("published", QueryValue::Bool(true)));
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);

        let idx = compiler.find_or_create_join("published", None).unwrap();
        let join = &compiler.joins[idx];
        assert_eq!(
            join.convert_value(&vendor, &QueryValue::Bool(true)),
            Some(SqlLiteral::Integer(1))
        );
        assert_eq!(
            join.convert_value(&vendor, &QueryValue::Text("0.5".into())),
            Some(SqlLiteral::Number(0.5))
        );
        assert_eq!(join.convert_value(&vendor, &QueryValue::Missing), None);
    }

    #[test]
    fn test_sort_join_reuses_across_branches() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let query = Query::from_all();
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);

        let a = compiler.find_or_create_join("title", Some(3)).unwrap();
        let b = compiler.find_or_create_sort_join("title").unwrap();
        assert_eq!(a, b);
        assert_eq!(compiler.index_hint_join, Some(a));
    }

    #[test]
    fn test_record_column_join_adds_no_table() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let query = Query::from_all();
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);

        let idx = compiler.find_or_create_join("_id", None).unwrap();
        let join = &compiler.joins[idx];
        assert!(!join.is_index());
        assert_eq!(join.value_expr("r").to_sql(), "`r`.`id`");
    }
}
