//! Query-to-SQL compiler
//!
//! `SqlCompiler` lowers one `Query` into SQL text over the record/index-table
//! layout. Compilation runs in phases:
//!
//! - key mapping: every referenced key is resolved through the catalog and a
//!   covering index is selected per key
//! - clause construction: the predicate tree becomes a condition tree plus a
//!   set of index-table joins, sorters become ORDER BY entries, correlated
//!   sub-queries become either inlined selects or fused joins
//! - statement assembly: the shared FROM/WHERE skeleton is rendered into one
//!   of the statement forms (select, count, delete, group, last-update)
//!
//! A compiler instance is single-use and single-threaded; clause construction
//! memoizes, so asking for several statement forms from one instance reuses
//! the same joins and conditions.

mod errors;
mod explain;
mod index_select;
mod join;
mod predicate;
mod statement;
mod subquery;

pub use errors::{CompileError, CompileResult};
pub use explain::{CompileReport, JoinSummary};
pub use statement::OrderBy;

use std::collections::BTreeMap;

use regex::Regex;

use crate::catalog::{IndexCatalog, IndexModel, MappedKey};
use crate::query::Query;
use crate::sql::layout::{self, RECORD_TABLE, TYPE_ID_COLUMN};
use crate::sql::{quote_ident, Condition, Expr, SqlLiteral};
use crate::vendor::Vendor;

use join::{Join, JoinKind, JoinTarget};
use subquery::{SubCompiler, SubQueryEntry};

/// MySQL hint attached to the join feeding the first sorter.
const USE_INDEX_HINT: &str = " /*! USE INDEX (k_name_value) */";

/// Compiles one query into SQL statements.
pub struct SqlCompiler<'a> {
    catalog: &'a dyn IndexCatalog,
    vendor: &'a dyn Vendor,
    query: Query,
    alias_prefix: String,
    depth: usize,

    mapped_keys: BTreeMap<String, MappedKey>,
    selected_indexes: BTreeMap<String, IndexModel>,
    joins: Vec<Join>,
    sub_queries: Vec<SubQueryEntry>,
    sub_compilers: Vec<SubCompiler<'a>>,

    from_clause: String,
    where_condition: Option<Condition>,
    having_condition: Option<Condition>,
    order_by: Vec<OrderBy>,

    needs_distinct: bool,
    force_left_joins: bool,
    index_hint_join: Option<usize>,
    ignore_primary_disabled: bool,

    mapped: bool,
    initialized: bool,
    branch_counter: usize,
    child_counter: usize,
}

impl std::fmt::Debug for SqlCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCompiler")
            .field("alias_prefix", &self.alias_prefix)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<'a> SqlCompiler<'a> {
    pub fn new(catalog: &'a dyn IndexCatalog, vendor: &'a dyn Vendor, query: Query) -> Self {
        Self::nested(catalog, vendor, query, String::new(), 0)
    }

    fn nested(
        catalog: &'a dyn IndexCatalog,
        vendor: &'a dyn Vendor,
        query: Query,
        alias_prefix: String,
        depth: usize,
    ) -> Self {
        Self {
            catalog,
            vendor,
            query,
            alias_prefix,
            depth,
            mapped_keys: BTreeMap::new(),
            selected_indexes: BTreeMap::new(),
            joins: Vec::new(),
            sub_queries: Vec::new(),
            sub_compilers: Vec::new(),
            from_clause: String::new(),
            where_condition: None,
            having_condition: None,
            order_by: Vec::new(),
            needs_distinct: false,
            force_left_joins: false,
            index_hint_join: None,
            ignore_primary_disabled: false,
            mapped: false,
            initialized: false,
            branch_counter: 0,
            child_counter: 0,
        }
    }

    /// Alias of the base record table for this compiler's scope.
    fn record_alias(&self) -> String {
        format!("{}r", self.alias_prefix)
    }

    fn fresh_branch(&mut self) -> usize {
        self.branch_counter += 1;
        self.branch_counter
    }

    /// Resolves a key through the catalog, caching the result.
    fn mapped_key_cloned(&mut self, key: &str) -> CompileResult<MappedKey> {
        if let Some(mapped) = self.mapped_keys.get(key) {
            return Ok(mapped.clone());
        }
        let mapped = self
            .catalog
            .map_key(&self.query, key)
            .ok_or_else(|| CompileError::unmapped_key(key))?;
        self.mapped_keys.insert(key.to_string(), mapped.clone());
        Ok(mapped)
    }

    /// Maps every key the query references and selects covering indexes.
    fn ensure_mapped(&mut self) -> CompileResult<()> {
        if self.mapped {
            return Ok(());
        }
        for key in self.query.referenced_keys() {
            self.mapped_key_cloned(&key)?;
        }
        self.reselect_indexes();
        self.mapped = true;
        Ok(())
    }

    /// Recomputes index selection over every mapped key. Called again when
    /// grouping introduces keys after the initial mapping pass.
    fn reselect_indexes(&mut self) {
        self.selected_indexes = index_select::select_indexes(&self.mapped_keys);
    }

    /// Builds the shared FROM/WHERE/ORDER BY skeleton. Idempotent.
    fn initialize(&mut self) -> CompileResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.ensure_mapped()?;

        // Joins referenced by the extra-join option must exist before the
        // clause text is rendered.
        let extra_joins = self.interpolate_extra_joins()?;

        let mut where_parts = Vec::new();
        if !self.query.from_all {
            where_parts.push(self.type_id_condition());
        }
        if let Some(predicate) = self.query.predicate.clone() {
            if let Some(condition) = self.compile_predicate(&predicate, &predicate, None, false)? {
                where_parts.push(condition);
            }
        }
        if let Some(extra) = self.query.options.extra_where.clone() {
            where_parts.push(Condition::Raw(extra));
        }
        self.where_condition = Some(Condition::and(where_parts));

        self.compile_sorters()?;
        self.build_from_clause(extra_joins);

        if let Some(extra) = self.query.options.extra_having.clone() {
            self.having_condition = Some(Condition::Raw(extra));
        }

        self.initialized = true;
        Ok(())
    }

    /// Restriction of the base table to the query's concrete types. A typed
    /// query with no concrete types matches nothing.
    fn type_id_condition(&self) -> Condition {
        if self.query.concrete_type_ids.is_empty() {
            return Condition::False;
        }
        let list = self
            .query
            .concrete_type_ids
            .iter()
            .map(|id| Expr::Literal(SqlLiteral::Raw(self.vendor.uuid_literal(*id))))
            .collect();
        Condition::In {
            lhs: Expr::column(self.record_alias(), TYPE_ID_COLUMN),
            list,
        }
    }

    /// Resolves `${queryKey}` placeholders in the extra-join option to the
    /// rendered value column of a join on that key, creating joins as needed.
    fn interpolate_extra_joins(&mut self) -> CompileResult<Option<String>> {
        let Some(text) = self.query.options.extra_joins.clone() else {
            return Ok(None);
        };
        let pattern = Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid");
        let record_alias = self.record_alias();
        let mut out = String::new();
        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let whole = caps.get(0).expect("a match always has a full capture");
            let key = &caps[1];
            // Interpolated keys grow the key set, so index selection has to
            // be redone before their joins are created.
            self.mapped_key_cloned(key)?;
            self.reselect_indexes();
            let join_idx = self.find_or_create_join(key, None)?;
            // The raw fragment decides how the value is used; the row stays
            // optional.
            self.joins[join_idx].kind = JoinKind::LeftOuter;
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.joins[join_idx].value_expr(&record_alias).to_sql());
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(Some(out))
    }

    /// Lowers the query's sorters into ORDER BY entries, creating or reusing
    /// joins for the sort keys.
    fn compile_sorters(&mut self) -> CompileResult<()> {
        use crate::catalog::FieldType;
        use crate::query::Sorter;

        let record_alias = self.record_alias();
        for sorter in self.query.sorters.clone() {
            let key = sorter.key().to_string();
            let mapped = self.mapped_key_cloned(&key)?;

            if mapped.sub_query.is_some() {
                // Push the sort down into a fused sub-query and hoist its
                // ORDER BY entries.
                let Some(child_query) = mapped.sub_query_with_sorter(&sorter) else {
                    continue;
                };
                let join_idx = self.find_or_create_sort_join(&key)?;
                let value = self.joins[join_idx].value_expr(&record_alias).to_sql();
                let child_idx = self.get_or_create_sub_compiler(&child_query, true)?;
                self.upsert_sub_query(child_query, format!("{value} = "));
                let hoisted = self.sub_compilers[child_idx].compiler.order_by.clone();
                self.order_by.extend(hoisted);
                continue;
            }

            let join_idx = self.find_or_create_sort_join(&key)?;
            let value = self.joins[join_idx].value_expr(&record_alias).to_sql();
            match sorter {
                Sorter::Ascending { .. } => self.order_by.push(OrderBy::ascending(value)),
                Sorter::Descending { .. } => self.order_by.push(OrderBy::descending(value)),
                Sorter::Closest { origin, .. } | Sorter::Farthest { origin, .. } => {
                    if mapped.internal_type != FieldType::Location {
                        return Err(CompileError::unsupported_sorter(
                            &key,
                            "distance sorts require a location field",
                        ));
                    }
                    let expr = self
                        .vendor
                        .nearest_location(&origin, &value)
                        .map_err(|err| CompileError::unsupported_index(&key, err.to_string()))?;
                    let descending = matches!(sorter, Sorter::Farthest { .. });
                    self.order_by.push(OrderBy { expr, descending });
                }
            }
        }
        Ok(())
    }

    /// Renders the join list, fused sub-queries, and extra-join text into the
    /// FROM clause tail (everything after the base table reference).
    fn build_from_clause(&mut self, extra_joins: Option<String>) {
        let record_alias = self.record_alias();
        let mut from = String::new();

        for idx in 0..self.joins.len() {
            let join = self.joins[idx].clone();
            let JoinTarget::Index { kind, version } = join.target else {
                // Base-column bindings compare against the record table
                // directly and add nothing to FROM.
                continue;
            };
            let left_outer = self.force_left_joins || join.kind == JoinKind::LeftOuter;

            from.push('\n');
            from.push_str(if left_outer {
                "LEFT OUTER JOIN "
            } else {
                "INNER JOIN "
            });
            from.push_str(&quote_ident(&kind.table_name(version)));
            from.push_str(" AS ");
            from.push_str(&quote_ident(&join.alias));

            if self.vendor.supports_index_hints() {
                if !left_outer && self.index_hint_join == Some(idx) && version >= 2 {
                    from.push_str(USE_INDEX_HINT);
                }
                if kind == crate::sql::layout::IndexKind::Location && version >= 2 {
                    from.push_str(" IGNORE INDEX (PRIMARY)");
                }
            }

            from.push_str(" ON ");
            let on = self.join_on_condition(&join, version, &record_alias);
            from.push_str(&on.to_sql());
        }

        // Fuse correlated sub-queries into the parent FROM clause.
        for entry in self.sub_queries.clone() {
            let Some(pos) = self
                .sub_compilers
                .iter()
                .position(|sub| sub.query == entry.query)
            else {
                continue;
            };
            let child_alias = self.sub_compilers[pos].compiler.record_alias();
            let child_from = self.sub_compilers[pos].compiler.from_clause.clone();
            if self.sub_compilers[pos].compiler.needs_distinct {
                self.needs_distinct = true;
            }
            from.push_str("\nINNER JOIN ");
            from.push_str(&quote_ident(RECORD_TABLE));
            from.push_str(" AS ");
            from.push_str(&quote_ident(&child_alias));
            from.push_str(" ON ");
            from.push_str(&entry.prefix);
            from.push_str(&Expr::column(child_alias, layout::ID_COLUMN).to_sql());
            from.push_str(&child_from);
        }

        if let Some(extra) = extra_joins {
            from.push('\n');
            from.push_str(&extra);
        }

        self.from_clause = from;
    }

    /// ON condition of one index-table join: row identity, type identity for
    /// layouts that carry it, and the symbol filter for the join's keys.
    fn join_on_condition(&self, join: &Join, version: u8, record_alias: &str) -> Condition {
        let mut parts = vec![Condition::Compare {
            lhs: Expr::column(join.alias.as_str(), layout::ID_COLUMN),
            op: crate::sql::CompareOp::Eq,
            rhs: Expr::column(record_alias, layout::ID_COLUMN),
        }];
        if layout::has_type_id(version) {
            parts.push(Condition::Compare {
                lhs: Expr::column(join.alias.as_str(), layout::TYPE_ID_COLUMN),
                op: crate::sql::CompareOp::Eq,
                rhs: Expr::column(record_alias, layout::TYPE_ID_COLUMN),
            });
        }
        if !join.keys.is_empty() {
            let list = join
                .keys
                .iter()
                .map(|symbol| Expr::Literal(join.convert_index_key(self.catalog, symbol)))
                .collect();
            parts.push(Condition::In {
                lhs: Expr::column(join.alias.as_str(), layout::key_column(version)),
                list,
            });
        }
        Condition::and(parts)
    }
}
