//! Statement assembly
//!
//! Renders the initialized FROM/WHERE skeleton into the final statement
//! forms. All forms share the same joins and conditions; only the projection
//! and the surrounding syntax differ.

use crate::sql::layout::{
    DATA_COLUMN, ID_COLUMN, RECORD_TABLE, RECORD_UPDATE_TABLE, TYPE_ID_COLUMN, UPDATE_DATE_COLUMN,
};
use crate::sql::{quote_ident, Expr};

use super::{CompileError, CompileResult, SqlCompiler, USE_INDEX_HINT};

/// One ORDER BY entry, already rendered to expression text.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn ascending(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            descending: false,
        }
    }

    pub fn descending(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            descending: true,
        }
    }
}

impl<'a> SqlCompiler<'a> {
    /// Full row select.
    pub fn select_statement(&mut self) -> CompileResult<String> {
        self.initialize()?;
        let record_alias = self.record_alias();
        let columns = self.select_columns();
        let tail = format!(
            "{}{}{}",
            self.where_sql(),
            self.having_sql(),
            self.order_sql()
        );

        if self.needs_distinct {
            // Distinct runs over identity columns only; anything wider is
            // re-joined around the distinct core.
            let inner = format!(
                "SELECT DISTINCT {}, {}\nFROM {} AS {}{}{}{}",
                Expr::column(record_alias.as_str(), ID_COLUMN).to_sql(),
                Expr::column(record_alias.as_str(), TYPE_ID_COLUMN).to_sql(),
                quote_ident(RECORD_TABLE),
                quote_ident(&record_alias),
                self.base_table_hint(),
                self.from_clause,
                tail
            );
            if columns.len() <= 2 {
                return Ok(inner);
            }
            let distinct_alias = format!("{}d", self.alias_prefix);
            return Ok(format!(
                "SELECT {}\nFROM {} AS {}\nINNER JOIN ({}\n) AS {} ON {} = {} AND {} = {}",
                columns.join(", "),
                quote_ident(RECORD_TABLE),
                quote_ident(&record_alias),
                inner,
                quote_ident(&distinct_alias),
                Expr::column(distinct_alias.as_str(), TYPE_ID_COLUMN).to_sql(),
                Expr::column(record_alias.as_str(), TYPE_ID_COLUMN).to_sql(),
                Expr::column(distinct_alias.as_str(), ID_COLUMN).to_sql(),
                Expr::column(record_alias.as_str(), ID_COLUMN).to_sql(),
            ));
        }

        Ok(format!(
            "SELECT {}\nFROM {} AS {}{}{}{}",
            columns.join(", "),
            quote_ident(RECORD_TABLE),
            quote_ident(&record_alias),
            self.base_table_hint(),
            self.from_clause,
            tail
        ))
    }

    /// Matching-row count.
    pub fn count_statement(&mut self) -> CompileResult<String> {
        self.initialize()?;
        let record_alias = self.record_alias();
        // The sort-driven hint helps ordered reads and hurts counts.
        let from = self.from_clause.replace(USE_INDEX_HINT, "");
        Ok(format!(
            "SELECT COUNT({}{})\nFROM {} AS {}{}{}",
            if self.needs_distinct { "DISTINCT " } else { "" },
            Expr::column(record_alias.as_str(), ID_COLUMN).to_sql(),
            quote_ident(RECORD_TABLE),
            quote_ident(&record_alias),
            from,
            self.where_sql()
        ))
    }

    /// Deletes every matching base-table row.
    pub fn delete_statement(&mut self) -> CompileResult<String> {
        self.initialize()?;
        let record_alias = self.record_alias();
        Ok(format!(
            "DELETE {}\nFROM {} AS {}{}{}",
            quote_ident(&record_alias),
            quote_ident(RECORD_TABLE),
            quote_ident(&record_alias),
            self.from_clause,
            self.where_sql()
        ))
    }

    /// Count per distinct combination of the group keys.
    pub fn group_statement(&mut self, group_keys: &[&str]) -> CompileResult<String> {
        if group_keys.is_empty() {
            return Err(CompileError::invalid_usage(
                "grouping requires at least one key",
            ));
        }
        self.ensure_mapped()?;

        // Group keys may not appear in the predicate; map them and redo
        // index selection before any joins are created.
        let mut pending = Vec::new();
        for key in group_keys {
            let mapped = self.mapped_key_cloned(key)?;
            pending.push((key.to_string(), mapped));
        }
        self.reselect_indexes();

        let record_alias = self.record_alias();
        let mut group_exprs: Vec<String> = Vec::new();
        for (key, mapped) in pending {
            if mapped.sub_query.is_some() {
                // Group by the tail of a reference path: the child carries
                // the tail as a sort so it materializes a join, and the
                // child's value columns become the grouping expressions.
                let Some(child_query) = mapped.sub_query_with_group_by() else {
                    continue;
                };
                let join_idx = self.find_or_create_join(&key, None)?;
                let value = self.joins[join_idx].value_expr(&record_alias).to_sql();
                let child_idx = self.get_or_create_sub_compiler(&child_query, true)?;
                self.upsert_sub_query(child_query, format!("{value} = "));
                let child_alias = self.sub_compilers[child_idx].compiler.record_alias();
                for join in self.sub_compilers[child_idx].compiler.joins.clone() {
                    if join.is_index() {
                        group_exprs.push(join.value_expr(&child_alias).to_sql());
                    }
                }
            } else {
                let join_idx = self.find_or_create_join(&key, None)?;
                group_exprs.push(self.joins[join_idx].value_expr(&record_alias).to_sql());
            }
        }

        self.initialize()?;

        let mut sql = format!(
            "SELECT COUNT({}{}) AS {}",
            if self.needs_distinct { "DISTINCT " } else { "" },
            Expr::column(record_alias.as_str(), ID_COLUMN).to_sql(),
            quote_ident("_count")
        );
        for expr in &group_exprs {
            sql.push_str(", ");
            sql.push_str(expr);
        }
        // The sort-driven hint helps ordered reads, not grouped scans.
        let from = self.from_clause.replace(USE_INDEX_HINT, "");
        sql.push_str(&format!(
            "\nFROM {} AS {}{}{}",
            quote_ident(RECORD_TABLE),
            quote_ident(&record_alias),
            from,
            self.where_sql()
        ));
        sql.push_str("\nGROUP BY ");
        sql.push_str(&group_exprs.join(", "));
        sql.push_str(&self.having_sql());
        sql.push_str(&self.order_sql());
        Ok(sql)
    }

    /// Most recent update timestamp across matching records.
    pub fn last_update_statement(&mut self) -> CompileResult<String> {
        self.initialize()?;
        let record_alias = self.record_alias();
        Ok(format!(
            "SELECT MAX({})\nFROM {} AS {}{}{}",
            Expr::column(record_alias.as_str(), UPDATE_DATE_COLUMN).to_sql(),
            quote_ident(RECORD_UPDATE_TABLE),
            quote_ident(&record_alias),
            self.from_clause,
            self.where_sql()
        ))
    }

    /// Identifier-only select suitable for embedding in IN (...).
    pub fn sub_query_statement(&mut self) -> CompileResult<String> {
        self.initialize()?;
        let record_alias = self.record_alias();
        Ok(format!(
            "SELECT{} {}\nFROM {} AS {}{}{}{}{}",
            if self.needs_distinct { " DISTINCT" } else { "" },
            Expr::column(record_alias.as_str(), ID_COLUMN).to_sql(),
            quote_ident(RECORD_TABLE),
            quote_ident(&record_alias),
            self.from_clause,
            self.where_sql(),
            self.having_sql(),
            self.order_sql()
        ))
    }

    fn select_columns(&self) -> Vec<String> {
        let record_alias = self.record_alias();
        let mut columns = vec![
            Expr::column(record_alias.as_str(), ID_COLUMN).to_sql(),
            Expr::column(record_alias.as_str(), TYPE_ID_COLUMN).to_sql(),
        ];
        match &self.query.fields {
            None => columns.push(Expr::column(record_alias.as_str(), DATA_COLUMN).to_sql()),
            Some(fields) => {
                for field in fields {
                    columns.push(Expr::column(record_alias.as_str(), field.as_str()).to_sql());
                }
            }
        }
        if let Some(extra) = &self.query.options.extra_columns {
            for name in extra.split_whitespace() {
                columns.push(Expr::column(record_alias.as_str(), name).to_sql());
            }
        }
        columns
    }

    /// Base-table primary-index hint, emitted only when every join is inner
    /// and no join landed on a layout too old to make it safe.
    fn base_table_hint(&self) -> &'static str {
        if !self.from_clause.is_empty()
            && !self.from_clause.contains("LEFT OUTER JOIN")
            && !self.ignore_primary_disabled
            && self.vendor.supports_index_hints()
        {
            " /*! IGNORE INDEX (PRIMARY) */"
        } else {
            ""
        }
    }

    fn where_sql(&self) -> String {
        match &self.where_condition {
            Some(condition) => format!("\nWHERE {}", condition.to_sql()),
            None => String::new(),
        }
    }

    fn having_sql(&self) -> String {
        match &self.having_condition {
            Some(condition) => format!("\nHAVING {}", condition.to_sql()),
            None => String::new(),
        }
    }

    fn order_sql(&self) -> String {
        if self.order_by.is_empty() {
            return String::new();
        }
        let entries: Vec<String> = self
            .order_by
            .iter()
            .map(|order| {
                if order.descending {
                    format!("{} DESC", order.expr)
                } else {
                    order.expr.clone()
                }
            })
            .collect();
        format!("\nORDER BY {}", entries.join(", "))
    }
}
