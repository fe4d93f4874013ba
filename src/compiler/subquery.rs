//! Correlated sub-queries
//!
//! A key path that traverses a reference field continues as a child query
//! over the referenced type. Child compilers are cached by structural query
//! identity, so one child serves every clause that lands on the same query.
//! Nesting depth is bounded; a reference cycle in the catalog fails
//! compilation instead of recursing forever.

use super::{CompileError, CompileResult, SqlCompiler};
use crate::query::Query;

/// Upper bound on reference-path nesting.
pub(super) const MAX_SUBQUERY_DEPTH: usize = 16;

/// A fused child query: its joins are spliced into the parent FROM clause
/// behind `prefix`, the rendered "`parent value` = " (or " != ") text that
/// correlates the two scopes.
#[derive(Debug, Clone)]
pub(super) struct SubQueryEntry {
    pub(super) query: Query,
    pub(super) prefix: String,
}

/// An initialized child compiler keyed by its query.
pub(super) struct SubCompiler<'a> {
    pub(super) query: Query,
    pub(super) compiler: SqlCompiler<'a>,
}

impl<'a> SqlCompiler<'a> {
    /// Creates an uninitialized child compiler one nesting level down.
    pub(super) fn nested_compiler(&mut self, query: Query) -> CompileResult<SqlCompiler<'a>> {
        if self.depth + 1 >= MAX_SUBQUERY_DEPTH {
            return Err(CompileError::unsupported_predicate(format!(
                "sub-query nesting exceeds {MAX_SUBQUERY_DEPTH} levels"
            )));
        }
        let prefix = format!("{}s{}", self.alias_prefix, self.child_counter);
        self.child_counter += 1;
        Ok(SqlCompiler::nested(
            self.catalog,
            self.vendor,
            query,
            prefix,
            self.depth + 1,
        ))
    }

    /// Returns the index of an initialized child compiler for `query`,
    /// creating it on first use. `force_left_joins` makes every join the
    /// child renders LEFT OUTER regardless of its computed kind.
    pub(super) fn get_or_create_sub_compiler(
        &mut self,
        query: &Query,
        force_left_joins: bool,
    ) -> CompileResult<usize> {
        if let Some(pos) = self
            .sub_compilers
            .iter()
            .position(|sub| &sub.query == query)
        {
            return Ok(pos);
        }
        let mut compiler = self.nested_compiler(query.clone())?;
        compiler.force_left_joins = force_left_joins;
        compiler.initialize()?;
        self.sub_compilers.push(SubCompiler {
            query: query.clone(),
            compiler,
        });
        Ok(self.sub_compilers.len() - 1)
    }

    /// Registers (or re-registers) the fusion prefix for a child query.
    pub(super) fn upsert_sub_query(&mut self, query: Query, prefix: String) {
        if let Some(entry) = self
            .sub_queries
            .iter_mut()
            .find(|entry| entry.query == query)
        {
            entry.prefix = prefix;
            return;
        }
        self.sub_queries.push(SubQueryEntry { query, prefix });
    }
}
