//! Compilation report
//!
//! A structural summary of a compiled query for diagnostics: which index
//! each key selected, which tables are joined and how, and whether the
//! projection had to go distinct. Meant for logging and test assertions, not
//! for machine consumption.

use std::fmt;

use super::{CompileResult, SqlCompiler};

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSummary {
    pub alias: String,
    /// Joined index table, or `None` for base-column bindings.
    pub table: Option<String>,
    pub left_outer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    /// Query key to selected index name.
    pub selected_indexes: Vec<(String, String)>,
    pub joins: Vec<JoinSummary>,
    pub needs_distinct: bool,
    pub sub_query_count: usize,
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "indexes:")?;
        for (key, index) in &self.selected_indexes {
            writeln!(f, "  {key} -> {index}")?;
        }
        writeln!(f, "joins:")?;
        for join in &self.joins {
            writeln!(
                f,
                "  {} {} ({})",
                join.alias,
                join.table.as_deref().unwrap_or("<record>"),
                if join.left_outer { "left outer" } else { "inner" }
            )?;
        }
        writeln!(f, "distinct: {}", self.needs_distinct)?;
        write!(f, "sub-queries: {}", self.sub_query_count)
    }
}

impl<'a> SqlCompiler<'a> {
    /// Summarizes the compiled structure, compiling first if needed.
    pub fn report(&mut self) -> CompileResult<CompileReport> {
        self.initialize()?;

        let selected_indexes = self
            .selected_indexes
            .iter()
            .map(|(key, index)| (key.clone(), index.name.clone()))
            .collect();

        let joins = self
            .joins
            .iter()
            .map(|join| {
                let table = match join.target {
                    super::join::JoinTarget::Record(_) => None,
                    super::join::JoinTarget::Index { kind, version } => {
                        Some(kind.table_name(version))
                    }
                };
                JoinSummary {
                    alias: join.alias.clone(),
                    table,
                    left_outer: self.force_left_joins
                        || join.kind == super::join::JoinKind::LeftOuter,
                }
            })
            .collect();

        Ok(CompileReport {
            selected_indexes,
            joins,
            needs_distinct: self.needs_distinct,
            sub_query_count: self.sub_queries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, MemoryCatalog};
    use crate::query::{Predicate, Query, QueryValue};
    use crate::vendor::MysqlVendor;

    #[test]
    fn test_report_lists_joins_and_indexes() {
        let catalog = MemoryCatalog::new().with_field("title", FieldType::Text);
        let vendor = MysqlVendor::new();
        let query = Query::from_all()
            .with_predicate(Predicate::eq("title", QueryValue::text("Foo")));
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);

        let report = compiler.report().unwrap();
        assert_eq!(
            report.selected_indexes,
            vec![("title".to_string(), "k_title".to_string())]
        );
        assert_eq!(report.joins.len(), 1);
        assert_eq!(report.joins[0].table.as_deref(), Some("RecordString3"));
        assert!(!report.needs_distinct);

        let text = report.to_string();
        assert!(text.contains("title -> k_title"));
        assert!(text.contains("distinct: false"));
    }
}
