//! Predicate lowering
//!
//! Walks the predicate tree and produces a condition tree plus the joins the
//! conditions read from. AND children share their parent's disjunction
//! branch; each child of a multi-child OR (and of NOT, which lowers as a
//! negated OR) gets a fresh branch, so comparisons on the same key inside a
//! disjunction never share an index row. Disjunctions also force left-outer
//! joins and a distinct projection, since a row may now match through one
//! branch while another branch's join misses.

use super::join::JoinKind;
use super::{CompileError, CompileResult, SqlCompiler};
use crate::catalog::{FieldInfo, MappedKey};
use crate::query::{
    ComparisonOperator, ComparisonPredicate, CompoundOperator, Predicate, QueryValue,
};
use crate::sql::layout;
use crate::sql::{escape_like, CompareOp, Condition, Expr};

impl<'a> SqlCompiler<'a> {
    /// Lowers one predicate node. `root` is the whole tree, consulted when a
    /// reference-path comparison decides between inlining and fusing its
    /// sub-query. Returns `None` for empty compounds.
    pub(super) fn compile_predicate(
        &mut self,
        predicate: &Predicate,
        root: &Predicate,
        branch: Option<usize>,
        uses_left_join: bool,
    ) -> CompileResult<Option<Condition>> {
        match predicate {
            Predicate::Comparison(comparison) => Ok(Some(self.compile_comparison(
                comparison,
                root,
                branch,
                uses_left_join,
            )?)),
            Predicate::Compound { op, children } => {
                if children.is_empty() {
                    return Ok(None);
                }
                match op {
                    CompoundOperator::And => {
                        let mut parts = Vec::new();
                        for child in children {
                            if let Some(condition) =
                                self.compile_predicate(child, root, branch, uses_left_join)?
                            {
                                parts.push(condition);
                            }
                        }
                        Ok((!parts.is_empty()).then(|| Condition::and(parts)))
                    }
                    CompoundOperator::Or | CompoundOperator::Not => {
                        let is_not = *op == CompoundOperator::Not;
                        let multi = children.len() > 1;
                        if multi {
                            self.needs_distinct = true;
                        }
                        let child_left = uses_left_join || is_not || multi;

                        let mut parts = Vec::new();
                        for child in children {
                            let child_branch = if multi {
                                Some(self.fresh_branch())
                            } else {
                                branch
                            };
                            if let Some(condition) =
                                self.compile_predicate(child, root, child_branch, child_left)?
                            {
                                parts.push(condition);
                            }
                        }
                        if parts.is_empty() {
                            return Ok(None);
                        }
                        let combined = Condition::or(parts);
                        Ok(Some(if is_not {
                            Condition::Not(Box::new(combined))
                        } else {
                            combined
                        }))
                    }
                }
            }
        }
    }

    fn compile_comparison(
        &mut self,
        comparison: &ComparisonPredicate,
        root: &Predicate,
        branch: Option<usize>,
        uses_left_join: bool,
    ) -> CompileResult<Condition> {
        let mapped = self.mapped_key_cloned(&comparison.key)?;

        if mapped.sub_query.is_some() {
            return self.compile_sub_query_comparison(
                comparison,
                &mapped,
                root,
                branch,
                uses_left_join,
            );
        }

        let join_idx = if mapped.is_collection() {
            self.create_join(&comparison.key, branch)?
        } else {
            self.find_or_create_join(&comparison.key, branch)?
        };
        if uses_left_join {
            self.joins[join_idx].kind = JoinKind::LeftOuter;
        }

        let record_alias = self.record_alias();
        let lhs = self.joins[join_idx].value_expr(&record_alias);
        if mapped.is_collection() && self.joins[join_idx].version() < 2 {
            // Old collection layouts can emit one row per element even for
            // single-row matches.
            self.needs_distinct = true;
        }

        if comparison.op.is_relational() {
            self.compile_relational(comparison, &mapped, join_idx, lhs)
        } else {
            self.compile_membership(comparison, &mapped, join_idx, lhs)
        }
    }

    /// EqualsAny / NotEqualsAll. Each listed value contributes one condition;
    /// EqualsAny combines them with OR, NotEqualsAll with AND.
    fn compile_membership(
        &mut self,
        comparison: &ComparisonPredicate,
        mapped: &MappedKey,
        join_idx: usize,
        lhs: Expr,
    ) -> CompileResult<Condition> {
        let is_not = comparison.op == ComparisonOperator::NotEqualsAll;
        let mut parts = Vec::new();
        let mut in_values = Vec::new();
        let mut has_missing = false;

        for value in &comparison.values {
            match value {
                // Nothing ever equals null; everything differs from it.
                QueryValue::Null => parts.push(if is_not {
                    Condition::True
                } else {
                    Condition::False
                }),
                QueryValue::Missing => {
                    has_missing = true;
                    if is_not {
                        parts.push(Condition::IsNotNull(lhs.clone()));
                    } else {
                        // Matching absent rows needs the index row to be
                        // optional.
                        self.joins[join_idx].kind = JoinKind::LeftOuter;
                        parts.push(Condition::IsNull(lhs.clone()));
                    }
                }
                QueryValue::Region(region) => {
                    // An empty region has no geometry; nothing lies inside it.
                    if region.is_empty() {
                        parts.push(if is_not {
                            Condition::True
                        } else {
                            Condition::False
                        });
                        continue;
                    }
                    let sql = self
                        .vendor
                        .where_region(region, &lhs.to_sql())
                        .map_err(|err| {
                            CompileError::unsupported_index(&comparison.key, err.to_string())
                        })?;
                    parts.push(negate_if(is_not, Condition::Raw(sql)));
                }
                QueryValue::Location(location) => {
                    let sql = self
                        .vendor
                        .where_location(location, &lhs.to_sql())
                        .map_err(|err| {
                            CompileError::unsupported_index(&comparison.key, err.to_string())
                        })?;
                    parts.push(negate_if(is_not, Condition::Raw(sql)));
                }
                value => match self.joins[join_idx].convert_value(self.vendor, value) {
                    Some(literal) => {
                        if is_not {
                            // "differs from v" counts absent rows as
                            // differing, so the row must be optional and the
                            // null case matches.
                            self.joins[join_idx].kind = JoinKind::LeftOuter;
                            self.needs_distinct = true;
                            has_missing = true;
                            parts.push(Condition::Or(vec![
                                Condition::IsNull(lhs.clone()),
                                Condition::Compare {
                                    lhs: lhs.clone(),
                                    op: CompareOp::Ne,
                                    rhs: Expr::Literal(literal),
                                },
                            ]));
                        } else {
                            in_values.push(Expr::Literal(literal));
                        }
                    }
                    // A value the table cannot store can never match.
                    None => parts.push(if is_not {
                        Condition::True
                    } else {
                        Condition::False
                    }),
                },
            }
        }

        // Each listed value is one way for a record to match, and every way
        // can hit its own index row. Counted before the IN collapse.
        if !is_not && parts.len() + in_values.len() > 1 {
            self.needs_distinct = true;
        }
        match in_values.len() {
            0 => {}
            1 => parts.push(Condition::Compare {
                lhs: lhs.clone(),
                op: CompareOp::Eq,
                rhs: in_values.remove(0),
            }),
            _ => parts.push(Condition::In {
                lhs: lhs.clone(),
                list: in_values,
            }),
        }

        if parts.is_empty() {
            return Ok(if is_not {
                Condition::True
            } else {
                Condition::False
            });
        }
        let combined = if is_not {
            Condition::and(parts)
        } else {
            Condition::or(parts)
        };
        Ok(self.with_prefilters(&comparison.key, mapped, join_idx, lhs, combined, has_missing))
    }

    /// The relational/pattern family. The comparison holds when at least one
    /// listed value satisfies the operator.
    fn compile_relational(
        &mut self,
        comparison: &ComparisonPredicate,
        mapped: &MappedKey,
        join_idx: usize,
        lhs: Expr,
    ) -> CompileResult<Condition> {
        let mut parts = Vec::new();

        for value in &comparison.values {
            match value {
                QueryValue::Missing => {
                    return Err(CompileError::unsupported_predicate(
                        "missing values are only comparable with equality operators",
                    ));
                }
                QueryValue::Null => parts.push(Condition::False),
                QueryValue::Region(region)
                    if comparison.op == ComparisonOperator::Contains =>
                {
                    if region.is_empty() {
                        parts.push(Condition::False);
                        continue;
                    }
                    let sql = self
                        .vendor
                        .where_region(region, &lhs.to_sql())
                        .map_err(|err| {
                            CompileError::unsupported_index(&comparison.key, err.to_string())
                        })?;
                    parts.push(Condition::Raw(sql));
                }
                QueryValue::Location(location) => {
                    let sql = self
                        .vendor
                        .where_location(location, &lhs.to_sql())
                        .map_err(|err| {
                            CompileError::unsupported_index(&comparison.key, err.to_string())
                        })?;
                    parts.push(Condition::Raw(sql));
                }
                value => match comparison.op {
                    ComparisonOperator::Contains | ComparisonOperator::StartsWith => {
                        match value.as_like_source() {
                            Some(text) => {
                                let escaped = escape_like(&text);
                                let pattern =
                                    if comparison.op == ComparisonOperator::Contains {
                                        format!("%{escaped}%")
                                    } else {
                                        format!("{escaped}%")
                                    };
                                parts.push(Condition::Like {
                                    lhs: lhs.clone(),
                                    pattern,
                                });
                            }
                            None => parts.push(Condition::False),
                        }
                    }
                    op => match self.joins[join_idx].convert_value(self.vendor, value) {
                        Some(literal) => parts.push(Condition::Compare {
                            lhs: lhs.clone(),
                            op: relational_op(op),
                            rhs: Expr::Literal(literal),
                        }),
                        None => parts.push(Condition::False),
                    },
                },
            }
        }

        if parts.is_empty() {
            return Ok(Condition::False);
        }
        if parts.len() > 1 {
            self.needs_distinct = true;
        }
        let combined = Condition::or(parts);
        Ok(self.with_prefilters(&comparison.key, mapped, join_idx, lhs, combined, false))
    }

    /// Comparison against a reference path: the local join reads the
    /// reference value, and the remainder runs as a child query. Inlined as
    /// `IN (SELECT ...)` when another comparison uses the reference field
    /// directly; fused into the parent FROM clause otherwise.
    fn compile_sub_query_comparison(
        &mut self,
        comparison: &ComparisonPredicate,
        mapped: &MappedKey,
        root: &Predicate,
        branch: Option<usize>,
        uses_left_join: bool,
    ) -> CompileResult<Condition> {
        let is_not = comparison.op == ComparisonOperator::NotEqualsAll;
        let Some(child_query) = mapped.sub_query_with_comparison(comparison) else {
            return Err(CompileError::invalid_usage(
                "reference path without a sub-query continuation",
            ));
        };

        let join_idx = if mapped.is_collection() {
            self.create_join(&comparison.key, branch)?
        } else {
            self.find_or_create_join(&comparison.key, branch)?
        };
        if uses_left_join {
            self.joins[join_idx].kind = JoinKind::LeftOuter;
        }
        if is_not || mapped.is_collection() {
            self.needs_distinct = true;
        }
        let record_alias = self.record_alias();
        let lhs = self.joins[join_idx].value_expr(&record_alias);

        if self.find_similar_comparison(mapped.field.as_ref(), root) {
            // The reference field is also compared directly elsewhere, so a
            // fused join would serve two masters. Inline instead.
            let mut child = self.nested_compiler(child_query)?;
            let select = child.sub_query_statement()?;
            return Ok(Condition::InSelect {
                lhs,
                select,
                negated: is_not,
            });
        }

        let prefix = format!(
            "{}{}",
            lhs.to_sql(),
            if is_not { " != " } else { " = " }
        );
        let force_left = self.joins[join_idx].kind == JoinKind::LeftOuter;
        let child_idx = self.get_or_create_sub_compiler(&child_query, force_left)?;
        self.upsert_sub_query(child_query, prefix);
        Ok(self.sub_compilers[child_idx]
            .compiler
            .where_condition
            .clone()
            .unwrap_or(Condition::True))
    }

    /// Prepends the per-key symbol filter and, for optional joins, the
    /// not-null guard. Skipped entirely when the comparison itself matches
    /// absent rows.
    fn with_prefilters(
        &mut self,
        query_key: &str,
        mapped: &MappedKey,
        join_idx: usize,
        lhs: Expr,
        combined: Condition,
        has_missing: bool,
    ) -> Condition {
        if has_missing {
            return combined;
        }
        let mut parts = Vec::new();
        let join = &self.joins[join_idx];

        if join.is_index() {
            if let Some(symbol) = mapped.index_key(self.selected_indexes.get(query_key)) {
                parts.push(Condition::Compare {
                    lhs: Expr::column(
                        join.alias.as_str(),
                        layout::key_column(join.version()),
                    ),
                    op: CompareOp::Eq,
                    rhs: Expr::Literal(join.convert_index_key(self.catalog, symbol)),
                });
            }
        }
        if join.kind == JoinKind::LeftOuter {
            parts.push(Condition::IsNotNull(lhs));
        }
        parts.push(combined);
        Condition::and(parts)
    }

    /// Whether any other comparison in the tree lands on `field` directly,
    /// without a sub-query continuation.
    fn find_similar_comparison(&self, field: Option<&FieldInfo>, predicate: &Predicate) -> bool {
        let Some(field) = field else {
            return false;
        };
        match predicate {
            Predicate::Compound { children, .. } => children
                .iter()
                .any(|child| self.find_similar_comparison(Some(field), child)),
            Predicate::Comparison(comparison) => self
                .mapped_keys
                .get(&comparison.key)
                .is_some_and(|mapped| {
                    mapped.sub_query.is_none() && mapped.field.as_ref() == Some(field)
                }),
        }
    }
}

fn relational_op(op: ComparisonOperator) -> CompareOp {
    match op {
        ComparisonOperator::LessThan => CompareOp::Lt,
        ComparisonOperator::LessThanOrEquals => CompareOp::Lte,
        ComparisonOperator::GreaterThan => CompareOp::Gt,
        ComparisonOperator::GreaterThanOrEquals => CompareOp::Gte,
        // Pattern and membership operators never reach here.
        ComparisonOperator::EqualsAny
        | ComparisonOperator::NotEqualsAll
        | ComparisonOperator::Contains
        | ComparisonOperator::StartsWith => CompareOp::Eq,
    }
}

fn negate_if(negate: bool, condition: Condition) -> Condition {
    if negate {
        Condition::Not(Box::new(condition))
    } else {
        condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, MemoryCatalog};
    use crate::query::Query;
    use crate::vendor::MysqlVendor;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_field("title", FieldType::Text)
            .with_field("rating", FieldType::Number)
            .with_collection("tags", FieldType::Text, 3)
    }

    fn compile(predicate: Predicate) -> (String, bool) {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let query = Query::from_all().with_predicate(predicate.clone());
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);
        compiler.ensure_mapped().unwrap();
        let condition = compiler
            .compile_predicate(&predicate, &predicate, None, false)
            .unwrap()
            .unwrap();
        (condition.to_sql(), compiler.needs_distinct)
    }

    #[test]
    fn test_single_equality() {
        let (sql, distinct) = compile(Predicate::eq("title", QueryValue::text("Foo")));
        assert_eq!(sql, "(`i0`.`symbolId` = 1 AND `i0`.`value` = 'Foo')");
        assert!(!distinct);
    }

    #[test]
    fn test_equals_any_collapses_to_in() {
        let (sql, distinct) = compile(Predicate::equals_any(
            "title",
            vec![QueryValue::text("a"), QueryValue::text("b")],
        ));
        assert_eq!(sql, "(`i0`.`symbolId` = 1 AND `i0`.`value` IN ('a', 'b'))");
        // Two ways to match, two possible index rows per record.
        assert!(distinct);
    }

    #[test]
    fn test_null_value_never_matches() {
        let (sql, _) = compile(Predicate::eq("title", QueryValue::Null));
        assert_eq!(sql, "(`i0`.`symbolId` = 1 AND 1 = 0)");
    }

    #[test]
    fn test_missing_lowers_to_is_null() {
        let (sql, _) = compile(Predicate::missing("title"));
        assert_eq!(sql, "`i0`.`value` IS NULL");
    }

    #[test]
    fn test_not_equals_counts_absent_as_differing() {
        let (sql, distinct) = compile(Predicate::not_equals_all(
            "title",
            vec![QueryValue::text("Foo")],
        ));
        assert_eq!(
            sql,
            "(`i0`.`value` IS NULL OR `i0`.`value` != 'Foo')"
        );
        assert!(distinct);
    }

    #[test]
    fn test_relational_disjunction_over_values() {
        let (sql, _) = compile(Predicate::comparison(
            "rating",
            ComparisonOperator::LessThan,
            vec![QueryValue::number(3.0)],
        ));
        assert_eq!(sql, "(`i0`.`symbolId` = 1 AND `i0`.`value` < 3)");
    }

    #[test]
    fn test_starts_with_escapes_pattern() {
        let (sql, _) = compile(Predicate::comparison(
            "title",
            ComparisonOperator::StartsWith,
            vec![QueryValue::text("50%")],
        ));
        assert_eq!(
            sql,
            "(`i0`.`symbolId` = 1 AND `i0`.`value` LIKE '50\\\\%%')"
        );
    }

    #[test]
    fn test_or_branches_do_not_share_joins() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let predicate = Predicate::or(vec![
            Predicate::eq("title", QueryValue::text("a")),
            Predicate::eq("title", QueryValue::text("b")),
        ]);
        let query = Query::from_all().with_predicate(predicate.clone());
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);
        compiler.ensure_mapped().unwrap();
        compiler
            .compile_predicate(&predicate, &predicate, None, false)
            .unwrap();
        assert_eq!(compiler.joins.len(), 2);
        assert!(compiler.needs_distinct);
    }

    #[test]
    fn test_not_is_negated_disjunction() {
        let (sql, _) = compile(Predicate::not(vec![Predicate::eq(
            "title",
            QueryValue::text("Foo"),
        )]));
        assert_eq!(
            sql,
            "NOT ((`i0`.`symbolId` = 1 AND `i0`.`value` IS NOT NULL AND `i0`.`value` = 'Foo'))"
        );
    }

    #[test]
    fn test_missing_value_rejected_by_relational_ops() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let predicate = Predicate::comparison(
            "rating",
            ComparisonOperator::GreaterThan,
            vec![QueryValue::Missing],
        );
        let query = Query::from_all().with_predicate(predicate.clone());
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);
        compiler.ensure_mapped().unwrap();
        let err = compiler
            .compile_predicate(&predicate, &predicate, None, false)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedPredicate { .. }));
    }

    #[test]
    fn test_collection_comparisons_use_fresh_joins() {
        let catalog = catalog();
        let vendor = MysqlVendor::new();
        let predicate = Predicate::and(vec![
            Predicate::eq("tags", QueryValue::text("a")),
            Predicate::eq("tags", QueryValue::text("b")),
        ]);
        let query = Query::from_all().with_predicate(predicate.clone());
        let mut compiler = SqlCompiler::new(&catalog, &vendor, query);
        compiler.ensure_mapped().unwrap();
        compiler
            .compile_predicate(&predicate, &predicate, None, false)
            .unwrap();
        assert_eq!(compiler.joins.len(), 2);
    }
}
