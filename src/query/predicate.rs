//! Predicate tree
//!
//! Queries filter records with a tree of compound nodes (AND/OR/NOT) over
//! comparison leaves. Operators are closed enumerations: there is no string
//! dispatch and no silent fall-through for unrecognized operators.

use serde::{Deserialize, Serialize};

use super::value::QueryValue;

/// Logical combinators for compound predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundOperator {
    And,
    Or,
    Not,
}

/// Comparison operators.
///
/// `EqualsAny` matches when the field equals at least one listed value;
/// `NotEqualsAll` matches when it differs from every listed value, counting
/// an absent field as differing. The relational family is a disjunction over
/// the listed values: the comparison holds when at least one value satisfies
/// the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    EqualsAny,
    NotEqualsAll,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    Contains,
    StartsWith,
}

impl ComparisonOperator {
    /// Whether this operator belongs to the relational/pattern family
    /// (everything except the two membership operators).
    pub fn is_relational(self) -> bool {
        !matches!(
            self,
            ComparisonOperator::EqualsAny | ComparisonOperator::NotEqualsAll
        )
    }
}

/// A single comparison of a dot-path query key against a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPredicate {
    pub key: String,
    pub op: ComparisonOperator,
    pub values: Vec<QueryValue>,
}

impl ComparisonPredicate {
    pub fn new(
        key: impl Into<String>,
        op: ComparisonOperator,
        values: Vec<QueryValue>,
    ) -> Self {
        Self {
            key: key.into(),
            op,
            values,
        }
    }
}

/// A node in the predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Compound {
        op: CompoundOperator,
        children: Vec<Predicate>,
    },
    Comparison(ComparisonPredicate),
}

impl Predicate {
    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::Compound {
            op: CompoundOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Compound {
            op: CompoundOperator::Or,
            children,
        }
    }

    pub fn not(children: Vec<Predicate>) -> Self {
        Predicate::Compound {
            op: CompoundOperator::Not,
            children,
        }
    }

    pub fn comparison(
        key: impl Into<String>,
        op: ComparisonOperator,
        values: Vec<QueryValue>,
    ) -> Self {
        Predicate::Comparison(ComparisonPredicate::new(key, op, values))
    }

    /// Equality against a single value.
    pub fn eq(key: impl Into<String>, value: QueryValue) -> Self {
        Self::comparison(key, ComparisonOperator::EqualsAny, vec![value])
    }

    /// Membership in a value list.
    pub fn equals_any(key: impl Into<String>, values: Vec<QueryValue>) -> Self {
        Self::comparison(key, ComparisonOperator::EqualsAny, values)
    }

    /// Exclusion of every listed value.
    pub fn not_equals_all(key: impl Into<String>, values: Vec<QueryValue>) -> Self {
        Self::comparison(key, ComparisonOperator::NotEqualsAll, values)
    }

    /// Matches records where the field is absent.
    pub fn missing(key: impl Into<String>) -> Self {
        Self::eq(key, QueryValue::Missing)
    }

    /// Collects every query key referenced by this subtree, in order.
    pub fn collect_keys(&self, out: &mut Vec<String>) {
        match self {
            Predicate::Compound { children, .. } => {
                for child in children {
                    child.collect_keys(out);
                }
            }
            Predicate::Comparison(cmp) => {
                if !out.contains(&cmp.key) {
                    out.push(cmp.key.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let p = Predicate::and(vec![
            Predicate::eq("title", QueryValue::text("Foo")),
            Predicate::not_equals_all("state", vec![QueryValue::text("deleted")]),
        ]);

        match p {
            Predicate::Compound { op, children } => {
                assert_eq!(op, CompoundOperator::And);
                assert_eq!(children.len(), 2);
            }
            Predicate::Comparison(_) => panic!("expected compound"),
        }
    }

    #[test]
    fn test_collect_keys_dedupes() {
        let p = Predicate::or(vec![
            Predicate::eq("title", QueryValue::text("a")),
            Predicate::eq("title", QueryValue::text("b")),
            Predicate::eq("author", QueryValue::text("c")),
        ]);

        let mut keys = Vec::new();
        p.collect_keys(&mut keys);
        assert_eq!(keys, vec!["title".to_string(), "author".to_string()]);
    }

    #[test]
    fn test_relational_family() {
        assert!(ComparisonOperator::LessThan.is_relational());
        assert!(ComparisonOperator::Contains.is_relational());
        assert!(!ComparisonOperator::EqualsAny.is_relational());
        assert!(!ComparisonOperator::NotEqualsAll.is_relational());
    }
}
