//! SQL expressions and boolean conditions
//!
//! Conditions form a tree that renders to deterministic text: children are
//! rendered in construction order and composite groups are parenthesized, so
//! the same tree always produces the same statement.

use std::fmt;

use super::{quote_ident, quote_str};

/// A literal value in its physical SQL representation.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlLiteral {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    /// Pre-rendered literal text (vendor-encoded values such as UUIDs).
    Raw(String),
}

impl SqlLiteral {
    fn render_to(&self, out: &mut String) {
        match self {
            SqlLiteral::Null => out.push_str("NULL"),
            SqlLiteral::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
            SqlLiteral::Integer(i) => out.push_str(&i.to_string()),
            SqlLiteral::Number(n) => {
                if n.is_finite() {
                    out.push_str(&n.to_string());
                } else {
                    out.push_str("NULL");
                }
            }
            SqlLiteral::Text(s) => out.push_str(&quote_str(s)),
            SqlLiteral::Raw(s) => out.push_str(s),
        }
    }
}

/// A scalar SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An alias-qualified column reference.
    Column { alias: String, name: String },
    Literal(SqlLiteral),
    /// Pre-rendered expression text.
    Raw(String),
}

impl Expr {
    /// Creates an alias-qualified column reference.
    pub fn column(alias: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column {
            alias: alias.into(),
            name: name.into(),
        }
    }

    pub fn render_to(&self, out: &mut String) {
        match self {
            Expr::Column { alias, name } => {
                out.push_str(&quote_ident(alias));
                out.push('.');
                out.push_str(&quote_ident(name));
            }
            Expr::Literal(lit) => lit.render_to(out),
            Expr::Raw(s) => out.push_str(s),
        }
    }

    /// Renders this expression to a standalone string.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.render_to(&mut out);
        out
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// A boolean condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Always satisfied.
    True,
    /// Never satisfied.
    False,
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
    IsNull(Expr),
    IsNotNull(Expr),
    /// Membership in a literal list; an empty list is never satisfied.
    In {
        lhs: Expr,
        list: Vec<Expr>,
    },
    /// Membership in a nested SELECT, optionally negated.
    InSelect {
        lhs: Expr,
        select: String,
        negated: bool,
    },
    /// LIKE against an already-escaped pattern.
    Like {
        lhs: Expr,
        pattern: String,
    },
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    /// Caller-supplied SQL text, trusted verbatim.
    Raw(String),
}

impl Condition {
    /// Combines conditions with AND, collapsing the single-child case.
    pub fn and(mut children: Vec<Condition>) -> Condition {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Condition::And(children)
        }
    }

    /// Combines conditions with OR, collapsing the single-child case.
    pub fn or(mut children: Vec<Condition>) -> Condition {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Condition::Or(children)
        }
    }

    pub fn and_with(self, other: Condition) -> Condition {
        Condition::And(vec![self, other])
    }

    pub fn render_to(&self, out: &mut String) {
        match self {
            Condition::True => out.push_str("1 = 1"),
            Condition::False => out.push_str("1 = 0"),
            Condition::Compare { lhs, op, rhs } => {
                lhs.render_to(out);
                out.push(' ');
                out.push_str(op.as_str());
                out.push(' ');
                rhs.render_to(out);
            }
            Condition::IsNull(expr) => {
                expr.render_to(out);
                out.push_str(" IS NULL");
            }
            Condition::IsNotNull(expr) => {
                expr.render_to(out);
                out.push_str(" IS NOT NULL");
            }
            Condition::In { lhs, list } => {
                if list.is_empty() {
                    out.push_str("1 = 0");
                    return;
                }
                lhs.render_to(out);
                out.push_str(" IN (");
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_to(out);
                }
                out.push(')');
            }
            Condition::InSelect {
                lhs,
                select,
                negated,
            } => {
                lhs.render_to(out);
                out.push_str(if *negated { " NOT IN (" } else { " IN (" });
                out.push_str(select);
                out.push(')');
            }
            Condition::Like { lhs, pattern } => {
                lhs.render_to(out);
                out.push_str(" LIKE ");
                out.push_str(&quote_str(pattern));
            }
            Condition::Not(inner) => {
                out.push_str("NOT (");
                inner.render_to(out);
                out.push(')');
            }
            Condition::And(children) => render_group(out, children, " AND ", "1 = 1"),
            Condition::Or(children) => render_group(out, children, " OR ", "1 = 0"),
            Condition::Raw(text) => out.push_str(text),
        }
    }

    /// Renders this condition to a standalone string.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.render_to(&mut out);
        out
    }
}

fn render_group(out: &mut String, children: &[Condition], sep: &str, empty: &str) {
    match children {
        [] => out.push_str(empty),
        [single] => single.render_to(out),
        _ => {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                child.render_to(out);
            }
            out.push(')');
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(alias: &str, name: &str) -> Expr {
        Expr::column(alias, name)
    }

    #[test]
    fn test_compare_render() {
        let cond = Condition::Compare {
            lhs: col("i0", "value"),
            op: CompareOp::Eq,
            rhs: Expr::Literal(SqlLiteral::Text("Foo".into())),
        };
        assert_eq!(cond.to_sql(), "`i0`.`value` = 'Foo'");
    }

    #[test]
    fn test_and_or_grouping() {
        let cond = Condition::And(vec![
            Condition::IsNotNull(col("i0", "value")),
            Condition::Or(vec![
                Condition::Compare {
                    lhs: col("i0", "value"),
                    op: CompareOp::Eq,
                    rhs: Expr::Literal(SqlLiteral::Text("a".into())),
                },
                Condition::Compare {
                    lhs: col("i0", "value"),
                    op: CompareOp::Eq,
                    rhs: Expr::Literal(SqlLiteral::Text("b".into())),
                },
            ]),
        ]);
        assert_eq!(
            cond.to_sql(),
            "(`i0`.`value` IS NOT NULL AND (`i0`.`value` = 'a' OR `i0`.`value` = 'b'))"
        );
    }

    #[test]
    fn test_single_child_collapses() {
        let cond = Condition::and(vec![Condition::True]);
        assert_eq!(cond.to_sql(), "1 = 1");
    }

    #[test]
    fn test_empty_in_never_matches() {
        let cond = Condition::In {
            lhs: col("r", "typeId"),
            list: Vec::new(),
        };
        assert_eq!(cond.to_sql(), "1 = 0");
    }

    #[test]
    fn test_not_wraps() {
        let cond = Condition::Not(Box::new(Condition::IsNull(col("i0", "value"))));
        assert_eq!(cond.to_sql(), "NOT (`i0`.`value` IS NULL)");
    }

    #[test]
    fn test_number_literal_render() {
        let mut out = String::new();
        SqlLiteral::Number(3.0).render_to(&mut out);
        assert_eq!(out, "3");

        let mut out = String::new();
        SqlLiteral::Number(2.5).render_to(&mut out);
        assert_eq!(out, "2.5");
    }
}
