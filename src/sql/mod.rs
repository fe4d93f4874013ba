//! Rendered-SQL text model
//!
//! A minimal expression/condition tree that renders to MySQL-dialect text.
//! The compiler assembles statements out of these pieces instead of pasting
//! strings together inline, so quoting and escaping live in exactly one place.
//!
//! Raw fragments (caller-supplied WHERE/HAVING/JOIN text from query options)
//! are carried as an explicit `Raw` variant and are never escaped or
//! inspected; they are trusted exactly as far as the caller trusts them.

mod expr;
pub mod layout;

pub use expr::{CompareOp, Condition, Expr, SqlLiteral};

/// Quotes an identifier with backticks, doubling any embedded backtick.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for c in name.chars() {
        if c == '`' {
            out.push('`');
        }
        out.push(c);
    }
    out.push('`');
    out
}

/// Quotes a string literal with single quotes, doubling embedded quotes
/// and escaping backslashes.
pub fn quote_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Escapes LIKE pattern metacharacters in a literal fragment.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '%' || c == '_' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
