//! Query option bag
//!
//! Recognized string-valued extension options carrying raw SQL fragments.
//! These are escape hatches: the fragments are spliced into the rendered
//! statement verbatim and are the caller's responsibility. The extra-JOIN
//! fragment supports `${queryKey}` placeholders, resolved during compilation
//! to the rendered value-column reference for that key.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Raw condition ANDed onto the WHERE clause.
    pub extra_where: Option<String>,
    /// Raw condition used as the HAVING clause.
    pub extra_having: Option<String>,
    /// Raw join text appended to the FROM clause; supports `${queryKey}`
    /// placeholder interpolation.
    pub extra_joins: Option<String>,
    /// Whitespace-separated column names appended to the SELECT list.
    pub extra_columns: Option<String>,
}

impl QueryOptions {
    pub fn is_empty(&self) -> bool {
        self.extra_where.is_none()
            && self.extra_having.is_none()
            && self.extra_joins.is_none()
            && self.extra_columns.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(QueryOptions::default().is_empty());

        let opts = QueryOptions {
            extra_where: Some("`r`.`id` IS NOT NULL".into()),
            ..QueryOptions::default()
        };
        assert!(!opts.is_empty());
    }
}
