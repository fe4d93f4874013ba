//! Sort specifications
//!
//! Four recognized sort kinds: plain ascending/descending on a key, and
//! geospatial closest/farthest relative to an origin point.

use serde::{Deserialize, Serialize};

use super::value::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sorter {
    Ascending { key: String },
    Descending { key: String },
    Closest { key: String, origin: Location },
    Farthest { key: String, origin: Location },
}

impl Sorter {
    pub fn ascending(key: impl Into<String>) -> Self {
        Sorter::Ascending { key: key.into() }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Sorter::Descending { key: key.into() }
    }

    pub fn closest(key: impl Into<String>, origin: Location) -> Self {
        Sorter::Closest {
            key: key.into(),
            origin,
        }
    }

    pub fn farthest(key: impl Into<String>, origin: Location) -> Self {
        Sorter::Farthest {
            key: key.into(),
            origin,
        }
    }

    /// The query key this sorter orders by.
    pub fn key(&self) -> &str {
        match self {
            Sorter::Ascending { key }
            | Sorter::Descending { key }
            | Sorter::Closest { key, .. }
            | Sorter::Farthest { key, .. } => key,
        }
    }

    pub fn is_geospatial(&self) -> bool {
        matches!(self, Sorter::Closest { .. } | Sorter::Farthest { .. })
    }

    /// The same sort kind aimed at a different key. Used when a sort on a
    /// reference path is pushed down into a correlated sub-query.
    pub fn retargeted(&self, key: impl Into<String>) -> Sorter {
        let key = key.into();
        match self {
            Sorter::Ascending { .. } => Sorter::Ascending { key },
            Sorter::Descending { .. } => Sorter::Descending { key },
            Sorter::Closest { origin, .. } => Sorter::Closest {
                key,
                origin: *origin,
            },
            Sorter::Farthest { origin, .. } => Sorter::Farthest {
                key,
                origin: *origin,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_access() {
        assert_eq!(Sorter::ascending("title").key(), "title");
        assert_eq!(
            Sorter::closest("where", Location::new(1.0, 2.0)).key(),
            "where"
        );
    }

    #[test]
    fn test_retargeted_keeps_kind() {
        let s = Sorter::farthest("author/home", Location::new(3.0, 4.0));
        let r = s.retargeted("home");
        match r {
            Sorter::Farthest { key, origin } => {
                assert_eq!(key, "home");
                assert_eq!(origin, Location::new(3.0, 4.0));
            }
            _ => panic!("expected farthest"),
        }
    }
}
