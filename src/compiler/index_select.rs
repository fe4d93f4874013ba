//! Covering-index selection
//!
//! Each mapped key picks one index out of its candidates: the index whose
//! field list overlaps the most of the query's mapped fields wins, so a
//! compound index shared by several referenced keys is preferred over
//! separate single-field indexes. When nothing overlaps beyond the key's own
//! field, a dedicated single-field index beats a wider compound one.

use std::collections::BTreeMap;

use crate::catalog::{IndexModel, MappedKey};

/// Selects a covering index for every mapped key that has candidates.
pub(super) fn select_indexes(
    mapped_keys: &BTreeMap<String, MappedKey>,
) -> BTreeMap<String, IndexModel> {
    let mut selected = BTreeMap::new();
    for (query_key, mapped) in mapped_keys {
        if let Some(index) = select_index(mapped, mapped_keys) {
            selected.insert(query_key.clone(), index.clone());
        }
    }
    selected
}

fn select_index<'a>(
    mapped: &'a MappedKey,
    mapped_keys: &BTreeMap<String, MappedKey>,
) -> Option<&'a IndexModel> {
    let mut best: Option<&IndexModel> = None;
    let mut best_count = 0;

    for index in &mapped.indexes {
        let count = mapped_keys
            .values()
            .filter(|other| {
                other
                    .field
                    .as_ref()
                    .is_some_and(|field| index.fields.contains(&field.name))
            })
            .count();
        if count > best_count {
            best_count = count;
            best = Some(index);
        }
    }

    // With no cross-key overlap a dedicated single-field index is the
    // cheaper choice.
    if best_count == 1 {
        if let Some(single) = mapped.indexes.iter().find(|index| index.fields.len() == 1) {
            best = Some(single);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldInfo, FieldType};

    fn key(name: &str, indexes: Vec<IndexModel>) -> MappedKey {
        MappedKey::for_field(name, FieldInfo::new(name, FieldType::Text), indexes)
    }

    #[test]
    fn test_compound_index_wins_when_both_fields_queried() {
        let compound = IndexModel::new("k_title_author", ["title", "author"], 3);
        let mut keys = BTreeMap::new();
        keys.insert(
            "title".to_string(),
            key(
                "title",
                vec![IndexModel::new("k_title", ["title"], 3), compound.clone()],
            ),
        );
        keys.insert(
            "author".to_string(),
            key(
                "author",
                vec![IndexModel::new("k_author", ["author"], 3), compound.clone()],
            ),
        );

        let selected = select_indexes(&keys);
        assert_eq!(selected["title"].name, "k_title_author");
        assert_eq!(selected["author"].name, "k_title_author");
    }

    #[test]
    fn test_single_field_index_preferred_without_overlap() {
        let compound = IndexModel::new("k_title_author", ["title", "author"], 3);
        let mut keys = BTreeMap::new();
        keys.insert(
            "title".to_string(),
            key(
                "title",
                vec![compound, IndexModel::new("k_title", ["title"], 3)],
            ),
        );

        let selected = select_indexes(&keys);
        assert_eq!(selected["title"].name, "k_title");
    }

    #[test]
    fn test_unindexed_key_selects_nothing() {
        let mut keys = BTreeMap::new();
        keys.insert("title".to_string(), key("title", Vec::new()));
        assert!(select_indexes(&keys).is_empty());
    }
}
