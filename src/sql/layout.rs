//! Physical storage layout contract
//!
//! The compiler targets a fixed naming scheme: one generic record table plus
//! per-logical-type index tables, each versioned 1 through 4. Versions 2 and
//! up add a type-id column (index sharing across record types) and switch the
//! key column from the field name to a symbol id; the newest versions are
//! also safe to pair with a primary-index hint on the base table.

use serde::{Deserialize, Serialize};

use crate::catalog::FieldType;

/// Base record table holding one row per logical record.
pub const RECORD_TABLE: &str = "Record";
/// Companion table tracking per-record update timestamps.
pub const RECORD_UPDATE_TABLE: &str = "RecordUpdate";

pub const ID_COLUMN: &str = "id";
pub const TYPE_ID_COLUMN: &str = "typeId";
pub const DATA_COLUMN: &str = "data";
pub const UPDATE_DATE_COLUMN: &str = "updateDate";
/// Key column for version 1 index tables (textual field name).
pub const NAME_COLUMN: &str = "name";
/// Key column for version 2+ index tables (symbol id).
pub const SYMBOL_COLUMN: &str = "symbolId";
pub const VALUE_COLUMN: &str = "value";

/// Columns of the base record table that query keys may bind to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordColumn {
    Id,
    TypeId,
}

impl RecordColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            RecordColumn::Id => ID_COLUMN,
            RecordColumn::TypeId => TYPE_ID_COLUMN,
        }
    }
}

/// Logical type of an index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Text,
    Number,
    Uuid,
    Location,
}

impl IndexKind {
    /// Maps a field's internal storage type to its index table type.
    /// Booleans are stored in the number tables.
    pub fn for_field_type(field_type: FieldType) -> IndexKind {
        match field_type {
            FieldType::Text => IndexKind::Text,
            FieldType::Number | FieldType::Boolean => IndexKind::Number,
            FieldType::Uuid => IndexKind::Uuid,
            FieldType::Location => IndexKind::Location,
        }
    }

    fn base_name(self) -> &'static str {
        match self {
            IndexKind::Text => "RecordString",
            IndexKind::Number => "RecordNumber",
            IndexKind::Uuid => "RecordUuid",
            IndexKind::Location => "RecordLocation",
        }
    }

    /// Physical table name for a given layout version.
    pub fn table_name(self, version: u8) -> String {
        if version <= 1 {
            self.base_name().to_string()
        } else {
            format!("{}{}", self.base_name(), version)
        }
    }

    /// Minimum table version at which the base-table primary-index hint
    /// remains safe. Older layouts disable the hint for the whole render.
    pub fn hint_min_version(self) -> u8 {
        match self {
            IndexKind::Text => 4,
            IndexKind::Number | IndexKind::Uuid | IndexKind::Location => 3,
        }
    }
}

/// Key column name for a given index table version.
pub fn key_column(version: u8) -> &'static str {
    if version >= 2 {
        SYMBOL_COLUMN
    } else {
        NAME_COLUMN
    }
}

/// Whether a given index table version carries a type-id column.
pub fn has_type_id(version: u8) -> bool {
    version >= 2
}
