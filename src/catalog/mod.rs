//! Index catalog
//!
//! Read-only metadata the compiler consults: per query key, the resolved
//! field, its candidate composite indexes, and the symbol-table encoding used
//! by versioned index tables. Implementations must be safe for concurrent
//! reads; independent compiler instances may run against one catalog at the
//! same time.

mod mapped_key;
mod memory;

pub use mapped_key::{FieldInfo, FieldType, IndexModel, MappedKey, SubQueryPath};
pub use memory::MemoryCatalog;

use crate::query::Query;

/// Read-only resolution of query keys to physical storage metadata.
pub trait IndexCatalog: Sync {
    /// Resolves a dot-path query key in the context of `query`.
    /// Returns `None` when the key names nothing the catalog knows about.
    fn map_key(&self, query: &Query, key: &str) -> Option<MappedKey>;

    /// Numeric id of a field symbol, used as the key-column value in
    /// version 2+ index tables.
    fn symbol_id(&self, symbol: &str) -> i64;
}
