//! entisql - a deterministic compiler from entity queries to SQL
//!
//! Queries are predicate trees over schema-agnostic field keys. The compiler
//! resolves each key through an index catalog, joins the versioned index
//! tables that hold the field values, and renders select, count, delete,
//! group, and last-update statements over the shared record layout.

pub mod catalog;
pub mod compiler;
pub mod query;
pub mod sql;
pub mod vendor;

pub use catalog::{IndexCatalog, MemoryCatalog};
pub use compiler::{CompileError, CompileReport, CompileResult, SqlCompiler};
pub use query::{Predicate, Query, QueryValue, Sorter};
pub use vendor::{GenericVendor, MysqlVendor, Vendor};
