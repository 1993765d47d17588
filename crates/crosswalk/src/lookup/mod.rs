//! Lookup resolution and reference-table self-repair.

mod reference;
mod repair;
mod resolver;

pub use reference::ReferenceTable;
pub use repair::{flush, UPLOAD_TIMESTAMP_COLUMN};
pub use resolver::{ResolveReport, Resolver, LOOKUP_FLAG_COLUMN, SENTINEL};
