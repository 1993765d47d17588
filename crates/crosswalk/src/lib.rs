//! Crosswalk: self-repairing lookup-chain resolution for tabular
//! commission data.
//!
//! Crosswalk assigns a derived routing field (by default the FSE code) to
//! every row of an incoming dataset by threading each row's tokens through
//! chains of cross-referenced reference tables, and keeps those tables
//! self-correcting: unknown keys are appended as `"ENF"` placeholders for
//! manual triage, and values that later prove wrong are invalidated
//! automatically.
//!
//! # Core Principles
//!
//! - **Misses are data**: a failed lookup flags the row and queues a repair,
//!   it never aborts the run
//! - **Write-through**: intermediate lookup results are written back into
//!   the dataset so later paths and rows reuse the canonical form
//! - **Bounded blast radius**: a dead end only questions the step
//!   immediately before it
//!
//! # Example
//!
//! ```no_run
//! use crosswalk::Crosswalk;
//!
//! let crosswalk = Crosswalk::new();
//! let report = crosswalk.run("Input/VISHAY@2024-03-01.csv").unwrap();
//!
//! println!("Resolved: {}/{}", report.resolution.resolved, report.resolution.rows);
//! println!("Repaired tables: {:?}", report.repaired_tables);
//! ```

pub mod catalog;
pub mod error;
pub mod io;
pub mod lookup;
pub mod standardize;

mod crosswalk;

pub use crate::crosswalk::{Crosswalk, CrosswalkConfig, NoReview, ReviewSink, RunReport};
pub use catalog::{Catalog, LookupPath, TableId, TableSpec};
pub use error::{CrosswalkError, Result};
pub use io::DataTable;
pub use lookup::{ReferenceTable, ResolveReport, Resolver, LOOKUP_FLAG_COLUMN, SENTINEL};
pub use standardize::{BatchIdentity, Standardizer};
