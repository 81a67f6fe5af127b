//! A Rust library for composing Epic EHI extracts into per-subject record
//! graphs with schema validation and column-safety enforcement.
//!
//! An EHI extract arrives as hundreds of narrow physical tables keyed by
//! internal identifiers. This crate reassembles them, one subject at a
//! time, into a typed record graph: split tables merge back into logical
//! rows, child tables nest as ordered collections, contact serial numbers
//! resolve through an authored relationship catalog rather than column-name
//! guessing, and every row read can be checked against the documented
//! schema snapshot.
//!
//! Per subject the pipeline runs composition (scoped roots, split merge,
//! ordered children), parent-chain resolution, contact indexing, and
//! optional heuristic history linkage. [`SubjectProjector`] ties the stages
//! together; [`Verifier`] runs the same pipeline with every drift check
//! turned into a failure.

pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod projector;
pub mod row;
pub mod schema;
pub mod scope;
pub mod store;
pub mod typed;
pub mod utils;

// Re-export the most common types for easier use
// Core pipeline
pub use config::{ChainResults, EngineConfig};
pub use error::{ProjectionError, Result};
pub use projector::{SubjectProjector, SubjectRecord, VerificationReport, Verifier};

// Graph model
pub use compose::{ContactIndex, EntityId, LogicalEntity, SubjectGraph};
pub use row::{CellValue, RawRow};

// Static configuration
pub use mapping::MappingCatalog;
pub use schema::SchemaRegistry;

// Staging stores
pub use store::{MemoryStore, ParquetStore, TableStore};

// Typed table views
pub use typed::TableRow;

// Diagnostics stream
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
