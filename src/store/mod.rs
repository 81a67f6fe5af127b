//! Staging-store access.
//!
//! The engine composes subject records from single-table equality queries
//! and full-table scans; that whole surface is the `TableStore` trait, so
//! the same projection code runs against the in-memory TSV-loaded store and
//! the Parquet snapshot store.

pub mod memory;
pub mod parquet;

pub use memory::MemoryStore;
pub use parquet::ParquetStore;

use crate::error::Result;
use crate::row::{CellValue, RawRow};

/// Read-only interface over a staged extract.
///
/// Queries address physical tables (`PATIENT_2`, not the logical
/// `PATIENT`); split resolution happens above this layer.
pub trait TableStore: Send + Sync {
    /// True when the physical table is present in the store
    fn table_exists(&self, table: &str) -> bool;

    /// Rows of `table` whose `column` equals `value`, in staged order.
    ///
    /// # Errors
    /// Fails when the table is not present; callers degrade gracefully by
    /// checking `table_exists` first.
    fn rows_where(&self, table: &str, column: &str, value: &CellValue) -> Result<Vec<RawRow>>;

    /// Every row of `table`, in staged order.
    ///
    /// # Errors
    /// Fails when the table is not present.
    fn scan(&self, table: &str) -> Result<Vec<RawRow>>;

    /// Physical table names present in the store, sorted
    fn tables(&self) -> Vec<String>;
}
