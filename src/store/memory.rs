//! In-memory staging store with TSV extract loading.
//!
//! The vendor ships one tab-separated file per physical table. Loading
//! coerces every cell against the schema registry's documented column type,
//! so a table with no schema file stages as plain text, exactly like the
//! SQLite staging loader behaves.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use indicatif::ParallelProgressIterator;
use itertools::Itertools;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{ProjectionError, Result};
use crate::row::{CellValue, RawRow};
use crate::schema::{ColumnType, SchemaRegistry, coerce};
use crate::store::TableStore;
use crate::utils::progress::create_load_progress_bar;

/// Staging store backed by plain maps; the workhorse for tests and for
/// extracts small enough to hold resident
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: FxHashMap<String, Vec<RawRow>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its rows, replacing any previous contents
    pub fn insert_table<S: Into<String>>(&mut self, table: S, rows: Vec<RawRow>) {
        self.tables.insert(table.into(), rows);
    }

    /// Append one row to a table, creating the table if needed
    pub fn insert_row<S: Into<String>>(&mut self, table: S, row: RawRow) {
        self.tables.entry(table.into()).or_default().push(row);
    }

    /// Builder-style `insert_table`, for fixture construction
    #[must_use]
    pub fn with_table<S: Into<String>>(mut self, table: S, rows: Vec<RawRow>) -> Self {
        self.insert_table(table, rows);
        self
    }

    /// Number of staged rows in a table, 0 when absent
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, Vec::len)
    }

    /// Load every `TABLE.tsv` in a directory, coercing cells by the
    /// registry's documented column types.
    ///
    /// Files are loaded in parallel but staged in sorted name order, so two
    /// loads of the same extract produce identical stores. Empty files are
    /// skipped with a warning.
    ///
    /// # Errors
    /// Fails when the directory cannot be listed or a file cannot be read.
    pub fn load_tsv_dir<P: AsRef<Path>>(dir: P, registry: &SchemaRegistry) -> Result<Self> {
        let dir = dir.as_ref();
        let start = Instant::now();
        log::info!("Loading TSV extract from {}", dir.display());

        let mut files: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("reading extract directory {}", dir.display()))?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let name = path.file_name()?.to_str()?;
                name.strip_suffix(".tsv")
                    .map(|table| (table.to_string(), path.clone()))
            })
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let bar = create_load_progress_bar(files.len() as u64, "Loading extract tables");
        let loaded: Vec<(String, Option<Vec<RawRow>>)> = files
            .par_iter()
            .progress_with(bar)
            .map(|(table, path)| {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading extract file {}", path.display()))?;
                Ok((table.clone(), parse_tsv(table, &raw, registry)))
            })
            .collect::<Result<_>>()?;

        let mut store = Self::new();
        let mut total_rows = 0usize;
        for (table, rows) in loaded {
            match rows {
                Some(rows) => {
                    total_rows += rows.len();
                    store.insert_table(table, rows);
                }
                None => log::warn!("Extract file for {table} is empty, skipping"),
            }
        }

        log::info!(
            "Staged {} rows across {} tables from {} in {:?}",
            total_rows,
            store.tables.len(),
            dir.display(),
            start.elapsed()
        );
        Ok(store)
    }
}

impl TableStore for MemoryStore {
    fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn rows_where(&self, table: &str, column: &str, value: &CellValue) -> Result<Vec<RawRow>> {
        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| ProjectionError::store(format!("no staged table '{table}'")))?;
        Ok(rows
            .iter()
            .filter(|row| row.get(column) == Some(value))
            .cloned()
            .collect())
    }

    fn scan(&self, table: &str) -> Result<Vec<RawRow>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ProjectionError::store(format!("no staged table '{table}'")))
    }

    fn tables(&self) -> Vec<String> {
        self.tables.keys().cloned().sorted().collect()
    }
}

/// Parse one TSV document into rows. Returns `None` when there is no header
/// line. Cells are coerced by the registry's type for that table and
/// column; rows shorter than the header pad with nulls, extra cells beyond
/// the header are dropped.
fn parse_tsv(table: &str, raw: &str, registry: &SchemaRegistry) -> Option<Vec<RawRow>> {
    let mut lines = raw.lines();
    let header: Vec<&str> = lines
        .next()?
        .split('\t')
        .map(|field| field.trim_end_matches('\r'))
        .collect();
    if header.is_empty() || (header.len() == 1 && header[0].is_empty()) {
        return None;
    }

    let schema = registry.get(table);
    let column_types: Vec<_> = header
        .iter()
        .map(|&name| schema.map_or(ColumnType::Varchar, |s| s.column_type(name)))
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let mut cells = line.split('\t').map(|field| field.trim_end_matches('\r'));
        let mut row = RawRow::with_capacity(header.len());
        for (&name, &column_type) in header.iter().zip(column_types.iter()) {
            let cell = cells
                .next()
                .map_or(CellValue::Null, |value| coerce(value, column_type));
            if !row.insert(name.to_string(), cell) {
                log::debug!("Duplicate header column {name} in {table}, keeping first");
            }
        }
        rows.push(row);
    }
    Some(rows)
}
