//! Parquet snapshot staging store.
//!
//! Some sites stage the extract as one Parquet file per physical table
//! instead of raw TSV. Tables are read on first touch and cached; cells are
//! converted to the same staged shapes the TSV loader produces, so the two
//! backends project identical graphs.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, LargeStringArray, StringArray, UInt8Array, UInt16Array, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use futures::{StreamExt, stream};
use itertools::Itertools;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::row::{CellValue, RawRow};
use crate::store::TableStore;

/// Staging store over a directory of `TABLE.parquet` snapshots
#[derive(Debug)]
pub struct ParquetStore {
    dir: PathBuf,
    cache: RwLock<FxHashMap<String, Arc<Vec<RawRow>>>>,
}

impl ParquetStore {
    /// Open a snapshot directory.
    ///
    /// # Errors
    /// Fails when the path does not exist or is not a directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow::anyhow!(
                "snapshot directory does not exist: {}",
                dir.display()
            )
            .into());
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            cache: RwLock::new(FxHashMap::default()),
        })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.parquet"))
    }

    /// Read (or fetch from cache) every staged row of a table
    fn load_table(&self, table: &str) -> Result<Arc<Vec<RawRow>>> {
        if let Some(rows) = self.cache.read().unwrap().get(table) {
            return Ok(Arc::clone(rows));
        }

        let path = self.table_path(table);
        let start = Instant::now();
        log::debug!("Reading staged table {}", path.display());

        let file = File::open(&path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| anyhow::anyhow!("Failed to read parquet file {}: {e}", path.display()))?
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build parquet reader: {e}"))?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| anyhow::anyhow!("Failed to read record batch. Error: {e}"))?;
            batch_into_rows(&batch, &mut rows)?;
        }

        log::debug!(
            "Staged {} rows from {} in {:?}",
            rows.len(),
            path.display(),
            start.elapsed()
        );

        let rows = Arc::new(rows);
        self.cache
            .write()
            .unwrap()
            .insert(table.to_string(), Arc::clone(&rows));
        Ok(rows)
    }

    /// Warm the cache for a set of tables, reading files in parallel
    ///
    /// # Errors
    /// Fails on the first table that cannot be read.
    pub fn preload(&self, tables: &[&str]) -> Result<()> {
        tables
            .par_iter()
            .map(|table| self.load_table(table).map(|_| ()))
            .collect()
    }

    /// Async variant of [`Self::preload`]; file reads run on blocking tasks,
    /// at most one in flight per CPU
    ///
    /// # Errors
    /// Fails on the first table that cannot be read or a panicked task.
    pub async fn preload_async(self: &Arc<Self>, tables: &[&str]) -> Result<()> {
        let joined = stream::iter(tables.iter().map(|table| {
            let store = Arc::clone(self);
            let table = (*table).to_string();
            tokio::task::spawn_blocking(move || store.load_table(&table).map(|_| ()))
        }))
        .buffer_unordered(num_cpus::get())
        .collect::<Vec<_>>()
        .await;

        for result in joined {
            result.map_err(|e| anyhow::anyhow!("preload task failed: {e}"))??;
        }
        Ok(())
    }
}

impl TableStore for ParquetStore {
    fn table_exists(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    fn rows_where(&self, table: &str, column: &str, value: &CellValue) -> Result<Vec<RawRow>> {
        let rows = self.load_table(table)?;
        Ok(rows
            .iter()
            .filter(|row| row.get(column) == Some(value))
            .cloned()
            .collect())
    }

    fn scan(&self, table: &str) -> Result<Vec<RawRow>> {
        Ok(self.load_table(table)?.as_ref().clone())
    }

    fn tables(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let name = path.file_name()?.to_str()?;
                name.strip_suffix(".parquet").map(str::to_string)
            })
            .sorted()
            .collect()
    }
}

/// Append every row of a record batch, converted to staged cell shapes
fn batch_into_rows(batch: &RecordBatch, rows: &mut Vec<RawRow>) -> Result<()> {
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

    for row_idx in 0..batch.num_rows() {
        let mut row = RawRow::with_capacity(names.len());
        for (col_idx, &name) in names.iter().enumerate() {
            let cell = staged_cell(batch.column(col_idx), row_idx, name)?;
            row.insert(name.to_string(), cell);
        }
        rows.push(row);
    }
    Ok(())
}

/// Convert one array slot into its staged value. Numeric families widen to
/// i64/f64, booleans stage as 0/1, dates render as ISO text (timestamps in
/// extracts are text columns), anything else falls back to display text.
fn staged_cell(array: &ArrayRef, row: usize, column: &str) -> Result<CellValue> {
    if array.is_null(row) {
        return Ok(CellValue::Null);
    }

    macro_rules! int_cell {
        ($ty:ty) => {
            downcast::<$ty>(array, column).map(|a| CellValue::Int(i64::from(a.value(row))))
        };
    }

    match array.data_type() {
        DataType::Utf8 => {
            downcast::<StringArray>(array, column).map(|a| CellValue::Text(a.value(row).to_string()))
        }
        DataType::LargeUtf8 => downcast::<LargeStringArray>(array, column)
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::Int64 => downcast::<Int64Array>(array, column).map(|a| CellValue::Int(a.value(row))),
        DataType::Int32 => int_cell!(Int32Array),
        DataType::Int16 => int_cell!(Int16Array),
        DataType::Int8 => int_cell!(Int8Array),
        DataType::UInt8 => int_cell!(UInt8Array),
        DataType::UInt16 => int_cell!(UInt16Array),
        DataType::UInt32 => int_cell!(UInt32Array),
        DataType::UInt64 => downcast::<UInt64Array>(array, column).map(|a| {
            let v = a.value(row);
            i64::try_from(v).map_or_else(|_| CellValue::Text(v.to_string()), CellValue::Int)
        }),
        DataType::Float64 => {
            downcast::<Float64Array>(array, column).map(|a| CellValue::Float(a.value(row)))
        }
        DataType::Float32 => downcast::<Float32Array>(array, column)
            .map(|a| CellValue::Float(f64::from(a.value(row)))),
        DataType::Boolean => downcast::<BooleanArray>(array, column)
            .map(|a| CellValue::Int(i64::from(a.value(row)))),
        DataType::Date32 => downcast::<Date32Array>(array, column).map(|a| {
            a.value_as_date(row).map_or(CellValue::Null, |date| {
                CellValue::Text(date.format("%Y-%m-%d").to_string())
            })
        }),
        _ => {
            let text = array_value_to_string(array, row)
                .map_err(|e| anyhow::anyhow!("Failed to render column {column}: {e}"))?;
            Ok(CellValue::Text(text))
        }
    }
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow::anyhow!("unexpected array layout for column {column}").into())
}
