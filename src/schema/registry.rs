//! Schema registry loaded from the vendor's published table documentation.
//!
//! One JSON document per table (the open.epic.com EHI format): a table
//! description, the documented primary key, and per-column name, type
//! label, and authored description. The registry is the single source of
//! truth for declared columns; the column guard, the typed views, and the
//! mapping catalog all validate against it.

use std::fs;
use std::path::Path;

use anyhow::Context;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::Result;
use crate::schema::types::ColumnType;

/// One documented column
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name as it appears in the extract header
    pub name: String,
    /// Documented type label, normalized
    pub column_type: ColumnType,
    /// Authored description from the vendor documentation
    pub description: String,
}

/// Documented schema of one physical table
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Physical table name
    pub name: String,
    /// Authored table description
    pub description: String,
    /// Documented primary key columns, in key order
    pub primary_key: Vec<String>,
    columns: Vec<ColumnDef>,
    index: FxHashMap<String, usize>,
}

impl TableSchema {
    /// Create a schema from its parts. The first definition wins when a
    /// column name repeats.
    #[must_use]
    pub fn new(
        name: String,
        description: String,
        primary_key: Vec<String>,
        columns: Vec<ColumnDef>,
    ) -> Self {
        let mut index = FxHashMap::default();
        for (i, col) in columns.iter().enumerate() {
            index.entry(col.name.clone()).or_insert(i);
        }
        Self {
            name,
            description,
            primary_key,
            columns,
            index,
        }
    }

    /// Definition of a column, if documented
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// True when the column is documented for this table
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Type of a column; undocumented columns default to `Varchar`, the
    /// same fallback the staging loader uses
    #[must_use]
    pub fn column_type(&self, name: &str) -> ColumnType {
        self.column(name)
            .map_or(ColumnType::Varchar, |c| c.column_type)
    }

    /// All documented columns in declared order
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Documented column names in declared order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// All loaded table schemas, keyed by physical table name
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: FxHashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `TABLE.json` schema in a directory.
    ///
    /// Empty files are skipped (the vendor ships placeholders for some
    /// tables); tables without a schema file simply stay undocumented.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("reading schema directory {}", dir.display()))?;

        let mut skipped_empty = 0usize;
        for entry in entries {
            let path = entry
                .with_context(|| format!("listing schema directory {}", dir.display()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading schema file {}", path.display()))?;
            if raw.trim().is_empty() {
                skipped_empty += 1;
                continue;
            }
            let schema = parse_schema(stem, &raw)
                .with_context(|| format!("parsing schema file {}", path.display()))?;
            registry.insert(schema);
        }

        log::info!(
            "Loaded {} table schemas from {} ({} empty placeholders skipped)",
            registry.len(),
            dir.display(),
            skipped_empty
        );
        Ok(registry)
    }

    /// Parse one schema document for a named table
    pub fn parse_table(name: &str, json: &str) -> Result<TableSchema> {
        Ok(parse_schema(name, json)?)
    }

    /// Add or replace a table schema
    pub fn insert(&mut self, schema: TableSchema) {
        self.tables.insert(schema.name.clone(), schema);
    }

    /// Schema of a physical table
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(table)
    }

    /// True when the table has a loaded schema
    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Number of loaded schemas
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no schemas are loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Loaded table names, sorted
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).sorted().collect()
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    description: String,
    #[serde(default, rename = "primaryKey")]
    primary_key: Vec<PrimaryKeyEntry>,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
struct PrimaryKeyEntry {
    #[serde(rename = "columnName")]
    column_name: String,
}

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    name: String,
    #[serde(default, rename = "type")]
    type_label: String,
    #[serde(default)]
    description: String,
}

fn parse_schema(name: &str, json: &str) -> serde_json::Result<TableSchema> {
    let file: SchemaFile = serde_json::from_str(json)?;
    let columns = file
        .columns
        .into_iter()
        .map(|c| ColumnDef {
            name: c.name,
            column_type: ColumnType::parse(&c.type_label),
            description: c.description,
        })
        .collect();
    Ok(TableSchema::new(
        name.to_string(),
        file.description,
        file.primary_key.into_iter().map(|p| p.column_name).collect(),
        columns,
    ))
}
