//! Relationship classification for identifier-bearing columns.
//!
//! Two columns with near-identical names can mean opposite things: one
//! table's contact serial number marks ownership, another's marks only that
//! a contact touched the row in passing. The distinction is authored here,
//! per exact table and column, and looked up verbatim at runtime. Nothing
//! is ever derived from column name patterns.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

/// What an identifier column means on its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// The row belongs to the target entity and nests under it
    StructuralChild,
    /// The row points at the target entity; stored as a typed field,
    /// resolvable through the graph, never nested
    CrossReference,
    /// The target touched this row in passing; flat metadata, no accessor
    ProvenanceStamp,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StructuralChild => "structural_child",
            Self::CrossReference => "cross_reference",
            Self::ProvenanceStamp => "provenance_stamp",
        };
        write!(f, "{name}")
    }
}

/// Authored meaning of one identifier column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// Table owning the column
    pub table: String,
    /// The identifier column
    pub column: String,
    /// How the engine treats the relationship
    pub kind: RelationshipKind,
    /// Table the identifier points at
    pub target: String,
    /// Authored semantic, taken from the vendor's column description
    pub meaning: String,
}

/// All authored relationship specs, indexed by (table, column)
#[derive(Debug, Clone, Default)]
pub struct RelationshipCatalog {
    specs: Vec<RelationshipSpec>,
    by_column: FxHashMap<(String, String), usize>,
    by_table: FxHashMap<String, Vec<usize>>,
}

impl RelationshipCatalog {
    /// Build the catalog from authored specs.
    ///
    /// # Errors
    /// Fails when a (table, column) pair is declared twice; exactly one
    /// classification per column is the whole point.
    pub fn from_specs(specs: Vec<RelationshipSpec>) -> Result<Self> {
        let mut catalog = Self::default();
        for spec in specs {
            let key = (spec.table.clone(), spec.column.clone());
            if catalog.by_column.contains_key(&key) {
                return Err(ProjectionError::InvalidCatalog(format!(
                    "relationship for {}.{} declared twice",
                    spec.table, spec.column
                )));
            }
            let idx = catalog.specs.len();
            catalog.by_column.insert(key, idx);
            catalog
                .by_table
                .entry(spec.table.clone())
                .or_default()
                .push(idx);
            catalog.specs.push(spec);
        }
        Ok(catalog)
    }

    /// The authored spec for a column, if any
    #[must_use]
    pub fn get(&self, table: &str, column: &str) -> Option<&RelationshipSpec> {
        self.by_column
            .get(&(table.to_string(), column.to_string()))
            .map(|&i| &self.specs[i])
    }

    /// Classify an identifier column.
    ///
    /// # Errors
    /// `UnclassifiedColumn` when no spec covers the column; a
    /// configuration error for the owning table.
    pub fn classify(&self, table: &str, column: &str) -> Result<&RelationshipSpec> {
        self.get(table, column)
            .ok_or_else(|| ProjectionError::UnclassifiedColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    /// Specs for one table, in authored order
    pub fn for_table(&self, table: &str) -> impl Iterator<Item = &RelationshipSpec> {
        self.by_table
            .get(table)
            .into_iter()
            .flatten()
            .map(|&i| &self.specs[i])
    }

    /// Every spec, in authored order
    pub fn iter(&self) -> impl Iterator<Item = &RelationshipSpec> {
        self.specs.iter()
    }

    /// Number of authored specs
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True when no specs are authored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
