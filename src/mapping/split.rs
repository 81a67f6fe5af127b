//! Split-table declarations.
//!
//! Wide source tables arrive as several physical tables (`ACCOUNT`,
//! `ACCOUNT_2`, `ACCOUNT_3`). Each split names its own join column because
//! the key drifts across splits (`ACCOUNT_2` exposes `ACCT_ID` for the same
//! identifier `ACCOUNT` calls `ACCOUNT_ID`). Nothing here guesses: an
//! undeclared logical table is a configuration error.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::row::CellValue;

/// How an identifier value is shaped before querying one split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdTransform {
    /// Use the identifier as staged
    #[default]
    Identity,
    /// Render the identifier as text (splits that store numeric keys in
    /// VARCHAR columns)
    Text,
}

impl IdTransform {
    /// Apply the transform to an identifier value
    #[must_use]
    pub fn apply(self, id: &CellValue) -> CellValue {
        match self {
            Self::Identity => id.clone(),
            Self::Text => CellValue::Text(id.id_text()),
        }
    }
}

/// One physical split of a logical table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitTable {
    /// Physical table name in the store
    pub table: String,
    /// Column this split keys rows by
    pub join_column: String,
    /// Identifier shaping for this split's join column
    #[serde(default)]
    pub transform: IdTransform,
}

/// Ordered physical splits of one logical table; the first entry is the
/// base table that defines row existence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitGroup {
    /// Logical table name the engine addresses
    pub logical: String,
    /// Physical splits in merge order
    pub splits: Vec<SplitTable>,
}

impl SplitGroup {
    /// Declare a logical table backed by one physical table
    pub fn single<T: Into<String>, C: Into<String>>(logical: T, join_column: C) -> Self {
        let logical = logical.into();
        Self {
            splits: vec![SplitTable {
                table: logical.clone(),
                join_column: join_column.into(),
                transform: IdTransform::default(),
            }],
            logical,
        }
    }

    /// The base split that defines whether a logical row exists
    #[must_use]
    pub fn base(&self) -> &SplitTable {
        &self.splits[0]
    }
}

/// All declared split groups, keyed by logical table name
#[derive(Debug, Clone, Default)]
pub struct SplitCatalog {
    groups: FxHashMap<String, usize>,
    ordered: Vec<SplitGroup>,
}

impl SplitCatalog {
    /// Build the catalog from declarations.
    ///
    /// # Errors
    /// Fails when a logical table is declared twice or a group has no
    /// splits.
    pub fn from_groups(groups: Vec<SplitGroup>) -> Result<Self> {
        let mut catalog = Self::default();
        for group in groups {
            if group.splits.is_empty() {
                return Err(ProjectionError::InvalidCatalog(format!(
                    "split group '{}' declares no physical tables",
                    group.logical
                )));
            }
            if catalog.groups.contains_key(&group.logical) {
                return Err(ProjectionError::InvalidCatalog(format!(
                    "split group '{}' declared twice",
                    group.logical
                )));
            }
            catalog
                .groups
                .insert(group.logical.clone(), catalog.ordered.len());
            catalog.ordered.push(group);
        }
        Ok(catalog)
    }

    /// Resolve a logical table to its declared splits.
    ///
    /// # Errors
    /// `UnknownSplitGroup` when the table is undeclared; fatal for that
    /// table's projection, isolated from other tables.
    pub fn resolve(&self, logical: &str) -> Result<&SplitGroup> {
        self.groups
            .get(logical)
            .map(|&i| &self.ordered[i])
            .ok_or_else(|| ProjectionError::UnknownSplitGroup(logical.to_string()))
    }

    /// True when the logical table is declared
    #[must_use]
    pub fn contains(&self, logical: &str) -> bool {
        self.groups.contains_key(logical)
    }

    /// Declared groups in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &SplitGroup> {
        self.ordered.iter()
    }
}
