//! Static mapping configuration.
//!
//! Everything the engine knows about table shapes it knows from here:
//! split groups, per-table identity and scoping, child attachments,
//! relationship classifications, bridge joins, parent-order chains, and
//! field-mapping manifests. The catalog is plain serde data, versioned
//! alongside the schema registry snapshot it was authored against, and is
//! validated against that registry at load time.

pub mod builtin;
pub mod manifest;
pub mod relation;
pub mod split;

pub use manifest::{Manifest, ManifestCheck, MappedColumn, SkippedColumn};
pub use relation::{RelationshipCatalog, RelationshipKind, RelationshipSpec};
pub use split::{IdTransform, SplitCatalog, SplitGroup, SplitTable};

use std::path::Path;

use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::schema::SchemaRegistry;

/// A child table attached under a parent entity as an ordered collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSpec {
    /// Logical child table
    pub table: String,
    /// Column on the child holding the parent identifier
    pub foreign_key: String,
    /// Collection name on the parent entity
    pub attach_as: String,
    /// Sequence column that orders the collection; staged order when absent
    #[serde(default)]
    pub order_by: Option<String>,
}

/// Per-table composition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Logical table name
    pub table: String,
    /// Column holding the entity identifier; absent for line-keyed tables
    #[serde(default)]
    pub identity_column: Option<String>,
    /// Column holding the subject identifier, for directly scoped tables
    #[serde(default)]
    pub subject_column: Option<String>,
    /// True when this table's identity IS a contact serial number
    #[serde(default)]
    pub contact_identity: bool,
    /// True when the table's entities sit at the top of the subject graph
    #[serde(default)]
    pub root: bool,
    /// Child collections, in attachment order
    #[serde(default)]
    pub children: Vec<ChildSpec>,
}

/// Bridge declaration for tables with no subject column of their own
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSpec {
    /// Table being scoped
    pub entity_table: String,
    /// Bridge table holding both identifiers
    pub bridge_table: String,
    /// Column naming the entity on the bridge and on the entity table
    pub entity_column: String,
    /// Column naming the subject on the bridge
    pub subject_column: String,
}

/// Parent-order chain declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Table whose rows chain to parents (the order table)
    pub table: String,
    /// Link table mapping child identifiers to parent identifiers
    pub link_table: String,
    /// Link column holding the child identifier
    pub child_column: String,
    /// Link column holding the parent identifier
    pub parent_column: String,
    /// The collection on the parent that resolved results merge into
    pub results_attach_as: String,
}

/// Heuristic history-linkage settings for one history-shaped table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySpec {
    /// The history-shaped table
    pub table: String,
    /// Authoritative link column naming the documented clinical encounter
    pub link_column: String,
    /// Column naming the contact the history row was recorded during
    pub recorded_column: String,
    /// Date column on the contact table, for same-day matching
    pub contact_date_column: String,
    /// Provider column on the contact table, for same-provider matching
    pub contact_provider_column: String,
}

/// Wire form of the catalog; one JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDoc {
    /// Split group declarations
    #[serde(default)]
    pub splits: Vec<SplitGroup>,
    /// Per-table composition settings, in graph output order
    #[serde(default)]
    pub tables: Vec<TableSpec>,
    /// Relationship classifications
    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,
    /// Bridge declarations
    #[serde(default)]
    pub bridges: Vec<BridgeSpec>,
    /// Parent-order chain declarations
    #[serde(default)]
    pub chains: Vec<ChainSpec>,
    /// Field-mapping manifests
    #[serde(default)]
    pub manifests: Vec<Manifest>,
    /// Heuristic history-linkage settings
    #[serde(default)]
    pub history: Vec<HistorySpec>,
    /// Extra computed column names the column guard should allow
    #[serde(default)]
    pub synthetic_columns: Vec<String>,
}

/// The loaded, indexed mapping catalog
#[derive(Debug, Clone)]
pub struct MappingCatalog {
    splits: SplitCatalog,
    tables: Vec<TableSpec>,
    table_index: FxHashMap<String, usize>,
    relationships: RelationshipCatalog,
    bridges: FxHashMap<String, BridgeSpec>,
    chains: FxHashMap<String, ChainSpec>,
    manifests: Vec<Manifest>,
    manifest_index: FxHashMap<String, usize>,
    history: FxHashMap<String, HistorySpec>,
    synthetic_columns: Vec<String>,
}

impl MappingCatalog {
    /// Index a catalog document.
    ///
    /// # Errors
    /// Fails on duplicate declarations (tables, splits, relationships,
    /// bridges, chains, manifests, history).
    pub fn from_doc(doc: CatalogDoc) -> Result<Self> {
        let splits = SplitCatalog::from_groups(doc.splits)?;
        let relationships = RelationshipCatalog::from_specs(doc.relationships)?;

        let mut table_index = FxHashMap::default();
        for (i, spec) in doc.tables.iter().enumerate() {
            if table_index.insert(spec.table.clone(), i).is_some() {
                return Err(ProjectionError::InvalidCatalog(format!(
                    "table '{}' declared twice",
                    spec.table
                )));
            }
        }

        let mut bridges = FxHashMap::default();
        for bridge in doc.bridges {
            if bridges
                .insert(bridge.entity_table.clone(), bridge)
                .is_some()
            {
                return Err(ProjectionError::InvalidCatalog(
                    "duplicate bridge declaration".to_string(),
                ));
            }
        }

        let mut chains = FxHashMap::default();
        for chain in doc.chains {
            if chains.insert(chain.table.clone(), chain).is_some() {
                return Err(ProjectionError::InvalidCatalog(
                    "duplicate chain declaration".to_string(),
                ));
            }
        }

        let mut manifest_index = FxHashMap::default();
        for (i, manifest) in doc.manifests.iter().enumerate() {
            if manifest_index.insert(manifest.table.clone(), i).is_some() {
                return Err(ProjectionError::InvalidCatalog(format!(
                    "manifest for '{}' declared twice",
                    manifest.table
                )));
            }
        }

        let mut history = FxHashMap::default();
        for spec in doc.history {
            if history.insert(spec.table.clone(), spec).is_some() {
                return Err(ProjectionError::InvalidCatalog(
                    "duplicate history declaration".to_string(),
                ));
            }
        }

        Ok(Self {
            splits,
            tables: doc.tables,
            table_index,
            relationships,
            bridges,
            chains,
            manifests: doc.manifests,
            manifest_index,
            history,
            synthetic_columns: doc.synthetic_columns,
        })
    }

    /// Parse a catalog from its JSON document form
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: CatalogDoc = serde_json::from_str(json)?;
        Self::from_doc(doc)
    }

    /// Load a catalog JSON file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading mapping catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded mapping catalog from {}: {} tables, {} relationships",
            path.display(),
            catalog.tables.len(),
            catalog.relationships.len()
        );
        Ok(catalog)
    }

    /// Composition settings for a logical table
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.table_index.get(name).map(|&i| &self.tables[i])
    }

    /// Every declared table, in declaration order
    #[must_use]
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Root tables in declaration order; this order fixes graph output order
    pub fn root_tables(&self) -> impl Iterator<Item = &TableSpec> {
        self.tables.iter().filter(|t| t.root)
    }

    /// Child declarations of a table, empty when none
    #[must_use]
    pub fn children_of(&self, table: &str) -> &[ChildSpec] {
        self.table(table).map_or(&[], |t| t.children.as_slice())
    }

    /// The split catalog
    #[must_use]
    pub fn splits(&self) -> &SplitCatalog {
        &self.splits
    }

    /// The relationship catalog
    #[must_use]
    pub fn relationships(&self) -> &RelationshipCatalog {
        &self.relationships
    }

    /// Bridge declaration scoping a table, if any
    #[must_use]
    pub fn bridge(&self, entity_table: &str) -> Option<&BridgeSpec> {
        self.bridges.get(entity_table)
    }

    /// Chain declaration for a table, if any
    #[must_use]
    pub fn chain(&self, table: &str) -> Option<&ChainSpec> {
        self.chains.get(table)
    }

    /// Chain declarations in table declaration order
    pub fn chain_specs(&self) -> impl Iterator<Item = &ChainSpec> {
        self.tables
            .iter()
            .filter_map(|spec| self.chains.get(&spec.table))
    }

    /// Manifest covering a physical table, if any
    #[must_use]
    pub fn manifest(&self, table: &str) -> Option<&Manifest> {
        self.manifest_index.get(table).map(|&i| &self.manifests[i])
    }

    /// Every manifest, in declaration order
    #[must_use]
    pub fn manifests(&self) -> &[Manifest] {
        &self.manifests
    }

    /// History-linkage settings for a table, if any
    #[must_use]
    pub fn history(&self, table: &str) -> Option<&HistorySpec> {
        self.history.get(table)
    }

    /// History-linkage settings in table declaration order
    pub fn history_specs(&self) -> impl Iterator<Item = &HistorySpec> {
        self.tables
            .iter()
            .filter_map(|spec| self.history.get(&spec.table))
    }

    /// Configured synthetic column names
    #[must_use]
    pub fn synthetic_columns(&self) -> &[String] {
        &self.synthetic_columns
    }

    /// Every collection name entities can carry (child attachments plus
    /// chain result targets); these are guard-exempt synthetic names
    pub fn attach_names(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .flat_map(|t| t.children.iter().map(|c| c.attach_as.as_str()))
    }

    /// Check the catalog against a schema registry snapshot.
    ///
    /// Collects every inconsistency instead of stopping at the first, so
    /// one validation run gives the complete repair list.
    ///
    /// # Errors
    /// `InvalidCatalog` naming every violated declaration.
    pub fn validate(&self, registry: &SchemaRegistry) -> Result<()> {
        let mut violations: Vec<String> = Vec::new();

        for group in self.splits.iter() {
            for split in &group.splits {
                match registry.get(&split.table) {
                    None => violations.push(format!(
                        "split table {} of '{}' has no schema",
                        split.table, group.logical
                    )),
                    Some(schema) if !schema.has_column(&split.join_column) => {
                        violations.push(format!(
                            "split table {} does not document join column {}",
                            split.table, split.join_column
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        for spec in &self.tables {
            self.validate_table(spec, registry, &mut violations);
        }

        for spec in self.relationships.iter() {
            match registry.get(&spec.table) {
                None => violations.push(format!(
                    "relationship {}.{} names a table with no schema",
                    spec.table, spec.column
                )),
                Some(schema) if !schema.has_column(&spec.column) => violations.push(format!(
                    "relationship {}.{} names an undocumented column",
                    spec.table, spec.column
                )),
                Some(_) => {}
            }
            if spec.meaning.trim().is_empty() {
                violations.push(format!(
                    "relationship {}.{} has no authored meaning",
                    spec.table, spec.column
                ));
            }
            if !self.splits.contains(&spec.target) && !registry.contains(&spec.target) {
                violations.push(format!(
                    "relationship {}.{} targets unknown table {}",
                    spec.table, spec.column, spec.target
                ));
            }
        }

        for bridge in self.bridges.values() {
            if let Some(schema) = registry.get(&bridge.bridge_table) {
                for column in [&bridge.entity_column, &bridge.subject_column] {
                    if !schema.has_column(column) {
                        violations.push(format!(
                            "bridge table {} does not document column {}",
                            bridge.bridge_table, column
                        ));
                    }
                }
            } else {
                violations.push(format!(
                    "bridge table {} has no schema",
                    bridge.bridge_table
                ));
            }
            if !self.splits.contains(&bridge.entity_table) {
                violations.push(format!(
                    "bridge scopes undeclared table {}",
                    bridge.entity_table
                ));
            }
        }

        for chain in self.chains.values() {
            if self
                .table(&chain.table)
                .is_none_or(|t| t.identity_column.is_none())
            {
                violations.push(format!(
                    "chain table {} needs a declared identity column",
                    chain.table
                ));
            }
            match registry.get(&chain.link_table) {
                None => violations.push(format!(
                    "chain link table {} has no schema",
                    chain.link_table
                )),
                Some(schema) => {
                    for column in [&chain.child_column, &chain.parent_column] {
                        if !schema.has_column(column) {
                            violations.push(format!(
                                "chain link table {} does not document column {}",
                                chain.link_table, column
                            ));
                        }
                    }
                }
            }
            let has_target_collection = self
                .children_of(&chain.table)
                .iter()
                .any(|c| c.attach_as == chain.results_attach_as);
            if !has_target_collection {
                violations.push(format!(
                    "chain on {} targets collection '{}' which no child declares",
                    chain.table, chain.results_attach_as
                ));
            }
        }

        for spec in self.history.values() {
            for column in [&spec.recorded_column, &spec.link_column] {
                match self.relationships.get(&spec.table, column) {
                    Some(rel) if rel.kind == RelationshipKind::CrossReference => {}
                    _ => violations.push(format!(
                        "history column {}.{} must be a classified cross_reference",
                        spec.table, column
                    )),
                }
            }
            if let Some(rel) = self.relationships.get(&spec.table, &spec.link_column) {
                if let Some(schema) = registry.get(&rel.target) {
                    for column in [&spec.contact_date_column, &spec.contact_provider_column] {
                        if !schema.has_column(column) {
                            violations.push(format!(
                                "history matching column {} undocumented on {}",
                                column, rel.target
                            ));
                        }
                    }
                }
            }
        }

        if violations.is_empty() {
            log::info!(
                "Mapping catalog validated against {} table schemas",
                registry.len()
            );
            Ok(())
        } else {
            Err(ProjectionError::InvalidCatalog(violations.join("; ")))
        }
    }

    fn validate_table(
        &self,
        spec: &TableSpec,
        registry: &SchemaRegistry,
        violations: &mut Vec<String>,
    ) {
        let Ok(group) = self.splits.resolve(&spec.table) else {
            violations.push(format!("table {} has no split group", spec.table));
            return;
        };
        let base_schema = registry.get(&group.base().table);

        for column in [&spec.identity_column, &spec.subject_column]
            .into_iter()
            .flatten()
        {
            if base_schema.is_some_and(|s| !s.has_column(column)) {
                violations.push(format!(
                    "table {} declares undocumented column {}",
                    spec.table, column
                ));
            }
        }

        if spec.root && spec.subject_column.is_none() && !self.bridges.contains_key(&spec.table) {
            violations.push(format!(
                "root table {} has neither subject column nor bridge",
                spec.table
            ));
        }

        for child in &spec.children {
            let Ok(child_group) = self.splits.resolve(&child.table) else {
                violations.push(format!(
                    "child table {} of {} has no split group",
                    child.table, spec.table
                ));
                continue;
            };
            if let Some(schema) = registry.get(&child_group.base().table) {
                if !schema.has_column(&child.foreign_key) {
                    violations.push(format!(
                        "child {} does not document foreign key {}",
                        child.table, child.foreign_key
                    ));
                }
                if let Some(order_by) = &child.order_by {
                    if !schema.has_column(order_by) {
                        violations.push(format!(
                            "child {} does not document sequence column {}",
                            child.table, order_by
                        ));
                    }
                }
            }
            let classified_as_child = self
                .relationships
                .get(&child.table, &child.foreign_key)
                .is_some_and(|r| r.kind == RelationshipKind::StructuralChild);
            if !classified_as_child {
                violations.push(format!(
                    "child key {}.{} lacks a structural_child classification",
                    child.table, child.foreign_key
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry.insert(
            SchemaRegistry::parse_table(
                "HNO_INFO",
                r#"{"columns": [
                    {"name": "NOTE_ID", "type": "NUMERIC"},
                    {"name": "PAT_ENC_CSN_ID", "type": "NUMERIC"}
                ]}"#,
            )
            .unwrap(),
        );
        registry.insert(
            SchemaRegistry::parse_table(
                "PAT_ENC",
                r#"{"columns": [{"name": "PAT_ENC_CSN_ID", "type": "NUMERIC"}]}"#,
            )
            .unwrap(),
        );
        registry
    }

    fn note_catalog(column: &str, meaning: &str) -> MappingCatalog {
        MappingCatalog::from_json_str(&format!(
            r#"{{
                "splits": [
                    {{"logical": "HNO_INFO",
                      "splits": [{{"table": "HNO_INFO", "join_column": "NOTE_ID"}}]}}
                ],
                "relationships": [
                    {{"table": "HNO_INFO", "column": "{column}",
                      "kind": "cross_reference", "target": "PAT_ENC",
                      "meaning": "{meaning}"}}
                ]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_documented_catalog_validates() {
        let catalog = note_catalog("PAT_ENC_CSN_ID", "the note's documenting encounter");
        assert!(catalog.validate(&note_registry()).is_ok());
    }

    #[test]
    fn test_undocumented_relationship_column_is_named() {
        let catalog = note_catalog("UNKNOWN_COL", "mystery pointer");
        let err = catalog.validate(&note_registry()).unwrap_err();
        assert!(err.to_string().contains("HNO_INFO.UNKNOWN_COL"));
    }

    #[test]
    fn test_blank_meaning_is_rejected() {
        let catalog = note_catalog("PAT_ENC_CSN_ID", "  ");
        let err = catalog.validate(&note_registry()).unwrap_err();
        assert!(err.to_string().contains("no authored meaning"));
    }
}
