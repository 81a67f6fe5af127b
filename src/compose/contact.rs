//! Contact identity index and heuristic history linkage.
//!
//! A contact identifier can mean four different things depending on the
//! column holding it: ownership (structural child), self identity,
//! provenance, or a clinical cross-reference. This module covers the
//! identity case: one index from contact identifier to the entity that IS
//! that contact. Accessors take the index as an explicit parameter; there
//! is no ambient lookup state. The full contact table mixes clinical
//! visits, administrative contacts, and history-review contacts, so the
//! index never assumes a single authoritative visit source.

use rustc_hash::FxHashMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::compose::entity::{EntityId, LogicalEntity, SubjectGraph};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::mapping::MappingCatalog;
use crate::row::CellValue;
use crate::schema::parse_date;

/// Basis label carried by every heuristic link
pub const HEURISTIC_BASIS: &str = "same-day-provider";

/// Per-subject contact identity index.
///
/// Generic entity lookups go through [`SubjectGraph::entity`]; this index
/// adds the contact-specific directions: which entity owns a contact
/// identifier, and which entities reference it.
#[derive(Debug, Clone, Default)]
pub struct ContactIndex {
    identities: FxHashMap<String, EntityId>,
    incoming: FxHashMap<String, Vec<(EntityId, String)>>,
}

impl ContactIndex {
    /// Build the index for one composed graph.
    ///
    /// Entities of tables declared as contact identities are indexed under
    /// their own identifier; every non-null cross-reference feeds the
    /// reverse direction.
    #[must_use]
    pub fn build(graph: &SubjectGraph, catalog: &MappingCatalog) -> Self {
        let mut index = Self::default();
        for entity in graph.entities() {
            let is_identity = catalog
                .table(&entity.table)
                .is_some_and(|spec| spec.contact_identity);
            if is_identity {
                let key = entity.id.id.clone();
                if let Some(existing) = index.identities.get(&key) {
                    log::warn!(
                        "Contact identifier {key} claimed by both {existing} and {}",
                        entity.id
                    );
                } else {
                    index.identities.insert(key, entity.id.clone());
                }
            }
            for reference in &entity.references {
                if reference.value.is_null() {
                    continue;
                }
                index
                    .incoming
                    .entry(reference.value.id_text())
                    .or_default()
                    .push((entity.id.clone(), reference.column.clone()));
            }
        }
        index
    }

    /// Check every cross-reference aimed at a contact-identity table.
    ///
    /// A non-null reference to an identifier this index never saw is an
    /// integrity problem in the extract; it is recorded as a diagnostic and
    /// the reference resolves to absent, never aborting the subject.
    pub fn validate(
        &self,
        graph: &SubjectGraph,
        catalog: &MappingCatalog,
        sink: &mut DiagnosticSink,
    ) {
        for entity in graph.entities() {
            for reference in &entity.references {
                let targets_contact = catalog
                    .table(&reference.target)
                    .is_some_and(|spec| spec.contact_identity);
                if !targets_contact || reference.value.is_null() {
                    continue;
                }
                let key = reference.value.id_text();
                if !self.identities.contains_key(&key) {
                    sink.record(
                        Diagnostic::new(
                            DiagnosticKind::UnresolvedReference,
                            &entity.table,
                            format!("contact {key} referenced by {} is not indexed", entity.id),
                        )
                        .with_column(&reference.column),
                    );
                }
            }
        }
    }

    /// Entity whose identity a contact identifier is, if indexed
    #[must_use]
    pub fn owner_of(&self, contact: &str) -> Option<&EntityId> {
        self.identities.get(contact)
    }

    /// True when a contact identifier is indexed
    #[must_use]
    pub fn contains(&self, contact: &str) -> bool {
        self.identities.contains_key(contact)
    }

    /// Entities referencing a contact identifier, with the source column
    #[must_use]
    pub fn referencing(&self, contact: &str) -> &[(EntityId, String)] {
        self.incoming.get(contact).map_or(&[], Vec::as_slice)
    }

    /// Number of indexed contact identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// True when no contact identities were indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Serialize for ContactIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("identities", &SortedIdentities(&self.identities))?;
        map.serialize_entry("referenced_by", &SortedIncoming(&self.incoming))?;
        map.end()
    }
}

struct SortedIdentities<'a>(&'a FxHashMap<String, EntityId>);

impl Serialize for SortedIdentities<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            map.serialize_entry(key, &self.0[key])?;
        }
        map.end()
    }
}

struct SortedIncoming<'a>(&'a FxHashMap<String, Vec<(EntityId, String)>>);

#[derive(Serialize)]
struct IncomingEntry<'a> {
    table: &'a str,
    id: &'a str,
    column: &'a str,
}

impl Serialize for SortedIncoming<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            let entries: Vec<IncomingEntry<'_>> = self.0[key]
                .iter()
                .map(|(entity, column)| IncomingEntry {
                    table: &entity.table,
                    id: &entity.id,
                    column,
                })
                .collect();
            map.serialize_entry(key, &entries)?;
        }
        map.end()
    }
}

/// One derived same-day/provider pairing; never authoritative
#[derive(Debug, Clone, Serialize)]
pub struct HeuristicLink {
    /// The history row the pairing was derived for
    pub history: EntityId,
    /// The zero-content contact the history row was recorded during
    pub review_contact: EntityId,
    /// The clinical contact matched by date and provider
    pub clinical_contact: EntityId,
    /// How the pairing was derived
    pub basis: &'static str,
}

/// Derive labeled history-to-visit pairings for rows whose authoritative
/// link column is empty.
///
/// A pairing is produced only when the recording contact carries no
/// clinical content and exactly one other contact shares its date and
/// provider. Ambiguity yields nothing; the authoritative link column always
/// wins when populated.
#[must_use]
pub fn heuristic_history_links(
    graph: &SubjectGraph,
    catalog: &MappingCatalog,
    contacts: &ContactIndex,
) -> Vec<HeuristicLink> {
    let mut links = Vec::new();
    for spec in catalog.history_specs() {
        let Some(target) = catalog
            .relationships()
            .get(&spec.table, &spec.link_column)
            .map(|rel| rel.target.clone())
        else {
            continue;
        };
        for entity in graph.entities().filter(|e| e.table == spec.table) {
            if entity
                .reference(&spec.link_column)
                .is_some_and(|r| !r.value.is_null())
            {
                continue;
            }
            let Some(recorded) = entity.reference(&spec.recorded_column) else {
                continue;
            };
            if recorded.value.is_null() {
                continue;
            }
            let Some(review_id) = contacts.owner_of(&recorded.value.id_text()) else {
                continue;
            };
            let Some(review) = graph.entity(review_id) else {
                continue;
            };
            if !clinically_empty(review) {
                continue;
            }
            let Some(date) = cell_date(review, &spec.contact_date_column) else {
                continue;
            };
            let Some(provider) = non_null_text(review, &spec.contact_provider_column) else {
                continue;
            };

            let mut candidates = graph.entities().filter(|c| {
                c.table == target
                    && c.id != *review_id
                    && !clinically_empty(c)
                    && cell_date(c, &spec.contact_date_column) == Some(date)
                    && non_null_text(c, &spec.contact_provider_column).as_deref()
                        == Some(provider.as_str())
            });
            let (Some(clinical), None) = (candidates.next(), candidates.next()) else {
                continue;
            };
            links.push(HeuristicLink {
                history: entity.id.clone(),
                review_contact: review_id.clone(),
                clinical_contact: clinical.id.clone(),
                basis: HEURISTIC_BASIS,
            });
        }
    }
    links
}

fn clinically_empty(entity: &LogicalEntity) -> bool {
    entity.children.iter().all(|c| c.members.is_empty())
}

fn cell_date(entity: &LogicalEntity, column: &str) -> Option<chrono::NaiveDate> {
    entity
        .field(column)
        .filter(|v| !v.is_null())
        .and_then(|v| parse_date(&v.id_text()))
}

fn non_null_text(entity: &LogicalEntity, column: &str) -> Option<String> {
    entity
        .field(column)
        .filter(|v| !v.is_null())
        .map(CellValue::id_text)
}
