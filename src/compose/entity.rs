//! Logical entities and the per-subject graph arena.
//!
//! Entities live in one arena per subject; child collections and the
//! identity index hold arena slots, never owning references, so chain
//! resolution can splice result collections without fighting the borrow
//! checker. Serialization walks roots in composition order and nests
//! collections, which keeps repeated projections byte-identical.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::compose::contact::ContactIndex;
use crate::row::{CellValue, RawRow};

/// Graph-wide entity key: logical table plus canonical identifier text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityId {
    /// Logical table the entity came from
    pub table: String,
    /// Canonical identifier text
    pub id: String,
}

impl EntityId {
    /// Create an entity id
    pub fn new<T: Into<String>, I: Into<String>>(table: T, id: I) -> Self {
        Self {
            table: table.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.id)
    }
}

/// A typed cross-reference field on an entity
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceField {
    /// Source column
    pub column: String,
    /// Table the reference points at
    pub target: String,
    /// Referenced identifier as staged
    pub value: CellValue,
    /// Authored semantic of the reference
    pub meaning: String,
}

/// A flat provenance field on an entity; never resolvable
#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceField {
    /// Source column
    pub column: String,
    /// Stamped identifier as staged
    pub value: CellValue,
    /// Authored semantic of the stamp
    pub meaning: String,
}

/// One named, ordered child collection on an entity
#[derive(Debug, Clone)]
pub struct ChildCollection {
    /// Collection name (the declared attachment name)
    pub name: String,
    /// Logical table the members come from
    pub table: String,
    /// Arena slots of the members, in collection order
    pub members: Vec<usize>,
}

/// One composed entity: merged row, collections, typed references
#[derive(Debug, Clone)]
pub struct LogicalEntity {
    /// Logical table
    pub table: String,
    /// Graph-wide key
    pub id: EntityId,
    /// Merged attribute row
    pub row: RawRow,
    /// False when the base split had no row for the identifier
    pub found: bool,
    /// Ordered child collections
    pub children: Vec<ChildCollection>,
    /// Typed cross-reference fields, in authored order
    pub references: Vec<ReferenceField>,
    /// Provenance stamps, in authored order
    pub provenance: Vec<ProvenanceField>,
}

impl LogicalEntity {
    /// Value of a merged column; plain lookup, no guard
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&CellValue> {
        self.row.get(column)
    }

    /// A child collection by its attachment name
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&ChildCollection> {
        self.children.iter().find(|c| c.name == name)
    }

    /// A cross-reference field by source column
    #[must_use]
    pub fn reference(&self, column: &str) -> Option<&ReferenceField> {
        self.references.iter().find(|r| r.column == column)
    }

    /// A provenance field by source column
    #[must_use]
    pub fn provenance_field(&self, column: &str) -> Option<&ProvenanceField> {
        self.provenance.iter().find(|p| p.column == column)
    }
}

/// The composed record graph of one subject
#[derive(Debug, Clone)]
pub struct SubjectGraph {
    /// Subject identifier the graph was projected for
    pub subject: String,
    entities: Vec<LogicalEntity>,
    by_id: FxHashMap<EntityId, usize>,
    roots: Vec<usize>,
}

impl SubjectGraph {
    pub(crate) fn new<S: Into<String>>(subject: S) -> Self {
        Self {
            subject: subject.into(),
            entities: Vec::new(),
            by_id: FxHashMap::default(),
            roots: Vec::new(),
        }
    }

    pub(crate) fn push_entity(&mut self, entity: LogicalEntity) -> usize {
        let slot = self.entities.len();
        self.by_id.entry(entity.id.clone()).or_insert(slot);
        self.entities.push(entity);
        slot
    }

    pub(crate) fn add_root(&mut self, slot: usize) {
        self.roots.push(slot);
    }

    pub(crate) fn entity_at_mut(&mut self, slot: usize) -> &mut LogicalEntity {
        &mut self.entities[slot]
    }

    /// Arena slot of an entity, if composed
    #[must_use]
    pub fn slot(&self, id: &EntityId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Entity by graph key
    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<&LogicalEntity> {
        self.slot(id).map(|i| &self.entities[i])
    }

    /// Entity at an arena slot
    #[must_use]
    pub fn entity_at(&self, slot: usize) -> Option<&LogicalEntity> {
        self.entities.get(slot)
    }

    /// Root entities in composition order
    pub fn roots(&self) -> impl Iterator<Item = &LogicalEntity> {
        self.roots.iter().map(|&i| &self.entities[i])
    }

    /// Every composed entity in arena order
    pub fn entities(&self) -> impl Iterator<Item = &LogicalEntity> {
        self.entities.iter()
    }

    /// Members of a named collection on an entity
    pub fn children<'g>(
        &'g self,
        entity: &'g LogicalEntity,
        name: &str,
    ) -> impl Iterator<Item = &'g LogicalEntity> {
        entity
            .collection(name)
            .into_iter()
            .flat_map(|c| c.members.iter().map(|&i| &self.entities[i]))
    }

    /// Resolve a cross-reference field through the contact index.
    ///
    /// Returns `None` when the field is absent, null, or points outside the
    /// graph; the forward and reverse directions of the index always agree.
    #[must_use]
    pub fn follow_reference(
        &self,
        entity: &LogicalEntity,
        column: &str,
        contacts: &ContactIndex,
    ) -> Option<&LogicalEntity> {
        let reference = entity.reference(column)?;
        if reference.value.is_null() {
            return None;
        }
        let key = reference.value.id_text();
        if let Some(owner) = contacts.owner_of(&key) {
            return self.entity(owner);
        }
        self.entity(&EntityId::new(reference.target.clone(), key))
    }

    /// Number of composed entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing was composed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Serialize for SubjectGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("subject", &self.subject)?;
        map.serialize_entry(
            "entities",
            &SlotSeq {
                graph: self,
                slots: &self.roots,
            },
        )?;
        map.end()
    }
}

struct SlotSeq<'g> {
    graph: &'g SubjectGraph,
    slots: &'g [usize],
}

impl Serialize for SlotSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.slots.len()))?;
        for &slot in self.slots {
            seq.serialize_element(&EntityNode {
                graph: self.graph,
                slot,
            })?;
        }
        seq.end()
    }
}

struct EntityNode<'g> {
    graph: &'g SubjectGraph,
    slot: usize,
}

impl Serialize for EntityNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;
        let entity = self
            .graph
            .entity_at(self.slot)
            .ok_or_else(|| S::Error::custom("dangling entity slot"))?;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("table", &entity.table)?;
        map.serialize_entry("id", &entity.id.id)?;
        map.serialize_entry("found", &entity.found)?;
        map.serialize_entry("row", &entity.row)?;
        if !entity.references.is_empty() {
            map.serialize_entry("references", &entity.references)?;
        }
        if !entity.provenance.is_empty() {
            map.serialize_entry("provenance", &entity.provenance)?;
        }
        for collection in &entity.children {
            map.serialize_entry(
                &collection.name,
                &SlotSeq {
                    graph: self.graph,
                    slots: &collection.members,
                },
            )?;
        }
        map.end()
    }
}
