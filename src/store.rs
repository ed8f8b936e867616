// src/store.rs
//
// The engine never writes anywhere. Accepting a merge or deleting a record is
// the caller's job; `RecordStore` is the seam a caller's persistence layer
// implements, and `InMemoryStore` is the reference implementation used by the
// batch binary and the tests.

use log::{debug, info};

use crate::error::{DedupeError, DedupeResult};
use crate::models::{EntityId, EntityRecord, MergeDecision};

pub trait RecordStore {
    fn get(&self, id: &EntityId) -> Option<EntityRecord>;

    /// Inserts or replaces the record with the same id.
    fn upsert(&mut self, record: EntityRecord) -> DedupeResult<()>;

    fn remove(&mut self, id: &EntityId) -> DedupeResult<EntityRecord>;

    fn all(&self) -> Vec<EntityRecord>;

    fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }
}

/// Writes the canonical record and retires the other members. Every retired
/// id is checked first, so a missing record leaves the store untouched.
pub fn apply_merge<S: RecordStore + ?Sized>(store: &mut S, decision: &MergeDecision) -> DedupeResult<()> {
    if let Some(missing) = decision.retired_ids.iter().find(|id| !store.contains(id)) {
        return Err(DedupeError::RecordNotFound(missing.clone()));
    }

    store.upsert(decision.canonical.clone())?;
    for id in &decision.retired_ids {
        store.remove(id)?;
    }

    info!(
        "Merged {} records into {}",
        decision.retired_ids.len() + 1,
        decision.canonical.id
    );
    Ok(())
}

pub fn apply_delete<S: RecordStore + ?Sized>(store: &mut S, id: &EntityId) -> DedupeResult<EntityRecord> {
    let removed = store.remove(id)?;
    debug!("Deleted record {}", id);
    Ok(removed)
}

/// Insertion-ordered store backed by a `Vec`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Vec<EntityRecord>,
}

impl InMemoryStore {
    pub fn new(records: Vec<EntityRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }
}

impl RecordStore for InMemoryStore {
    fn get(&self, id: &EntityId) -> Option<EntityRecord> {
        self.position(id).map(|i| self.records[i].clone())
    }

    fn upsert(&mut self, record: EntityRecord) -> DedupeResult<()> {
        match self.position(&record.id) {
            Some(i) => self.records[i] = record,
            None => self.records.push(record),
        }
        Ok(())
    }

    fn remove(&mut self, id: &EntityId) -> DedupeResult<EntityRecord> {
        let i = self
            .position(id)
            .ok_or_else(|| DedupeError::RecordNotFound(id.clone()))?;
        Ok(self.records.remove(i))
    }

    fn all(&self) -> Vec<EntityRecord> {
        self.records.clone()
    }
}
