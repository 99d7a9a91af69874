//! In-memory record store.
//!
//! The authoritative store for position records, keyed by (symbol, side).
//! Records are handed out as `Arc<tokio::sync::Mutex<_>>` handles so every
//! mutation, from whichever task, is serialized behind the record's own
//! lock. Slots are created on demand and never removed; a finished
//! lifecycle resets the record in place.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::debug;

use rung_domain::{PositionRecord, Side, Symbol, SymbolSpec};

/// Shared handle to one position record.
pub type RecordHandle = Arc<Mutex<PositionRecord>>;

/// Identity of a position slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Symbol of the slot
    pub symbol: Symbol,
    /// Position direction of the slot
    pub side: Side,
}

impl RecordKey {
    /// Create a key.
    pub fn new(symbol: Symbol, side: Side) -> Self {
        Self { symbol, side }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.side)
    }
}

/// In-memory store of position records.
#[derive(Default)]
pub struct RecordStore {
    records: RwLock<HashMap<RecordKey, RecordHandle>>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle for a slot, creating an idle record if the slot does
    /// not exist yet.
    pub fn ensure(&self, symbol: Symbol, side: Side, spec: &SymbolSpec) -> RecordHandle {
        let key = RecordKey::new(symbol.clone(), side);
        if let Some(handle) = self.records.read().unwrap().get(&key) {
            return handle.clone();
        }

        let mut records = self.records.write().unwrap();
        records
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(%key, "Created position slot");
                Arc::new(Mutex::new(PositionRecord::new(symbol, side, spec.clone())))
            })
            .clone()
    }

    /// Get the handle for an existing slot.
    pub fn get(&self, key: &RecordKey) -> Option<RecordHandle> {
        self.records.read().unwrap().get(key).cloned()
    }

    /// Snapshot of every slot and its handle.
    pub fn handles(&self) -> Vec<(RecordKey, RecordHandle)> {
        self.records
            .read()
            .unwrap()
            .iter()
            .map(|(key, handle)| (key.clone(), handle.clone()))
            .collect()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// True when no slots exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every slot. Test helper.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
