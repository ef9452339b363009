//! Read-only symbol-table view (C3).
//!
//! Populated by the (out-of-scope) front-end; the core only ever reads it.
//! Scalars are home-backed at a stable address; arrays expose a base
//! address, the declared starting index the user wrote as the array's
//! lower bound (so that `base + (index - start_index)` is the effective
//! address of an element), and their length in cells, so the symbol table
//! can report the full region an array occupies.

use crate::common::{Id, Map};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarEntry {
    pub address: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayEntry {
    pub base: i64,
    pub start_index: i64,
    /// Number of cells the array occupies, `[base, base + length)`.
    pub length: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    scalars: Map<Id, ScalarEntry>,
    arrays: Map<Id, ArrayEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_scalar(&mut self, name: Id, address: i64) {
        self.scalars.insert(name, ScalarEntry { address });
    }

    pub fn declare_array(&mut self, name: Id, base: i64, start_index: i64, length: i64) {
        self.arrays.insert(
            name,
            ArrayEntry {
                base,
                start_index,
                length,
            },
        );
    }

    pub fn scalar(&self, name: Id) -> Option<ScalarEntry> {
        self.scalars.get(&name).copied()
    }

    pub fn array(&self, name: Id) -> Option<ArrayEntry> {
        self.arrays.get(&name).copied()
    }

    /// The lowest address this table has already assigned, so the
    /// descriptor engine can pick a disjoint region for temporaries' homes
    /// that never overlaps a scalar's home or any cell of a declared array.
    pub fn next_free_address(&self) -> i64 {
        let scalar_hi = self.scalars.values().map(|e| e.address + 1).max();
        let array_hi = self.arrays.values().map(|e| e.base + e.length).max();
        scalar_hi.into_iter().chain(array_hi).max().unwrap_or(0)
    }
}
