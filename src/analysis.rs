//! Read-only analysis inputs (spec §6): per-block live-out sets and
//! per-block dominator sets. Computing these is out of scope; the core
//! only consults live-out, and only at block boundaries. Dominators are
//! threaded through the constructor (rather than assigned late, mixin-style,
//! as the source does) so the core never has "not yet initialized" state,
//! and are exposed for future optimizations this spec does not require.

use crate::common::{Map, Set};
use crate::ir::{BlockId, Descriptor};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LivenessMap(Map<BlockId, Set<Descriptor>>);

impl LivenessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: BlockId, live_out: Set<Descriptor>) {
        self.0.insert(block, live_out);
    }

    /// Live-out set for a block. A block absent from the map is treated as
    /// having nothing live-out (nothing is flushed at its branch).
    pub fn live_out(&self, block: BlockId) -> Set<Descriptor> {
        self.0.get(&block).cloned().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DominatorMap(Map<BlockId, Set<BlockId>>);

impl DominatorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: BlockId, dominators: Set<BlockId>) {
        self.0.insert(block, dominators);
    }

    pub fn dominators(&self, block: BlockId) -> Set<BlockId> {
        self.0.get(&block).cloned().unwrap_or_default()
    }
}
