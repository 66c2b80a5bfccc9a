//! Read-only view over the header arena, shared by the retargeting and
//! block-validation modules so neither needs to depend on the concrete
//! `ChainState` fork-choice engine directly.

use crate::types::{Hash32, HeaderSummary};

pub trait HeaderIndex {
    fn get(&self, hash: &Hash32) -> Option<&HeaderSummary>;
    fn genesis_hash(&self) -> Hash32;

    /// Ancestor of `from` at `height`. On-mainline lookups may use
    /// `height_to_hash` directly; off-mainline ancestors are obtained by
    /// walking `prev_header_hash` back from `from`.
    fn ancestor_at_height(&self, from: &Hash32, height: u64) -> Option<Hash32>;
}
