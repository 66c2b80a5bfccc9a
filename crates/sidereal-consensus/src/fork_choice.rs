//! Multi-tip fork-choice engine (component F): the in-memory header
//! arena, the bounded tip set, and LCA tracking. Implements
//! `receive_block`/`reconsider_tips` per CANONICAL §4.1.

use std::collections::HashMap;

use crate::error::{ErrorCode, ReceiveBlockResult, TxError};
use crate::header_index::HeaderIndex;
use crate::stores::{CoinDiff, UnspentStore};
use crate::types::{Hash32, HeaderSummary};

/// The header arena plus the bounded tip set. `headers` never shrinks —
/// every accepted header (tip or not) stays resident so fork-choice can
/// always walk an orphan branch back to its point of divergence. `diffs`
/// shadows `headers` one-to-one: every indexed block's coin diff, so a
/// tip's overlay or the mainline's committed range can be rebuilt purely
/// from in-memory state, without re-running transaction validation.
pub struct ChainState {
    headers: HashMap<Hash32, HeaderSummary>,
    diffs: HashMap<Hash32, CoinDiff>,
    height_to_hash: HashMap<u64, Hash32>,
    tips: Vec<Hash32>,
    lca: Hash32,
    genesis_hash: Hash32,
    number_of_heads: usize,
}

impl ChainState {
    /// A `ChainState` cannot exist without a validated genesis tip: height
    /// zero, zero weight/iterations (the base case the strictly-increasing
    /// invariant builds on), and a coin diff that actually belongs to this
    /// header. `genesis_diff` is normally empty unless the chain mints a
    /// genesis coinbase.
    pub fn new(
        genesis: HeaderSummary,
        genesis_diff: CoinDiff,
        unspent_store: &mut dyn UnspentStore,
    ) -> Result<Self, TxError> {
        if !genesis.is_genesis() || genesis.weight != 0 || genesis.total_iters != 0 {
            return Err(TxError::new(
                ErrorCode::InvalidGenesisBlock,
                "genesis header must be height 0 with zero weight and iterations",
            ));
        }
        if genesis_diff.header_hash != genesis.header_hash || genesis_diff.height != 0 {
            return Err(TxError::new(
                ErrorCode::InvalidGenesisBlock,
                "genesis coin diff does not match the genesis header",
            ));
        }

        let hash = genesis.header_hash;
        let mut headers = HashMap::new();
        let mut height_to_hash = HashMap::new();
        let mut diffs = HashMap::new();
        height_to_hash.insert(genesis.height, hash);
        diffs.insert(hash, genesis_diff.clone());
        headers.insert(hash, genesis);
        unspent_store.add_lcas(std::slice::from_ref(&genesis_diff));

        Ok(ChainState {
            headers,
            diffs,
            height_to_hash,
            tips: vec![hash],
            lca: hash,
            genesis_hash: hash,
            number_of_heads: 3,
        })
    }

    pub fn with_capacity(
        genesis: HeaderSummary,
        genesis_diff: CoinDiff,
        number_of_heads: usize,
        unspent_store: &mut dyn UnspentStore,
    ) -> Result<Self, TxError> {
        let mut cs = Self::new(genesis, genesis_diff, unspent_store)?;
        cs.number_of_heads = number_of_heads.max(1);
        Ok(cs)
    }

    pub fn lca_hash(&self) -> Hash32 {
        self.lca
    }

    pub fn tips(&self) -> &[Hash32] {
        &self.tips
    }

    pub fn highest_tip(&self) -> &HeaderSummary {
        self.tips
            .iter()
            .map(|h| self.headers.get(h).expect("tip indexed"))
            .max_by_key(|h| (h.weight, std::cmp::Reverse(h.header_hash)))
            .expect("at least one tip")
    }

    fn has(&self, hash: &Hash32) -> bool {
        self.headers.contains_key(hash)
    }

    /// Already-known, disconnected, and insertion gates. `summary` must
    /// already have passed `validate_unfinished`/`validate_finished`; this
    /// call is the bookkeeping step, not re-validation.
    pub fn receive_block(
        &mut self,
        summary: HeaderSummary,
        diff: CoinDiff,
        unspent_store: &mut dyn UnspentStore,
    ) -> Result<ReceiveBlockResult, TxError> {
        if self.has(&summary.header_hash) {
            return Ok(ReceiveBlockResult::AlreadyHaveBlock);
        }
        if summary.height > 0 && !self.has(&summary.prev_header_hash) {
            return Ok(ReceiveBlockResult::DisconnectedBlock);
        }

        let hash = summary.header_hash;
        self.headers.insert(hash, summary);
        self.diffs.insert(hash, diff.clone());
        let result = self.reconsider_tips(hash, diff, unspent_store)?;
        Ok(result)
    }

    /// `min_w = min(weight(t) : t ∈ tips)`. `b` joins the
    /// tip set only if it clears this bar, unless it directly extends a
    /// current tip — extension trivially clears the bar since weight is
    /// strictly increasing, so that case is handled by replacement
    /// instead of a redundant comparison.
    fn reconsider_tips(
        &mut self,
        hash: Hash32,
        diff: CoinDiff,
        unspent_store: &mut dyn UnspentStore,
    ) -> Result<ReceiveBlockResult, TxError> {
        let header = self.headers.get(&hash).expect("just inserted").clone();

        if let Some(pos) = self.tips.iter().position(|t| *t == header.prev_header_hash) {
            self.tips[pos] = hash;
        } else {
            let min_w = self
                .tips
                .iter()
                .map(|t| self.headers.get(t).expect("tip indexed").weight)
                .min();
            let entered = min_w.map_or(true, |w| header.weight > w);
            if !entered {
                return Ok(ReceiveBlockResult::AddedAsOrphan);
            }
            self.tips.push(hash);
        }

        while self.tips.len() > self.number_of_heads {
            let evict = self
                .tips
                .iter()
                .copied()
                .min_by_key(|t| {
                    let h = self.headers.get(t).expect("tip indexed");
                    (h.weight, std::cmp::Reverse(h.header_hash))
                })
                .expect("nonempty tips");
            self.tips.retain(|t| *t != evict);
        }

        let survived = self.tips.contains(&hash);
        let old_lca = self.lca;
        self.recompute_lca();

        if old_lca != self.lca {
            // LCA moved: rollback/replay the committed UTXO and rebuild
            // every tip's overlay from scratch.
            self.rewrite_mainline(old_lca, unspent_store);
        } else if survived {
            // No reorg: extend the one overlay this block joined.
            unspent_store.new_heads(std::slice::from_ref(&diff));
        }

        if survived {
            Ok(ReceiveBlockResult::AddedToHead)
        } else {
            Ok(ReceiveBlockResult::AddedAsOrphan)
        }
    }

    /// Walks every tip back to genesis, taking the deepest header shared
    /// by all tips as the new LCA.
    fn recompute_lca(&mut self) {
        if self.tips.len() == 1 {
            self.lca = self.tips[0];
            return;
        }
        let mut candidate = *self
            .tips
            .iter()
            .min_by_key(|t| self.headers.get(*t).expect("tip indexed").height)
            .expect("nonempty tips");

        'outer: loop {
            for tip in &self.tips {
                if candidate != *tip && !self.is_ancestor(candidate, *tip) {
                    let ch = self.headers.get(&candidate).expect("indexed");
                    if ch.is_genesis() {
                        break 'outer;
                    }
                    candidate = ch.prev_header_hash;
                    continue 'outer;
                }
            }
            break;
        }
        self.lca = candidate;
    }

    fn is_ancestor(&self, ancestor: Hash32, descendant: Hash32) -> bool {
        let mut cur = descendant;
        loop {
            if cur == ancestor {
                return true;
            }
            let h = match self.headers.get(&cur) {
                Some(h) => h,
                None => return false,
            };
            if h.is_genesis() {
                return cur == ancestor;
            }
            cur = h.prev_header_hash;
        }
    }

    /// `find_fork`: deepest height at which the current mainline
    /// (`height_to_hash`) and the ancestor chain of the new LCA agree.
    /// Returns 0 (genesis) if they share nothing but genesis.
    fn find_fork(&self, old_lca: Hash32) -> u64 {
        let old_height = self.headers.get(&old_lca).expect("old lca indexed").height;
        let new_height = self.headers.get(&self.lca).expect("new lca indexed").height;
        let mut cur = self.lca;
        let mut cur_height = new_height;
        while cur_height > old_height {
            let h = self.headers.get(&cur).expect("indexed");
            cur = h.prev_header_hash;
            cur_height -= 1;
        }
        let mut old_cur = old_lca;
        let mut old_cur_height = old_height;
        while old_cur_height > cur_height {
            let h = self.headers.get(&old_cur).expect("indexed");
            old_cur = h.prev_header_hash;
            old_cur_height -= 1;
        }
        while cur != old_cur {
            if cur_height == 0 {
                return 0;
            }
            cur = self.headers.get(&cur).expect("indexed").prev_header_hash;
            old_cur = self.headers.get(&old_cur).expect("indexed").prev_header_hash;
            cur_height -= 1;
        }
        cur_height
    }

    /// Binary search over an explicit, ascending-by-height hash list for
    /// the deepest point at which it agrees with our mainline. Distinct
    /// from `find_fork`, which walks ancestry during `reconsider_tips`:
    /// this is a pure query any caller can run against an externally
    /// supplied candidate chain (e.g. a peer's fork-point negotiation)
    /// without touching tip state. Agreement is monotonic in height since
    /// both sides are single chains, so a binary search is valid. Returns
    /// 0 if the lists share nothing but genesis.
    pub fn find_fork_point(&self, alternate_chain: &[(u64, Hash32)]) -> u64 {
        if alternate_chain.is_empty() {
            return 0;
        }
        let agrees = |idx: usize| {
            let (height, hash) = alternate_chain[idx];
            self.height_to_hash.get(&height) == Some(&hash)
        };

        let mut lo = 0isize;
        let mut hi = alternate_chain.len() as isize - 1;
        let mut best = 0u64;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            if agrees(mid as usize) {
                best = best.max(alternate_chain[mid as usize].0);
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }
        best
    }

    /// Rewrites `height_to_hash` along the path from the fork point to
    /// the new LCA, and drives the UTXO store's rollback/advance.
    fn rewrite_mainline(&mut self, old_lca: Hash32, unspent_store: &mut dyn UnspentStore) {
        let fork_height = self.find_fork(old_lca);
        unspent_store.rollback_to_block(fork_height);

        let new_height = self.headers.get(&self.lca).expect("new lca indexed").height;
        let path = self.path_above(self.lca, fork_height);

        let path_diffs: Vec<CoinDiff> = path
            .iter()
            .map(|hash| self.diffs.get(hash).expect("diff indexed").clone())
            .collect();
        unspent_store.add_lcas(&path_diffs);

        for hash in &path {
            let height = self.headers.get(hash).expect("indexed").height;
            self.height_to_hash.insert(height, *hash);
        }
        self.height_to_hash.retain(|h, _| *h <= new_height);

        unspent_store.nuke_diffs();
        for tip in self.tips.clone() {
            let overlay = self.path_above(tip, new_height);
            let overlay_diffs: Vec<CoinDiff> = overlay
                .iter()
                .map(|hash| self.diffs.get(hash).expect("diff indexed").clone())
                .collect();
            unspent_store.new_heads(&overlay_diffs);
        }
    }

    /// Headers on `(from_height, from.height]` along `from`'s ancestry,
    /// oldest first — the "unique suffix" a per-tip overlay or a mainline
    /// advance replays on top of a committed base.
    fn path_above(&self, from: Hash32, from_height: u64) -> Vec<Hash32> {
        let mut path = Vec::new();
        let mut cur = from;
        loop {
            let h = self.headers.get(&cur).expect("indexed");
            if h.height <= from_height {
                break;
            }
            path.push(cur);
            cur = h.prev_header_hash;
        }
        path.reverse();
        path
    }
}

impl HeaderIndex for ChainState {
    fn get(&self, hash: &Hash32) -> Option<&HeaderSummary> {
        self.headers.get(hash)
    }

    fn genesis_hash(&self) -> Hash32 {
        self.genesis_hash
    }

    fn ancestor_at_height(&self, from: &Hash32, height: u64) -> Option<Hash32> {
        if let Some(h) = self.headers.get(from) {
            if h.height == height {
                return Some(*from);
            }
        }
        let mut cur = *from;
        loop {
            let h = self.headers.get(&cur)?;
            if h.height == height {
                return Some(cur);
            }
            if h.height < height {
                return None;
            }
            if h.is_genesis() {
                return None;
            }
            cur = h.prev_header_hash;
        }
    }
}

/// Surfaces `BlockNotInBlockchain` for callers (e.g. the node's sync
/// driver) asking about a hash this engine has never indexed.
pub fn block_not_in_blockchain_error() -> TxError {
    TxError::bare(ErrorCode::BlockNotInBlockchain)
}
