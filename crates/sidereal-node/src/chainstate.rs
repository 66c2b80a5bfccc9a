//! In-memory `UnspentStore` backing tests, benches, and devnets that
//! don't need the redb-backed `sidereal_store::Store`. Mirrors the
//! committed/overlay split that `Store` implements durably: `committed`
//! is the at-LCA unspent set, `overlay` is the runtime-only per-tip diff
//! that `nuke_diffs`/`new_heads` rebuild wholesale on every reorg.

use std::collections::HashMap;

use sidereal_consensus::{CoinDiff, Hash32, UnspentRecord, UnspentStore};

#[derive(Default)]
pub struct MemoryUnspentStore {
    committed: HashMap<Hash32, UnspentRecord>,
    overlay: HashMap<Hash32, UnspentRecord>,
    /// Committed diffs in application order, for `rollback_to_block`'s
    /// undo walk. A production store would keep this as an undo log
    /// keyed by block, as `sidereal_store::Store` does with its redb
    /// `UNDO_TABLE`; an in-memory `Vec` is the adequate stand-in here.
    history: Vec<CoinDiff>,
}

impl MemoryUnspentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_committed(&mut self, diff: &CoinDiff) {
        for name in &diff.removals {
            if let Some(rec) = self.committed.get_mut(name) {
                rec.spend(diff.height);
            }
        }
        for coin in &diff.additions {
            let name = coin.name();
            let is_coinbase = diff.coinbase == Some(name);
            self.committed
                .insert(name, UnspentRecord::new_unspent(coin.clone(), diff.height, is_coinbase));
        }
        self.history.push(diff.clone());
    }

    fn undo(&mut self, diff: &CoinDiff) {
        for coin in &diff.additions {
            self.committed.remove(&coin.name());
        }
        for name in &diff.removals {
            if let Some(rec) = self.committed.get_mut(name) {
                rec.spent_flag = false;
                rec.spent_index = 0;
            }
        }
    }
}

impl UnspentStore for MemoryUnspentStore {
    fn get_unspent(&self, coin_name: &Hash32) -> Option<UnspentRecord> {
        self.overlay
            .get(coin_name)
            .or_else(|| self.committed.get(coin_name))
            .cloned()
    }

    fn new_lca(&mut self, diff: &CoinDiff) {
        self.apply_committed(diff);
    }

    fn rollback_to_block(&mut self, height: u64) {
        while let Some(last) = self.history.last() {
            if last.height <= height {
                break;
            }
            let diff = self.history.pop().expect("checked non-empty above");
            self.undo(&diff);
        }
    }

    fn nuke_diffs(&mut self) {
        self.overlay.clear();
    }

    fn new_heads(&mut self, diffs: &[CoinDiff]) {
        self.overlay.clear();
        for diff in diffs {
            for name in &diff.removals {
                let mut rec = self
                    .overlay
                    .get(name)
                    .cloned()
                    .or_else(|| self.committed.get(name).cloned())
                    .expect("overlay removal references a coin absent from both overlay and committed state");
                rec.spend(diff.height);
                self.overlay.insert(*name, rec);
            }
            for coin in &diff.additions {
                let name = coin.name();
                let is_coinbase = diff.coinbase == Some(name);
                self.overlay
                    .insert(name, UnspentRecord::new_unspent(coin.clone(), diff.height, is_coinbase));
            }
        }
    }

    fn add_lcas(&mut self, diffs: &[CoinDiff]) {
        for diff in diffs {
            self.apply_committed(diff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidereal_consensus::Coin;

    fn coin(tag: u8, amount: u64) -> Coin {
        Coin {
            parent_coin_id: [tag; 32],
            puzzle_hash: [tag.wrapping_add(1); 32],
            amount,
        }
    }

    #[test]
    fn rollback_undoes_committed_diffs_above_height() {
        let mut store = MemoryUnspentStore::new();
        let base = coin(1, 100);
        store.add_lcas(&[CoinDiff {
            header_hash: [0; 32],
            height: 0,
            additions: vec![base.clone()],
            removals: vec![],
            coinbase: None,
        }]);

        let minted = coin(2, 5);
        store.add_lcas(&[CoinDiff {
            header_hash: [1; 32],
            height: 1,
            additions: vec![minted.clone()],
            removals: vec![base.name()],
            coinbase: None,
        }]);
        assert!(store.get_unspent(&base.name()).unwrap().spent_flag);
        assert!(store.get_unspent(&minted.name()).is_some());

        store.rollback_to_block(0);
        assert!(store.get_unspent(&minted.name()).is_none());
        assert!(!store.get_unspent(&base.name()).unwrap().spent_flag);
    }

    #[test]
    fn overlay_is_discarded_by_nuke_diffs() {
        let mut store = MemoryUnspentStore::new();
        let c = coin(9, 1);
        store.new_heads(&[CoinDiff {
            header_hash: [9; 32],
            height: 1,
            additions: vec![c.clone()],
            removals: vec![],
            coinbase: None,
        }]);
        assert!(store.get_unspent(&c.name()).is_some());
        store.nuke_diffs();
        assert!(store.get_unspent(&c.name()).is_none());
    }
}
