//! Per-tip transaction pool (component J): one `Pool` of admitted spend
//! bundles per live tip, ranked by fee-per-cost, plus the shared retry
//! caches (`potential_txs`, `old_mempool`) that give bundles a second
//! chance after the input they were waiting on appears or a reorg
//! un-confirms the block that evicted them.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::constants::ConsensusParams;
use crate::error::{ErrorCode, TxError};
use crate::stores::{ConditionInterpreter, UnspentStore};
use crate::tx::validate_transactions;
use crate::types::{Hash32, SpendBundle};
use sidereal_crypto::BlsVerifier;

/// An admitted spend bundle plus the fee/cost bookkeeping the ordering
/// and eviction logic needs.
#[derive(Clone, Debug)]
pub struct MempoolItem {
    pub spend_bundle: SpendBundle,
    pub fee: u64,
    pub cost: u64,
    pub additions: Vec<Hash32>,
    pub removals: Vec<Hash32>,
}

impl MempoolItem {
    pub fn fee_per_cost(&self) -> u64 {
        if self.cost == 0 {
            0
        } else {
            self.fee / self.cost
        }
    }
}

/// The pool attached to a single tip. Ranked by fee-per-cost so the
/// lowest-paying item is always known for eviction, and indexed by the
/// coin names it spends so conflict detection is O(1) per spend.
pub struct Pool {
    items: HashMap<Hash32, MempoolItem>,
    spent_coins: HashMap<Hash32, Hash32>,
    total_cost: u64,
}

impl Pool {
    pub fn new() -> Self {
        Pool {
            items: HashMap::new(),
            spent_coins: HashMap::new(),
            total_cost: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    /// The fee-per-cost of the lowest-ranked item currently admitted, or
    /// `None` if the pool is empty — the gate new low-fee items must
    /// clear once the pool is at `mempool_size`.
    pub fn min_fee_per_cost(&self) -> Option<u64> {
        self.items.values().map(|i| i.fee_per_cost()).min()
    }

    fn lowest_ranked(&self) -> Option<Hash32> {
        self.items
            .values()
            .min_by_key(|i| i.fee_per_cost())
            .map(|i| i.spend_bundle.name())
    }

    fn conflicts_with(&self, removals: &[Hash32]) -> HashSet<Hash32> {
        removals
            .iter()
            .filter_map(|c| self.spent_coins.get(c))
            .copied()
            .collect()
    }

    fn insert(&mut self, name: Hash32, item: MempoolItem) {
        for r in &item.removals {
            self.spent_coins.insert(*r, name);
        }
        self.total_cost += item.cost;
        self.items.insert(name, item);
    }

    fn remove(&mut self, name: &Hash32) -> Option<MempoolItem> {
        let item = self.items.remove(name)?;
        for r in &item.removals {
            self.spent_coins.remove(r);
        }
        self.total_cost = self.total_cost.saturating_sub(item.cost);
        Some(item)
    }

    /// Packs items in descending fee-per-cost order up to `cost_max`, the
    /// candidate-block assembly step a harvester calls when building on
    /// top of this tip.
    pub fn create_bundle_for_tip(&self, cost_max: u64) -> Vec<SpendBundle> {
        let mut ranked: Vec<&MempoolItem> = self.items.values().collect();
        ranked.sort_by(|a, b| b.fee_per_cost().cmp(&a.fee_per_cost()));
        let mut total = 0u64;
        let mut out = Vec::new();
        for item in ranked {
            if total + item.cost > cost_max {
                continue;
            }
            total += item.cost;
            out.push(item.spend_bundle.clone());
        }
        out
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry in the `old_mempool` retry cache: bundles evicted by a
/// reorg, kept for `old_mempool_cache_heights` blocks in case the
/// branch they belonged to becomes the new mainline again.
struct OldMempoolEntry {
    height: u64,
    bundles: Vec<SpendBundle>,
}

/// Owns one `Pool` per active tip plus the shared retry caches:
/// `potential_txs` parks bundles that can't be admitted yet (an unknown
/// input, an unmet block-index/block-age assertion, or a lost conflict)
/// so a later block can retry them, and `old_mempool` gives reorg'd-out
/// bundles a bounded grace window.
pub struct Mempool {
    pools: HashMap<Hash32, Pool>,
    potential_txs: VecDeque<SpendBundle>,
    old_mempool: VecDeque<OldMempoolEntry>,
    /// Names of bundles seen via gossip recently, bounding re-validation
    /// of duplicates even after they've been evicted from every pool.
    seen: VecDeque<Hash32>,
    seen_set: HashSet<Hash32>,
    params: ConsensusParams,
}

impl Mempool {
    pub fn new(params: ConsensusParams) -> Self {
        Mempool {
            pools: HashMap::new(),
            potential_txs: VecDeque::new(),
            old_mempool: VecDeque::new(),
            seen: VecDeque::new(),
            seen_set: HashSet::new(),
            params,
        }
    }

    /// True if a bundle with this name has already been presented to the
    /// pool recently, regardless of whether it was admitted, parked, or
    /// rejected — lets a gossiping caller skip re-validating a duplicate
    /// without consulting every tip's `Pool`.
    pub fn has_seen(&self, name: &Hash32) -> bool {
        self.seen_set.contains(name)
    }

    fn mark_seen(&mut self, name: Hash32) {
        if self.seen_set.insert(name) {
            self.seen.push_back(name);
            let cap = (self.params.mempool_size() * 2).max(1) as usize;
            while self.seen.len() > cap {
                if let Some(evicted) = self.seen.pop_front() {
                    self.seen_set.remove(&evicted);
                }
            }
        }
    }

    pub fn pool_for_tip(&self, tip: &Hash32) -> Option<&Pool> {
        self.pools.get(tip)
    }

    /// Registers a newly-joined tip with an empty pool, and drops the pool
    /// of any tip that's no longer in `tips`.
    pub fn new_tips(&mut self, tips: &[Hash32]) {
        self.pools.retain(|h, _| tips.contains(h));
        for tip in tips {
            self.pools.entry(*tip).or_insert_with(Pool::new);
        }
    }

    /// Full admission algorithm for one bundle against one tip's pool:
    /// dedup against what's already been seen, validate, park on a
    /// deferred condition, check the mempool-size fee floor, resolve
    /// conflicts in favor of the higher fee-per-cost bundle (parking the
    /// loser), then insert. Only `tip`'s pool is touched — callers that
    /// want a bundle admitted across the whole tip set call this once
    /// per tip.
    #[allow(clippy::too_many_arguments)]
    pub fn add_spend_bundle(
        &mut self,
        tip: Hash32,
        bundle: SpendBundle,
        height: u64,
        unspent_store: &dyn UnspentStore,
        interpreter: &dyn ConditionInterpreter,
        crypto: &dyn BlsVerifier,
    ) -> Result<(), TxError> {
        let name = bundle.name();
        if self.pools.get(&tip).map(|p| p.items.contains_key(&name)) == Some(true) {
            return Ok(());
        }
        self.mark_seen(name);

        let outcome = validate_transactions(
            std::slice::from_ref(&bundle),
            height,
            unspent_store,
            interpreter,
            crypto,
            self.params.max_coin_amount,
            self.params.coinbase_freeze_period,
            self.params.block_cost_max,
        );

        let outcome = match outcome {
            Ok(o) => o,
            Err(e)
                if matches!(
                    e.code,
                    ErrorCode::UnknownUnspent
                        | ErrorCode::AssertBlockIndexExceedsFailed
                        | ErrorCode::AssertBlockAgeExceedsFailed
                ) =>
            {
                self.park_potential(bundle);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if outcome.cost == 0 {
            return Err(TxError::bare(ErrorCode::Unknown));
        }

        let item = MempoolItem {
            spend_bundle: bundle,
            fee: outcome.fees,
            cost: outcome.cost,
            additions: outcome.additions.iter().map(|c| c.name()).collect(),
            removals: outcome.removals.clone(),
        };
        let fee_per_cost = item.fee_per_cost();

        let pool = self.pools.entry(tip).or_insert_with(Pool::new);

        if pool.size() as u64 >= self.params.mempool_size() {
            match pool.min_fee_per_cost() {
                Some(min) if fee_per_cost <= min => {
                    return Err(TxError::bare(ErrorCode::InvalidFeeLowFee));
                }
                None => return Err(TxError::bare(ErrorCode::InvalidFeeNoFee)),
                _ => {}
            }
        }

        let conflicts = pool.conflicts_with(&outcome.removals);
        if !conflicts.is_empty() {
            for conflict_name in &conflicts {
                let conflicting_fee_per_cost = pool
                    .items
                    .get(conflict_name)
                    .map(|i| i.fee_per_cost())
                    .unwrap_or(0);
                if fee_per_cost <= conflicting_fee_per_cost {
                    // `pool` still holds self.pools; park directly against
                    // the disjoint fields rather than through a method that
                    // would need the whole of `self`.
                    if self.potential_txs.len() >= self.params.potential_txs_cache_size {
                        self.potential_txs.pop_front();
                    }
                    self.potential_txs.push_back(item.spend_bundle.clone());
                    return Err(TxError::bare(ErrorCode::MempoolConflict));
                }
            }
            for conflict_name in &conflicts {
                pool.remove(conflict_name);
            }
        }

        if pool.size() as u64 >= self.params.mempool_size() {
            if let Some(evict) = pool.lowest_ranked() {
                pool.remove(&evict);
            }
        }

        pool.insert(name, item);
        Ok(())
    }

    fn park_potential(&mut self, bundle: SpendBundle) {
        if self.potential_txs.len() >= self.params.potential_txs_cache_size {
            self.potential_txs.pop_front();
        }
        self.potential_txs.push_back(bundle);
    }

    /// Retries every parked bundle against the current tip state — the
    /// natural hook to call right after a new block lands.
    #[allow(clippy::too_many_arguments)]
    pub fn retry_potential_txs(
        &mut self,
        tip: Hash32,
        height: u64,
        unspent_store: &dyn UnspentStore,
        interpreter: &dyn ConditionInterpreter,
        crypto: &dyn BlsVerifier,
    ) {
        let pending: Vec<SpendBundle> = self.potential_txs.drain(..).collect();
        for bundle in pending {
            let _ = self.add_spend_bundle(tip, bundle, height, unspent_store, interpreter, crypto);
        }
    }

    /// Moves a tip's bundles into the reorg-grace cache rather than
    /// discarding them outright, in case the branch they belonged to
    /// becomes mainline again within `old_mempool_cache_heights` blocks.
    pub fn add_to_old_mempool_cache(&mut self, tip: Hash32, height: u64) {
        if let Some(pool) = self.pools.remove(&tip) {
            let bundles: Vec<SpendBundle> = pool
                .items
                .into_values()
                .map(|i| i.spend_bundle)
                .collect();
            if bundles.is_empty() {
                return;
            }
            self.old_mempool.push_back(OldMempoolEntry { height, bundles });
            let floor = height.saturating_sub(self.params.old_mempool_cache_heights);
            self.old_mempool.retain(|e| e.height >= floor);
        }
    }

    pub fn update_pool(&mut self, tips: &[Hash32]) {
        self.new_tips(tips);
    }
}
