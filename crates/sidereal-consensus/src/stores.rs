//! External collaborators this crate depends on only through traits:
//! durable block/unspent storage and the puzzle/condition interpreter.
//! Concrete implementations (redb-backed or in-memory) live in the store
//! and node crates; this crate never names a storage engine.

use serde::{Deserialize, Serialize};

use crate::types::{Coin, FullBlock, Hash32, UnspentRecord};

pub trait BlockStore {
    fn get_block(&self, header_hash: &Hash32) -> Option<FullBlock>;
    fn add_block(&mut self, block: FullBlock);
}

/// One block's effect on the coin set, as already determined by
/// `validate_transactions`/`validate_finished`. The store applies this
/// diff rather than re-deriving it, so it never needs a condition
/// interpreter of its own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoinDiff {
    pub header_hash: Hash32,
    pub height: u64,
    pub additions: Vec<Coin>,
    pub removals: Vec<Hash32>,
    /// Name of the addition that is this block's coinbase output, if any —
    /// the one addition subject to `COINBASE_FREEZE_PERIOD`. `None` for a
    /// diff with no coinbase (e.g. the genesis diff in chains that mint
    /// nothing at height 0).
    pub coinbase: Option<Hash32>,
}

/// Durable UTXO keyed by coin name, plus the reorg-coupling operations
/// `reconsider_tips` drives as mainline is rewritten underneath it.
pub trait UnspentStore {
    fn get_unspent(&self, coin_name: &Hash32) -> Option<UnspentRecord>;

    /// Apply `diff` at the committed tip, advancing the LCA by one and
    /// recording an undo record keyed by `diff.header_hash`.
    fn new_lca(&mut self, diff: &CoinDiff);

    /// Roll the committed UTXO back to the state as of `height`,
    /// inclusive — undoes every block above it using recorded undo
    /// records.
    fn rollback_to_block(&mut self, height: u64);

    /// Discard all per-tip diff overlays; `new_heads` rebuilds them.
    fn nuke_diffs(&mut self);

    /// Recompute a diff overlay for each given tip-path block, applied on
    /// top of the committed LCA state. Does not touch committed storage.
    fn new_heads(&mut self, diffs: &[CoinDiff]);

    /// Record `diffs` as newly committed along the path to the new LCA.
    fn add_lcas(&mut self, diffs: &[CoinDiff]);
}

/// A coin-name / puzzle-hash / condition-dict triple produced by
/// evaluating a spend's puzzle against its solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Npc {
    pub coin_name: Hash32,
    pub puzzle_hash: Hash32,
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    AggSigMe { pubkey: Vec<u8>, message: Vec<u8> },
    CreateCoin { puzzle_hash: Hash32, amount: u64 },
    AssertBlockIndexExceeds(u64),
    AssertBlockAgeExceeds(u64),
}

/// The out-of-scope puzzle VM, modeled as a trait so a reference
/// interpreter can back tests while the real one (not part of this
/// core) backs production.
pub trait ConditionInterpreter {
    /// Evaluate one coin spend's puzzle reveal against its solution,
    /// returning the resulting NPC plus the opcode cost charged.
    fn get_name_puzzle_conditions(
        &self,
        coin_name: &Hash32,
        puzzle_reveal: &[u8],
        solution: &[u8],
    ) -> Result<(Npc, u64), crate::error::TxError>;
}
