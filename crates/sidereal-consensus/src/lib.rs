//! Consensus core: chain state, retargeting, block and transaction
//! validation, and the per-tip mempool for a proof-of-space/proof-of-time
//! chain.
//!
//! Non-consensus policy — networking, storage engines, and the puzzle
//! VM — MUST NOT be implemented here. Those live behind the traits in
//! [`stores`] and the [`sidereal_crypto`] crate.

pub mod constants;
pub mod error;
pub mod fork_choice;
pub mod hash;
pub mod header_index;
pub mod mempool;
pub mod retarget;
pub mod stores;
pub mod subsidy;
pub mod tx;
pub mod types;
pub mod validate;

pub use constants::ConsensusParams;
pub use error::{ErrorCode, ReceiveBlockResult, TxError};
pub use fork_choice::ChainState;
pub use header_index::HeaderIndex;
pub use mempool::{Mempool, MempoolItem, Pool};
pub use retarget::{calculate_iterations_quality, next_difficulty, next_ips, DifficultyMemo, IpsMemo};
pub use stores::{BlockStore, CoinDiff, Condition, ConditionInterpreter, Npc, UnspentStore};
pub use subsidy::{block_reward, coinbase_and_fee_base};
pub use tx::{check_fee_conservation, validate_transactions, ReferenceInterpreter, TxValidationOutcome};
pub use types::{
    Body, ChallengeChainData, Coin, CoinSpend, FullBlock, Hash32, HeaderBlock, HeaderData,
    HeaderSummary, ProofOfSpace, ProofOfTime, SpendBundle, UnspentRecord,
};
pub use validate::{pre_validate_block, validate_finished, validate_unfinished, PreValidationResult};

pub const CONSENSUS_REVISION: &str = "v1";
