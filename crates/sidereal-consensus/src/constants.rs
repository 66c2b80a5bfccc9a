use serde::{Deserialize, Serialize};

/// Immutable consensus tunables, threaded by reference through every
/// validator, retarget, and mempool call. Never a global: tests build
/// their own instance (often via `ConsensusParams::sampled()` plus
/// struct-update syntax) and the node loads one from TOML at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    pub difficulty_starting: u64,
    pub difficulty_epoch: u64,
    pub difficulty_delay: u64,
    pub difficulty_warp_factor: u64,
    pub difficulty_factor: u64,

    pub block_time_target: u64,
    pub min_block_time: u64,

    pub vdf_ips_starting: u64,
    pub ips_factor: u64,
    pub discriminant_size_bits: u32,

    pub number_of_timestamps: usize,
    pub max_future_time: u64,

    /// K in spec terms: the tip-set cap.
    pub number_of_heads: usize,

    pub coinbase_freeze_period: u64,
    pub max_coin_amount: u64,
    pub block_cost_max: u64,

    pub tx_per_sec: u64,
    pub mempool_block_buffer: u64,

    /// Bound on the `potential_txs` retry cache (spec: 300).
    pub potential_txs_cache_size: usize,
    /// Bound on the old-mempool cache, keyed by eviction height (spec: 10).
    pub old_mempool_cache_heights: u64,
}

impl ConsensusParams {
    /// `mempool_size = TX_PER_SEC * BLOCK_TIME_TARGET * MEMPOOL_BLOCK_BUFFER`.
    pub fn mempool_size(&self) -> u64 {
        self.tx_per_sec * self.block_time_target * self.mempool_block_buffer
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            difficulty_starting: 30,
            difficulty_epoch: 2_016,
            difficulty_delay: 256,
            difficulty_warp_factor: 4,
            difficulty_factor: 3,

            block_time_target: 300,
            min_block_time: 120,

            vdf_ips_starting: 100_000,
            ips_factor: 3,
            discriminant_size_bits: 1_024,

            number_of_timestamps: 11,
            max_future_time: 7_200,

            number_of_heads: 3,

            coinbase_freeze_period: 200,
            max_coin_amount: (1u64 << 48) - 1,
            block_cost_max: 6_000,

            tx_per_sec: 20,
            mempool_block_buffer: 10,

            potential_txs_cache_size: 300,
            old_mempool_cache_heights: 10,
        }
    }
}

/// A small-epoch parameter set used across the test suite so retarget and
/// fork-choice scenarios don't require thousands of blocks to exercise an
/// epoch boundary.
#[cfg(test)]
pub(crate) fn sampled_params() -> ConsensusParams {
    ConsensusParams {
        difficulty_epoch: 12,
        difficulty_delay: 3,
        difficulty_starting: 5,
        difficulty_factor: 3,
        difficulty_warp_factor: 4,
        block_time_target: 10,
        number_of_heads: 3,
        ..ConsensusParams::default()
    }
}
