//! In-memory `BlockStore` for tests, benches, and devnets. The durable
//! counterpart is `sidereal_store::Store`, which persists full blocks in
//! its redb `BLOCKS_TABLE`.

use std::collections::HashMap;

use sidereal_consensus::{BlockStore, FullBlock, Hash32};

#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: HashMap<Hash32, FullBlock>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn get_block(&self, header_hash: &Hash32) -> Option<FullBlock> {
        self.blocks.get(header_hash).cloned()
    }

    fn add_block(&mut self, block: FullBlock) {
        self.blocks.insert(block.header_hash(), block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidereal_consensus::{Body, Coin, ChallengeChainData, HeaderBlock, HeaderData, ProofOfSpace};

    fn sample_block() -> FullBlock {
        let coinbase = Coin {
            parent_coin_id: [0; 32],
            puzzle_hash: [1; 32],
            amount: 100,
        };
        let fees_coin = Coin {
            parent_coin_id: [0; 32],
            puzzle_hash: [2; 32],
            amount: 0,
        };
        let body = Body {
            coinbase: coinbase.clone(),
            coinbase_solution: vec![],
            fees_coin,
            aggregated_signature: None,
            transactions: None,
        };
        let header_data = HeaderData {
            height: 0,
            prev_header_hash: [0; 32],
            timestamp: 1,
            proof_of_space_hash: [3; 32],
            body_hash: body.hash(),
            challenge: ChallengeChainData {
                challenge: [4; 32],
                total_weight: 1,
                total_iters: 1,
            },
        };
        FullBlock {
            header: HeaderBlock {
                data: header_data,
                proof_of_space: ProofOfSpace {
                    challenge_hash: [4; 32],
                    pool_public_key: vec![],
                    plot_public_key: vec![],
                    size: 32,
                    proof_bytes: vec![],
                },
                proof_of_time: None,
                coinbase_signature: vec![],
                harvester_signature: vec![],
            },
            body,
        }
    }

    #[test]
    fn roundtrips_full_block_by_header_hash() {
        let mut store = MemoryBlockStore::new();
        let block = sample_block();
        let hash = block.header_hash();
        store.add_block(block.clone());
        assert_eq!(store.get_block(&hash), Some(block));
    }

    #[test]
    fn unknown_hash_returns_none() {
        let store = MemoryBlockStore::new();
        assert_eq!(store.get_block(&[9; 32]), None);
    }
}
