//! Benches the combined cost of extending a chain and admitting
//! transactions into its tip's mempool — the two hot paths a running
//! node drives on every new block.

use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, Criterion};
use sidereal_consensus::{
    CoinDiff, Coin, ConsensusParams, CoinSpend, HeaderSummary, Hash32, Mempool,
    ReferenceInterpreter, SpendBundle, UnspentRecord, UnspentStore,
};
use sidereal_consensus::ChainState;

#[derive(Default)]
struct MapStore {
    committed: HashMap<Hash32, UnspentRecord>,
}

impl UnspentStore for MapStore {
    fn get_unspent(&self, coin_name: &Hash32) -> Option<UnspentRecord> {
        self.committed.get(coin_name).cloned()
    }
    fn new_lca(&mut self, diff: &CoinDiff) {
        self.apply(diff);
    }
    fn rollback_to_block(&mut self, _height: u64) {}
    fn nuke_diffs(&mut self) {}
    fn new_heads(&mut self, _diffs: &[CoinDiff]) {}
    fn add_lcas(&mut self, diffs: &[CoinDiff]) {
        for diff in diffs {
            self.apply(diff);
        }
    }
}

impl MapStore {
    fn apply(&mut self, diff: &CoinDiff) {
        for name in &diff.removals {
            self.committed.remove(name);
        }
        for coin in &diff.additions {
            self.committed.insert(
                coin.name(),
                UnspentRecord::new_unspent(coin.clone(), diff.height, false),
            );
        }
    }
}

struct AlwaysOkCrypto;
impl sidereal_crypto::BlsVerifier for AlwaysOkCrypto {
    fn verify(&self, _p: &[u8], _m: &[u8], _s: &[u8]) -> Result<bool, String> {
        Ok(true)
    }
    fn aggregate_verify(&self, _pairs: &[(Vec<u8>, Vec<u8>)], _sig: &[u8]) -> Result<bool, String> {
        Ok(true)
    }
}

fn mkhash(n: u64) -> Hash32 {
    let mut h = [0u8; 32];
    h[0..8].copy_from_slice(&n.to_le_bytes());
    h
}

fn header(hash: Hash32, prev: Hash32, height: u64, weight: u64) -> HeaderSummary {
    HeaderSummary {
        header_hash: hash,
        prev_header_hash: prev,
        height,
        weight,
        total_iters: height * 1_000,
        timestamp: 1_000 + height,
        challenge_digest: [0; 32],
        proof_of_space_hash: [0; 32],
    }
}

fn bench_combined_load(c: &mut Criterion) {
    c.bench_function("combined_load/256_blocks_plus_mempool", |b| {
        b.iter(|| {
            let genesis_hash = mkhash(0);
            let mut store = MapStore::default();
            let mut state = ChainState::with_capacity(
                header(genesis_hash, genesis_hash, 0, 0),
                CoinDiff {
                    header_hash: genesis_hash,
                    height: 0,
                    additions: vec![],
                    removals: vec![],
                    coinbase: None,
                },
                3,
                &mut store,
            )
            .unwrap();

            let mut mempool = Mempool::new(ConsensusParams::default());
            let mut prev = genesis_hash;
            for height in 1u64..=256 {
                let hash = mkhash(height);
                let coin = Coin {
                    parent_coin_id: prev,
                    puzzle_hash: [7; 32],
                    amount: height,
                };
                let diff = CoinDiff {
                    header_hash: hash,
                    height,
                    additions: vec![coin.clone()],
                    removals: vec![],
                    coinbase: None,
                };
                state
                    .receive_block(header(hash, prev, height, height * 10), diff, &mut store)
                    .unwrap();
                mempool.new_tips(state.tips());

                let spend = CoinSpend {
                    coin,
                    puzzle_reveal: vec![7u8; 32],
                    solution: vec![],
                };
                let bundle = SpendBundle {
                    coin_spends: vec![spend],
                    aggregated_signature: vec![],
                };
                let _ = mempool.add_spend_bundle(
                    hash,
                    bundle,
                    height,
                    &store,
                    &ReferenceInterpreter,
                    &AlwaysOkCrypto,
                );
                prev = hash;
            }
        })
    });
}

criterion_group!(benches, bench_combined_load);
criterion_main!(benches);
