//! Property tests for the chain-shape and retarget invariants (P1-P3, P7). Each
//! test drives the public API with randomly generated input rather than
//! a single hand-picked scenario, so regressions that only show up on
//! unusual shapes (deep forks, lopsided timestamps) get caught too.

use std::collections::HashMap;

use proptest::prelude::*;
use sidereal_consensus::{
    next_difficulty, ChainState, CoinDiff, ConsensusParams, DifficultyMemo, Hash32, HeaderIndex,
    HeaderSummary, ReceiveBlockResult, UnspentStore,
};

fn mkhash(n: u64) -> Hash32 {
    let mut h = [0u8; 32];
    h[0..8].copy_from_slice(&n.to_le_bytes());
    h
}

/// An `UnspentStore` that ignores every call. The fork-choice invariants
/// under test (P1-P3) are purely structural over the header arena; every
/// `CoinDiff` fed to `ChainState` in this file is empty, so there is
/// nothing for a real store to track.
#[derive(Default)]
struct NoopStore;
impl UnspentStore for NoopStore {
    fn get_unspent(&self, _coin_name: &Hash32) -> Option<sidereal_consensus::UnspentRecord> {
        None
    }
    fn new_lca(&mut self, _diff: &CoinDiff) {}
    fn rollback_to_block(&mut self, _height: u64) {}
    fn nuke_diffs(&mut self) {}
    fn new_heads(&mut self, _diffs: &[CoinDiff]) {}
    fn add_lcas(&mut self, _diffs: &[CoinDiff]) {}
}

fn empty_diff(hash: Hash32, height: u64) -> CoinDiff {
    CoinDiff {
        header_hash: hash,
        height,
        additions: vec![],
        removals: vec![],
        coinbase: None,
    }
}

const NUMBER_OF_HEADS: usize = 3;

proptest! {
    /// P1, P3: after any sequence of `receive_block` calls where every
    /// new block extends some already-known node, every tip is reachable
    /// from genesis, the tip set never exceeds `NUMBER_OF_HEADS`, and
    /// weight/`total_iters` increase strictly along every ancestor chain.
    #[test]
    fn tree_invariants_hold_after_random_block_sequence(
        steps in proptest::collection::vec((0u8..=250, 1u8..=5), 1..60),
    ) {
        let genesis_hash = mkhash(0);
        let mut store = NoopStore;
        let mut state = ChainState::with_capacity(
            HeaderSummary {
                header_hash: genesis_hash,
                prev_header_hash: genesis_hash,
                height: 0,
                weight: 0,
                total_iters: 0,
                timestamp: 0,
                challenge_digest: [0; 32],
                proof_of_space_hash: [0; 32],
            },
            empty_diff(genesis_hash, 0),
            NUMBER_OF_HEADS,
            &mut store,
        )
        .unwrap();

        // `nodes[i]` is the hash created at step `i` (nodes[0] == genesis).
        let mut nodes: Vec<Hash32> = vec![genesis_hash];

        for (i, (parent_choice, weight_delta)) in steps.iter().enumerate() {
            let parent_idx = (*parent_choice as usize) % nodes.len();
            let parent_hash = nodes[parent_idx];
            let parent = state.get(&parent_hash).expect("parent indexed").clone();

            let hash = mkhash(1_000 + i as u64);
            let height = parent.height + 1;
            let weight = parent.weight + *weight_delta as u64;
            let total_iters = parent.total_iters + *weight_delta as u64 * 100;

            let summary = HeaderSummary {
                header_hash: hash,
                prev_header_hash: parent_hash,
                height,
                weight,
                total_iters,
                timestamp: total_iters,
                challenge_digest: [0; 32],
                proof_of_space_hash: [0; 32],
            };

            let result = state
                .receive_block(summary, empty_diff(hash, height), &mut store)
                .unwrap();
            prop_assert!(matches!(
                result,
                ReceiveBlockResult::AddedToHead | ReceiveBlockResult::AddedAsOrphan
            ));
            nodes.push(hash);
        }

        // P1: bounded tip count, every tip reachable from genesis.
        prop_assert!(state.tips().len() <= NUMBER_OF_HEADS);
        for tip in state.tips() {
            prop_assert_eq!(state.ancestor_at_height(tip, 0), Some(genesis_hash));
        }

        // P2: below the LCA's height, every tip agrees with the LCA on
        // the header at that height.
        let lca = state.lca_hash();
        let lca_height = state.get(&lca).expect("lca indexed").height;
        for h in 0..=lca_height {
            let expected = state.ancestor_at_height(&lca, h);
            for tip in state.tips() {
                prop_assert_eq!(state.ancestor_at_height(tip, h), expected);
            }
        }

        // P3: weight and total_iters strictly increase walking any tip
        // back to genesis.
        for tip in state.tips() {
            let mut cur = state.get(tip).expect("tip indexed").clone();
            while !cur.is_genesis() {
                let prev = state.get(&cur.prev_header_hash).expect("prev indexed").clone();
                prop_assert!(cur.weight > prev.weight);
                prop_assert!(cur.total_iters > prev.total_iters);
                cur = prev;
            }
        }
    }

    /// P7: at every retarget boundary, the new difficulty is within a
    /// factor of `difficulty_factor` of the difficulty it replaces, and
    /// never drops below 1 — regardless of how lopsided the timestamps
    /// feeding the ratio are.
    #[test]
    fn retarget_stays_within_factor_bound_for_arbitrary_timestamps(
        deltas in proptest::collection::vec(1u64..=500, 28),
    ) {
        let params = ConsensusParams {
            difficulty_epoch: 12,
            difficulty_delay: 3,
            difficulty_starting: 5,
            difficulty_factor: 3,
            difficulty_warp_factor: 4,
            block_time_target: 10,
            ..ConsensusParams::default()
        };

        let mut headers: HashMap<Hash32, HeaderSummary> = HashMap::new();
        let genesis_hash = mkhash(0);
        headers.insert(
            genesis_hash,
            HeaderSummary {
                header_hash: genesis_hash,
                prev_header_hash: genesis_hash,
                height: 0,
                weight: 5,
                total_iters: 0,
                timestamp: 1_000,
                challenge_digest: [0; 32],
                proof_of_space_hash: [0; 32],
            },
        );

        struct Index(HashMap<Hash32, HeaderSummary>, Hash32);
        impl HeaderIndex for Index {
            fn get(&self, hash: &Hash32) -> Option<&HeaderSummary> {
                self.0.get(hash)
            }
            fn genesis_hash(&self) -> Hash32 {
                self.1
            }
            fn ancestor_at_height(&self, from: &Hash32, height: u64) -> Option<Hash32> {
                let mut cur = *from;
                loop {
                    let h = self.0.get(&cur)?;
                    if h.height == height {
                        return Some(cur);
                    }
                    if h.height < height {
                        return None;
                    }
                    cur = h.prev_header_hash;
                }
            }
        }

        let mut prev_hash = genesis_hash;
        let mut weight = 5u64;
        let mut timestamp = 1_000u64;
        for (i, delta) in deltas.iter().enumerate() {
            let height = i as u64 + 1;
            let hash = mkhash(height);
            weight += 5;
            timestamp += delta;
            headers.insert(
                hash,
                HeaderSummary {
                    header_hash: hash,
                    prev_header_hash: prev_hash,
                    height,
                    weight,
                    total_iters: height * 1_000,
                    timestamp,
                    challenge_digest: [0; 32],
                    proof_of_space_hash: [0; 32],
                },
            );
            prev_hash = hash;
        }

        let index = Index(headers, genesis_hash);

        // Boundaries at i = 15 and i = 27 (deltas has 28 entries, so the
        // tip after the loop is at height 28, covering both retargets).
        // `tc` below is exactly the value `next_difficulty` itself
        // recurses into for the boundary tip, so comparing the
        // boundary's result against it directly checks the clamp the
        // function promises: within a factor of `difficulty_factor`,
        // never below 1.
        for boundary_height in [14u64, 26u64] {
            let boundary_tip = mkhash(boundary_height);
            let prev_hash = index.get(&boundary_tip).expect("boundary tip indexed").prev_header_hash;
            let tc = next_difficulty(&index, &prev_hash, &params, &mut DifficultyMemo::new());
            let d = next_difficulty(&index, &boundary_tip, &params, &mut DifficultyMemo::new());
            prop_assert!(d >= 1);
            prop_assert!(d <= tc.max(1) * params.difficulty_factor);
            prop_assert!(d * params.difficulty_factor >= tc.max(1));
        }
    }
}
