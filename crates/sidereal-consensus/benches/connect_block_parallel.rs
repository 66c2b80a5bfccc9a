//! Benches the pure, block-local pre-validation steps (proof-of-space
//! hash, harvester signature, quality extraction, VDF check) fanned out
//! across a `rayon` pool, mirroring the worker-pool shape the node's
//! single-writer actor dispatches to before serial validation.

use criterion::{criterion_group, criterion_main, Criterion};
use rayon::prelude::*;
use sidereal_consensus::{
    pre_validate_block, Body, ChallengeChainData, Coin, ConsensusParams, FullBlock, Hash32,
    HeaderBlock, HeaderData, ProofOfSpace, ProofOfTime,
};
use sidereal_crypto::CryptoProvider;

struct AlwaysOkCrypto;

impl sidereal_crypto::PoSpaceVerifier for AlwaysOkCrypto {
    fn verify_and_get_quality(
        &self,
        _pool_public_key: &[u8],
        _plot_public_key: &[u8],
        _challenge_hash: &Hash32,
        proof_bytes: &[u8],
        _size: u8,
    ) -> Result<Option<Hash32>, String> {
        let mut q = [0u8; 32];
        q[0..8].copy_from_slice(&(proof_bytes.len() as u64).to_le_bytes());
        Ok(Some(q))
    }
}

impl sidereal_crypto::VdfVerifier for AlwaysOkCrypto {
    fn verify(
        &self,
        _discriminant_size_bits: u32,
        _challenge_hash: &Hash32,
        _output_a: &[u8],
        _output_b: &[u8],
        _number_of_iterations: u64,
        _witness: &[u8],
        _witness_type: u8,
    ) -> Result<bool, String> {
        Ok(true)
    }
}

impl sidereal_crypto::BlsVerifier for AlwaysOkCrypto {
    fn verify(&self, _public_key: &[u8], _message: &[u8], _signature: &[u8]) -> Result<bool, String> {
        Ok(true)
    }
    fn aggregate_verify(
        &self,
        _pairs: &[(Vec<u8>, Vec<u8>)],
        _aggregate_signature: &[u8],
    ) -> Result<bool, String> {
        Ok(true)
    }
}

fn synthetic_block(height: u64) -> FullBlock {
    let coinbase = Coin {
        parent_coin_id: [0; 32],
        puzzle_hash: [1; 32],
        amount: 1,
    };
    let fees_coin = Coin {
        parent_coin_id: [0; 32],
        puzzle_hash: [2; 32],
        amount: 1,
    };
    let body = Body {
        coinbase,
        coinbase_solution: vec![],
        fees_coin,
        aggregated_signature: None,
        transactions: None,
    };
    let proof_of_space = ProofOfSpace {
        challenge_hash: [0; 32],
        pool_public_key: vec![1; 48],
        plot_public_key: vec![2; 48],
        size: 32,
        proof_bytes: vec![0u8; 64 + (height as usize % 8)],
    };
    let data = HeaderData {
        height,
        prev_header_hash: [0; 32],
        timestamp: 1_000 + height,
        proof_of_space_hash: proof_of_space.hash(),
        body_hash: body.hash(),
        challenge: ChallengeChainData {
            challenge: [0; 32],
            total_weight: height,
            total_iters: height * 1_000,
        },
    };
    let header = HeaderBlock {
        data,
        proof_of_space,
        proof_of_time: Some(ProofOfTime {
            challenge_hash: [0; 32],
            number_of_iterations: 1,
            output_a: vec![],
            output_b: vec![],
            witness_type: 0,
            witness: vec![],
        }),
        coinbase_signature: vec![],
        harvester_signature: vec![],
    };
    FullBlock { header, body }
}

fn bench_parallel_prevalidation(c: &mut Criterion) {
    let crypto: &dyn CryptoProvider = &AlwaysOkCrypto;
    let params = ConsensusParams::default();
    let blocks: Vec<FullBlock> = (0..512).map(synthetic_block).collect();

    c.bench_function("connect_block_parallel/512_blocks", |b| {
        b.iter(|| {
            blocks
                .par_iter()
                .map(|blk| pre_validate_block(blk, crypto, &params))
                .filter(|r| r.ok)
                .count()
        })
    });
}

criterion_group!(benches, bench_parallel_prevalidation);
criterion_main!(benches);
