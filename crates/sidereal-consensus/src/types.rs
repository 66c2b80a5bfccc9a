//! Core data model: coins, unspent records, headers, and the proof types
//! that make up a candidate block.

use serde::{Deserialize, Serialize};

use crate::hash::sha3_256_concat;

pub type Hash32 = [u8; 32];

/// Identity = `H(parent_coin_id || puzzle_hash || amount)`. Two coins with
/// the same parent, puzzle hash, and amount are the same coin — this is
/// what makes "ephemeral" coins (created and spent in the same block)
/// well defined without an explicit index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub parent_coin_id: Hash32,
    pub puzzle_hash: Hash32,
    pub amount: u64,
}

impl Coin {
    pub fn name(&self) -> Hash32 {
        sha3_256_concat(&[
            &self.parent_coin_id,
            &self.puzzle_hash,
            &self.amount.to_le_bytes(),
        ])
    }
}

/// A coin's lifecycle record in the unspent store. `spent_index` is only
/// meaningful when `spent_flag` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentRecord {
    pub coin: Coin,
    pub confirmed_index: u64,
    pub spent_index: u64,
    pub spent_flag: bool,
    pub coinbase_flag: bool,
}

impl UnspentRecord {
    pub fn new_unspent(coin: Coin, confirmed_index: u64, coinbase_flag: bool) -> Self {
        UnspentRecord {
            coin,
            confirmed_index,
            spent_index: 0,
            spent_flag: false,
            coinbase_flag,
        }
    }

    pub fn spend(&mut self, spent_index: u64) {
        self.spent_flag = true;
        self.spent_index = spent_index;
    }
}

/// A proof-of-space submission. `proof_bytes` is opaque to consensus; the
/// `CryptoProvider::verify_and_get_quality` collaborator interprets it
/// against a plotter-specific table encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfSpace {
    pub challenge_hash: Hash32,
    pub pool_public_key: Vec<u8>,
    pub plot_public_key: Vec<u8>,
    pub size: u8,
    pub proof_bytes: Vec<u8>,
}

impl ProofOfSpace {
    pub fn hash(&self) -> Hash32 {
        sha3_256_concat(&[
            &self.challenge_hash,
            &self.pool_public_key,
            &self.plot_public_key,
            &[self.size],
            &self.proof_bytes,
        ])
    }
}

/// A Wesolowski-style VDF output plus witness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfTime {
    pub challenge_hash: Hash32,
    pub number_of_iterations: u64,
    pub output_a: Vec<u8>,
    pub output_b: Vec<u8>,
    pub witness_type: u8,
    pub witness: Vec<u8>,
}

/// Per-block challenge-chain bookkeeping: the running weight/iteration
/// totals and the challenge that the *next* block's proof of space must
/// reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeChainData {
    pub challenge: Hash32,
    pub total_weight: u64,
    pub total_iters: u64,
}

impl ChallengeChainData {
    pub fn next_challenge(&self) -> Hash32 {
        sha3_256_concat(&[&self.challenge])
    }
}

/// The data actually hashed to produce `header_hash`; everything a
/// validator needs that isn't the block body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderData {
    pub height: u64,
    pub prev_header_hash: Hash32,
    pub timestamp: u64,
    pub proof_of_space_hash: Hash32,
    pub body_hash: Hash32,
    pub challenge: ChallengeChainData,
}

impl HeaderData {
    pub fn hash(&self) -> Hash32 {
        sha3_256_concat(&[
            &self.height.to_le_bytes(),
            &self.prev_header_hash,
            &self.timestamp.to_le_bytes(),
            &self.proof_of_space_hash,
            &self.body_hash,
            &self.challenge.challenge,
            &self.challenge.total_weight.to_le_bytes(),
            &self.challenge.total_iters.to_le_bytes(),
        ])
    }
}

/// The full header carried during validation: header data plus the two
/// external proofs. `HeaderSummary` is the compact form kept resident in
/// the in-memory index once a block has been accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBlock {
    pub data: HeaderData,
    pub proof_of_space: ProofOfSpace,
    pub proof_of_time: Option<ProofOfTime>,
    pub coinbase_signature: Vec<u8>,
    pub harvester_signature: Vec<u8>,
}

/// Compact in-memory header, the unit the header index and fork-choice
/// engine actually operate on. Weight and `total_iters` are carried
/// denormalized here so fork-choice comparisons never need to touch the
/// block store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSummary {
    pub header_hash: Hash32,
    pub prev_header_hash: Hash32,
    pub height: u64,
    pub weight: u64,
    pub total_iters: u64,
    pub timestamp: u64,
    pub challenge_digest: Hash32,
    pub proof_of_space_hash: Hash32,
}

impl HeaderSummary {
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub coinbase: Coin,
    pub coinbase_solution: Vec<u8>,
    pub fees_coin: Coin,
    pub aggregated_signature: Option<Vec<u8>>,
    pub transactions: Option<Vec<SpendBundle>>,
}

impl Body {
    pub fn hash(&self) -> Hash32 {
        let mut parts: Vec<Vec<u8>> = vec![
            self.coinbase.name().to_vec(),
            self.coinbase_solution.clone(),
            self.fees_coin.name().to_vec(),
        ];
        if let Some(sig) = &self.aggregated_signature {
            parts.push(sig.clone());
        }
        if let Some(txs) = &self.transactions {
            for tx in txs {
                parts.push(tx.name().to_vec());
            }
        }
        let refs: Vec<&[u8]> = parts.iter().map(|v| v.as_slice()).collect();
        sha3_256_concat(&refs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullBlock {
    pub header: HeaderBlock,
    pub body: Body,
}

impl FullBlock {
    pub fn header_hash(&self) -> Hash32 {
        self.header.data.hash()
    }
}

/// A single coin spend: the coin being spent, the solution to its
/// puzzle, and (opaque to consensus) the puzzle program itself. The
/// condition interpreter (§6) turns a list of these into NPC records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSpend {
    pub coin: Coin,
    pub puzzle_reveal: Vec<u8>,
    pub solution: Vec<u8>,
}

/// Atomic transaction: a list of coin spends plus the aggregate BLS
/// signature authorizing them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendBundle {
    pub coin_spends: Vec<CoinSpend>,
    pub aggregated_signature: Vec<u8>,
}

impl SpendBundle {
    pub fn name(&self) -> Hash32 {
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(self.coin_spends.len() + 1);
        for cs in &self.coin_spends {
            parts.push(cs.coin.name().to_vec());
            parts.push(cs.puzzle_reveal.clone());
            parts.push(cs.solution.clone());
        }
        parts.push(self.aggregated_signature.clone());
        let refs: Vec<&[u8]> = parts.iter().map(|v| v.as_slice()).collect();
        sha3_256_concat(&refs)
    }
}
