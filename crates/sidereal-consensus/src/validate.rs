//! Block validator (component H). Splits into "unfinished" checks (pure
//! over the candidate block and the header index) and "finished" checks
//! (retargeting plus transaction validation).

use sidereal_crypto::{BlsVerifier, CryptoProvider, PoSpaceVerifier, VdfVerifier};

use crate::constants::ConsensusParams;
use crate::error::{ErrorCode, TxError};
use crate::header_index::HeaderIndex;
use crate::retarget::{calculate_iterations_quality, next_difficulty, next_ips, DifficultyMemo, IpsMemo};
use crate::stores::{CoinDiff, ConditionInterpreter, UnspentStore};
use crate::subsidy::coinbase_and_fee_base;
use crate::tx::{check_fee_conservation, validate_transactions};
use crate::types::{FullBlock, Hash32};

/// Result of the four pure, block-local steps that may run on a worker
/// pool ahead of serial validation: proof-of-space hash, harvester
/// signature, quality extraction, VDF validity.
#[derive(Clone, Copy, Debug)]
pub struct PreValidationResult {
    pub ok: bool,
    pub quality: Option<Hash32>,
}

/// Proof-of-space hash check, harvester signature, quality extraction,
/// and VDF validity. Pure over the block itself and `params` — safe to
/// run off the single-writer task on a `rayon` worker. Takes
/// `discriminant_size_bits` from the same `ConsensusParams` the serial
/// path uses, so a parallel and a serial run of this validator always
/// check the VDF at the same width.
pub fn pre_validate_block(
    block: &FullBlock,
    crypto: &dyn CryptoProvider,
    params: &ConsensusParams,
) -> PreValidationResult {
    let header = &block.header;

    // Step 1: H(proof_of_space) == header.data.proof_of_space_hash
    if header.proof_of_space.hash() != header.data.proof_of_space_hash {
        return PreValidationResult {
            ok: false,
            quality: None,
        };
    }

    // Step 4: harvester BLS signature over H(header.data), under the plot key.
    let header_hash = header.data.hash();
    match BlsVerifier::verify(
        crypto,
        &header.proof_of_space.plot_public_key,
        &header_hash,
        &header.harvester_signature,
    ) {
        Ok(true) => {}
        _ => {
            return PreValidationResult {
                ok: false,
                quality: None,
            }
        }
    }

    // Step 9: proof-of-space quality extraction.
    let quality = match crypto.verify_and_get_quality(
        &header.proof_of_space.pool_public_key,
        &header.proof_of_space.plot_public_key,
        &header.proof_of_space.challenge_hash,
        &header.proof_of_space.proof_bytes,
        header.proof_of_space.size,
    ) {
        Ok(Some(q)) => q,
        _ => {
            return PreValidationResult {
                ok: false,
                quality: None,
            }
        }
    };

    // Step 13: VDF validity.
    let Some(pot) = &header.proof_of_time else {
        return PreValidationResult {
            ok: false,
            quality: None,
        };
    };
    let vdf_ok = VdfVerifier::verify(
        crypto,
        params.discriminant_size_bits,
        &pot.challenge_hash,
        &pot.output_a,
        &pot.output_b,
        pot.number_of_iterations,
        &pot.witness,
        pot.witness_type,
    )
    .unwrap_or(false);
    if !vdf_ok {
        return PreValidationResult {
            ok: false,
            quality: None,
        };
    }

    PreValidationResult {
        ok: true,
        quality: Some(quality),
    }
}

/// `validate_unfinished`: every check except VDF validity and PoT
/// challenge continuity, which require the finished block. Returns the
/// extracted 32-byte quality on success, skipping re-derivation of steps
/// already covered by `pre_validated`.
#[allow(clippy::too_many_arguments)]
pub fn validate_unfinished(
    index: &dyn HeaderIndex,
    block: &FullBlock,
    crypto: &dyn CryptoProvider,
    params: &ConsensusParams,
    now: u64,
    pre_validated: Option<PreValidationResult>,
) -> Result<Hash32, TxError> {
    let header = &block.header;
    let data = &header.data;

    let quality = if let Some(pre) = pre_validated {
        if !pre.ok {
            return Err(TxError::bare(ErrorCode::InvalidBlock));
        }
        pre.quality.expect("pre-validated ok implies quality")
    } else {
        // Steps 1, 4, 9 serially.
        if header.proof_of_space.hash() != data.proof_of_space_hash {
            return Err(TxError::new(ErrorCode::InvalidBlock, "pos hash mismatch"));
        }

        // Step 3: coinbase BLS signature under the pool key signs coinbase.name().
        let coinbase_name = block.body.coinbase.name();
        let coinbase_sig_ok = BlsVerifier::verify(
            crypto,
            &header.proof_of_space.pool_public_key,
            &coinbase_name,
            &header.coinbase_signature,
        )
        .unwrap_or(false);
        if !coinbase_sig_ok {
            return Err(TxError::new(ErrorCode::InvalidBlock, "bad coinbase signature"));
        }

        let header_hash = data.hash();
        let harvester_sig_ok = BlsVerifier::verify(
            crypto,
            &header.proof_of_space.plot_public_key,
            &header_hash,
            &header.harvester_signature,
        )
        .unwrap_or(false);
        if !harvester_sig_ok {
            return Err(TxError::new(ErrorCode::InvalidBlock, "bad harvester signature"));
        }

        match crypto.verify_and_get_quality(
            &header.proof_of_space.pool_public_key,
            &header.proof_of_space.plot_public_key,
            &header.proof_of_space.challenge_hash,
            &header.proof_of_space.proof_bytes,
            header.proof_of_space.size,
        ) {
            Ok(Some(q)) => q,
            _ => return Err(TxError::new(ErrorCode::InvalidBlock, "bad pos quality")),
        }
    };

    // Step 2: H(body) == header.data.body_hash.
    if block.body.hash() != data.body_hash {
        return Err(TxError::new(ErrorCode::InvalidBlock, "body hash mismatch"));
    }

    let is_genesis = data.height == 0;

    // Step 5: non-genesis must connect to a known header.
    let prev = if is_genesis {
        None
    } else {
        let prev = index
            .get(&data.prev_header_hash)
            .ok_or_else(|| TxError::new(ErrorCode::InvalidBlock, "prev header unknown"))?;
        Some(prev.clone())
    };

    // Step 6: timestamp window.
    if let Some(prev) = &prev {
        let mut timestamps = Vec::with_capacity(params.number_of_timestamps);
        let mut cursor = prev.header_hash;
        for _ in 0..params.number_of_timestamps {
            let Some(h) = index.get(&cursor) else { break };
            timestamps.push(h.timestamp);
            if h.is_genesis() {
                break;
            }
            cursor = h.prev_header_hash;
        }
        let mean = timestamps.iter().sum::<u64>() / (timestamps.len() as u64);
        if data.timestamp < mean {
            return Err(TxError::new(ErrorCode::InvalidBlock, "timestamp too old"));
        }
    }
    if data.timestamp > now + params.max_future_time {
        return Err(TxError::new(ErrorCode::InvalidBlock, "timestamp too far in future"));
    }

    // Step 7: reserved filter-hash check — a no-op until the filter
    // design lands.

    // Step 8: challenge continuity.
    match &prev {
        None => {
            if header.proof_of_space.challenge_hash != data.challenge.challenge {
                return Err(TxError::new(ErrorCode::InvalidBlock, "genesis challenge mismatch"));
            }
        }
        Some(prev) => {
            if header.proof_of_space.challenge_hash != prev.challenge_digest {
                return Err(TxError::new(ErrorCode::InvalidBlock, "challenge continuity broken"));
            }
        }
    }

    // Step 10: height continuity.
    let expected_height = prev.as_ref().map(|p| p.height + 1).unwrap_or(0);
    if data.height != expected_height {
        return Err(TxError::new(ErrorCode::InvalidBlock, "height mismatch"));
    }

    Ok(quality)
}

/// `validate_finished`: retargeting, VDF/weight/iteration accounting,
/// and coinbase/transaction rules. Requires that `validate_unfinished`
/// already passed and returned `quality`. Returns
/// the block's effect on the coin set so the caller can hand it to
/// `ChainState::receive_block` and the `UnspentStore` without
/// re-deriving it from the transactions a second time.
#[allow(clippy::too_many_arguments)]
pub fn validate_finished(
    index: &dyn HeaderIndex,
    block: &FullBlock,
    quality: Hash32,
    crypto_vdf: &dyn VdfVerifier,
    crypto_bls: &dyn BlsVerifier,
    interpreter: &dyn ConditionInterpreter,
    unspent_store: &dyn UnspentStore,
    params: &ConsensusParams,
    pre_validated_pot: bool,
    diff_memo: &mut DifficultyMemo,
    ips_memo: &mut IpsMemo,
) -> Result<CoinDiff, TxError> {
    let header = &block.header;
    let data = &header.data;
    let is_genesis = data.height == 0;

    let (difficulty, ips) = if is_genesis {
        (params.difficulty_starting, params.vdf_ips_starting)
    } else {
        (
            next_difficulty(index, &data.prev_header_hash, params, diff_memo),
            next_ips(index, &data.prev_header_hash, params, ips_memo),
        )
    };

    // Step 12: derive and check number_of_iters.
    let number_of_iters = calculate_iterations_quality(
        &quality,
        header.proof_of_space.size,
        difficulty,
        ips,
        params.min_block_time,
    );
    let pot = header
        .proof_of_time
        .as_ref()
        .ok_or_else(|| TxError::new(ErrorCode::InvalidBlock, "missing proof of time"))?;
    if number_of_iters != pot.number_of_iterations {
        return Err(TxError::new(ErrorCode::InvalidBlock, "iteration count mismatch"));
    }

    // Step 13/14: VDF validity and challenge continuity on the PoT side.
    if !pre_validated_pot {
        let vdf_ok = crypto_vdf
            .verify(
                params.discriminant_size_bits,
                &pot.challenge_hash,
                &pot.output_a,
                &pot.output_b,
                pot.number_of_iterations,
                &pot.witness,
                pot.witness_type,
            )
            .unwrap_or(false);
        if !vdf_ok {
            return Err(TxError::new(ErrorCode::InvalidBlock, "vdf invalid"));
        }
    }
    if pot.challenge_hash != header.proof_of_space.challenge_hash {
        return Err(TxError::new(ErrorCode::InvalidBlock, "pot challenge mismatch"));
    }

    // Step 15/16: weight and total_iters accounting.
    let prev_summary = if is_genesis {
        None
    } else {
        index.get(&data.prev_header_hash)
    };
    let expected_total_weight = prev_summary.map(|p| p.weight).unwrap_or(0) + difficulty;
    let expected_total_iters = prev_summary.map(|p| p.total_iters).unwrap_or(0) + number_of_iters;
    if data.challenge.total_weight != expected_total_weight {
        return Err(TxError::new(ErrorCode::InvalidBlock, "total weight mismatch"));
    }
    if data.challenge.total_iters != expected_total_iters {
        return Err(TxError::new(ErrorCode::InvalidBlock, "total iters mismatch"));
    }

    // Step 17/18: coinbase/fee accounting, transaction validation.
    let (expected_coinbase, fee_base) = coinbase_and_fee_base(params, data.height);
    if block.body.coinbase.amount != expected_coinbase {
        return Err(TxError::bare(ErrorCode::BadCoinbaseReward));
    }

    let coinbase_name = block.body.coinbase.name();
    let mut additions = vec![block.body.coinbase.clone(), block.body.fees_coin.clone()];
    let mut removals: Vec<Hash32> = Vec::new();

    match (&block.body.aggregated_signature, &block.body.transactions) {
        (None, txs) => {
            if txs.is_some() {
                return Err(TxError::new(ErrorCode::InvalidBlock, "unsigned block carries transactions"));
            }
            check_fee_conservation(0, fee_base, block.body.fees_coin.amount)?;
        }
        (Some(_agg_sig), Some(txs)) => {
            let outcome = validate_transactions(
                txs,
                data.height,
                unspent_store,
                interpreter,
                crypto_bls,
                params.max_coin_amount,
                params.coinbase_freeze_period,
                params.block_cost_max,
            )?;
            check_fee_conservation(outcome.fees, fee_base, block.body.fees_coin.amount)?;
            additions.extend(outcome.additions);
            removals = outcome.removals;
        }
        (Some(_), None) => {
            return Err(TxError::new(ErrorCode::InvalidBlock, "signature without transactions"));
        }
    }

    Ok(CoinDiff {
        header_hash: block.header_hash(),
        height: data.height,
        additions,
        removals,
        coinbase: Some(coinbase_name),
    })
}
