//! Transaction validator (component I): turns a block's spend bundles
//! into NPC records via the external condition interpreter, then checks
//! double-spend freedom, puzzle-hash match, coinbase maturity, block-index
//! and block-age assertions, and fee conservation.

use std::collections::{HashMap, HashSet};

use sidereal_crypto::BlsVerifier;

use crate::error::{ErrorCode, TxError};
use crate::stores::{Condition, ConditionInterpreter, Npc, UnspentStore};
use crate::types::{Coin, Hash32, SpendBundle, UnspentRecord};

pub struct TxValidationOutcome {
    pub additions: Vec<Coin>,
    pub removals: Vec<Hash32>,
    pub fees: u64,
    pub cost: u64,
}

/// Evaluates `bundles` against the unspent state as of `tip_header` and
/// the in-block ephemeral coins created by earlier bundles in the same
/// block: cost accounting, double-spend and duplicate-output rejection,
/// coinbase maturity, block-index/block-age assertions, and fee
/// conservation against the aggregate signature.
#[allow(clippy::too_many_arguments)]
pub fn validate_transactions(
    bundles: &[SpendBundle],
    height: u64,
    unspent_store: &dyn UnspentStore,
    interpreter: &dyn ConditionInterpreter,
    crypto: &dyn BlsVerifier,
    max_coin_amount: u64,
    coinbase_freeze_period: u64,
    block_cost_max: u64,
) -> Result<TxValidationOutcome, TxError> {
    let mut npcs: Vec<Npc> = Vec::new();
    let mut total_cost: u64 = 0;

    for bundle in bundles {
        for spend in &bundle.coin_spends {
            let coin_name = spend.coin.name();
            let (npc, cost) = interpreter.get_name_puzzle_conditions(
                &coin_name,
                &spend.puzzle_reveal,
                &spend.solution,
            )?;
            total_cost = total_cost
                .checked_add(cost)
                .ok_or(TxError::bare(ErrorCode::BlockCostExceedsMax))?;
            npcs.push(npc);
        }
    }

    if total_cost > block_cost_max {
        return Err(TxError::bare(ErrorCode::BlockCostExceedsMax));
    }

    // additions: every CREATE_COIN condition produces a new coin whose
    // parent is the spending coin.
    let mut additions: Vec<Coin> = Vec::new();
    let mut addition_names: HashSet<Hash32> = HashSet::new();
    let mut removal_names: HashSet<Hash32> = HashSet::new();
    let mut removals: Vec<Hash32> = Vec::new();
    let mut aggsig_pairs: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

    for npc in &npcs {
        if !removal_names.insert(npc.coin_name) {
            return Err(TxError::bare(ErrorCode::DoubleSpend));
        }
        removals.push(npc.coin_name);

        for cond in &npc.conditions {
            match cond {
                Condition::CreateCoin {
                    puzzle_hash,
                    amount,
                } => {
                    if *amount >= max_coin_amount {
                        return Err(TxError::bare(ErrorCode::CoinAmountExceedsMaximum));
                    }
                    let coin = Coin {
                        parent_coin_id: npc.coin_name,
                        puzzle_hash: *puzzle_hash,
                        amount: *amount,
                    };
                    let name = coin.name();
                    if !addition_names.insert(name) {
                        return Err(TxError::bare(ErrorCode::DuplicateOutput));
                    }
                    additions.push(coin);
                }
                Condition::AggSigMe { pubkey, message } => {
                    aggsig_pairs.push((pubkey.clone(), message.clone()));
                }
                // Evaluated against the spent coin's confirmation height below,
                // once the unspent record for this npc is in hand.
                Condition::AssertBlockIndexExceeds(_) | Condition::AssertBlockAgeExceeds(_) => {}
            }
        }
    }

    // Ephemeral coins: created and spent within the same block are
    // treated as unspent at height+1, never consulting the store.
    let ephemeral: HashSet<Hash32> = additions
        .iter()
        .map(|c| c.name())
        .filter(|n| removal_names.contains(n))
        .collect();

    let mut total_in: u64 = 0;
    for npc in &npcs {
        let name = npc.coin_name;
        let record: UnspentRecord = if ephemeral.contains(&name) {
            // Synthesized as just-created, unspent, non-coinbase.
            UnspentRecord {
                coin: additions
                    .iter()
                    .find(|c| c.name() == name)
                    .cloned()
                    .expect("ephemeral coin must be in additions"),
                confirmed_index: height + 1,
                spent_index: 0,
                spent_flag: false,
                coinbase_flag: false,
            }
        } else {
            match unspent_store.get_unspent(&name) {
                None => return Err(TxError::bare(ErrorCode::UnknownUnspent)),
                Some(r) => r,
            }
        };

        if record.spent_flag {
            return Err(TxError::bare(ErrorCode::DoubleSpend));
        }
        if record.coinbase_flag && height < record.confirmed_index + coinbase_freeze_period {
            return Err(TxError::bare(ErrorCode::CoinbaseNotYetSpendable));
        }
        if record.coin.puzzle_hash != npc.puzzle_hash {
            return Err(TxError::bare(ErrorCode::WrongPuzzleHash));
        }
        for cond in &npc.conditions {
            match cond {
                Condition::AssertBlockIndexExceeds(h) => {
                    if height <= *h {
                        return Err(TxError::bare(ErrorCode::AssertBlockIndexExceedsFailed));
                    }
                }
                Condition::AssertBlockAgeExceeds(age) => {
                    if height <= record.confirmed_index + age {
                        return Err(TxError::bare(ErrorCode::AssertBlockAgeExceedsFailed));
                    }
                }
                Condition::CreateCoin { .. } | Condition::AggSigMe { .. } => {}
            }
        }

        total_in = total_in
            .checked_add(record.coin.amount)
            .ok_or(TxError::bare(ErrorCode::CoinAmountExceedsMaximum))?;
    }

    let total_out: u64 = additions.iter().map(|c| c.amount).sum();
    if total_out > total_in {
        return Err(TxError::bare(ErrorCode::MintingCoin));
    }
    let fees = total_in - total_out;

    let aggregate_sig = bundles
        .iter()
        .flat_map(|b| b.aggregated_signature.clone())
        .collect::<Vec<u8>>();
    if !crypto
        .aggregate_verify(&aggsig_pairs, &aggregate_sig)
        .map_err(|_| TxError::bare(ErrorCode::BadAggregateSignature))?
    {
        return Err(TxError::bare(ErrorCode::BadAggregateSignature));
    }

    Ok(TxValidationOutcome {
        additions,
        removals,
        fees,
        cost: total_cost,
    })
}

/// A minimal in-memory condition interpreter backing tests: treats the
/// puzzle reveal as a fixed 32-byte puzzle hash and the solution as a
/// flat encoding of conditions. Production deployments supply the real
/// puzzle VM, which is out of scope for this core.
pub struct ReferenceInterpreter;

impl ConditionInterpreter for ReferenceInterpreter {
    fn get_name_puzzle_conditions(
        &self,
        coin_name: &Hash32,
        puzzle_reveal: &[u8],
        solution: &[u8],
    ) -> Result<(Npc, u64), TxError> {
        if puzzle_reveal.len() != 32 {
            return Err(TxError::new(ErrorCode::InvalidBlock, "bad puzzle reveal"));
        }
        let mut puzzle_hash = [0u8; 32];
        puzzle_hash.copy_from_slice(puzzle_reveal);

        let mut conditions = Vec::new();
        let mut cost: u64 = 1;
        let mut offset = 0;
        while offset < solution.len() {
            let opcode = solution[offset];
            offset += 1;
            match opcode {
                0x01 => {
                    // CREATE_COIN: 32-byte puzzle hash, 8-byte LE amount
                    let ph: [u8; 32] = solution[offset..offset + 32].try_into().unwrap();
                    let amount =
                        u64::from_le_bytes(solution[offset + 32..offset + 40].try_into().unwrap());
                    offset += 40;
                    conditions.push(Condition::CreateCoin {
                        puzzle_hash: ph,
                        amount,
                    });
                    cost += 10;
                }
                0x02 => {
                    // AGGSIG_ME: pubkey(48) + message(32)
                    let pubkey = solution[offset..offset + 48].to_vec();
                    let message = solution[offset + 48..offset + 80].to_vec();
                    offset += 80;
                    conditions.push(Condition::AggSigMe { pubkey, message });
                    cost += 20;
                }
                0x03 => {
                    let height =
                        u64::from_le_bytes(solution[offset..offset + 8].try_into().unwrap());
                    offset += 8;
                    conditions.push(Condition::AssertBlockIndexExceeds(height));
                    cost += 1;
                }
                0x04 => {
                    let age = u64::from_le_bytes(solution[offset..offset + 8].try_into().unwrap());
                    offset += 8;
                    conditions.push(Condition::AssertBlockAgeExceeds(age));
                    cost += 1;
                }
                _ => return Err(TxError::new(ErrorCode::InvalidBlock, "unknown opcode")),
            }
        }

        Ok((
            Npc {
                coin_name: *coin_name,
                puzzle_hash,
                conditions,
            },
            cost,
        ))
    }
}

/// Checks `fees + fee_base == fees_coin.amount`: the fees coin must carry
/// exactly the subsidy's fee base plus whatever transaction fees this
/// block collected, no more and no less.
pub fn check_fee_conservation(
    fees: u64,
    fee_base: u64,
    fees_coin_amount: u64,
) -> Result<(), TxError> {
    let expected = fee_base
        .checked_add(fees)
        .ok_or(TxError::bare(ErrorCode::BadCoinbaseReward))?;
    if expected != fees_coin_amount {
        return Err(TxError::bare(ErrorCode::BadCoinbaseReward));
    }
    Ok(())
}
