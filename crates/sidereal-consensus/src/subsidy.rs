use crate::constants::ConsensusParams;

/// Heights per halving epoch: the reward halves every such window, via
/// an integer right-shift rather than a floating-point curve.
pub const REWARD_HALVING_INTERVAL: u64 = 1_050_000;

/// `block_reward(height)`: starts at `INITIAL_REWARD` and halves every
/// `REWARD_HALVING_INTERVAL` heights, floored at zero once the shift
/// exceeds 63 bits.
pub fn block_reward(params: &ConsensusParams, height: u64) -> u64 {
    let _ = params;
    let halvings = height / REWARD_HALVING_INTERVAL;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_REWARD >> halvings
}

const INITIAL_REWARD: u64 = 16_000_000_000;

/// Splits `block_reward(height)` into the coinbase's own share (7/8) and
/// the `fee_base` that the fees-coin must carry on top of transaction
/// fees.
pub fn coinbase_and_fee_base(params: &ConsensusParams, height: u64) -> (u64, u64) {
    let reward = block_reward(params, height);
    let coinbase_amount = (reward / 8) * 7;
    let fee_base = reward / 8;
    (coinbase_amount, fee_base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_halves_on_schedule() {
        let p = ConsensusParams::default();
        assert_eq!(block_reward(&p, 0), INITIAL_REWARD);
        assert_eq!(
            block_reward(&p, REWARD_HALVING_INTERVAL),
            INITIAL_REWARD / 2
        );
        assert_eq!(
            block_reward(&p, REWARD_HALVING_INTERVAL * 2),
            INITIAL_REWARD / 4
        );
    }

    #[test]
    fn coinbase_and_fee_base_sum_to_seven_eighths_and_one_eighth() {
        let p = ConsensusParams::default();
        let (coinbase, fee_base) = coinbase_and_fee_base(&p, 0);
        assert_eq!(coinbase, (INITIAL_REWARD / 8) * 7);
        assert_eq!(fee_base, INITIAL_REWARD / 8);
    }
}
