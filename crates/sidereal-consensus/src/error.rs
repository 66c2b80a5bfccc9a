use core::fmt;

/// Consensus rejection taxonomy. These are the only values a validator,
/// the fork-choice engine, or the mempool may return for *policy*
/// failures; store/channel failures live in the node crate's own error
/// type and must never be folded into this one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    // Connectivity
    AlreadyHaveBlock,
    DisconnectedBlock,
    ExtendsUnknownBlock,
    BlockNotInBlockchain,

    // Structural
    InvalidGenesisBlock,
    InvalidBlock,

    // Transaction
    UnknownUnspent,
    DoubleSpend,
    DuplicateOutput,
    MintingCoin,
    CoinAmountExceedsMaximum,
    CoinbaseNotYetSpendable,
    WrongPuzzleHash,
    BadAggregateSignature,
    BadCoinbaseReward,
    BlockCostExceedsMax,

    // Mempool
    MempoolConflict,
    InvalidFeeNoFee,
    InvalidFeeLowFee,
    AssertBlockIndexExceedsFailed,
    AssertBlockAgeExceedsFailed,

    // Generic
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AlreadyHaveBlock => "ALREADY_HAVE_BLOCK",
            ErrorCode::DisconnectedBlock => "DISCONNECTED_BLOCK",
            ErrorCode::ExtendsUnknownBlock => "EXTENDS_UNKNOWN_BLOCK",
            ErrorCode::BlockNotInBlockchain => "BLOCK_NOT_IN_BLOCKCHAIN",

            ErrorCode::InvalidGenesisBlock => "INVALID_GENESIS_BLOCK",
            ErrorCode::InvalidBlock => "INVALID_BLOCK",

            ErrorCode::UnknownUnspent => "UNKNOWN_UNSPENT",
            ErrorCode::DoubleSpend => "DOUBLE_SPEND",
            ErrorCode::DuplicateOutput => "DUPLICATE_OUTPUT",
            ErrorCode::MintingCoin => "MINTING_COIN",
            ErrorCode::CoinAmountExceedsMaximum => "COIN_AMOUNT_EXCEEDS_MAXIMUM",
            ErrorCode::CoinbaseNotYetSpendable => "COINBASE_NOT_YET_SPENDABLE",
            ErrorCode::WrongPuzzleHash => "WRONG_PUZZLE_HASH",
            ErrorCode::BadAggregateSignature => "BAD_AGGREGATE_SIGNATURE",
            ErrorCode::BadCoinbaseReward => "BAD_COINBASE_REWARD",
            ErrorCode::BlockCostExceedsMax => "BLOCK_COST_EXCEEDS_MAX",

            ErrorCode::MempoolConflict => "MEMPOOL_CONFLICT",
            ErrorCode::InvalidFeeNoFee => "INVALID_FEE_NO_FEE",
            ErrorCode::InvalidFeeLowFee => "INVALID_FEE_LOW_FEE",
            ErrorCode::AssertBlockIndexExceedsFailed => "ASSERT_BLOCK_INDEX_EXCEEDS_FAILED",
            ErrorCode::AssertBlockAgeExceedsFailed => "ASSERT_BLOCK_AGE_EXCEEDS_FAILED",

            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxError {
    pub code: ErrorCode,
    pub msg: &'static str,
}

impl TxError {
    pub fn new(code: ErrorCode, msg: &'static str) -> Self {
        Self { code, msg }
    }

    pub fn bare(code: ErrorCode) -> Self {
        Self { code, msg: "" }
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msg.is_empty() {
            write!(f, "{}", self.code.as_str())
        } else {
            write!(f, "{}: {}", self.code.as_str(), self.msg)
        }
    }
}

impl std::error::Error for TxError {}

/// Outcome of `ChainState::receive_block`. `ADDED_AS_ORPHAN` covers both
/// "joined tips but wasn't the best" and "didn't join tips at all" —
/// spec terms both an orphan, since neither moves the LCA.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveBlockResult {
    AddedToHead,
    AddedAsOrphan,
    InvalidBlock,
    AlreadyHaveBlock,
    DisconnectedBlock,
}
