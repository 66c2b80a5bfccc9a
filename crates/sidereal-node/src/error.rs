//! Node-crate error type. Store/consensus failures get wrapped here
//! rather than folded into either crate's own error type, per
//! `sidereal_consensus::ErrorCode`'s note that store/channel failures
//! belong in the node crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] sidereal_store::StoreError),

    #[error("consensus error: {0}")]
    Consensus(#[from] sidereal_consensus::TxError),

    #[error("chain actor channel closed")]
    ChannelClosed,
}
