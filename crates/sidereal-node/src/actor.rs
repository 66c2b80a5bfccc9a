//! The single-writer chain actor: every chain-state mutation is
//! serialized through one tokio task owning `ChainState`, `Mempool`, and
//! the store trait objects. Callers talk to it only through
//! `ChainHandle`, an mpsc request/oneshot-reply client — nothing outside
//! this module ever locks the chain state directly.
//!
//! Parallelism is confined to `pre_validate_block` (the proof-of-space
//! hash, harvester signature, quality extraction, and VDF check), which
//! callers may run ahead of time on the `rayon` pool before handing the
//! block to the actor; the actor itself still re-derives the
//! unfinished/finished checks serially, since the pool is an
//! optimisation and not a trust boundary.

use std::sync::Arc;

use sidereal_consensus::{
    pre_validate_block, validate_finished, validate_unfinished, BlockStore, ChainState,
    ConditionInterpreter, DifficultyMemo, FullBlock, Hash32, HeaderIndex, IpsMemo, Mempool,
    ReceiveBlockResult, SpendBundle, TxError, UnspentStore,
};
use sidereal_crypto::CryptoProvider;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::NodeError;

type Reply<T> = oneshot::Sender<T>;

enum Request {
    SubmitBlock {
        block: Box<FullBlock>,
        reply: Reply<Result<ReceiveBlockResult, TxError>>,
    },
    SubmitSpendBundle {
        bundle: Box<SpendBundle>,
        reply: Reply<Result<(), TxError>>,
    },
    Tips {
        reply: Reply<Vec<Hash32>>,
    },
    LcaHash {
        reply: Reply<Hash32>,
    },
}

/// Cloneable client handle. Every clone shares the same mpsc channel, so
/// any number of callers (RPC handlers, the CLI, test harnesses) can
/// submit work concurrently — the actor still drains its queue one
/// request at a time.
#[derive(Clone)]
pub struct ChainHandle {
    tx: mpsc::Sender<Request>,
}

impl ChainHandle {
    pub async fn submit_block(&self, block: FullBlock) -> Result<ReceiveBlockResult, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::SubmitBlock {
                block: Box::new(block),
                reply,
            })
            .await
            .map_err(|_| NodeError::ChannelClosed)?;
        rx.await.map_err(|_| NodeError::ChannelClosed)?.map_err(NodeError::Consensus)
    }

    pub async fn submit_spend_bundle(&self, bundle: SpendBundle) -> Result<(), NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::SubmitSpendBundle {
                bundle: Box::new(bundle),
                reply,
            })
            .await
            .map_err(|_| NodeError::ChannelClosed)?;
        rx.await.map_err(|_| NodeError::ChannelClosed)?.map_err(NodeError::Consensus)
    }

    pub async fn tips(&self) -> Result<Vec<Hash32>, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Tips { reply })
            .await
            .map_err(|_| NodeError::ChannelClosed)?;
        rx.await.map_err(|_| NodeError::ChannelClosed)
    }

    pub async fn lca_hash(&self) -> Result<Hash32, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::LcaHash { reply })
            .await
            .map_err(|_| NodeError::ChannelClosed)?;
        rx.await.map_err(|_| NodeError::ChannelClosed)
    }
}

/// Owns every piece of mutable chain state. Never `Clone` — there is
/// exactly one, running inside the task `spawn` launches.
pub struct ChainActor {
    chain: ChainState,
    mempool: Mempool,
    block_store: Box<dyn BlockStore + Send>,
    unspent_store: Box<dyn UnspentStore + Send>,
    crypto: Arc<dyn CryptoProvider + Send + Sync>,
    interpreter: Arc<dyn ConditionInterpreter + Send + Sync>,
    params: sidereal_consensus::ConsensusParams,
    diff_memo: DifficultyMemo,
    ips_memo: IpsMemo,
    rayon_pool: rayon::ThreadPool,
}

impl ChainActor {
    pub fn new(
        chain: ChainState,
        mempool: Mempool,
        block_store: Box<dyn BlockStore + Send>,
        unspent_store: Box<dyn UnspentStore + Send>,
        crypto: Arc<dyn CryptoProvider + Send + Sync>,
        interpreter: Arc<dyn ConditionInterpreter + Send + Sync>,
        params: sidereal_consensus::ConsensusParams,
    ) -> Self {
        let workers = num_cpus::get().saturating_sub(1).max(1);
        let rayon_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("rayon pool builds with a positive thread count");
        ChainActor {
            chain,
            mempool,
            block_store,
            unspent_store,
            crypto,
            interpreter,
            params,
            diff_memo: DifficultyMemo::new(),
            ips_memo: IpsMemo::new(),
            rayon_pool,
        }
    }

    /// Spawns the actor's task and returns the client handle. `buffer`
    /// sizes the request channel — requests beyond it simply await a
    /// free slot rather than being dropped.
    pub fn spawn(mut self, buffer: usize) -> ChainHandle {
        let (tx, mut rx) = mpsc::channel::<Request>(buffer);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                self.handle(req);
            }
            info!("chain actor channel closed, task exiting");
        });
        ChainHandle { tx }
    }

    fn handle(&mut self, req: Request) {
        match req {
            Request::SubmitBlock { block, reply } => {
                let result = self.submit_block(*block);
                let _ = reply.send(result);
            }
            Request::SubmitSpendBundle { bundle, reply } => {
                let result = self.submit_spend_bundle(*bundle);
                let _ = reply.send(result);
            }
            Request::Tips { reply } => {
                let _ = reply.send(self.chain.tips().to_vec());
            }
            Request::LcaHash { reply } => {
                let _ = reply.send(self.chain.lca_hash());
            }
        }
    }

    fn submit_block(&mut self, block: FullBlock) -> Result<ReceiveBlockResult, TxError> {
        // Connectivity gates come before validation: a block this actor
        // already holds, or one whose parent it hasn't seen yet, is a
        // caller-retriable outcome, not a permanent rejection.
        let header_hash = block.header_hash();
        if self.chain.get(&header_hash).is_some() {
            return Ok(ReceiveBlockResult::AlreadyHaveBlock);
        }
        let data = &block.header.data;
        if data.height > 0 && self.chain.get(&data.prev_header_hash).is_none() {
            return Ok(ReceiveBlockResult::DisconnectedBlock);
        }

        let now = now_secs();
        let pre = self
            .rayon_pool
            .install(|| pre_validate_block(&block, self.crypto.as_ref(), &self.params));

        let quality = validate_unfinished(
            &self.chain,
            &block,
            self.crypto.as_ref(),
            &self.params,
            now,
            Some(pre),
        )?;

        let diff = validate_finished(
            &self.chain,
            &block,
            quality,
            self.crypto.as_ref(),
            self.crypto.as_ref(),
            self.interpreter.as_ref(),
            self.unspent_store.as_ref(),
            &self.params,
            pre.ok,
            &mut self.diff_memo,
            &mut self.ips_memo,
        )?;

        let summary = summarize(&block);
        let result = self
            .chain
            .receive_block(summary, diff, self.unspent_store.as_mut())?;

        match result {
            ReceiveBlockResult::AddedToHead | ReceiveBlockResult::AddedAsOrphan => {
                self.block_store.add_block(block);
                self.mempool.update_pool(self.chain.tips());
            }
            ReceiveBlockResult::AlreadyHaveBlock | ReceiveBlockResult::DisconnectedBlock => {
                warn!(?result, "block not accepted");
            }
            ReceiveBlockResult::InvalidBlock => {}
        }
        Ok(result)
    }

    fn submit_spend_bundle(&mut self, bundle: SpendBundle) -> Result<(), TxError> {
        let tip = self.chain.highest_tip().header_hash;
        let height = self.chain.highest_tip().height;
        self.mempool.add_spend_bundle(
            tip,
            bundle,
            height,
            self.unspent_store.as_ref(),
            self.interpreter.as_ref(),
            self.crypto.as_ref(),
        )
    }
}

/// `total_weight`/`total_iters` already carry the derived values
/// `validate_finished` checked; everything else comes straight from the
/// header. `challenge_digest` is the challenge the *next* block must
/// reference, derived once here rather than re-derived by every reader.
fn summarize(block: &FullBlock) -> sidereal_consensus::HeaderSummary {
    let data = &block.header.data;
    sidereal_consensus::HeaderSummary {
        header_hash: block.header_hash(),
        prev_header_hash: data.prev_header_hash,
        height: data.height,
        weight: data.challenge.total_weight,
        total_iters: data.challenge.total_iters,
        timestamp: data.timestamp,
        challenge_digest: data.challenge.next_challenge(),
        proof_of_space_hash: data.proof_of_space_hash,
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
