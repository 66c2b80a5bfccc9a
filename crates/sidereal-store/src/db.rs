//! redb-backed durable storage for the node: full blocks, and the
//! committed UTXO set with an undo log capable of inverting any suffix of
//! applied diffs. Adapted from the teacher's five-table KV layout
//! (`headers_by_hash` / `blocks_by_hash` / `block_index_by_hash` /
//! `utxo_by_outpoint` / `undo_by_block_hash`), retyped around this spec's
//! coin-name-keyed UTXO model and folding the block-index table into a
//! height-ordered commit log since `ChainState` (not this crate) owns
//! fork-choice.
//!
//! `BlockStore`/`UnspentStore` (sidereal-consensus) are infallible by
//! design — "store/channel failures live in the node crate's own error
//! type" (sidereal-consensus's `error.rs`). This impl treats a corrupt or
//! unreadable redb file as fatal and panics from those two trait impls;
//! every other method on `Store` returns `Result<_, StoreError>` so a
//! caller that can do something about it (e.g. at startup) still can.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use sidereal_consensus::{BlockStore, CoinDiff, FullBlock, Hash32, UnspentRecord, UnspentStore};

use crate::error::StoreError;
use crate::manifest::Manifest;

const BLOCKS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blocks_by_hash");
const UTXO_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("utxo_by_coin_name");
const UNDO_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("undo_by_header_hash");
/// Height (big-endian u64) -> header_hash, for the committed (LCA) chain
/// only. Orphaned/disconnected branches never appear here — `ChainState`
/// keeps those in memory via its own header arena.
const COMMITTED_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("committed_by_height");

const DB_FILE_NAME: &str = "sidereal.redb";

pub struct Store {
    db: Database,
    manifest: Manifest,
    manifest_path: PathBuf,
    /// Runtime-only overlay representing the most recently selected head
    /// path, layered atop the committed `UTXO_TABLE`. Rebuilt wholesale by
    /// `new_heads`/`nuke_diffs`, never persisted — `ChainState` can always
    /// recompute it from its in-memory header index after a restart.
    overlay: HashMap<Hash32, UnspentRecord>,
}

impl Store {
    /// Open (creating if absent) the redb file and manifest under
    /// `data_dir`. `genesis_hash` seeds a fresh manifest; it is ignored if
    /// a manifest already exists on disk.
    pub fn open(data_dir: &Path, genesis_hash: Hash32) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DB_FILE_NAME);
        let db = Database::create(db_path)?;

        {
            let tx = db.begin_write()?;
            tx.open_table(BLOCKS_TABLE)?;
            tx.open_table(UTXO_TABLE)?;
            tx.open_table(UNDO_TABLE)?;
            tx.open_table(COMMITTED_TABLE)?;
            tx.commit()?;
        }

        let manifest_path = Manifest::path_in(data_dir);
        let manifest = if manifest_path.exists() {
            Manifest::load(&manifest_path)?
        } else {
            let m = Manifest::genesis(genesis_hash);
            m.save_atomic(&manifest_path)?;
            m
        };

        Ok(Store {
            db,
            manifest,
            manifest_path,
            overlay: HashMap::new(),
        })
    }

    pub fn lca_height(&self) -> u64 {
        self.manifest.lca_height
    }

    pub fn lca_hash(&self) -> Hash32 {
        self.manifest.lca_hash
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    pub fn get_block_result(&self, header_hash: &Hash32) -> Result<Option<FullBlock>, StoreError> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(BLOCKS_TABLE)?;
        match table.get(header_hash.as_slice())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_block_result(&self, block: &FullBlock) -> Result<(), StoreError> {
        let header_hash = block.header_hash();
        let bytes = serde_json::to_vec(block)?;
        let tx = self.db.begin_write()?;
        {
            let mut table = tx.open_table(BLOCKS_TABLE)?;
            table.insert(header_hash.as_slice(), bytes.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── Committed UTXO (read-only helpers) ─────────────────────────────

    fn get_committed_utxo(&self, coin_name: &Hash32) -> Result<Option<UnspentRecord>, StoreError> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(UTXO_TABLE)?;
        match table.get(coin_name.as_slice())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn get_committed_hash_at_height(&self, height: u64) -> Result<Option<Hash32>, StoreError> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(COMMITTED_TABLE)?;
        match table.get(height.to_be_bytes().as_slice())? {
            Some(guard) => {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(guard.value());
                Ok(Some(hash))
            }
            None => Ok(None),
        }
    }

    /// Iterate every committed unspent/spent record in coin-name order.
    /// Intended for node startup diagnostics and tests, not a hot path.
    pub fn iter_committed(&self) -> Result<Vec<UnspentRecord>, StoreError> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(UTXO_TABLE)?;
        let mut out = Vec::with_capacity(table.len()? as usize);
        for entry in table.iter()? {
            let (_, v) = entry?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }

    // ── Overlay (runtime-only) ──────────────────────────────────────────

    fn apply_to_overlay(&mut self, diff: &CoinDiff) -> Result<(), StoreError> {
        for name in &diff.removals {
            let mut rec = match self.overlay.get(name).cloned() {
                Some(r) => r,
                None => self
                    .get_committed_utxo(name)?
                    .expect("overlay removal references a coin absent from both overlay and committed state"),
            };
            rec.spend(diff.height);
            self.overlay.insert(*name, rec);
        }
        for coin in &diff.additions {
            let name = coin.name();
            let is_coinbase = diff.coinbase == Some(name);
            self.overlay
                .insert(name, UnspentRecord::new_unspent(coin.clone(), diff.height, is_coinbase));
        }
        Ok(())
    }

    // ── Committed writes ────────────────────────────────────────────────

    fn add_lcas_result(&mut self, diffs: &[CoinDiff]) -> Result<(), StoreError> {
        let mut last: Option<(Hash32, u64)> = None;
        for diff in diffs {
            let tx = self.db.begin_write()?;
            {
                let mut utxo = tx.open_table(UTXO_TABLE)?;
                let mut undo = tx.open_table(UNDO_TABLE)?;
                let mut committed = tx.open_table(COMMITTED_TABLE)?;

                for name in &diff.removals {
                    let existing = utxo
                        .get(name.as_slice())?
                        .map(|g| g.value().to_vec())
                        .expect("add_lcas: removal of a coin absent from the committed set");
                    let mut rec: UnspentRecord = serde_json::from_slice(&existing)?;
                    rec.spend(diff.height);
                    let bytes = serde_json::to_vec(&rec)?;
                    utxo.insert(name.as_slice(), bytes.as_slice())?;
                }
                for coin in &diff.additions {
                    let name = coin.name();
                    let is_coinbase = diff.coinbase == Some(name);
                    let rec = UnspentRecord::new_unspent(coin.clone(), diff.height, is_coinbase);
                    let bytes = serde_json::to_vec(&rec)?;
                    utxo.insert(name.as_slice(), bytes.as_slice())?;
                }

                let undo_bytes = serde_json::to_vec(diff)?;
                undo.insert(diff.header_hash.as_slice(), undo_bytes.as_slice())?;
                committed.insert(diff.height.to_be_bytes().as_slice(), diff.header_hash.as_slice())?;
            }
            tx.commit()?;
            last = Some((diff.header_hash, diff.height));
        }

        if let Some((hash, height)) = last {
            self.manifest.update_lca(hash, height);
            self.manifest.save_atomic(&self.manifest_path)?;
        }
        Ok(())
    }

    fn rollback_to_block_result(&mut self, height: u64) -> Result<(), StoreError> {
        let current_height = self.manifest.lca_height;
        if current_height <= height {
            return Ok(());
        }

        let tx = self.db.begin_write()?;
        {
            let mut utxo = tx.open_table(UTXO_TABLE)?;
            let mut undo = tx.open_table(UNDO_TABLE)?;
            let mut committed = tx.open_table(COMMITTED_TABLE)?;

            let mut h = current_height;
            while h > height {
                let key = h.to_be_bytes();
                let header_hash: Option<Hash32> = committed.get(key.as_slice())?.map(|g| {
                    let mut hash = [0u8; 32];
                    hash.copy_from_slice(g.value());
                    hash
                });

                if let Some(header_hash) = header_hash {
                    let diff_bytes = undo.get(header_hash.as_slice())?.map(|g| g.value().to_vec());
                    if let Some(diff_bytes) = diff_bytes {
                        let diff: CoinDiff = serde_json::from_slice(&diff_bytes)?;
                        for coin in &diff.additions {
                            utxo.remove(coin.name().as_slice())?;
                        }
                        for removed_name in &diff.removals {
                            let existing = utxo.get(removed_name.as_slice())?.map(|g| g.value().to_vec());
                            if let Some(existing) = existing {
                                let mut rec: UnspentRecord = serde_json::from_slice(&existing)?;
                                rec.spent_flag = false;
                                rec.spent_index = 0;
                                let bytes = serde_json::to_vec(&rec)?;
                                utxo.insert(removed_name.as_slice(), bytes.as_slice())?;
                            }
                        }
                    }
                    undo.remove(header_hash.as_slice())?;
                }
                committed.remove(key.as_slice())?;
                h -= 1;
            }
        }
        tx.commit()?;

        let new_hash = if height == 0 {
            self.manifest.genesis_hash
        } else {
            self.get_committed_hash_at_height(height)?
                .expect("rollback target height must already be committed")
        };
        self.manifest.update_lca(new_hash, height);
        self.manifest.save_atomic(&self.manifest_path)?;
        Ok(())
    }
}

impl BlockStore for Store {
    fn get_block(&self, header_hash: &Hash32) -> Option<FullBlock> {
        self.get_block_result(header_hash)
            .expect("sidereal-store: block read failed")
    }

    fn add_block(&mut self, block: FullBlock) {
        self.put_block_result(&block)
            .expect("sidereal-store: block write failed");
    }
}

impl UnspentStore for Store {
    fn get_unspent(&self, coin_name: &Hash32) -> Option<UnspentRecord> {
        if let Some(rec) = self.overlay.get(coin_name) {
            return Some(rec.clone());
        }
        self.get_committed_utxo(coin_name)
            .expect("sidereal-store: utxo read failed")
    }

    fn new_lca(&mut self, diff: &CoinDiff) {
        self.add_lcas_result(std::slice::from_ref(diff))
            .expect("sidereal-store: commit failed");
    }

    fn rollback_to_block(&mut self, height: u64) {
        self.rollback_to_block_result(height)
            .expect("sidereal-store: rollback failed");
    }

    fn nuke_diffs(&mut self) {
        self.overlay.clear();
    }

    fn new_heads(&mut self, diffs: &[CoinDiff]) {
        self.overlay.clear();
        for diff in diffs {
            self.apply_to_overlay(diff)
                .expect("sidereal-store: overlay rebuild failed");
        }
    }

    fn add_lcas(&mut self, diffs: &[CoinDiff]) {
        self.add_lcas_result(diffs)
            .expect("sidereal-store: commit failed");
    }
}
