//! `MANIFEST.json` — single crash-recovery anchor recording where the
//! committed LCA stood as of the last fully-applied `add_lcas` batch.
//! Adapted from the teacher's atomic write-temp/fsync/rename discipline;
//! the chain-id/cumulative-work fields it tracked for a PoW single chain
//! have no counterpart here, since `ChainState` (not the store) owns
//! fork-choice weight.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sidereal_consensus::Hash32;

use crate::error::StoreError;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub schema_version: u32,
    pub genesis_hash: Hash32,
    pub lca_hash: Hash32,
    pub lca_height: u64,
}

impl Manifest {
    pub fn genesis(genesis_hash: Hash32) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            genesis_hash,
            lca_hash: genesis_hash,
            lca_height: 0,
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let data = fs::read_to_string(path)?;
        let m: Manifest = serde_json::from_str(&data)?;
        Ok(m)
    }

    /// Atomically save: write to a temp file, fsync, then rename over the
    /// real path. The rename is what makes a crash mid-write harmless —
    /// readers only ever see the old or the new manifest, never a partial
    /// one.
    pub fn save_atomic(&self, path: &Path) -> Result<(), StoreError> {
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Redb("manifest path has no parent dir".into()))?;

        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let tmp_path = dir.join(format!(".MANIFEST.json.tmp.{pid}.{nanos}"));

        let json = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        drop(f);

        fs::rename(&tmp_path, path)?;
        if let Ok(dir_f) = fs::File::open(dir) {
            let _ = dir_f.sync_all();
        }
        Ok(())
    }

    pub fn update_lca(&mut self, lca_hash: Hash32, lca_height: u64) {
        self.lca_hash = lca_hash;
        self.lca_height = lca_height;
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("MANIFEST.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_roundtrip() {
        let m = Manifest::genesis([7u8; 32]);
        let dir = std::env::temp_dir();
        let path = dir.join("sidereal_test_manifest.json");
        m.save_atomic(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(m, loaded);
        let _ = std::fs::remove_file(&path);
    }
}
