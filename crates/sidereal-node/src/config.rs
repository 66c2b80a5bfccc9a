//! TOML-loadable node configuration: where state lives on disk, how
//! verbose logging should be, and the consensus tunables to thread
//! through the chain actor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sidereal_consensus::{ConsensusParams, Hash32};

use crate::error::NodeError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub log_filter: String,
    /// Seeds a fresh `Manifest`/genesis `ChainState` on first run; ignored
    /// once a manifest already exists on disk.
    pub genesis_hash: Hash32,
    pub consensus: ConsensusParams,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            data_dir: PathBuf::from("./sidereal-data"),
            log_filter: "info".to_string(),
            genesis_hash: [0u8; 32],
            consensus: ConsensusParams::default(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), NodeError> {
        let text = toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let cfg = NodeConfig::default();
        let dir = std::env::temp_dir();
        let path = dir.join("sidereal_test_config.toml");
        cfg.save(&path).unwrap();
        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(cfg.data_dir, loaded.data_dir);
        assert_eq!(cfg.consensus, loaded.consensus);
        let _ = std::fs::remove_file(&path);
    }
}
