//! Narrow cryptography interface for the sidereal consensus core.
//!
//! Consensus code depends only on the traits below, never on a concrete
//! proof-of-space plotter, VDF prover, or BLS backend — those are external
//! collaborators per the consensus specification. `sha3_256` is the one
//! concrete primitive the core owns outright; it is not swappable because
//! hashing is a consensus rule, not an external proof system.

#[cfg(feature = "dev-std")]
pub mod dev;

/// 32-byte domain hash, used throughout for challenges, quality strings,
/// header hashes, and coin names.
pub type Hash32 = [u8; 32];

pub fn sha3_256(input: &[u8]) -> Hash32 {
    use sha3::Digest;
    let mut hasher = sha3::Sha3_256::new();
    hasher.update(input);
    let out = hasher.finalize();
    let mut result = [0u8; 32];
    result.copy_from_slice(&out);
    result
}

pub fn sha3_256_concat(parts: &[&[u8]]) -> Hash32 {
    use sha3::Digest;
    let mut hasher = sha3::Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let out = hasher.finalize();
    let mut result = [0u8; 32];
    result.copy_from_slice(&out);
    result
}

/// Verifies a proof of space against a challenge and returns the 32-byte
/// quality string consensus uses to derive the required VDF iteration
/// count. The plot/pool/plot key material lives in the consensus crate's
/// `ProofOfSpace` type and is passed here as raw bytes, so this crate
/// carries no dependency on consensus types.
pub trait PoSpaceVerifier {
    fn verify_and_get_quality(
        &self,
        pool_public_key: &[u8],
        plot_public_key: &[u8],
        challenge_hash: &Hash32,
        proof_bytes: &[u8],
        k_size: u8,
    ) -> Result<Option<Hash32>, String>;
}

/// Verifies a Wesolowski-style VDF proof: `b = a^(2^iters) mod disc`,
/// witnessed by `witness`. `witness_type` selects between the
/// n-wesolowski variants the prover may emit.
pub trait VdfVerifier {
    #[allow(clippy::too_many_arguments)]
    fn verify(
        &self,
        discriminant_size_bits: u32,
        challenge_hash: &Hash32,
        a: &[u8],
        b: &[u8],
        number_of_iterations: u64,
        witness: &[u8],
        witness_type: u8,
    ) -> Result<bool, String>;
}

/// BLS12-381 signature verification: single-signature (coinbase and
/// harvester signatures) and aggregate (block-level AGGSIG conditions).
pub trait BlsVerifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, String>;

    fn aggregate_verify(
        &self,
        pairs: &[(Vec<u8>, Vec<u8>)],
        aggregate_signature: &[u8],
    ) -> Result<bool, String>;
}

/// Bundles the three external proof systems behind one handle, the shape
/// node-level code wires a single crypto backend through to the validator.
pub trait CryptoProvider: PoSpaceVerifier + VdfVerifier + BlsVerifier {}

impl<T> CryptoProvider for T where T: PoSpaceVerifier + VdfVerifier + BlsVerifier {}
