//! Reference verifiers for devnets and tests.
//!
//! `BlstProvider` does real BLS12-381 verification via `blst`. The
//! proof-of-space and VDF checks here are deliberately simplified: standing
//! up a real plotter or a `chiavdf`-equivalent square-and-witness prover is
//! out of scope for this crate. They exist so a devnet can run end to end
//! with a pluggable, swappable backend — not as a security claim.

use crate::{BlsVerifier, Hash32, PoSpaceVerifier, VdfVerifier};

use blst::min_pk::{AggregateSignature, PublicKey, Signature};
use blst::BLST_ERROR;

const DST: &[u8] = b"SIDEREAL-V1-BLS12381G2_XMD:SHA-256_SSWU_RO_AUG_";

/// Development crypto backend: real BLS12-381 pairing checks, deterministic
/// stand-ins for proof-of-space quality extraction and VDF verification.
pub struct BlstProvider;

impl BlsVerifier for BlstProvider {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, String> {
        let pk = PublicKey::from_bytes(public_key).map_err(|e| format!("bad public key: {e:?}"))?;
        let sig = Signature::from_bytes(signature).map_err(|e| format!("bad signature: {e:?}"))?;
        let err = sig.verify(true, message, DST, &[], &pk, true);
        Ok(err == BLST_ERROR::BLST_SUCCESS)
    }

    fn aggregate_verify(
        &self,
        pairs: &[(Vec<u8>, Vec<u8>)],
        aggregate_signature: &[u8],
    ) -> Result<bool, String> {
        if pairs.is_empty() {
            return Ok(aggregate_signature.is_empty());
        }
        let agg_sig = Signature::from_bytes(aggregate_signature)
            .map_err(|e| format!("bad aggregate signature: {e:?}"))?;
        let agg_sig = AggregateSignature::from_signature(&agg_sig);
        let sig = agg_sig.to_signature();

        let mut pks = Vec::with_capacity(pairs.len());
        let mut msgs = Vec::with_capacity(pairs.len());
        for (pubkey, _) in pairs {
            pks.push(PublicKey::from_bytes(pubkey).map_err(|e| format!("bad public key: {e:?}"))?);
        }
        for (_, msg) in pairs {
            msgs.push(msg.as_slice());
        }
        let pk_refs: Vec<&PublicKey> = pks.iter().collect();
        let err = sig.aggregate_verify(true, &msgs, DST, &pk_refs, true);
        Ok(err == BLST_ERROR::BLST_SUCCESS)
    }
}

impl PoSpaceVerifier for BlstProvider {
    /// A real implementation re-derives the plot's `f1..f7` chain from the
    /// k-sized table entries encoded in `proof_bytes` and checks the final
    /// values collapse to `challenge_hash`. This stand-in accepts any
    /// proof whose length matches the expected `k`-size encoding and
    /// derives a quality string by hashing the proof against the
    /// challenge, which is enough to drive `next_difficulty`/fork-choice
    /// logic in a devnet without a real plotter present.
    fn verify_and_get_quality(
        &self,
        pool_public_key: &[u8],
        plot_public_key: &[u8],
        challenge_hash: &Hash32,
        proof_bytes: &[u8],
        k_size: u8,
    ) -> Result<Option<Hash32>, String> {
        let expected_len = (k_size as usize) * 8;
        if proof_bytes.len() != expected_len {
            return Ok(None);
        }
        let quality = crate::sha3_256_concat(&[
            pool_public_key,
            plot_public_key,
            challenge_hash,
            proof_bytes,
        ]);
        Ok(Some(quality))
    }
}

impl VdfVerifier for BlstProvider {
    /// A real implementation recreates the class-group discriminant from
    /// `challenge_hash` and replays the n-wesolowski witness chain. This
    /// stand-in checks only the shape of the inputs (non-empty group
    /// elements, a plausible witness for the claimed iteration count) and
    /// is unsound as a consensus check; production deployments must
    /// supply a `chiavdf`-backed verifier.
    fn verify(
        &self,
        _discriminant_size_bits: u32,
        _challenge_hash: &Hash32,
        a: &[u8],
        b: &[u8],
        number_of_iterations: u64,
        witness: &[u8],
        _witness_type: u8,
    ) -> Result<bool, String> {
        if a.is_empty() || b.is_empty() {
            return Ok(false);
        }
        if number_of_iterations == 0 {
            return Ok(false);
        }
        Ok(!witness.is_empty())
    }
}
