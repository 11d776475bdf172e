//! Cryptographic primitives, delegated to well-reviewed libraries.
//!
//! This module is the one place the crate reaches outside pure Rust logic
//! into assembly/C-backed implementations (`blst`, `k256`'s field arithmetic).
//! Every function here is a thin, behaviorally-specified wrapper - no
//! protocol logic lives here, only hashing and signature math.

use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

use crate::types::beacon::{BlsPublicKey, BlsSignature};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid BLS public key at index {index}: {reason}")]
    InvalidPublicKey { index: usize, reason: String },

    #[error("invalid BLS signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("BLS aggregate verification failed")]
    BlsVerifyFailed,

    #[error("empty participant set")]
    NoParticipants,

    #[error("secp256k1 recovery failed: {0}")]
    RecoveryFailed(String),
}

/// keccak256(input) - the Ethereum variant (not NIST SHA3).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// sha256(input) - used throughout the SSZ Merkleizer and signing domain
/// computation.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

pub fn sha256_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(a);
    data[32..].copy_from_slice(b);
    sha256(&data)
}

/// BLS DST for sync-committee signatures, per the consensus spec
/// (`BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_`).
pub const BLS_DST_POP: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Verify an aggregate BLS12-381 signature over `message` under the
/// aggregate of `pubkeys`. Returns `Ok(())` iff the signature verifies.
///
/// Deserializing pubkeys/signature is not cached across calls here - callers
/// that verify many updates against the same committee (§4.5) should cache
/// the deserialized `AggregatePublicKey` themselves; this function is the
/// pure, stateless contract the spec requires.
pub fn verify_aggregate_bls_signature(
    pubkeys: &[&BlsPublicKey],
    message: &[u8; 32],
    signature: &BlsSignature,
) -> Result<(), CryptoError> {
    use blst::min_pk::{AggregatePublicKey, PublicKey, Signature};
    use blst::BLST_ERROR;

    if pubkeys.is_empty() {
        return Err(CryptoError::NoParticipants);
    }

    let sig = Signature::from_bytes(&signature.0)
        .map_err(|e| CryptoError::InvalidSignatureEncoding(format!("{:?}", e)))?;

    let pks: Vec<PublicKey> = pubkeys
        .iter()
        .enumerate()
        .map(|(i, pk)| {
            PublicKey::from_bytes(&pk.0).map_err(|e| CryptoError::InvalidPublicKey {
                index: i,
                reason: format!("{:?}", e),
            })
        })
        .collect::<Result<_, _>>()?;

    let pk_refs: Vec<&PublicKey> = pks.iter().collect();
    let agg_pk = AggregatePublicKey::aggregate(&pk_refs, false)
        .map_err(|e| CryptoError::InvalidPublicKey {
            index: 0,
            reason: format!("aggregate failed: {:?}", e),
        })?
        .to_public_key();

    let result = sig.verify(false, message, BLS_DST_POP, &[], &agg_pk, false);
    if result != BLST_ERROR::BLST_SUCCESS {
        return Err(CryptoError::BlsVerifyFailed);
    }
    Ok(())
}

/// Recover a secp256k1 public key (64 bytes, uncompressed, no `04` prefix)
/// from a 32-byte digest and a 65-byte `{r, s, v}` signature, `v` normalized
/// to `{0, 1}` by the caller (transaction recovery normalizes the various
/// legacy `v` encodings before calling this - see `execution::transaction`).
pub fn secp256k1_recover(digest: &[u8; 32], sig: &[u8; 65]) -> Result<[u8; 64], CryptoError> {
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    let recid = RecoveryId::from_byte(sig[64])
        .ok_or_else(|| CryptoError::RecoveryFailed("invalid recovery id".into()))?;
    let signature = Signature::from_slice(&sig[..64])
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recid)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;

    let encoded = verifying_key.to_encoded_point(false);
    let bytes = encoded.as_bytes();
    // `bytes` is [0x04, X (32), Y (32)] - strip the uncompressed-point tag.
    let mut out = [0u8; 64];
    out.copy_from_slice(&bytes[1..65]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_of_empty_matches_known_vector() {
        let empty_hash = keccak256(&[]);
        let expected = hex::decode(
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a47",
        )
        .unwrap();
        assert_eq!(&empty_hash[..], &expected[..]);
    }

    #[test]
    fn sha256_pair_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(sha256_pair(&a, &b), sha256_pair(&b, &a));
    }

    #[test]
    fn bls_verify_rejects_empty_participants() {
        let sig = BlsSignature([0u8; 96]);
        let result = verify_aggregate_bls_signature(&[], &[0u8; 32], &sig);
        assert!(matches!(result, Err(CryptoError::NoParticipants)));
    }
}
