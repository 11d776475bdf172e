//! Optional L2 (OP-stack) output-root verifier (spec.md §4.14). Gated
//! behind the `op-stack` feature since it is not part of the core L1
//! verifier.

use thiserror::Error;

use crate::crypto::keccak256;
use crate::execution::proof::{verify_account_proof, verify_storage_proof, ProofError};
use crate::types::proof::L2OutputProofBundle;

#[derive(Debug, Error)]
pub enum L2Error {
    #[error("L1 account or storage proof invalid: {0}")]
    Proof(#[from] ProofError),
    #[error("L2OutputOracle storage slot does not match the computed output root")]
    OutputRootMismatch,
}

/// `output_root := keccak(version || state_root || withdrawals_storage_root || latest_block_hash)`.
pub fn compute_output_root(
    version: &[u8; 32],
    state_root: &[u8; 32],
    withdrawals_storage_root: &[u8; 32],
    latest_block_hash: &[u8; 32],
) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(128);
    preimage.extend_from_slice(version);
    preimage.extend_from_slice(state_root);
    preimage.extend_from_slice(withdrawals_storage_root);
    preimage.extend_from_slice(latest_block_hash);
    keccak256(&preimage)
}

/// `slot := keccak(output_index_be32 || mapping_slot_be32)`, the storage
/// slot an `L2OutputOracle` stores `output_root` under.
pub fn output_oracle_slot(output_index: u64, mapping_slot: &[u8; 32]) -> [u8; 32] {
    let mut preimage = [0u8; 64];
    preimage[24..32].copy_from_slice(&output_index.to_be_bytes());
    preimage[32..64].copy_from_slice(mapping_slot);
    keccak256(&preimage)
}

/// Verify an `L2OutputProofBundle`: recompute the L2 output root, derive
/// the L2OutputOracle storage slot it should occupy, and verify that slot
/// against the L1 account's (already-trusted) state root.
pub fn verify_l2_output_proof(
    l1_state_root: [u8; 32],
    bundle: &L2OutputProofBundle,
) -> Result<[u8; 32], L2Error> {
    let output_root = compute_output_root(
        &bundle.l2_version,
        &bundle.l2_state_root,
        &bundle.l2_withdrawals_root,
        &bundle.l2_block_hash,
    );
    let slot = output_oracle_slot(bundle.output_index, &bundle.mapping_slot);

    let account = verify_account_proof(
        l1_state_root,
        bundle.l1_account_proof.address,
        &bundle.l1_account_proof.account_proof,
    )?;

    let stored = bundle
        .l1_account_proof
        .storage_proofs
        .iter()
        .find(|p| p.key == slot)
        .ok_or(L2Error::OutputRootMismatch)?;
    let value = verify_storage_proof(account.storage_root, stored.key, stored)?;

    if value != output_root {
        return Err(L2Error::OutputRootMismatch);
    }
    Ok(output_root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_root_is_deterministic() {
        let a = compute_output_root(&[1u8; 32], &[2u8; 32], &[3u8; 32], &[4u8; 32]);
        let b = compute_output_root(&[1u8; 32], &[2u8; 32], &[3u8; 32], &[4u8; 32]);
        assert_eq!(a, b);
    }

    #[test]
    fn oracle_slot_varies_with_output_index() {
        let mapping_slot = [9u8; 32];
        let slot0 = output_oracle_slot(0, &mapping_slot);
        let slot1 = output_oracle_slot(1, &mapping_slot);
        assert_ne!(slot0, slot1);
    }
}
