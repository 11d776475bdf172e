//! Call verifier (spec.md §4.12): resolves account/storage/code state from
//! a proof bundle into an EVM host overlay, hands off to an externally
//! supplied EVM (the interpreter itself is out of scope - spec.md §1,
//! "For the EVM we specify only the host interface"), and compares the
//! returned bytes against the asserted `eth_call` result.

use std::collections::HashMap;

use thiserror::Error;

use crate::execution::code::{resolve_code, CodeCache, CodeError, CodeResolution};
use crate::execution::proof::{verify_account_proof, verify_storage_proof, ProofError};
use crate::host::{HostState, SourceAccount};
use crate::types::proof::{CallProofBundle, DataRequest};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("account or storage proof invalid: {0}")]
    Proof(#[from] ProofError),
    #[error("code resolution failed: {0}")]
    Code(#[from] CodeError),
    #[error("eth_call result does not match the asserted value")]
    ResultMismatch,
}

/// The caller-supplied, transaction-like call message (spec.md §4.12
/// inputs).
#[derive(Debug, Clone)]
pub struct CallMessage {
    pub to: [u8; 20],
    pub from: [u8; 20],
    pub data: Vec<u8>,
    pub value: [u8; 32],
    pub gas: u64,
}

pub enum CallVerifyOutcome {
    Verified(Vec<u8>),
    Pending(Vec<DataRequest>),
}

/// Addresses `0x01..=0x1F` are intercepted and dispatched to the precompile
/// table rather than treated as ordinary contract code (spec.md §4.12 step
/// 3, "Precompiles").
pub fn is_precompile(address: &[u8; 20]) -> bool {
    address[..19] == [0u8; 19] && (1..=0x1F).contains(&address[19])
}

/// Minimal precompile dispatch: identity, SHA-256, and ECRECOVER, the three
/// whose semantics are otherwise already implemented by this crate's
/// cryptography layer. Other precompile addresses return `None` - not
/// intercepted, so the caller's EVM falls through to ordinary code
/// execution (there is none, since precompile addresses never carry code,
/// so an unhandled precompile call becomes a no-op in this verifier).
pub fn dispatch_precompile(address: &[u8; 20], input: &[u8]) -> Option<Vec<u8>> {
    if !is_precompile(address) {
        return None;
    }
    match address[19] {
        0x01 => {
            if input.len() < 128 {
                return Some(vec![]);
            }
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&input[0..32]);
            let v = input[63];
            let mut sig = [0u8; 65];
            sig[..32].copy_from_slice(&input[64..96]);
            sig[32..64].copy_from_slice(&input[96..128]);
            sig[64] = if v >= 27 { v - 27 } else { v };
            match crate::crypto::secp256k1_recover(&digest, &sig) {
                Ok(pubkey) => {
                    let hash = crate::crypto::keccak256(&pubkey);
                    let mut out = vec![0u8; 32];
                    out[12..].copy_from_slice(&hash[12..32]);
                    Some(out)
                }
                Err(_) => Some(vec![0u8; 32]),
            }
        }
        0x02 => Some(crate::crypto::sha256(input).to_vec()),
        0x04 => Some(input.to_vec()),
        _ => None,
    }
}

/// Verify a `CallProofBundle`: verify every account/storage proof against
/// the (already-trusted) execution `state_root`, resolve every account's
/// code, build the host overlay, and let `execute` run the EVM against it.
/// `execute` receives the host and the root frame index and returns the
/// EVM's raw return bytes.
pub fn verify_call_proof(
    chain_id: u64,
    state_root: [u8; 32],
    bundle: &CallProofBundle,
    asserted_result: &[u8],
    cache: &mut CodeCache,
    execute: impl FnOnce(&mut HostState, usize) -> Vec<u8>,
) -> Result<CallVerifyOutcome, CallError> {
    let mut sources = HashMap::new();
    let mut pending = Vec::new();

    for account_input in &bundle.accounts {
        let account = verify_account_proof(state_root, account_input.address, &account_input.account_proof)?;

        let mut storage = HashMap::new();
        for storage_proof in &account_input.storage_proofs {
            let value = verify_storage_proof(account.storage_root, storage_proof.key, storage_proof)?;
            storage.insert(storage_proof.key, value);
        }

        match resolve_code(
            chain_id,
            account_input.address,
            account.code_hash,
            account_input.code.as_deref(),
            cache,
        )? {
            CodeResolution::Resolved(code) => {
                sources.insert(
                    account_input.address,
                    SourceAccount {
                        balance: account.balance,
                        nonce: account.nonce,
                        code_hash: account.code_hash,
                        code,
                        storage,
                    },
                );
            }
            CodeResolution::Pending(request) => pending.push(request),
        }
    }

    if !pending.is_empty() {
        return Ok(CallVerifyOutcome::Pending(pending));
    }

    let mut host = HostState::new(sources);
    let root = host.root();
    let returned = execute(&mut host, root);

    if returned != asserted_result {
        return Err(CallError::ResultMismatch);
    }

    Ok(CallVerifyOutcome::Verified(returned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompile_range_is_0x01_through_0x1f() {
        let mut addr = [0u8; 20];
        addr[19] = 0x02;
        assert!(is_precompile(&addr));
        addr[19] = 0x20;
        assert!(!is_precompile(&addr));
        addr[19] = 0x00;
        assert!(!is_precompile(&addr));
    }

    #[test]
    fn identity_precompile_echoes_input() {
        let mut addr = [0u8; 20];
        addr[19] = 0x04;
        let input = vec![1, 2, 3, 4];
        assert_eq!(dispatch_precompile(&addr, &input), Some(input));
    }

    #[test]
    fn sha256_precompile_matches_crypto_module() {
        let mut addr = [0u8; 20];
        addr[19] = 0x02;
        let input = b"hello";
        assert_eq!(
            dispatch_precompile(&addr, input),
            Some(crate::crypto::sha256(input).to_vec())
        );
    }
}
