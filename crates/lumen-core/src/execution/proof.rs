use crate::crypto::keccak256;
use crate::mpt::{self, ProofOutcome, TrieError};
use crate::rlp::{self, RlpItem};
use crate::types::execution::*;
use thiserror::Error;

/// Errors produced while verifying an account or storage proof.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("Empty proof: no trie nodes provided")]
    EmptyProof,

    #[error("trie proof invalid: {0}")]
    Trie(#[from] TrieError),

    #[error("Invalid RLP encoding in proof node {index}: {reason}")]
    InvalidRlp { index: usize, reason: String },

    #[error("Proof verification failed: computed root {computed} does not match expected root {expected}")]
    RootMismatch { computed: String, expected: String },

    #[error("Invalid trie node type at depth {depth}: expected branch or extension, got {node_type}")]
    InvalidNodeType { depth: usize, node_type: String },

    #[error("Proof path incomplete: trie traversal ended at depth {depth} without reaching the key")]
    IncompleteProof { depth: usize },

    #[error("Storage key not found: {key}")]
    StorageKeyNotFound { key: String },

    #[error("Invalid account RLP encoding: {reason}")]
    InvalidAccountEncoding { reason: String },

    #[error("Invalid value encoding: {reason}")]
    InvalidValueEncoding { reason: String },

    #[error("invalid storage proof because an empty storage hash can not have values")]
    StorageUnderEmptyRoot,
}

/// Verify an account proof against a known state root.
/// The state root comes from a verified execution payload header.
/// This lets us prove balance, nonce, code hash, and storage root of any account.
///
/// IMPORTANT: The state root must come from our verified chain state.
/// Never accept a state root from an untrusted source.
///
/// A `NotExisting` outcome is a valid proof of absence, not a failure - it
/// yields the empty account (`eth_getBalance` of a never-used address must
/// prove `0`, not error out).
pub fn verify_account_proof(
    state_root: [u8; 32],
    address: [u8; 20],
    proof: &AccountProof,
) -> Result<AccountState, ProofError> {
    if proof.proof.is_empty() {
        return Err(ProofError::EmptyProof);
    }

    let key = keccak256(&address);
    match mpt::verify(state_root, &key, &proof.proof)? {
        ProofOutcome::Found(rlp_bytes) => decode_account_from_rlp(&rlp_bytes),
        ProofOutcome::NotExisting => Ok(AccountState {
            nonce: 0,
            balance: [0u8; 32],
            storage_root: AccountState::EMPTY_STORAGE_ROOT,
            code_hash: AccountState::EMPTY_CODE_HASH,
        }),
    }
}

/// Verify a storage proof for a specific storage slot of a contract.
/// The storage root comes from a verified account state.
pub fn verify_storage_proof(
    storage_root: [u8; 32],
    slot: [u8; 32],
    proof: &StorageProof,
) -> Result<[u8; 32], ProofError> {
    if storage_root == AccountState::EMPTY_STORAGE_ROOT && !proof.proof.is_empty() {
        return Err(ProofError::StorageUnderEmptyRoot);
    }
    if proof.proof.is_empty() {
        if storage_root == AccountState::EMPTY_STORAGE_ROOT {
            return Ok([0u8; 32]);
        }
        return Err(ProofError::EmptyProof);
    }

    let key = keccak256(&slot);
    match mpt::verify(storage_root, &key, &proof.proof)? {
        ProofOutcome::Found(rlp_bytes) => decode_storage_value(&rlp_bytes),
        ProofOutcome::NotExisting => Ok([0u8; 32]),
    }
}

/// Decode an Ethereum account from RLP encoding.
/// Account is RLP([nonce, balance, storageRoot, codeHash])
pub(crate) fn decode_account_from_rlp(rlp_bytes: &[u8]) -> Result<AccountState, ProofError> {
    let items = rlp::decode_list(rlp_bytes).map_err(|e| ProofError::InvalidAccountEncoding {
        reason: e.to_string(),
    })?;

    if items.len() != 4 {
        return Err(ProofError::InvalidAccountEncoding {
            reason: format!("Expected 4 items, got {}", items.len()),
        });
    }

    let nonce = decode_uint64(items[0].as_bytes());
    let balance = decode_u256(items[1].as_bytes());

    let storage_root = decode_fixed32(items[2].as_bytes(), AccountState::EMPTY_STORAGE_ROOT)
        .map_err(|reason| ProofError::InvalidAccountEncoding { reason })?;
    let code_hash = decode_fixed32(items[3].as_bytes(), AccountState::EMPTY_CODE_HASH)
        .map_err(|reason| ProofError::InvalidAccountEncoding { reason })?;

    Ok(AccountState {
        nonce,
        balance,
        storage_root,
        code_hash,
    })
}

fn decode_fixed32(bytes: &[u8], empty_value: [u8; 32]) -> Result<[u8; 32], String> {
    if bytes.len() == 32 {
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(out)
    } else if bytes.is_empty() {
        Ok(empty_value)
    } else {
        Err(format!("expected 32-byte field, got {} bytes", bytes.len()))
    }
}

/// Decode a storage value from RLP.
pub(crate) fn decode_storage_value(rlp_bytes: &[u8]) -> Result<[u8; 32], ProofError> {
    let item = match rlp::decode_item(rlp_bytes) {
        Ok(RlpItem::Item(bytes)) => bytes,
        Ok(RlpItem::List(_)) => {
            return Err(ProofError::InvalidValueEncoding {
                reason: "expected byte string, got list".into(),
            })
        }
        Err(e) => {
            return Err(ProofError::InvalidValueEncoding { reason: e.to_string() });
        }
    };

    if item.len() > 32 {
        return Err(ProofError::InvalidValueEncoding {
            reason: format!("Storage value too long: {} bytes", item.len()),
        });
    }
    let mut result = [0u8; 32];
    result[32 - item.len()..].copy_from_slice(item);
    Ok(result)
}

fn decode_uint64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn decode_u256(bytes: &[u8]) -> [u8; 32] {
    let mut result = [0u8; 32];
    if bytes.is_empty() {
        return result;
    }
    let start = 32usize.saturating_sub(bytes.len());
    let len = bytes.len().min(32);
    result[start..start + len].copy_from_slice(&bytes[..len]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpt::Trie;

    #[test]
    fn keccak_of_empty_is_well_known_constant() {
        let empty_hash = keccak256(&[]);
        assert_eq!(empty_hash, AccountState::EMPTY_CODE_HASH);
    }

    #[test]
    fn account_round_trips_through_trie_and_rlp() {
        let mut trie = Trie::new();
        let address = [0x11u8; 20];
        let key = keccak256(&address);

        let account_rlp = rlp::encode_list(&[
            rlp::encode_uint(7),
            rlp::encode_uint(1_000_000_000_000_000_000),
            rlp::encode_bytes(&AccountState::EMPTY_STORAGE_ROOT),
            rlp::encode_bytes(&AccountState::EMPTY_CODE_HASH),
        ]);
        trie.insert(&key, account_rlp);
        let root = trie.root_hash();
        let proof = trie.create_merkle_proof(&key);

        let account = verify_account_proof(
            root,
            address,
            &AccountProof { address, proof, account: None },
        )
        .unwrap();
        assert_eq!(account.nonce, 7);
        assert_eq!(account.storage_root, AccountState::EMPTY_STORAGE_ROOT);
    }

    #[test]
    fn storage_under_empty_root_is_rejected() {
        let result = verify_storage_proof(
            AccountState::EMPTY_STORAGE_ROOT,
            [1u8; 32],
            &StorageProof { key: [1u8; 32], value: [0u8; 32], proof: vec![vec![0xc0]] },
        );
        assert!(matches!(result, Err(ProofError::StorageUnderEmptyRoot)));
    }

    #[test]
    fn missing_account_is_a_valid_non_existence_proof() {
        let mut trie = Trie::new();
        trie.insert(&[0u8; 32], vec![0x01]);
        let root = trie.root_hash();
        let missing_key = keccak256(&[0x99u8; 20]);
        let proof = trie.create_merkle_proof(&missing_key);

        let account = verify_account_proof(
            root,
            [0x99u8; 20],
            &AccountProof { address: [0x99u8; 20], proof, account: None },
        )
        .unwrap();
        assert_eq!(account.nonce, 0);
        assert_eq!(account.balance, [0u8; 32]);
        assert_eq!(account.storage_root, AccountState::EMPTY_STORAGE_ROOT);
        assert_eq!(account.code_hash, AccountState::EMPTY_CODE_HASH);
    }
}
