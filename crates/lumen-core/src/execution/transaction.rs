//! Transaction verifier (spec.md §4.9): typed-transaction decoding, sender
//! recovery, and the multi-leaf proof binding a transaction to a trusted
//! beacon body root.

use thiserror::Error;

use crate::crypto::{keccak256, secp256k1_recover, CryptoError};
use crate::rlp;
use crate::ssz::merkle::verify_multi_merkle_proof;
use crate::types::proof::TransactionProofBundle;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("empty transaction bytes")]
    Empty,
    #[error("invalid transaction type byte {0:#x}")]
    InvalidType(u8),
    #[error("malformed transaction RLP: {0}")]
    MalformedRlp(String),
    #[error("sender recovery failed: {0}")]
    RecoveryFailed(#[from] CryptoError),
    #[error("proof root does not match header body root")]
    BodyRootMismatch,
    #[error("{0} asserted does not match proven value")]
    AssertionMismatch(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Legacy,
    AccessList,
    Eip1559,
    Eip4844,
    Eip7702,
}

fn classify(first_byte: u8) -> Result<TxType, TransactionError> {
    match first_byte {
        0x7F..=0xFF => Ok(TxType::Legacy),
        0x01 => Ok(TxType::AccessList),
        0x02 => Ok(TxType::Eip1559),
        0x03 => Ok(TxType::Eip4844),
        0x04 => Ok(TxType::Eip7702),
        b => Err(TransactionError::InvalidType(b)),
    }
}

fn rebuild_list(items: &[&[u8]]) -> Vec<u8> {
    rlp::encode_list(&items.iter().map(|i| rlp::encode_bytes(i)).collect::<Vec<_>>())
}

fn pad_left_32(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = bytes.len().min(32);
    out[32 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
    out
}

fn decode_uint64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Recover the sending address of a raw (typed or legacy) transaction, per
/// spec.md §4.9's preimage-reconstruction contract.
pub fn recover_sender(raw_tx: &[u8]) -> Result<[u8; 20], TransactionError> {
    if raw_tx.is_empty() {
        return Err(TransactionError::Empty);
    }
    let tx_type = classify(raw_tx[0])?;

    let (digest, r, s, parity) = match tx_type {
        TxType::Legacy => {
            let items = rlp::decode_list(raw_tx).map_err(|e| TransactionError::MalformedRlp(e.to_string()))?;
            if items.len() != 9 {
                return Err(TransactionError::MalformedRlp(format!(
                    "expected 9 legacy fields, got {}",
                    items.len()
                )));
            }
            let raw: Vec<&[u8]> = items.iter().map(|i| i.as_bytes()).collect();
            let v = decode_uint64(raw[6]);
            let (preimage, parity) = if v >= 35 {
                let chain_id = (v - 35) / 2;
                let mut fields = raw[..6].to_vec();
                let chain_id_bytes = chain_id.to_be_bytes();
                let trimmed = trim_leading_zeros(&chain_id_bytes);
                fields.push(trimmed);
                fields.push(&[]);
                fields.push(&[]);
                (rebuild_list(&fields), ((v - 35) % 2) as u8)
            } else {
                let parity = match v {
                    27 => 0u8,
                    28 => 1u8,
                    other => (other % 2) as u8,
                };
                (rebuild_list(&raw[..6]), parity)
            };
            (keccak256(&preimage), raw[7].to_vec(), raw[8].to_vec(), parity)
        }
        _ => {
            let body = &raw_tx[1..];
            let items = rlp::decode_list(body).map_err(|e| TransactionError::MalformedRlp(e.to_string()))?;
            if items.len() < 3 {
                return Err(TransactionError::MalformedRlp("typed tx too short".into()));
            }
            let n = items.len();
            let raw: Vec<&[u8]> = items.iter().map(|i| i.as_bytes()).collect();
            let signed_fields = &raw[..n - 3];
            let mut preimage = vec![raw_tx[0]];
            preimage.extend_from_slice(&rebuild_list(signed_fields));
            let parity = decode_uint64(raw[n - 3]) as u8;
            (keccak256(&preimage), raw[n - 2].to_vec(), raw[n - 1].to_vec(), parity)
        }
    };

    let mut sig = [0u8; 65];
    sig[..32].copy_from_slice(&pad_left_32(&r));
    sig[32..64].copy_from_slice(&pad_left_32(&s));
    sig[64] = parity;

    let pubkey = secp256k1_recover(&digest, &sig)?;
    let hash = keccak256(&pubkey);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..32]);
    Ok(address)
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Generalized indices for the multi-leaf proof binding a transaction to
/// the execution payload subtree (fork-independent constants used by the
/// reference light client; real deployments parameterize these per fork).
pub struct TxBindingGindices {
    pub block_number: u64,
    pub block_hash: u64,
    pub base_fee_per_gas: u64,
    pub tx_base: u64,
}

pub const MAINNET_TX_BINDING: TxBindingGindices = TxBindingGindices {
    block_number: 3222,
    block_hash: 3228,
    base_fee_per_gas: 3227,
    tx_base: 1704,
};

#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub tx_type: TxType,
    pub from: [u8; 20],
    pub hash: [u8; 32],
}

/// Verify a transaction proof bundle: recompute the multi-leaf root from the
/// bundle's witness and compare it to the proven header's body root, then
/// recover the sender.
pub fn verify_transaction_proof(
    bundle: &TransactionProofBundle,
    gindices: &TxBindingGindices,
) -> Result<VerifiedTransaction, TransactionError> {
    let tx_ssz_root = {
        // hash_tree_root(tx_bytes_as_ssz_list): an SSZ `List(uint8, MAX_BYTES_PER_TX)`
        // is just the chunked+length-mixed root of the raw bytes.
        use crate::ssz::merkle::hash_tree_root;
        use crate::ssz::types::{Def, UintSize};
        let def = Def::List(Box::new(Def::Uint(UintSize::U8)), 1 << 20);
        hash_tree_root(&def, &bundle.raw_tx)
    };

    let leaves = vec![
        (gindices.block_number, leaf_u64(bundle.block_number)),
        (gindices.block_hash, bundle.block_hash),
        (gindices.base_fee_per_gas, leaf_u64(bundle.base_fee_per_gas)),
        (gindices.tx_base + bundle.tx_index, tx_ssz_root),
    ];

    let root = verify_multi_merkle_proof(&leaves, &bundle.witness)
        .map_err(|_| TransactionError::BodyRootMismatch)?;
    if root != bundle.block_proof.header.body_root {
        return Err(TransactionError::BodyRootMismatch);
    }

    let from = recover_sender(&bundle.raw_tx)?;
    let tx_type = classify(bundle.raw_tx[0])?;
    let hash = keccak256(&bundle.raw_tx);

    Ok(VerifiedTransaction { tx_type, from, hash })
}

fn leaf_u64(v: u64) -> [u8; 32] {
    let mut leaf = [0u8; 32];
    leaf[..8].copy_from_slice(&v.to_le_bytes());
    leaf
}

/// `eth_getTransactionByHash` argument check: the caller's asserted hash
/// must equal keccak(raw_tx).
pub fn check_hash_argument(raw_tx: &[u8], asserted: &[u8; 32]) -> Result<(), TransactionError> {
    if keccak256(raw_tx) != *asserted {
        return Err(TransactionError::AssertionMismatch("transaction hash"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_known_type_byte() {
        assert_eq!(classify(0x01).unwrap(), TxType::AccessList);
        assert_eq!(classify(0x02).unwrap(), TxType::Eip1559);
        assert_eq!(classify(0x03).unwrap(), TxType::Eip4844);
        assert_eq!(classify(0x04).unwrap(), TxType::Eip7702);
        assert_eq!(classify(0xf8).unwrap(), TxType::Legacy);
        assert!(classify(0x05).is_err());
    }

    #[test]
    fn legacy_parity_from_eip155_v() {
        // v = 37 => chain_id 1, parity 0; v = 38 => parity 1.
        assert_eq!((37u64 - 35) % 2, 0);
        assert_eq!((38u64 - 35) % 2, 1);
    }
}
