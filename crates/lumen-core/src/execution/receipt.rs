//! Receipt and logs verifiers (spec.md §4.10).

use crate::execution::proof::ProofError;
use crate::mpt::{self, ProofOutcome};
use crate::rlp;
use crate::types::execution::*;
use crate::types::proof::LogsProofBundle;

/// Verify a transaction receipt proof against a known receipts root.
/// The receipts root comes from a verified execution payload header.
pub fn verify_receipt_proof(
    receipts_root: [u8; 32],
    tx_index: u64,
    proof: &ReceiptProof,
) -> Result<TransactionReceipt, ProofError> {
    if proof.proof.is_empty() {
        return Err(ProofError::EmptyProof);
    }

    // The key in the receipts trie is the RLP-encoded transaction index.
    let key = rlp::encode_uint(tx_index);

    match mpt::verify(receipts_root, &key, &proof.proof)? {
        ProofOutcome::Found(rlp_bytes) => decode_receipt_from_rlp(&rlp_bytes),
        ProofOutcome::NotExisting => Err(ProofError::InvalidValueEncoding {
            reason: format!("Receipt not found for tx_index {}", tx_index),
        }),
    }
}

/// Decode a transaction receipt from RLP encoding.
/// Post-EIP-2718, receipts may be typed (prefixed with a type byte).
fn decode_receipt_from_rlp(data: &[u8]) -> Result<TransactionReceipt, ProofError> {
    let rlp_data = if !data.is_empty() && data[0] <= 0x7F {
        &data[1..]
    } else {
        data
    };

    let items = rlp::decode_list(rlp_data).map_err(|e| ProofError::InvalidValueEncoding {
        reason: format!("Invalid receipt RLP: {}", e),
    })?;

    if items.len() != 4 {
        return Err(ProofError::InvalidValueEncoding {
            reason: format!("Receipt should have 4 items, got {}", items.len()),
        });
    }

    let status_bytes = items[0].as_bytes();
    let status = if status_bytes.is_empty() { 0 } else { status_bytes[0] };

    let cumulative_gas_used = bytes_to_u64(items[1].as_bytes());

    let mut logs_bloom = [0u8; 256];
    let bloom_bytes = items[2].as_bytes();
    if bloom_bytes.len() == 256 {
        logs_bloom.copy_from_slice(bloom_bytes);
    }

    let logs = decode_logs(items[3].as_bytes())?;

    Ok(TransactionReceipt {
        status,
        cumulative_gas_used,
        logs_bloom,
        logs,
    })
}

fn decode_logs(data: &[u8]) -> Result<Vec<Log>, ProofError> {
    if data.is_empty() || data[0] == 0xC0 {
        return Ok(vec![]);
    }

    let log_items = rlp::decode_list(data).map_err(|e| ProofError::InvalidValueEncoding {
        reason: format!("Invalid logs RLP: {}", e),
    })?;

    let mut logs = Vec::new();
    for log_item in &log_items {
        let fields = rlp::decode_list(log_item.as_bytes()).map_err(|e| ProofError::InvalidValueEncoding {
            reason: format!("Invalid log RLP: {}", e),
        })?;

        if fields.len() != 3 {
            return Err(ProofError::InvalidValueEncoding {
                reason: format!("Log should have 3 fields, got {}", fields.len()),
            });
        }

        let addr_bytes = fields[0].as_bytes();
        let mut address = [0u8; 20];
        if addr_bytes.len() == 20 {
            address.copy_from_slice(addr_bytes);
        }

        let topic_items = rlp::decode_list(fields[1].as_bytes()).map_err(|e| ProofError::InvalidValueEncoding {
            reason: format!("Invalid topics RLP: {}", e),
        })?;

        let topics: Vec<[u8; 32]> = topic_items
            .iter()
            .filter_map(|t| {
                let b = t.as_bytes();
                if b.len() == 32 {
                    let mut arr = [0u8; 32];
                    arr.copy_from_slice(b);
                    Some(arr)
                } else {
                    None
                }
            })
            .collect();

        logs.push(Log {
            address,
            topics,
            data: fields[2].as_bytes().to_vec(),
        });
    }

    Ok(logs)
}

fn bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// A single verified log, bound to the transaction and block it was emitted in
/// (spec.md §4.10 "Logs"). `log_index` is the position within the receipt's
/// logs array; per spec.md §9 open questions this is not independently bound
/// to anything beyond array order.
#[derive(Debug, Clone)]
pub struct VerifiedLog {
    pub block_hash: [u8; 32],
    pub block_number: u64,
    pub transaction_hash: [u8; 32],
    pub transaction_index: u64,
    pub log_index: usize,
    pub log: Log,
}

/// Verify every log referenced by a `LogsProofBundle`: each receipt is bound
/// to the beacon body root, then every requested `(receipt_index, log_index)`
/// pair is extracted from that receipt's verified logs. Every asserted log
/// MUST have a proof, and every verified receipt's logs MUST be consumed by
/// at least one requested index.
pub fn verify_logs_proof(
    receipts_root_for: impl Fn(&crate::types::proof::BlockProof) -> [u8; 32],
    tx_hash_for: impl Fn(u64) -> [u8; 32],
    bundle: &LogsProofBundle,
) -> Result<Vec<VerifiedLog>, ProofError> {
    let mut verified_receipts = Vec::with_capacity(bundle.receipts.len());
    for entry in &bundle.receipts {
        let receipts_root = receipts_root_for(&entry.block_proof);
        let receipt = verify_receipt_proof(receipts_root, entry.tx_index, &entry.receipt_proof)?;
        verified_receipts.push((entry, receipt));
    }

    let mut out = Vec::with_capacity(bundle.log_indices.len());
    for &(receipt_idx, log_idx) in &bundle.log_indices {
        let (entry, receipt) =
            verified_receipts
                .get(receipt_idx)
                .ok_or_else(|| ProofError::InvalidValueEncoding {
                    reason: format!("no verified receipt at index {}", receipt_idx),
                })?;
        let log = receipt
            .logs
            .get(log_idx)
            .ok_or_else(|| ProofError::InvalidValueEncoding {
                reason: format!("receipt {} has no log at index {}", receipt_idx, log_idx),
            })?
            .clone();

        out.push(VerifiedLog {
            block_hash: entry.block_proof.header.body_root,
            block_number: entry.block_proof.header.slot,
            transaction_hash: tx_hash_for(entry.tx_index),
            transaction_index: entry.tx_index,
            log_index: log_idx,
            log,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpt::Trie;

    fn sample_receipt_rlp(status: u8) -> Vec<u8> {
        rlp::encode_list(&[
            rlp::encode_uint(status as u64),
            rlp::encode_uint(21000),
            rlp::encode_bytes(&[0u8; 256]),
            rlp::encode_list(&[]),
        ])
    }

    #[test]
    fn receipt_round_trips_through_trie() {
        let mut trie = Trie::new();
        let key = rlp::encode_uint(0);
        trie.insert(&key, sample_receipt_rlp(1));
        let root = trie.root_hash();
        let proof = trie.create_merkle_proof(&key);

        let receipt = verify_receipt_proof(root, 0, &ReceiptProof { tx_index: 0, proof }).unwrap();
        assert_eq!(receipt.status, 1);
        assert_eq!(receipt.cumulative_gas_used, 21000);
        assert!(receipt.logs.is_empty());
    }

    #[test]
    fn missing_receipt_is_reported() {
        let mut trie = Trie::new();
        trie.insert(&rlp::encode_uint(0), sample_receipt_rlp(1));
        let root = trie.root_hash();
        let proof = trie.create_merkle_proof(&rlp::encode_uint(5));

        let result = verify_receipt_proof(root, 5, &ReceiptProof { tx_index: 5, proof });
        assert!(result.is_err());
    }
}
