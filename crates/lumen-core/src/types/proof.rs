//! The proof bundle tagged union, verify context, and outstanding data
//! requests (spec.md §3's "Proof bundle" / "Verify context" / "Outstanding
//! data request").

use serde::{Deserialize, Serialize};

use super::beacon::{BeaconBlockHeader, ExecutionPayload};
use super::execution::{AccountProof, ReceiptProof, StorageProof};

/// A Merkle proof binding some execution-layer datum up to a trusted beacon
/// header, shared by every proof variant that needs `state_proof` framing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateProof {
    pub header: BeaconBlockHeader,
    /// The execution payload's state_root - the leaf `branch` proves up to
    /// `header.body_root`.
    pub state_root: [u8; 32],
    /// Branch from the execution payload's state_root to `header.body_root`.
    pub branch: Vec<[u8; 32]>,
    pub gindex: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockProof {
    pub header: BeaconBlockHeader,
    pub branch: Vec<[u8; 32]>,
    pub gindex: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountProofBundle {
    pub state_proof: StateProof,
    pub address: [u8; 20],
    pub account_proof: AccountProof,
    pub storage_proofs: Vec<StorageProof>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionProofBundle {
    pub raw_tx: Vec<u8>,
    pub tx_index: u64,
    pub block_number: u64,
    pub block_hash: [u8; 32],
    pub base_fee_per_gas: u64,
    /// Multi-leaf witness binding (block_number, block_hash, base_fee,
    /// tx_at_index) to `block_proof.header.body_root`.
    pub witness: Vec<[u8; 32]>,
    pub block_proof: BlockProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiptProofBundle {
    pub tx_index: u64,
    /// The receipts-trie root `receipt_proof` is verified against - the leaf
    /// `block_proof.branch` proves up to `block_proof.header.body_root`.
    pub receipts_root: [u8; 32],
    pub receipt_proof: ReceiptProof,
    pub block_proof: BlockProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogsProofBundle {
    pub receipts: Vec<ReceiptProofBundle>,
    pub log_indices: Vec<(usize, usize)>, // (receipt index, log index within receipt)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionBlockProofBundle {
    pub payload: ExecutionPayload,
    pub block_proof: BlockProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockNumberProofBundle {
    pub block_number: u64,
    pub block_proof: BlockProof,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallAccountInput {
    pub address: [u8; 20],
    pub account_proof: AccountProof,
    pub storage_keys: Vec<[u8; 32]>,
    pub storage_proofs: Vec<StorageProof>,
    pub code: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallProofBundle {
    pub state_proof: StateProof,
    pub accounts: Vec<CallAccountInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct L2OutputProofBundle {
    pub l2_version: [u8; 32],
    pub l2_state_root: [u8; 32],
    pub l2_withdrawals_root: [u8; 32],
    pub l2_block_hash: [u8; 32],
    pub output_index: u64,
    pub mapping_slot: [u8; 32],
    pub l1_account_proof: AccountProofBundle,
}

/// The SSZ union tag selecting a proof verifier (spec.md §3 "Proof bundle").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ProofBundle {
    SignatureProof { header: BeaconBlockHeader },
    HeaderChainProof { headers: Vec<BeaconBlockHeader> },
    HistoricProof { block_proof: BlockProof },
    AccountProof(AccountProofBundle),
    TransactionProof(TransactionProofBundle),
    ReceiptProof(ReceiptProofBundle),
    LogsProof(LogsProofBundle),
    BlockProof(ExecutionBlockProofBundle),
    BlockNumberProof(BlockNumberProofBundle),
    CallProof(CallProofBundle),
    L2OutputProof(L2OutputProofBundle),
}

impl ProofBundle {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ProofBundle::SignatureProof { .. } => "SignatureProof",
            ProofBundle::HeaderChainProof { .. } => "HeaderChainProof",
            ProofBundle::HistoricProof { .. } => "HistoricProof",
            ProofBundle::AccountProof(_) => "AccountProof",
            ProofBundle::TransactionProof(_) => "TransactionProof",
            ProofBundle::ReceiptProof(_) => "ReceiptProof",
            ProofBundle::LogsProof(_) => "LogsProof",
            ProofBundle::BlockProof(_) => "BlockProof",
            ProofBundle::BlockNumberProof(_) => "BlockNumberProof",
            ProofBundle::CallProof(_) => "CallProof",
            ProofBundle::L2OutputProof(_) => "L2OutputProof",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    BeaconApi,
    Rpc,
    Rest,
    Intern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestMethod {
    Get,
    Post,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestEncoding {
    Json,
    Ssz,
}

/// An outstanding data request (spec.md §3). `id` is the keccak of the
/// canonical request payload, so requests are content-addressed and
/// idempotent - the host may fulfill them in any order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataRequest {
    pub id: [u8; 32],
    pub chain_id: u64,
    pub kind: RequestKind,
    pub method: RequestMethod,
    pub encoding: RequestEncoding,
    pub url: String,
    pub payload: Vec<u8>,
    pub response: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl DataRequest {
    pub fn new(
        chain_id: u64,
        kind: RequestKind,
        method: RequestMethod,
        encoding: RequestEncoding,
        url: String,
        payload: Vec<u8>,
    ) -> Self {
        let id = crate::crypto::keccak256(
            format!("{}:{}:{:?}", chain_id, url, payload).as_bytes(),
        );
        DataRequest {
            id,
            chain_id,
            kind,
            method,
            encoding,
            url,
            payload,
            response: None,
            error: None,
        }
    }
}

/// Ephemeral per-request verification state (spec.md §3 "Verify context").
#[derive(Clone, Debug)]
pub struct VerifyContext {
    pub chain_id: u64,
    pub method: Option<String>,
    pub args: serde_json::Value,
    pub proof: Option<ProofBundle>,
    pub sync_data: Option<Vec<u8>>,
    pub data: Option<Vec<u8>>,
    pub error: Option<String>,
    pub outstanding: Vec<DataRequest>,
    pub success: bool,
}

impl VerifyContext {
    pub fn new(chain_id: u64, method: Option<String>, args: serde_json::Value) -> Self {
        VerifyContext {
            chain_id,
            method,
            args,
            proof: None,
            sync_data: None,
            data: None,
            error: None,
            outstanding: Vec::new(),
            success: false,
        }
    }
}
