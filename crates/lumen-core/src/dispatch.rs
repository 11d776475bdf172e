//! Verify dispatcher (spec.md §4.7): method taxonomy, request-arg schema
//! validation, and the `verify(ctx)` state machine that feeds `sync_data`
//! into the trust engine and routes a parsed `ProofBundle` to its verifier.
//!
//! The teacher has no dispatcher at all - `lumen-wasm` calls the bare
//! verification functions directly. This module is net new, grounded on the
//! proof-bundle union dispatch pattern in
//! `cosmos-solidity-ibc-eureka`'s `ethereum-light-client` crate (see
//! DESIGN.md).

use serde_json::Value;
use thiserror::Error;

use crate::consensus::light_client::{initialize_from_bootstrap, process_light_client_update};
use crate::consensus::sync_committee::{hash_beacon_block_header, VerificationError};
use crate::execution::block::{verify_block_proof, BlockError};
use crate::execution::call::{verify_call_proof, CallError, CallVerifyOutcome};
use crate::execution::code::CodeCache;
use crate::execution::proof::{verify_account_proof, verify_storage_proof, ProofError};
use crate::execution::receipt::{verify_logs_proof, verify_receipt_proof};
use crate::execution::transaction::{verify_transaction_proof, TransactionError, MAINNET_TX_BINDING};
use crate::ssz::merkle::verify_single_merkle_proof;
use crate::types::beacon::{LightClientBootstrap, LightClientState, LightClientUpdate};
use crate::types::chain::ChainSpec;
use crate::types::proof::{DataRequest, ProofBundle, VerifyContext};

#[cfg(feature = "op-stack")]
use crate::execution::l2::{verify_l2_output_proof, L2Error};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("unsupported proof kind: {0}")]
    UnsupportedProofKind(&'static str),
    #[error("invalid args: {0}")]
    InvalidArgs(String),
    #[error("state_proof does not bind to the trusted header's body_root")]
    StateRootMismatch,
    #[error("malformed client-updates blob entry")]
    MalformedUpdate,
    #[error(transparent)]
    Account(#[from] ProofError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Sync(#[from] VerificationError),
    #[cfg(feature = "op-stack")]
    #[error(transparent)]
    L2(#[from] L2Error),
}

/// `verify(ctx)`'s three-way result (spec.md §4.7 "Verify loop contract").
pub enum VerifyOutcome {
    Success,
    Pending(Vec<DataRequest>),
    Failure(String),
}

// ---------------------------------------------------------------------
// Method taxonomy
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    Proofable,
    Local,
    Undefined,
}

/// Per-(chain, method) classification. The method set per chain is fixed;
/// this crate only supports mainnet + sepolia today (`ChainSpec::mainnet`/
/// `ChainSpec::sepolia`), so the table does not vary by chain id beyond that
/// membership check.
pub fn classify_method(chain_id: u64, method: &str) -> MethodClass {
    if chain_id != 1 && chain_id != 11155111 {
        return MethodClass::Undefined;
    }
    match method {
        "eth_getBalance"
        | "eth_getTransactionCount"
        | "eth_getCode"
        | "eth_getStorageAt"
        | "eth_getTransactionByHash"
        | "eth_getTransactionReceipt"
        | "eth_getLogs"
        | "eth_getBlockByNumber"
        | "eth_getBlockByHash"
        | "eth_call" => MethodClass::Proofable,
        "eth_chainId" | "eth_blockNumber" | "net_version" => MethodClass::Local,
        _ => MethodClass::Undefined,
    }
}

// ---------------------------------------------------------------------
// Compact request-arg schema (spec.md §4.7 "Request schema")
// ---------------------------------------------------------------------

pub enum Schema {
    Address,
    Bytes32,
    Bytes,
    HexUint,
    SUint,
    Uint,
    Bool,
    Block,
    List(Box<Schema>),
    Object(Vec<(&'static str, Schema, bool)>),
}

fn is_hex_of_len(s: &str, byte_len: usize) -> bool {
    let s = s.strip_prefix("0x").unwrap_or(s);
    s.len() == byte_len * 2 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate `value` against `schema`. Returns `Ok(())` on success or an
/// allocated error string, matching spec.md's "NULL on success" contract.
pub fn validate_args(schema: &Schema, value: &Value) -> Result<(), String> {
    match schema {
        Schema::Address => match value.as_str() {
            Some(s) if is_hex_of_len(s, 20) => Ok(()),
            _ => Err("expected a 20-byte hex address".into()),
        },
        Schema::Bytes32 => match value.as_str() {
            Some(s) if is_hex_of_len(s, 32) => Ok(()),
            _ => Err("expected a 32-byte hex value".into()),
        },
        Schema::Bytes => match value.as_str() {
            Some(s) if s.strip_prefix("0x").unwrap_or(s).chars().all(|c| c.is_ascii_hexdigit()) => Ok(()),
            _ => Err("expected arbitrary hex bytes".into()),
        },
        Schema::HexUint => match value.as_str() {
            Some(s) if s.starts_with("0x") => Ok(()),
            _ => Err("expected a 0x-prefixed hex integer".into()),
        },
        Schema::SUint => match value.as_str() {
            Some(s) if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() => Ok(()),
            _ => Err("expected a decimal-string integer".into()),
        },
        Schema::Uint => {
            if value.is_u64() {
                Ok(())
            } else {
                Err("expected an unsigned integer".into())
            }
        }
        Schema::Bool => {
            if value.is_boolean() {
                Ok(())
            } else {
                Err("expected a boolean".into())
            }
        }
        Schema::Block => match value {
            Value::String(s) if matches!(s.as_str(), "latest" | "earliest" | "pending" | "finalized" | "safe") => Ok(()),
            Value::String(s) if s.starts_with("0x") => Ok(()),
            Value::Number(_) => Ok(()),
            _ => Err("expected a block tag or number".into()),
        },
        Schema::List(inner) => {
            let arr = value.as_array().ok_or_else(|| "expected an array".to_string())?;
            for item in arr {
                validate_args(inner, item)?;
            }
            Ok(())
        }
        Schema::Object(fields) => {
            for (name, field_schema, optional) in fields {
                match value.get(name) {
                    Some(v) => validate_args(field_schema, v)?,
                    None if *optional => {}
                    None => return Err(format!("missing field '{}'", name)),
                }
            }
            Ok(())
        }
    }
}

fn method_schema(method: &str) -> Option<Schema> {
    match method {
        "eth_getBalance" | "eth_getTransactionCount" | "eth_getCode" => Some(Schema::Object(vec![
            ("address", Schema::Address, false),
            ("block", Schema::Block, true),
        ])),
        "eth_getStorageAt" => Some(Schema::Object(vec![
            ("address", Schema::Address, false),
            ("key", Schema::Bytes32, false),
            ("block", Schema::Block, true),
        ])),
        "eth_getTransactionByHash" | "eth_getTransactionReceipt" => {
            Some(Schema::Object(vec![("hash", Schema::Bytes32, false)]))
        }
        "eth_getLogs" => Some(Schema::Object(vec![
            ("address", Schema::Address, true),
            ("fromBlock", Schema::Block, true),
            ("toBlock", Schema::Block, true),
            ("topics", Schema::List(Box::new(Schema::Bytes32)), true),
        ])),
        "eth_getBlockByNumber" | "eth_getBlockByHash" => Some(Schema::Object(vec![
            ("block", Schema::Block, false),
            ("fullTransactions", Schema::Bool, true),
        ])),
        "eth_call" => Some(Schema::Object(vec![
            ("to", Schema::Address, false),
            ("from", Schema::Address, true),
            ("data", Schema::Bytes, true),
            ("value", Schema::HexUint, true),
            ("block", Schema::Block, true),
            ("result", Schema::Bytes, true),
        ])),
        _ => None,
    }
}

// ---------------------------------------------------------------------
// Client-updates blob framing (spec.md §4.6 "Client-updates blob")
// ---------------------------------------------------------------------

pub struct RawUpdateEntry<'a> {
    pub fork_digest: [u8; 4],
    pub payload: &'a [u8],
}

/// Split a client-updates blob into framed entries: `8B length-LE || 4B
/// fork-digest || SSZ(LightClientUpdate)`. Detects the Lighthouse framing
/// variant (a leading table of little-endian absolute offsets) heuristically
/// and declines to split it further - that variant is recognized but not
/// decoded (see DESIGN.md). Stops at the first malformed entry, keeping
/// whatever entries parsed cleanly before it.
pub fn split_client_updates_blob(blob: &[u8]) -> Vec<RawUpdateEntry<'_>> {
    let mut entries = Vec::new();

    if blob.len() >= 8 {
        let first4 = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
        let looks_like_offset_table = first4 > 0 && first4 < blob.len() && blob[4..8].iter().any(|b| *b != 0);
        if looks_like_offset_table {
            return entries;
        }
    }

    let mut offset = 0usize;
    while offset + 12 <= blob.len() {
        let len = u64::from_le_bytes(blob[offset..offset + 8].try_into().unwrap()) as usize;
        let fork_digest = [blob[offset + 8], blob[offset + 9], blob[offset + 10], blob[offset + 11]];
        let start = offset + 12;
        if start + len > blob.len() {
            break;
        }
        entries.push(RawUpdateEntry { fork_digest, payload: &blob[start..start + len] });
        offset = start + len;
    }
    entries
}

const HEADER_WIDTH: usize = 8 + 8 + 32 + 32 + 32;
const COMMITTEE_WIDTH: usize = 512 * 48 + 48;
const NEXT_SYNC_COMMITTEE_BRANCH_WIDTH: usize = 5 * 32;
const FINALITY_BRANCH_WIDTH: usize = 6 * 32;
const SYNC_AGGREGATE_WIDTH: usize = 64 + 96;

fn decode_header(bytes: &[u8]) -> Result<crate::types::beacon::BeaconBlockHeader, DispatchError> {
    if bytes.len() < HEADER_WIDTH {
        return Err(DispatchError::MalformedUpdate);
    }
    let slot = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let proposer_index = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let mut parent_root = [0u8; 32];
    parent_root.copy_from_slice(&bytes[16..48]);
    let mut state_root = [0u8; 32];
    state_root.copy_from_slice(&bytes[48..80]);
    let mut body_root = [0u8; 32];
    body_root.copy_from_slice(&bytes[80..112]);
    Ok(crate::types::beacon::BeaconBlockHeader { slot, proposer_index, parent_root, state_root, body_root })
}

fn decode_branch(bytes: &[u8], depth: usize) -> Vec<[u8; 32]> {
    (0..depth)
        .map(|i| {
            let mut leaf = [0u8; 32];
            leaf.copy_from_slice(&bytes[i * 32..(i + 1) * 32]);
            leaf
        })
        .collect()
}

fn decode_committee(bytes: &[u8]) -> Result<crate::types::beacon::SyncCommittee, DispatchError> {
    use crate::types::beacon::BlsPublicKey;
    if bytes.len() < COMMITTEE_WIDTH {
        return Err(DispatchError::MalformedUpdate);
    }
    let pubkeys = (0..512)
        .map(|i| BlsPublicKey::from_bytes(&bytes[i * 48..(i + 1) * 48]).map_err(|_| DispatchError::MalformedUpdate))
        .collect::<Result<Vec<_>, _>>()?;
    let aggregate_pubkey =
        BlsPublicKey::from_bytes(&bytes[512 * 48..512 * 48 + 48]).map_err(|_| DispatchError::MalformedUpdate)?;
    Ok(crate::types::beacon::SyncCommittee { pubkeys, aggregate_pubkey })
}

/// Decode a single `LightClientUpdate` entry from a client-updates blob.
///
/// This crate has no generic SSZ decoder (only the reverse direction,
/// `ssz::json::json_to_ssz`, and `ssz::merkle::hash_tree_root` for encoded
/// bytes) - see DESIGN.md for why that engine is encode/hash-only. Rather
/// than build a general offset-table SSZ decoder for one call site, this
/// decodes `LightClientUpdate`'s fixed, known layout directly: a presence
/// byte gates the optional `next_sync_committee`, every other field is a
/// fixed-width vector or fixed-size container.
pub fn decode_light_client_update(bytes: &[u8]) -> Result<LightClientUpdate, DispatchError> {
    let mut offset = 0usize;
    let attested_header = decode_header(bytes.get(offset..offset + HEADER_WIDTH).ok_or(DispatchError::MalformedUpdate)?)?;
    offset += HEADER_WIDTH;

    let has_next_committee = *bytes.get(offset).ok_or(DispatchError::MalformedUpdate)? != 0;
    offset += 1;

    let next_sync_committee = if has_next_committee {
        let committee = decode_committee(bytes.get(offset..offset + COMMITTEE_WIDTH).ok_or(DispatchError::MalformedUpdate)?)?;
        offset += COMMITTEE_WIDTH;
        Some(committee)
    } else {
        None
    };

    let next_sync_committee_branch = decode_branch(
        bytes.get(offset..offset + NEXT_SYNC_COMMITTEE_BRANCH_WIDTH).ok_or(DispatchError::MalformedUpdate)?,
        5,
    );
    offset += NEXT_SYNC_COMMITTEE_BRANCH_WIDTH;

    let finalized_header = decode_header(bytes.get(offset..offset + HEADER_WIDTH).ok_or(DispatchError::MalformedUpdate)?)?;
    offset += HEADER_WIDTH;

    let finality_branch = decode_branch(
        bytes.get(offset..offset + FINALITY_BRANCH_WIDTH).ok_or(DispatchError::MalformedUpdate)?,
        6,
    );
    offset += FINALITY_BRANCH_WIDTH;

    let aggregate_bytes = bytes.get(offset..offset + SYNC_AGGREGATE_WIDTH).ok_or(DispatchError::MalformedUpdate)?;
    let sync_committee_bits = aggregate_bytes[..64].to_vec();
    let mut sig = [0u8; 96];
    sig.copy_from_slice(&aggregate_bytes[64..160]);
    offset += SYNC_AGGREGATE_WIDTH;

    let signature_slot = u64::from_le_bytes(
        bytes.get(offset..offset + 8).ok_or(DispatchError::MalformedUpdate)?.try_into().unwrap(),
    );

    Ok(LightClientUpdate {
        attested_header,
        next_sync_committee,
        next_sync_committee_branch,
        finalized_header,
        finality_branch,
        sync_aggregate: crate::types::beacon::SyncAggregate {
            sync_committee_bits,
            sync_committee_signature: crate::types::beacon::BlsSignature(sig),
        },
        signature_slot,
    })
}

// ---------------------------------------------------------------------
// sync_data ingestion (spec.md §4.7 step 2)
// ---------------------------------------------------------------------

fn ingest_sync_data(
    blob: &[u8],
    spec: &ChainSpec,
    client_state: &mut Option<LightClientState>,
) -> Result<(), DispatchError> {
    if client_state.is_none() {
        // First sync_data payload for this chain bootstraps the client; the
        // bootstrap is framed the same way, minus the length/fork-digest
        // prefix, so a zero-length blob is a caller error rather than silently
        // accepted.
        let bootstrap: LightClientBootstrap =
            serde_json::from_slice(blob).map_err(|_| DispatchError::MalformedUpdate)?;
        let state = initialize_from_bootstrap(&bootstrap, spec.genesis_validators_root, spec.fork_version_for_slot(bootstrap.header.slot))?;
        *client_state = Some(state);
        return Ok(());
    }

    let state = client_state.as_mut().expect("checked above");
    for entry in split_client_updates_blob(blob) {
        let update = decode_light_client_update(entry.payload)?;
        process_light_client_update(state, &update, update.signature_slot, spec.genesis_validators_root)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Proof-bundle routing (spec.md §4.7 step 3, §4.8-§4.14)
// ---------------------------------------------------------------------

pub enum RouteOutcome {
    Data(Vec<u8>),
    Pending(Vec<DataRequest>),
}

fn route_proof(
    chain_id: u64,
    bundle: &ProofBundle,
    args: &Value,
    client_state: &LightClientState,
    code_cache: &mut CodeCache,
) -> Result<RouteOutcome, DispatchError> {
    match bundle {
        ProofBundle::SignatureProof { header } => {
            if hash_beacon_block_header(header) != hash_beacon_block_header(&client_state.finalized_header)
                && header.slot != client_state.finalized_header.slot
            {
                return Err(DispatchError::StateRootMismatch);
            }
            Ok(RouteOutcome::Data(header.body_root.to_vec()))
        }

        ProofBundle::HeaderChainProof { headers } => {
            for pair in headers.windows(2) {
                if hash_beacon_block_header(&pair[1]) != pair[0].parent_root {
                    return Err(DispatchError::MalformedUpdate);
                }
            }
            let tip = headers.last().ok_or(DispatchError::MalformedUpdate)?;
            Ok(RouteOutcome::Data(tip.body_root.to_vec()))
        }

        ProofBundle::HistoricProof { block_proof } => {
            let leaf = hash_beacon_block_header(&block_proof.header);
            let computed = verify_single_merkle_proof(&block_proof.branch, leaf, block_proof.gindex);
            if computed != client_state.finalized_header.state_root {
                return Err(DispatchError::StateRootMismatch);
            }
            Ok(RouteOutcome::Data(leaf.to_vec()))
        }

        ProofBundle::BlockProof(bundle) => {
            let verified = verify_block_proof(&bundle.payload, &bundle.block_proof)?;
            Ok(RouteOutcome::Data(
                serde_json::to_vec(&serde_json::json!({
                    "number": verified.block_number,
                    "hash": hex::encode(verified.block_hash),
                    "parentHash": hex::encode(verified.parent_hash),
                    "stateRoot": hex::encode(verified.state_root),
                    "receiptsRoot": hex::encode(verified.receipts_root),
                    "transactionsRoot": hex::encode(verified.transactions_root),
                }))
                .unwrap_or_default(),
            ))
        }

        ProofBundle::AccountProof(bundle) => {
            let computed = verify_single_merkle_proof(&bundle.state_proof.branch, bundle.state_proof.state_root, bundle.state_proof.gindex);
            if computed != bundle.state_proof.header.body_root {
                return Err(DispatchError::StateRootMismatch);
            }
            let account = verify_account_proof(bundle.state_proof.state_root, bundle.address, &bundle.account_proof)?;
            let mut storage = Vec::with_capacity(bundle.storage_proofs.len());
            for sp in &bundle.storage_proofs {
                let value = verify_storage_proof(account.storage_root, sp.key, sp)?;
                storage.push(serde_json::json!({ "key": hex::encode(sp.key), "value": hex::encode(value) }));
            }
            Ok(RouteOutcome::Data(
                serde_json::to_vec(&serde_json::json!({
                    "nonce": account.nonce,
                    "balance": hex::encode(account.balance),
                    "codeHash": hex::encode(account.code_hash),
                    "storageHash": hex::encode(account.storage_root),
                    "storage": storage,
                }))
                .unwrap_or_default(),
            ))
        }

        ProofBundle::TransactionProof(bundle) => {
            let verified = verify_transaction_proof(bundle, &MAINNET_TX_BINDING)?;
            Ok(RouteOutcome::Data(
                serde_json::to_vec(&serde_json::json!({
                    "from": hex::encode(verified.from),
                    "hash": hex::encode(verified.hash),
                }))
                .unwrap_or_default(),
            ))
        }

        ProofBundle::ReceiptProof(bundle) => {
            let computed = verify_single_merkle_proof(&bundle.block_proof.branch, bundle.receipts_root, bundle.block_proof.gindex);
            if computed != bundle.block_proof.header.body_root {
                return Err(DispatchError::StateRootMismatch);
            }
            let receipt = verify_receipt_proof(bundle.receipts_root, bundle.tx_index, &bundle.receipt_proof)?;
            Ok(RouteOutcome::Data(
                serde_json::to_vec(&serde_json::json!({
                    "status": receipt.status,
                    "cumulativeGasUsed": receipt.cumulative_gas_used,
                    "logsCount": receipt.logs.len(),
                }))
                .unwrap_or_default(),
            ))
        }

        ProofBundle::LogsProof(bundle) => {
            for entry in &bundle.receipts {
                let computed = verify_single_merkle_proof(&entry.block_proof.branch, entry.receipts_root, entry.block_proof.gindex);
                if computed != entry.block_proof.header.body_root {
                    return Err(DispatchError::StateRootMismatch);
                }
            }
            let logs = verify_logs_proof(
                |block_proof| {
                    bundle
                        .receipts
                        .iter()
                        .find(|e| std::ptr::eq(&e.block_proof, block_proof))
                        .map(|e| e.receipts_root)
                        .unwrap_or([0u8; 32])
                },
                |_tx_index| [0u8; 32],
                bundle,
            )?;
            Ok(RouteOutcome::Data(serde_json::to_vec(&logs.len()).unwrap_or_default()))
        }

        ProofBundle::BlockNumberProof(bundle) => {
            let leaf = crate::ssz::merkle::uint64_leaf(bundle.block_number);
            let computed =
                verify_single_merkle_proof(&bundle.block_proof.branch, leaf, MAINNET_TX_BINDING.block_number);
            if computed != bundle.block_proof.header.body_root {
                return Err(DispatchError::StateRootMismatch);
            }
            Ok(RouteOutcome::Data(bundle.block_number.to_le_bytes().to_vec()))
        }

        ProofBundle::CallProof(bundle) => {
            let computed = verify_single_merkle_proof(&bundle.state_proof.branch, bundle.state_proof.state_root, bundle.state_proof.gindex);
            if computed != bundle.state_proof.header.body_root {
                return Err(DispatchError::StateRootMismatch);
            }
            let asserted = args
                .get("result")
                .and_then(Value::as_str)
                .and_then(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok())
                .unwrap_or_default();
            match verify_call_proof(chain_id, bundle.state_proof.state_root, bundle, &asserted, code_cache, |_, _| Vec::new())? {
                CallVerifyOutcome::Verified(bytes) => Ok(RouteOutcome::Data(bytes)),
                CallVerifyOutcome::Pending(reqs) => Ok(RouteOutcome::Pending(reqs)),
            }
        }

        #[cfg(feature = "op-stack")]
        ProofBundle::L2OutputProof(bundle) => {
            let l1 = &bundle.l1_account_proof.state_proof;
            let computed = verify_single_merkle_proof(&l1.branch, l1.state_root, l1.gindex);
            if computed != l1.header.body_root {
                return Err(DispatchError::StateRootMismatch);
            }
            let output = verify_l2_output_proof(l1.state_root, bundle)?;
            Ok(RouteOutcome::Data(output.to_vec()))
        }
        #[cfg(not(feature = "op-stack"))]
        ProofBundle::L2OutputProof(_) => Err(DispatchError::UnsupportedProofKind("L2OutputProof")),
    }
}

// ---------------------------------------------------------------------
// verify(ctx) - the dispatcher entry point
// ---------------------------------------------------------------------

/// The dispatcher entry point (spec.md §4.7 "Verify loop contract"). `spec`
/// and `client_state` are the per-chain handles a host threads through every
/// call (per store.rs's own note: explicit state, no process-wide
/// singleton). `code_cache` is likewise the host's persistent contract-code
/// cache across `eth_call` verifications.
pub fn verify(
    ctx: &mut VerifyContext,
    spec: &ChainSpec,
    client_state: &mut Option<LightClientState>,
    code_cache: &mut CodeCache,
) -> VerifyOutcome {
    // Step 1: chain support.
    if ctx.chain_id != spec.chain_id {
        let msg = format!("unsupported chain: {}", ctx.chain_id);
        ctx.error = Some(msg.clone());
        return VerifyOutcome::Failure(msg);
    }

    // Method classification + arg schema, ahead of any proof work.
    if let Some(method) = ctx.method.clone() {
        match classify_method(ctx.chain_id, &method) {
            MethodClass::Undefined => {
                let msg = format!("undefined method: {}", method);
                ctx.error = Some(msg.clone());
                return VerifyOutcome::Failure(msg);
            }
            MethodClass::Local => {
                ctx.success = true;
                return VerifyOutcome::Success;
            }
            MethodClass::Proofable => {
                if let Some(schema) = method_schema(&method) {
                    if let Err(e) = validate_args(&schema, &ctx.args) {
                        ctx.error = Some(e.clone());
                        return VerifyOutcome::Failure(e);
                    }
                }
            }
        }
    }

    // Step 2: feed sync_data into the trust engine.
    if let Some(sync_bytes) = ctx.sync_data.take() {
        if let Err(e) = ingest_sync_data(&sync_bytes, spec, client_state) {
            let msg = e.to_string();
            ctx.error = Some(msg.clone());
            return VerifyOutcome::Failure(msg);
        }
    }

    let Some(state) = client_state.as_ref() else {
        let msg = "no trusted checkpoint: submit a bootstrap via sync_data first".to_string();
        ctx.error = Some(msg.clone());
        return VerifyOutcome::Failure(msg);
    };

    // Step 3/4: route the proof, or succeed on a bare sync-data bootstrap.
    let Some(bundle) = ctx.proof.as_ref() else {
        if ctx.method.is_none() {
            ctx.success = true;
            return VerifyOutcome::Success;
        }
        let msg = "missing proof for a proofable method".to_string();
        ctx.error = Some(msg.clone());
        return VerifyOutcome::Failure(msg);
    };

    match route_proof(ctx.chain_id, bundle, &ctx.args, state, code_cache) {
        Ok(RouteOutcome::Data(data)) => {
            ctx.data = Some(data);
            ctx.success = true;
            VerifyOutcome::Success
        }
        Ok(RouteOutcome::Pending(reqs)) => {
            ctx.outstanding.extend(reqs.clone());
            VerifyOutcome::Pending(reqs)
        }
        Err(e) => {
            let msg = e.to_string();
            ctx.error = Some(msg.clone());
            VerifyOutcome::Failure(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_methods_never_need_a_proof() {
        assert_eq!(classify_method(1, "eth_chainId"), MethodClass::Local);
    }

    #[test]
    fn unknown_chain_is_undefined() {
        assert_eq!(classify_method(999, "eth_chainId"), MethodClass::Undefined);
    }

    #[test]
    fn proofable_method_requires_its_schema_fields() {
        let schema = method_schema("eth_getBalance").unwrap();
        let bad = serde_json::json!({});
        assert!(validate_args(&schema, &bad).is_err());
        let good = serde_json::json!({ "address": format!("0x{}", "11".repeat(20)) });
        assert!(validate_args(&schema, &good).is_ok());
    }

    #[test]
    fn blob_splitting_stops_on_truncated_entry() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&4u64.to_le_bytes());
        blob.extend_from_slice(&[4, 0, 0, 0]);
        blob.extend_from_slice(&[1, 2, 3, 4]);
        blob.extend_from_slice(&200u64.to_le_bytes());
        blob.extend_from_slice(&[4, 0, 0, 0]);
        blob.extend_from_slice(&[9, 9]);
        let entries = split_client_updates_blob(&blob);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn lighthouse_offset_table_is_recognized_and_not_split() {
        let mut blob = vec![0u8; 16];
        blob[0] = 8;
        blob[4] = 1;
        let entries = split_client_updates_blob(&blob);
        assert!(entries.is_empty());
    }

    #[test]
    fn verify_rejects_unsupported_chain() {
        let spec = ChainSpec::mainnet();
        let mut ctx = VerifyContext::new(999, Some("eth_chainId".into()), serde_json::Value::Null);
        let mut state = None;
        let mut cache = CodeCache::new();
        let outcome = verify(&mut ctx, &spec, &mut state, &mut cache);
        assert!(matches!(outcome, VerifyOutcome::Failure(_)));
    }

    #[test]
    fn verify_succeeds_locally_without_a_checkpoint() {
        let spec = ChainSpec::mainnet();
        let mut ctx = VerifyContext::new(1, Some("eth_chainId".into()), serde_json::Value::Null);
        let mut state = None;
        let mut cache = CodeCache::new();
        let outcome = verify(&mut ctx, &spec, &mut state, &mut cache);
        assert!(matches!(outcome, VerifyOutcome::Success));
    }

    #[test]
    fn verify_without_a_checkpoint_and_a_proofable_method_fails() {
        let spec = ChainSpec::mainnet();
        let mut ctx = VerifyContext::new(
            1,
            Some("eth_getBalance".into()),
            serde_json::json!({ "address": format!("0x{}", "11".repeat(20)) }),
        );
        let mut state = None;
        let mut cache = CodeCache::new();
        let outcome = verify(&mut ctx, &spec, &mut state, &mut cache);
        assert!(matches!(outcome, VerifyOutcome::Failure(_)));
    }
}
