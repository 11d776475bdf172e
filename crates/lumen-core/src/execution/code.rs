//! Contract code resolver (spec.md §4.13): a small state machine over
//! `(account -> code bytes)` that prefers proof-carried code, falls back to
//! a content-addressed cache, and otherwise suspends with a `data_request`
//! for `eth_getCode`.

use std::collections::HashMap;

use thiserror::Error;

use crate::crypto::keccak256;
use crate::types::execution::AccountState;
use crate::types::proof::{DataRequest, RequestEncoding, RequestKind, RequestMethod};

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("code hash mismatch: expected {expected}, got {got}")]
    HashMismatch { expected: String, got: String },
    #[error("malformed eth_getCode response")]
    MalformedResponse,
}

/// A content-addressed code cache, keyed by `"code_<codeHash>"` per
/// spec.md §4.13 step 2.
#[derive(Default)]
pub struct CodeCache {
    entries: HashMap<[u8; 32], Vec<u8>>,
}

impl CodeCache {
    pub fn new() -> Self {
        CodeCache { entries: HashMap::new() }
    }

    pub fn get(&self, code_hash: &[u8; 32]) -> Option<&[u8]> {
        self.entries.get(code_hash).map(|v| v.as_slice())
    }

    pub fn insert(&mut self, code_hash: [u8; 32], code: Vec<u8>) {
        self.entries.insert(code_hash, code);
    }
}

pub enum CodeResolution {
    Resolved(Vec<u8>),
    Pending(DataRequest),
}

/// Resolve the code for `code_hash`, per spec.md §4.13's four-step lookup.
/// `proof_code` is whatever code bytes the proof bundle already carries for
/// this account, if any.
pub fn resolve_code(
    chain_id: u64,
    address: [u8; 20],
    code_hash: [u8; 32],
    proof_code: Option<&[u8]>,
    cache: &mut CodeCache,
) -> Result<CodeResolution, CodeError> {
    if code_hash == AccountState::EMPTY_CODE_HASH {
        return Ok(CodeResolution::Resolved(Vec::new()));
    }

    if let Some(cached) = cache.get(&code_hash) {
        return Ok(CodeResolution::Resolved(cached.to_vec()));
    }

    if let Some(code) = proof_code {
        let computed = keccak256(code);
        if computed != code_hash {
            return Err(CodeError::HashMismatch {
                expected: hex::encode(code_hash),
                got: hex::encode(computed),
            });
        }
        cache.insert(code_hash, code.to_vec());
        return Ok(CodeResolution::Resolved(code.to_vec()));
    }

    let url = format!("eth_getCode:{}:latest", hex::encode(address));
    let request = DataRequest::new(
        chain_id,
        RequestKind::Rpc,
        RequestMethod::Post,
        RequestEncoding::Json,
        url,
        address.to_vec(),
    );
    Ok(CodeResolution::Pending(request))
}

/// Install a resumed `eth_getCode` response: the response MUST hash to
/// `code_hash`, any mismatch is fatal (spec.md §4.13 step 4).
pub fn install_fetched_code(
    code_hash: [u8; 32],
    response: &[u8],
    cache: &mut CodeCache,
) -> Result<Vec<u8>, CodeError> {
    let code = if let Some(hex_str) = std::str::from_utf8(response).ok().map(str::trim) {
        let hex_str = hex_str.trim_matches('"').strip_prefix("0x").unwrap_or(hex_str);
        hex::decode(hex_str).map_err(|_| CodeError::MalformedResponse)?
    } else {
        return Err(CodeError::MalformedResponse);
    };

    let computed = keccak256(&code);
    if computed != code_hash {
        return Err(CodeError::HashMismatch {
            expected: hex::encode(code_hash),
            got: hex::encode(computed),
        });
    }
    cache.insert(code_hash, code.clone());
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_code_hash_resolves_without_fetching() {
        let mut cache = CodeCache::new();
        let result = resolve_code(1, [0u8; 20], AccountState::EMPTY_CODE_HASH, None, &mut cache).unwrap();
        assert!(matches!(result, CodeResolution::Resolved(code) if code.is_empty()));
    }

    #[test]
    fn proof_carried_code_is_hash_checked_and_cached() {
        let mut cache = CodeCache::new();
        let code = vec![0x60, 0x00, 0x60, 0x00];
        let hash = keccak256(&code);
        let result = resolve_code(1, [0u8; 20], hash, Some(&code), &mut cache).unwrap();
        assert!(matches!(result, CodeResolution::Resolved(c) if c == code));
        assert!(cache.get(&hash).is_some());
    }

    #[test]
    fn missing_code_emits_pending_request() {
        let mut cache = CodeCache::new();
        let hash = keccak256(&[0xAB]);
        let result = resolve_code(1, [0u8; 20], hash, None, &mut cache).unwrap();
        assert!(matches!(result, CodeResolution::Pending(_)));
    }

    #[test]
    fn mismatched_proof_code_is_fatal() {
        let mut cache = CodeCache::new();
        let wrong_hash = [0xAAu8; 32];
        let result = resolve_code(1, [0u8; 20], wrong_hash, Some(&[0x01]), &mut cache);
        assert!(matches!(result, Err(CodeError::HashMismatch { .. })));
    }
}
