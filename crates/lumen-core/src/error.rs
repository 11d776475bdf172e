//! Top-level error taxonomy the dispatcher aggregates into.
//!
//! Every subsystem (`rlp`, `ssz`, `mpt`, `crypto`, `consensus`, `execution`)
//! owns a specific `thiserror` enum; `VerifyError` wraps each one so that
//! `ctx.state.error` always has a single `Display` string naming the exact
//! invariant that failed, regardless of which layer raised it.

use thiserror::Error;

use crate::consensus::{CheckpointError, VerificationError};
use crate::execution::block::BlockError;
use crate::execution::call::CallError;
use crate::execution::code::CodeError;
use crate::execution::transaction::TransactionError;
use crate::execution::ProofError;
use crate::mpt::TrieError;
use crate::rlp::RlpError;
use crate::ssz::SszError;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("unsupported proof kind: {0}")]
    UnsupportedProofKind(String),

    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    #[error("merkle mismatch: {0}")]
    MerkleMismatch(String),

    #[error("proof inconsistent: {0}")]
    ProofInconsistent(String),

    #[error("missing proof: {0}")]
    MissingProof(String),

    #[error("pending: {0} outstanding data request(s)")]
    Pending(usize),

    #[error(transparent)]
    Rlp(#[from] RlpError),

    #[error(transparent)]
    Ssz(#[from] SszError),

    #[error(transparent)]
    Trie(#[from] TrieError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Sync(#[from] VerificationError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Code(#[from] CodeError),
}

impl VerifyError {
    /// The diagnostic string surfaced to `ctx.state.error` - the `Display`
    /// impl already names the violated invariant, this just gives callers a
    /// cheap way to store it without formatting twice.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, VerifyError::Pending(_))
    }
}
