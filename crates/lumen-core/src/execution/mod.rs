pub mod proof;
pub mod account;
pub mod receipt;
pub mod transaction;
pub mod block;
pub mod call;
pub mod code;

#[cfg(feature = "op-stack")]
pub mod l2;

pub use proof::*;
pub use account::*;
pub use receipt::{verify_receipt_proof, verify_logs_proof, VerifiedLog};
pub use transaction::{recover_sender, verify_transaction_proof, TransactionError, TxType, VerifiedTransaction};
pub use block::{verify_block_proof, BlockError, VerifiedBlock};
pub use call::{verify_call_proof, CallError, CallMessage, CallVerifyOutcome};
pub use code::{resolve_code, install_fetched_code, CodeCache, CodeError, CodeResolution};
