//! # Transaction Module
//!
//! Construction, signing, submission, and confirmation of ledger
//! transactions. Each logical intent is one [`TransactionRecord`].
//!
//! ## Architecture
//!
//! ```text
//! types.rs       : Lifecycle states, failure reasons, stored results
//! error.rs       : Precondition errors (TransactionError)
//! payload.rs     : TxInfo (caller intent) and the signable Payload
//! record.rs      : TransactionRecord: construction, nonce assignment, snapshots
//! signing.rs     : sign / verify_signature over canonical bytes
//! lifecycle.rs   : submit and bounded confirmation polling
//! result_info.rs : Pure classification of responses into ResultInfo
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionRecord::new`] validates a [`TxInfo`] once.
//! 2. **Sign**: [`TransactionRecord::sign`] signs the canonical payload.
//! 3. **Submit**: [`TransactionRecord::submit`] fetches a nonce if needed,
//!    re-signs, and sends.
//! 4. **Confirm**: [`TransactionRecord::check_for_result`] polls until the
//!    ledger settles it or the attempt cap is hit.
//!
//! ## Design Decisions
//!
//! - The nonce is part of the signed payload. Assigning one recomputes the
//!   canonical form, and a signature taken before that is refreshed at
//!   submission with the signer the record was signed with.
//! - Network failures never propagate as `Err`. They end the record in
//!   `Terminal(Failed(reason))` with the error text in its stored result,
//!   so callers inspect state instead of unwinding async chains.
//! - Retry exhaustion and ledger rejection are different
//!   [`FailureReason`]s.

pub mod error;
pub mod lifecycle;
pub mod payload;
pub mod record;
pub mod result_info;
pub mod signing;
pub mod types;

pub use error::TransactionError;
pub use lifecycle::NON_ZERO_STATUS_ERROR;
pub use payload::{Payload, TxInfo};
pub use record::{RecordSnapshot, TransactionRecord};
pub use types::{
    FailureReason, NonceResult, Outcome, ResponseRecord, ResultInfo, ResultKind, TxState,
};
