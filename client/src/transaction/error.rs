//! Error types for transaction records.
//!
//! Only preconditions surface as [`TransactionError`]. Once a record has
//! started talking to the network, failures are captured on the record
//! itself (see [`FailureReason`](super::types::FailureReason)) and the
//! operation returns the resulting state instead.

use thiserror::Error;

use super::types::TxState;
use crate::codec::CodecError;

/// Errors raised synchronously by record construction and operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    /// Construction arguments failed validation. Never retried.
    #[error("invalid transaction info: {0}")]
    Validation(String),

    /// A field needed for signing is missing or malformed.
    #[error("transaction not ready to sign: {0}")]
    NotReady(String),

    /// `submit` was called on a record that was never signed.
    #[error("transaction not signed: call sign() first")]
    NotSigned,

    /// The operation is not allowed in the record's current state.
    #[error("cannot {operation} a transaction in state {state}")]
    InvalidState {
        state: TxState,
        operation: &'static str,
    },

    /// The stored signature no longer covers the current payload and no
    /// signer is available to refresh it.
    #[error("signature does not cover the current payload; sign again")]
    StaleSignature,

    #[error(transparent)]
    Codec(#[from] CodecError),
}
