//! Core type definitions for transaction records.
//!
//! The lifecycle vocabulary ([`TxState`], [`Outcome`], [`FailureReason`])
//! and the data a record accumulates on its way to settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::network::TxResponse;

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Why a record ended in `Terminal(Failed)`.
///
/// Retry exhaustion is its own variant: "we stopped asking" and "the
/// ledger said no" must never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// The nonce request failed or came back without a nonce.
    NonceUnavailable,
    /// A request never produced a usable answer.
    Transport,
    /// The service answered with an error instead of a result.
    Remote,
    /// The ledger processed the transaction and rejected it.
    Rejected,
    /// Confirmation polling hit its attempt cap.
    RetryExhausted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonceUnavailable => write!(f, "NonceUnavailable"),
            Self::Transport => write!(f, "Transport"),
            Self::Remote => write!(f, "Remote"),
            Self::Rejected => write!(f, "Rejected"),
            Self::RetryExhausted => write!(f, "RetryExhausted"),
        }
    }
}

// ---------------------------------------------------------------------------
// TxState
// ---------------------------------------------------------------------------

/// Final outcome of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failed(FailureReason),
}

/// Lifecycle state of a transaction record.
///
/// ```text
/// Unsigned -> Signed -> Submitting -> Pending -> Terminal(Success | Failed)
///                            \_________________/^
/// ```
///
/// Transitions only move forward. `Submitting` may jump straight to
/// `Terminal` when the service finalizes synchronously or the submission
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxState {
    Unsigned,
    Signed,
    Submitting,
    Pending,
    Terminal(Outcome),
}

impl TxState {
    /// Returns `true` if moving from `self` to `next` is a legal forward
    /// step. Re-signing (`Signed -> Signed`) is the only self-transition.
    pub fn can_advance_to(&self, next: &TxState) -> bool {
        matches!(
            (self, next),
            (Self::Unsigned, Self::Signed)
                | (Self::Signed, Self::Signed | Self::Submitting)
                | (Self::Submitting, Self::Pending | Self::Terminal(_))
                | (Self::Pending, Self::Terminal(_))
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Terminal(Outcome::Success))
    }

    /// The failure reason, if this is a failed terminal state.
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            Self::Terminal(Outcome::Failed(reason)) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned => write!(f, "Unsigned"),
            Self::Signed => write!(f, "Signed"),
            Self::Submitting => write!(f, "Submitting"),
            Self::Pending => write!(f, "Pending"),
            Self::Terminal(Outcome::Success) => write!(f, "Terminal(Success)"),
            Self::Terminal(Outcome::Failed(reason)) => write!(f, "Terminal(Failed: {reason})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A nonce successfully obtained for a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResult {
    pub nonce: u64,
    pub processor: String,
    /// Host that issued the nonce; submissions are routed back to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masternode: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A service response as stored on the record, with the time it was
/// handled. Failures that never reached the service are stored here too,
/// as a response carrying only `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    #[serde(flatten)]
    pub response: TxResponse,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn now(response: TxResponse) -> Self {
        Self {
            response,
            timestamp: Utc::now(),
        }
    }

    /// A response holding only the given error entries.
    pub fn errors(errors: Vec<String>) -> Self {
        Self::now(TxResponse {
            errors: Some(errors),
            ..TxResponse::default()
        })
    }
}

/// Severity of a [`ResultInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Success,
    Error,
}

/// Human-readable classification of a record's latest outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultInfo {
    pub title: String,
    pub subtitle: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamps_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
}
