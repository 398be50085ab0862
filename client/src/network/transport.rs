//! # Transport Interface
//!
//! The request/response contract between a transaction record and the
//! remote ledger service, plus the wire types that cross it.
//!
//! ## Endpoint Index
//!
//! | Operation             | Request                      | Response          |
//! |-----------------------|------------------------------|-------------------|
//! | `get_nonce`           | sender vk                    | [`NonceResponse`] |
//! | `send_transaction`    | [`WireTransaction`], host    | [`TxResponse`]    |
//! | `check_transaction`   | transaction hash             | [`TxResponse`]    |
//! | `ping`                | none                         | `bool`            |
//!
//! Responses are deliberately loose: every field is optional because the
//! remote service answers the same endpoint with several shapes (an
//! acceptance marker, an error string, or a full settlement result). The
//! record decides what a given shape means; the transport only moves bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::TX_NOT_FOUND_ERROR;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures below the application protocol: the request never produced a
/// parseable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS trouble, ...
    #[error("http error: {0}")]
    Http(String),

    /// The service answered with a non-success status and no usable body.
    #[error("unexpected status {code}: {reason}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Canonical reason phrase, or the raw body when there is none.
        reason: String,
    },

    /// The body was not the JSON shape we expected.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A configured host is unusable (missing scheme, empty list, ...).
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// The request did not complete within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Answer to a nonce request.
///
/// `nonce` is optional on purpose: a response without it is a nonce
/// failure, and that judgement belongs to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    /// The host that issued the nonce. Filled in by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masternode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answer to a submission or a status check.
///
/// Three shapes arrive here:
/// - accepted: `hash` and `success` are set;
/// - rejected: `error` is set;
/// - settled: `status`, `result`, `stamps_used` and `errors` describe the
///   outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamps_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TxResponse {
    /// A settlement result with the given status code and stamp usage.
    pub fn settled(status: i64, stamps_used: u64) -> Self {
        Self {
            status: Some(status),
            stamps_used: Some(stamps_used),
            ..Self::default()
        }
    }

    /// An acceptance marker for `hash`.
    pub fn accepted(hash: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
            success: Some(Value::String("Transaction queued".into())),
            ..Self::default()
        }
    }

    /// A bare error response.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// The service took the transaction and handed back a hash to poll.
    ///
    /// Needs a non-empty hash and a success marker that is either a
    /// non-empty string or `true`.
    pub fn is_accepted(&self) -> bool {
        let has_hash = self.hash.as_deref().is_some_and(|h| !h.trim().is_empty());
        let marked = match &self.success {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Bool(b)) => *b,
            _ => false,
        };
        has_hash && marked
    }

    /// The service does not know this hash yet.
    pub fn is_not_found(&self) -> bool {
        self.error.as_deref() == Some(TX_NOT_FOUND_ERROR)
    }

    /// Error entries carried by a settlement result.
    pub fn error_list(&self) -> &[String] {
        self.errors.as_deref().unwrap_or_default()
    }
}

/// Signature metadata attached to a submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMetadata {
    /// Hex Ed25519 signature over the canonical payload bytes.
    pub signature: String,
    /// Unix seconds at submission.
    pub timestamp: i64,
}

/// What actually goes over the wire: `{metadata, payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub metadata: WireMetadata,
    /// The key-sorted payload object.
    pub payload: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// The remote ledger service, as seen by a transaction record.
///
/// Implementations own host selection. Errors are transport-level only;
/// an application-level rejection is a successful call returning a
/// response with `error` set.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the next nonce and processor for `sender`.
    async fn get_nonce(&self, sender: &str) -> Result<NonceResponse, TransportError>;

    /// Submits a signed transaction. `host` pins the request to a specific
    /// node (the one that issued the nonce); `None` lets the transport pick.
    async fn send_transaction(
        &self,
        tx: &WireTransaction,
        host: Option<&str>,
    ) -> Result<TxResponse, TransportError>;

    /// Looks up the settlement result for `hash`.
    async fn check_transaction(&self, hash: &str) -> Result<TxResponse, TransportError>;

    /// Returns `true` if the service is reachable and healthy.
    async fn ping(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepted_requires_hash_and_success() {
        let accepted: TxResponse =
            serde_json::from_value(json!({ "hash": "h1", "success": "true" })).unwrap();
        assert!(accepted.is_accepted());

        let no_marker: TxResponse = serde_json::from_value(json!({ "hash": "h1" })).unwrap();
        assert!(!no_marker.is_accepted());

        let null_marker: TxResponse =
            serde_json::from_value(json!({ "hash": "h1", "success": null })).unwrap();
        assert!(!null_marker.is_accepted());

        let flag: TxResponse =
            serde_json::from_value(json!({ "hash": "h1", "success": true })).unwrap();
        assert!(flag.is_accepted());

        let refused: TxResponse =
            serde_json::from_value(json!({ "hash": "h1", "success": false })).unwrap();
        assert!(!refused.is_accepted());

        let blank_marker: TxResponse =
            serde_json::from_value(json!({ "hash": "h1", "success": "" })).unwrap();
        assert!(!blank_marker.is_accepted());

        let blank_hash: TxResponse =
            serde_json::from_value(json!({ "hash": "", "success": false })).unwrap();
        assert!(!blank_hash.is_accepted());

        let empty_hash: TxResponse =
            serde_json::from_value(json!({ "hash": "", "success": "ok" })).unwrap();
        assert!(!empty_hash.is_accepted());
    }

    #[test]
    fn not_found_matches_exact_marker() {
        assert!(TxResponse::rejected(TX_NOT_FOUND_ERROR).is_not_found());
        assert!(!TxResponse::rejected("Transaction not found").is_not_found());
        assert!(!TxResponse::settled(0, 10).is_not_found());
    }

    #[test]
    fn settlement_result_decodes_loosely() {
        let res: TxResponse = serde_json::from_value(json!({
            "status": 1,
            "result": "AssertionError('nope')",
            "stamps_used": 12,
            "errors": ["boom"],
            "unknown_field": true
        }))
        .unwrap();
        assert_eq!(res.status, Some(1));
        assert_eq!(res.stamps_used, Some(12));
        assert_eq!(res.error_list(), ["boom".to_string()]);
    }

    #[test]
    fn null_errors_is_an_empty_list() {
        let res: TxResponse = serde_json::from_value(json!({ "errors": null })).unwrap();
        assert!(res.error_list().is_empty());
    }

    #[test]
    fn wire_transaction_shape() {
        let mut payload = Map::new();
        payload.insert("nonce".into(), json!(5));
        let tx = WireTransaction {
            metadata: WireMetadata {
                signature: "ab".into(),
                timestamp: 1_700_000_000,
            },
            payload,
        };
        assert_eq!(
            serde_json::to_value(&tx).unwrap(),
            json!({
                "metadata": { "signature": "ab", "timestamp": 1_700_000_000 },
                "payload": { "nonce": 5 }
            })
        );
    }
}
