//! # Transaction Record
//!
//! One record per logical transaction intent. The record owns everything
//! that happens to that intent: the validated [`TxInfo`], the nonce
//! assignment, the canonical payload, the signature, every response the
//! service returned, and the derived [`ResultInfo`].
//!
//! The record *has* a transport and an event sender; it is not one. Both
//! are shared handles, so cloning them into thousands of records is cheap.
//!
//! ## Operations by file
//!
//! ```text
//! record.rs    : construction, accessors, nonce assignment, snapshot/restore
//! signing.rs   : sign, verify_signature
//! lifecycle.rs : submit, check_for_result
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::error::TransactionError;
use super::payload::{Payload, TxInfo};
use super::types::{NonceResult, ResponseRecord, ResultInfo, TxState};
use crate::codec::CanonicalForm;
use crate::config::PollConfig;
use crate::crypto::{Signature, Signer};
use crate::events::{self, EventSender, TxEvent};
use crate::network::Transport;

/// A transaction on its way from intent to settlement.
pub struct TransactionRecord {
    pub(super) info: TxInfo,
    pub(super) nonce_host: Option<String>,
    pub(super) canonical: CanonicalForm,
    pub(super) signature: Option<Signature>,
    /// The exact bytes `signature` covers.
    pub(super) signed_bytes: Option<Vec<u8>>,
    pub(super) signer: Option<Arc<dyn Signer>>,
    pub(super) nonce_result: Option<NonceResult>,
    pub(super) send_result: Option<ResponseRecord>,
    pub(super) check_result: Option<ResponseRecord>,
    pub(super) check_attempts: u32,
    pub(super) tx_hash: Option<String>,
    pub(super) result_info: Option<ResultInfo>,
    pub(super) state: TxState,
    pub(super) poll: PollConfig,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) events: EventSender,
}

impl TransactionRecord {
    /// Validates `info` and builds an unsigned record.
    ///
    /// This is the only place construction arguments are checked; a
    /// record that exists is well-formed.
    pub fn new(transport: Arc<dyn Transport>, info: TxInfo) -> Result<Self, TransactionError> {
        info.validate()?;
        let canonical = Payload::new(&info).canonicalize()?;

        Ok(Self {
            info,
            nonce_host: None,
            canonical,
            signature: None,
            signed_bytes: None,
            signer: None,
            nonce_result: None,
            send_result: None,
            check_result: None,
            check_attempts: 0,
            tx_hash: None,
            result_info: None,
            state: TxState::Unsigned,
            poll: PollConfig::default(),
            transport,
            events: events::detached(),
        })
    }

    /// Publishes this record's events on `events` instead of a private
    /// channel.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    // -- accessors -----------------------------------------------------------

    pub fn uid(&self) -> Option<&str> {
        self.info.uid.as_deref()
    }

    pub fn info(&self) -> &TxInfo {
        &self.info
    }

    pub fn sender(&self) -> &str {
        &self.info.sender_vk
    }

    pub fn nonce(&self) -> Option<u64> {
        self.info.nonce
    }

    pub fn processor(&self) -> Option<&str> {
        self.info.processor.as_deref()
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn signature_hex(&self) -> Option<String> {
        self.signature.map(|s| s.to_hex())
    }

    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    /// Canonical form of the current payload.
    pub fn canonical(&self) -> &CanonicalForm {
        &self.canonical
    }

    pub fn nonce_result(&self) -> Option<&NonceResult> {
        self.nonce_result.as_ref()
    }

    pub fn send_result(&self) -> Option<&ResponseRecord> {
        self.send_result.as_ref()
    }

    pub fn check_result(&self) -> Option<&ResponseRecord> {
        self.check_result.as_ref()
    }

    pub fn check_attempts(&self) -> u32 {
        self.check_attempts
    }

    pub fn result_info(&self) -> Option<&ResultInfo> {
        self.result_info.as_ref()
    }

    /// Subscribes to this record's event channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.events.subscribe()
    }

    // -- nonce assignment ----------------------------------------------------

    /// Sets the nonce and processor and recomputes the canonical payload.
    ///
    /// Only allowed before submission. A signature taken earlier no longer
    /// covers the payload afterwards; `submit` refreshes it with the
    /// record's signer.
    pub fn assign_nonce(
        &mut self,
        nonce: u64,
        processor: impl Into<String>,
        host: Option<String>,
    ) -> Result<(), TransactionError> {
        if !matches!(self.state, TxState::Unsigned | TxState::Signed) {
            return Err(TransactionError::InvalidState {
                state: self.state,
                operation: "assign a nonce to",
            });
        }
        let processor = processor.into();
        if processor.trim().is_empty() {
            return Err(TransactionError::Validation(
                "processor must be a non-empty string".into(),
            ));
        }
        self.set_assignment(nonce, processor, host)
    }

    pub(super) fn set_assignment(
        &mut self,
        nonce: u64,
        processor: String,
        host: Option<String>,
    ) -> Result<(), TransactionError> {
        let mut info = self.info.clone();
        info.nonce = Some(nonce);
        info.processor = Some(processor);
        let canonical = Payload::new(&info).canonicalize()?;

        self.info = info;
        self.canonical = canonical;
        if host.is_some() {
            self.nonce_host = host;
        }
        debug!(sender = %self.info.sender_vk, nonce, "nonce assigned");
        Ok(())
    }

    // -- state ---------------------------------------------------------------

    /// Moves to `next`, refusing anything but a forward step.
    pub(super) fn advance(
        &mut self,
        next: TxState,
        operation: &'static str,
    ) -> Result<(), TransactionError> {
        if !self.state.can_advance_to(&next) {
            return Err(TransactionError::InvalidState {
                state: self.state,
                operation,
            });
        }
        debug!(sender = %self.info.sender_vk, from = %self.state, to = %next, "state transition");
        self.state = next;
        Ok(())
    }

    // -- snapshot ------------------------------------------------------------

    /// A serializable view of everything the record knows.
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            uid: self.info.uid.clone(),
            tx_info: self.info.clone(),
            payload: self.canonical.to_value(),
            nonce_result: self.nonce_result.clone(),
            nonce_host: self.nonce_host.clone(),
            signature: self.signature_hex(),
            tx_hash: self.tx_hash.clone(),
            send_result: self.send_result.clone(),
            check_result: self.check_result.clone(),
            check_attempts: self.check_attempts,
            result_info: self.result_info.clone(),
            state: self.state,
        }
    }

    /// Rehydrates a record from a snapshot.
    ///
    /// The snapshot's signature is trusted to cover its payload. A restored
    /// record has no signer, so it can only be submitted if its nonce is
    /// already assigned.
    pub fn restore(
        transport: Arc<dyn Transport>,
        snapshot: RecordSnapshot,
    ) -> Result<Self, TransactionError> {
        let mut info = snapshot.tx_info;
        if info.uid.is_none() {
            info.uid = snapshot.uid;
        }

        let signature = snapshot
            .signature
            .as_deref()
            .map(Signature::from_hex)
            .transpose()
            .map_err(|e| TransactionError::Validation(e.to_string()))?;

        if signature.is_none() && snapshot.state != TxState::Unsigned {
            return Err(TransactionError::Validation(format!(
                "snapshot in state {} carries no signature",
                snapshot.state
            )));
        }
        if snapshot.tx_hash.is_none() && snapshot.state == TxState::Pending {
            return Err(TransactionError::Validation(
                "pending snapshot carries no transaction hash".into(),
            ));
        }

        let mut record = Self::new(transport, info)?;
        record.signed_bytes = signature.map(|_| record.canonical.bytes().to_vec());
        record.signature = signature;
        record.nonce_result = snapshot.nonce_result;
        record.nonce_host = snapshot
            .nonce_host
            .or_else(|| record.nonce_result.as_ref().and_then(|n| n.masternode.clone()));
        record.tx_hash = snapshot.tx_hash;
        record.send_result = snapshot.send_result;
        record.check_result = snapshot.check_result;
        record.check_attempts = snapshot.check_attempts;
        record.result_info = snapshot.result_info;
        record.state = snapshot.state;
        Ok(record)
    }

    pub(super) fn emit(&self, response: crate::network::TxResponse) {
        let subtitle = self
            .result_info
            .as_ref()
            .map(|info| info.subtitle.clone())
            .unwrap_or_default();
        // No subscribers is fine.
        let _ = self.events.send(TxEvent::Response {
            uid: self.info.uid.clone(),
            sender: self.info.sender_vk.clone(),
            nonce: self.info.nonce,
            subtitle,
            state: self.state,
            response,
        });
    }
}

impl fmt::Debug for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionRecord")
            .field("uid", &self.info.uid)
            .field("sender", &self.info.sender_vk)
            .field("nonce", &self.info.nonce)
            .field("state", &self.state)
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

/// Serializable record state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub tx_info: TxInfo,
    /// The canonical payload at snapshot time. Informational; restore
    /// rebuilds it from `tx_info`.
    pub payload: Value,
    #[serde(default)]
    pub nonce_result: Option<NonceResult>,
    #[serde(default)]
    pub nonce_host: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub send_result: Option<ResponseRecord>,
    #[serde(default)]
    pub check_result: Option<ResponseRecord>,
    #[serde(default)]
    pub check_attempts: u32,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
    pub state: TxState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MockTransport;
    use serde_json::json;

    const VK: &str = "270add00fc708791c97aeb5255107c770434bd2ab71c2e103fbee75e202aa15e";

    fn transport() -> Arc<dyn Transport> {
        Arc::new(MockTransport::new())
    }

    fn info() -> TxInfo {
        TxInfo::new(VK, "currency", "transfer", 50_000)
            .kwarg("to", json!(VK))
            .kwarg("amount", json!(100))
    }

    #[test]
    fn construction_validates_once() {
        let mut bad = info();
        bad.contract_name = String::new();
        assert!(matches!(
            TransactionRecord::new(transport(), bad),
            Err(TransactionError::Validation(_))
        ));

        let record = TransactionRecord::new(transport(), info()).unwrap();
        assert_eq!(record.state(), TxState::Unsigned);
        assert!(!record.is_signed());
        assert_eq!(record.nonce(), None);
    }

    #[test]
    fn assign_nonce_recomputes_canonical_form() {
        let mut record = TransactionRecord::new(transport(), info()).unwrap();
        let before = record.canonical().bytes().to_vec();

        record.assign_nonce(5, "p1", None).unwrap();
        assert_ne!(record.canonical().bytes(), before.as_slice());
        assert_eq!(record.canonical().ordered()["nonce"], json!(5));
        assert_eq!(record.canonical().ordered()["processor"], json!("p1"));
        assert_eq!(record.nonce(), Some(5));
    }

    #[test]
    fn assign_nonce_rejects_empty_processor() {
        let mut record = TransactionRecord::new(transport(), info()).unwrap();
        assert!(record.assign_nonce(1, " ", None).is_err());
        assert_eq!(record.nonce(), None);
    }

    #[test]
    fn advance_refuses_backward_steps() {
        let mut record = TransactionRecord::new(transport(), info()).unwrap();
        let err = record.advance(TxState::Pending, "test").unwrap_err();
        assert!(matches!(
            err,
            TransactionError::InvalidState {
                state: TxState::Unsigned,
                ..
            }
        ));
    }

    #[test]
    fn snapshot_restore_roundtrip_unsigned() {
        let mut record = TransactionRecord::new(transport(), info().uid("tx-1")).unwrap();
        record.assign_nonce(9, "p9", Some("http://node".into())).unwrap();

        let snap = record.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: RecordSnapshot = serde_json::from_str(&json).unwrap();
        let restored = TransactionRecord::restore(transport(), back).unwrap();

        assert_eq!(restored.uid(), Some("tx-1"));
        assert_eq!(restored.nonce(), Some(9));
        assert_eq!(restored.canonical().bytes(), record.canonical().bytes());
        assert_eq!(restored.nonce_host.as_deref(), Some("http://node"));
    }

    #[test]
    fn restore_rejects_inconsistent_snapshot() {
        let record = TransactionRecord::new(transport(), info()).unwrap();
        let mut snap = record.snapshot();
        snap.state = TxState::Signed;
        assert!(matches!(
            TransactionRecord::restore(transport(), snap),
            Err(TransactionError::Validation(_))
        ));
    }

    #[test]
    fn debug_is_compact() {
        let record = TransactionRecord::new(transport(), info()).unwrap();
        let s = format!("{record:?}");
        assert!(s.contains("TransactionRecord"));
        assert!(s.contains("Unsigned"));
    }
}
