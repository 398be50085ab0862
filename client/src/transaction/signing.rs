//! Transaction signing.
//!
//! Signing is a separate step from construction because the signer may
//! not be available when the intent is created (hardware wallet, remote
//! signer, a batch keyed by sender). The signed data is always the
//! record's current canonical bytes.

use std::sync::Arc;
use tracing::{debug, warn};

use super::error::TransactionError;
use super::record::TransactionRecord;
use super::types::TxState;
use crate::crypto::{verify_hex, SignatureError, Signer};

impl TransactionRecord {
    /// Signs the current canonical payload and keeps `signer` so the
    /// signature can be refreshed if the nonce changes before submission.
    ///
    /// Allowed in `Unsigned` and `Signed`. Fails with `NotReady` if the
    /// record's required fields are unusable.
    pub fn sign(&mut self, signer: Arc<dyn Signer>) -> Result<(), TransactionError> {
        if !self.state.can_advance_to(&TxState::Signed) {
            return Err(TransactionError::InvalidState {
                state: self.state,
                operation: "sign",
            });
        }
        self.info.validate().map_err(|e| match e {
            TransactionError::Validation(reason) => TransactionError::NotReady(reason),
            other => other,
        })?;

        let signer_vk = signer.verifying_key_hex();
        if !signer_vk.eq_ignore_ascii_case(&self.info.sender_vk) {
            warn!(
                sender = %self.info.sender_vk,
                signer = %signer_vk,
                "signing key does not match the sender; the service will reject this"
            );
        }

        self.apply_signature(signer.as_ref());
        self.signer = Some(signer);
        self.advance(TxState::Signed, "sign")
    }

    /// Returns `true` if the stored signature covers the current payload.
    pub fn signature_is_current(&self) -> bool {
        self.signed_bytes.as_deref() == Some(self.canonical.bytes())
    }

    /// Verifies the stored signature over the current canonical bytes with
    /// the sender's verifying key.
    ///
    /// `Ok(false)` for a bad signature or a sender that is not a valid
    /// Ed25519 key; `Err(NotSigned)` if there is nothing to verify.
    pub fn verify_signature(&self) -> Result<bool, TransactionError> {
        let signature = self.signature.ok_or(TransactionError::NotSigned)?;
        match verify_hex(&self.info.sender_vk, self.canonical.bytes(), &signature.to_hex()) {
            Ok(()) => Ok(true),
            Err(SignatureError::VerificationFailed | SignatureError::Key(_)) => Ok(false),
        }
    }

    pub(super) fn apply_signature(&mut self, signer: &dyn Signer) {
        let bytes = self.canonical.bytes().to_vec();
        self.signature = Some(signer.sign(&bytes));
        self.signed_bytes = Some(bytes);
        debug!(sender = %self.info.sender_vk, nonce = ?self.info.nonce, "payload signed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::network::{MockTransport, Transport};
    use crate::transaction::TxInfo;
    use serde_json::json;

    fn record_for(kp: &Keypair) -> TransactionRecord {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let info = TxInfo::new(kp.public_key().to_hex(), "currency", "transfer", 50_000)
            .kwarg("amount", json!(100));
        TransactionRecord::new(transport, info).unwrap()
    }

    #[test]
    fn sign_sets_signature_and_state() {
        let kp = Keypair::generate();
        let mut record = record_for(&kp);
        record.sign(Arc::new(kp)).unwrap();

        assert!(record.is_signed());
        assert_eq!(record.state(), TxState::Signed);
        assert_eq!(record.signature_hex().unwrap().len(), 128);
        assert!(record.signature_is_current());
    }

    #[test]
    fn signature_verifies_over_canonical_bytes() {
        let kp = Keypair::generate();
        let mut record = record_for(&kp);
        record.assign_nonce(5, "p1", None).unwrap();
        record.sign(Arc::new(kp.clone())).unwrap();

        assert_eq!(record.verify_signature(), Ok(true));
        assert!(kp.verify(record.canonical().bytes(), &record.signature.unwrap()));
    }

    #[test]
    fn changing_the_nonce_makes_the_signature_stale() {
        let kp = Keypair::generate();
        let mut record = record_for(&kp);
        record.sign(Arc::new(kp)).unwrap();
        record.assign_nonce(7, "p1", None).unwrap();

        assert!(!record.signature_is_current());
        assert_eq!(record.verify_signature(), Ok(false));
    }

    #[test]
    fn wrong_key_does_not_verify() {
        let kp = Keypair::generate();
        let mut record = record_for(&kp);
        record.sign(Arc::new(Keypair::generate())).unwrap();
        assert_eq!(record.verify_signature(), Ok(false));
    }

    #[test]
    fn verify_before_sign_is_an_error() {
        let kp = Keypair::generate();
        let record = record_for(&kp);
        assert_eq!(record.verify_signature(), Err(TransactionError::NotSigned));
    }

    #[test]
    fn resigning_is_allowed_before_submission() {
        let kp = Keypair::generate();
        let mut record = record_for(&kp);
        let signer: Arc<dyn Signer> = Arc::new(kp);
        record.sign(signer.clone()).unwrap();
        record.assign_nonce(3, "p", None).unwrap();
        record.sign(signer).unwrap();
        assert_eq!(record.verify_signature(), Ok(true));
    }
}
