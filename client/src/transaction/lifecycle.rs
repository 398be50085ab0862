//! Submission and confirmation.
//!
//! Both operations return the record's state after they finish. They only
//! return `Err` for broken preconditions, before anything is sent; every
//! network failure is recorded on the record and shows up as a
//! `Terminal(Failed(_))` state with its [`FailureReason`].

use chrono::Utc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::error::TransactionError;
use super::record::TransactionRecord;
use super::result_info;
use super::types::{FailureReason, NonceResult, Outcome, ResponseRecord, TxState};
use crate::network::{NonceResponse, TransportError, TxResponse, WireMetadata, WireTransaction};

/// Appended to a settlement result whose status code is not zero.
pub const NON_ZERO_STATUS_ERROR: &str = "This transaction returned a non-zero status code";

/// Which response slot a handled response lands in.
#[derive(Clone, Copy)]
enum Slot {
    Send,
    Check,
}

impl TransactionRecord {
    /// The wire transaction for the current payload and signature, stamped
    /// with the current time. `None` until the record is signed.
    pub fn wire_transaction(&self) -> Option<WireTransaction> {
        let signature = self.signature?;
        Some(WireTransaction {
            metadata: WireMetadata {
                signature: signature.to_hex(),
                timestamp: Utc::now().timestamp(),
            },
            payload: self.canonical.ordered().clone(),
        })
    }

    /// Submits the record.
    ///
    /// Acquires a nonce first if none is assigned, refreshes the signature
    /// if the payload changed since signing, then sends. The resulting
    /// state is `Pending` when the service hands back a hash to poll, or
    /// `Terminal` when it finalizes synchronously or anything fails.
    pub async fn submit(&mut self) -> Result<TxState, TransactionError> {
        match self.state {
            TxState::Signed => {}
            TxState::Unsigned => return Err(TransactionError::NotSigned),
            state => {
                return Err(TransactionError::InvalidState {
                    state,
                    operation: "submit",
                })
            }
        }

        let needs_nonce = self.info.nonce.is_none() || self.info.processor.is_none();
        if self.signer.is_none() && (needs_nonce || !self.signature_is_current()) {
            return Err(TransactionError::StaleSignature);
        }

        self.advance(TxState::Submitting, "submit")?;

        if needs_nonce {
            if let Err(message) = self.acquire_nonce().await {
                warn!(sender = %self.info.sender_vk, %message, "nonce acquisition failed");
                let reason = FailureReason::NonceUnavailable;
                return Ok(self.fail_with(vec![message], reason, Slot::Send));
            }
        }

        if !self.signature_is_current() {
            if let Some(signer) = self.signer.clone() {
                self.apply_signature(signer.as_ref());
            }
        }

        let Some(wire) = self.wire_transaction() else {
            return Ok(self.fail_with(
                vec!["transaction has no signature".into()],
                FailureReason::Transport,
                Slot::Send,
            ));
        };

        let host = self.nonce_host.clone();
        info!(
            sender = %self.info.sender_vk,
            nonce = ?self.info.nonce,
            host = host.as_deref().unwrap_or("any"),
            "submitting transaction"
        );

        match self.transport.send_transaction(&wire, host.as_deref()).await {
            Ok(response) => Ok(self.handle_send_response(response)),
            Err(e) => {
                warn!(sender = %self.info.sender_vk, error = %e, "submission failed");
                Ok(self.fail_with(vec![e.to_string()], FailureReason::Transport, Slot::Send))
            }
        }
    }

    /// Polls for the settlement result of a pending record.
    ///
    /// Waits `interval` before every attempt and gives up after
    /// `max_attempts` (at least one attempt is always made). Only "not
    /// found yet" answers and per-request timeouts are retried; any other
    /// error ends the record immediately.
    pub async fn check_for_result(&mut self) -> Result<TxState, TransactionError> {
        let hash = match (&self.state, &self.tx_hash) {
            (TxState::Pending, Some(hash)) => hash.clone(),
            (state, _) => {
                return Err(TransactionError::InvalidState {
                    state: *state,
                    operation: "check the result of",
                })
            }
        };
        let poll = self.poll;

        loop {
            sleep(poll.interval).await;
            self.check_attempts += 1;
            let attempt = self.check_attempts;

            let checked = timeout(poll.request_timeout, self.transport.check_transaction(&hash)).await;
            let transient = match checked {
                Err(_) => TransportError::Timeout(poll.request_timeout).to_string(),
                Ok(Err(e)) => {
                    warn!(tx_hash = %hash, attempt, error = %e, "status check failed");
                    let errors = vec![e.to_string()];
                    return Ok(self.fail_with(errors, FailureReason::Transport, Slot::Check));
                }
                Ok(Ok(response)) if response.is_not_found() => {
                    response.error.unwrap_or_default()
                }
                Ok(Ok(response)) => {
                    if let Some(error) = response.error.clone() {
                        return Ok(self.fail_with(vec![error], FailureReason::Remote, Slot::Check));
                    }
                    return Ok(self.finalize(response, Slot::Check));
                }
            };

            debug!(tx_hash = %hash, attempt, max = poll.max_attempts, %transient, "not settled yet");
            if attempt >= poll.max_attempts {
                warn!(tx_hash = %hash, attempt, "giving up on confirmation");
                return Ok(self.fail_with(
                    vec![
                        transient,
                        format!("Retry attempts {attempt} hit while checking for tx result."),
                    ],
                    FailureReason::RetryExhausted,
                    Slot::Check,
                ));
            }
        }
    }

    // -- internals -----------------------------------------------------------

    /// Fetches and applies a nonce. The error is the entry to record.
    async fn acquire_nonce(&mut self) -> Result<(), String> {
        let sender = self.info.sender_vk.clone();
        let response = self
            .transport
            .get_nonce(&sender)
            .await
            .map_err(|e| format!("Unable to get nonce for {sender}: {e}"))?;

        let (nonce, processor, masternode) = match response {
            NonceResponse {
                nonce: Some(nonce),
                processor: Some(processor),
                masternode,
                ..
            } if !processor.trim().is_empty() => (nonce, processor, masternode),
            NonceResponse { error, .. } => {
                return Err(error.unwrap_or_else(|| {
                    format!("Nonce response for {sender} carried no nonce or processor")
                }))
            }
        };

        self.set_assignment(nonce, processor.clone(), masternode.clone())
            .map_err(|e| e.to_string())?;
        self.nonce_result = Some(NonceResult {
            nonce,
            processor,
            masternode,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn handle_send_response(&mut self, response: TxResponse) -> TxState {
        if let Some(error) = response.error.clone() {
            return self.fail_with(vec![error], FailureReason::Remote, Slot::Send);
        }

        if response.is_accepted() {
            let hash = response.hash.clone().unwrap_or_default();
            info!(sender = %self.info.sender_vk, tx_hash = %hash, "transaction pending");
            self.result_info = Some(result_info::pending(&hash));
            self.tx_hash = Some(hash);
            self.send_result = Some(ResponseRecord::now(response.clone()));
            self.settle(TxState::Pending);
            self.emit(response);
            return self.state;
        }

        // The service finalized synchronously.
        self.finalize(response, Slot::Send)
    }

    /// Turns a settlement result into a terminal state.
    fn finalize(&mut self, mut response: TxResponse, slot: Slot) -> TxState {
        if response.status.is_some_and(|status| status != 0) {
            response
                .errors
                .get_or_insert_with(Vec::new)
                .push(NON_ZERO_STATUS_ERROR.to_string());
        }
        let outcome = if response.error_list().is_empty() {
            Outcome::Success
        } else {
            Outcome::Failed(FailureReason::Rejected)
        };
        self.conclude(response, slot, TxState::Terminal(outcome))
    }

    fn fail_with(&mut self, errors: Vec<String>, reason: FailureReason, slot: Slot) -> TxState {
        let response = TxResponse {
            errors: Some(errors),
            ..TxResponse::default()
        };
        self.conclude(response, slot, TxState::Terminal(Outcome::Failed(reason)))
    }

    fn conclude(&mut self, response: TxResponse, slot: Slot, next: TxState) -> TxState {
        let info = result_info::classify(&response);
        info!(
            sender = %self.info.sender_vk,
            nonce = ?self.info.nonce,
            tx_hash = ?self.tx_hash,
            state = %next,
            subtitle = %info.subtitle,
            "transaction concluded"
        );
        self.result_info = Some(info);
        let stored = Some(ResponseRecord::now(response.clone()));
        match slot {
            Slot::Send => self.send_result = stored,
            Slot::Check => self.check_result = stored,
        }
        self.settle(next);
        self.emit(response);
        self.state
    }

    /// Internal transition from `Submitting`/`Pending`; callers guarantee
    /// legality.
    fn settle(&mut self, next: TxState) {
        debug_assert!(self.state.can_advance_to(&next), "{} -> {next}", self.state);
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
