//! In-memory [`Transport`] for tests and offline runs.
//!
//! Every call is recorded with its (virtual, under `start_paused`) tokio
//! timestamp so tests can assert on ordering and pacing. Responses are
//! scripted per operation; when a script runs dry a sensible default is
//! used:
//!
//! - nonce: the sender's base nonce plus the number of transactions
//!   already submitted for that sender, processor `"mock-processor"`;
//! - send: accepted, with the SHA-256 of the signature as hash;
//! - check: settled with status 0.
//!
//! State reads answer from contracts and variables seeded with
//! [`MockTransport::add_contract`] and [`MockTransport::set_variable`].

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use super::reader::{ContractInfo, ContractMethod, ContractVariables, StateReader};
use super::transport::{NonceResponse, Transport, TransportError, TxResponse, WireTransaction};

/// Processor identifier handed out by default.
pub const MOCK_PROCESSOR: &str = "mock-processor";

/// Host name reported as the nonce issuer.
pub const MOCK_HOST: &str = "http://mock.local";

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GetNonce { sender: String },
    Send { tx: WireTransaction, host: Option<String> },
    Check { hash: String },
    Ping,
    /// A state read, by the REST path it would hit.
    Read { path: String },
}

/// A call and when it happened.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call: MockCall,
    pub at: Instant,
}

#[derive(Default)]
struct Inner {
    base_nonces: HashMap<String, u64>,
    submitted: HashMap<String, u64>,
    nonce_script: VecDeque<Result<NonceResponse, TransportError>>,
    send_script: VecDeque<Result<TxResponse, TransportError>>,
    check_script: VecDeque<Result<TxResponse, TransportError>>,
    check_default: Option<TxResponse>,
    send_delay: Duration,
    check_delay: Duration,
    offline: bool,
    calls: Vec<CallRecord>,
    contracts: HashMap<String, MockContract>,
    variables: HashMap<String, Value>,
}

struct MockContract {
    info: ContractInfo,
    methods: Vec<ContractMethod>,
    variables: ContractVariables,
}

fn variable_key(contract: &str, variable: &str, key: Option<&str>) -> String {
    match key {
        Some(k) => format!("{contract}.{variable}:{k}"),
        None => format!("{contract}.{variable}"),
    }
}

/// Scriptable in-memory transport.
#[derive(Default)]
pub struct MockTransport {
    inner: Mutex<Inner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nonce the next request for `sender` starts from.
    pub fn set_nonce(&self, sender: &str, nonce: u64) {
        let mut inner = self.inner.lock();
        inner.base_nonces.insert(sender.to_string(), nonce);
        inner.submitted.remove(sender);
    }

    /// Queues a nonce response (or failure) ahead of the defaults.
    pub fn push_nonce(&self, response: Result<NonceResponse, TransportError>) {
        self.inner.lock().nonce_script.push_back(response);
    }

    /// Queues a submission response (or failure) ahead of the defaults.
    pub fn push_send(&self, response: Result<TxResponse, TransportError>) {
        self.inner.lock().send_script.push_back(response);
    }

    /// Queues a status-check response (or failure) ahead of the default.
    pub fn push_check(&self, response: Result<TxResponse, TransportError>) {
        self.inner.lock().check_script.push_back(response);
    }

    /// Replaces the response returned once the check script is empty.
    pub fn set_check_default(&self, response: TxResponse) {
        self.inner.lock().check_default = Some(response);
    }

    /// Delays every submission by `delay`.
    pub fn set_send_delay(&self, delay: Duration) {
        self.inner.lock().send_delay = delay;
    }

    /// Delays every status check by `delay`.
    pub fn set_check_delay(&self, delay: Duration) {
        self.inner.lock().check_delay = delay;
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Deploys a contract for the read calls.
    pub fn add_contract(
        &self,
        info: ContractInfo,
        methods: Vec<ContractMethod>,
        variables: ContractVariables,
    ) {
        self.inner.lock().contracts.insert(
            info.name.clone(),
            MockContract {
                info,
                methods,
                variables,
            },
        );
    }

    /// Stores `value` under `contract.variable` (or `contract.variable[key]`).
    pub fn set_variable(&self, contract: &str, variable: &str, key: Option<&str>, value: Value) {
        self.inner
            .lock()
            .variables
            .insert(variable_key(contract, variable, key), value);
    }

    /// All calls so far, oldest first.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner.lock().calls.clone()
    }

    /// Submitted transactions with their submission time.
    pub fn sent(&self) -> Vec<(WireTransaction, Instant)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|record| match &record.call {
                MockCall::Send { tx, .. } => Some((tx.clone(), record.at)),
                _ => None,
            })
            .collect()
    }

    /// Submitted transactions for one sender, in submission order.
    pub fn sent_by(&self, sender: &str) -> Vec<WireTransaction> {
        self.sent()
            .into_iter()
            .map(|(tx, _)| tx)
            .filter(|tx| tx.payload.get("sender").and_then(Value::as_str) == Some(sender))
            .collect()
    }

    pub fn nonce_requests(&self, sender: &str) -> usize {
        self.count(|call| matches!(call, MockCall::GetNonce { sender: s } if s == sender))
    }

    pub fn check_count(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Check { .. }))
    }

    fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|r| pred(&r.call)).count()
    }

    /// Records a read; fails like an unreachable host while offline.
    fn read(&self, path: String) -> Result<(), TransportError> {
        self.record(MockCall::Read { path });
        if self.inner.lock().offline {
            return Err(TransportError::Http("mock transport is offline".to_string()));
        }
        Ok(())
    }

    fn record(&self, call: MockCall) {
        self.inner.lock().calls.push(CallRecord {
            call,
            at: Instant::now(),
        });
    }
}

/// SHA-256 of the signature, hex encoded. Stable per transaction.
pub fn mock_hash(tx: &WireTransaction) -> String {
    hex::encode(Sha256::digest(tx.metadata.signature.as_bytes()))
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_nonce(&self, sender: &str) -> Result<NonceResponse, TransportError> {
        self.record(MockCall::GetNonce {
            sender: sender.to_string(),
        });

        let mut inner = self.inner.lock();
        if let Some(scripted) = inner.nonce_script.pop_front() {
            return scripted;
        }
        let base = inner.base_nonces.get(sender).copied().unwrap_or(0);
        let submitted = inner.submitted.get(sender).copied().unwrap_or(0);
        Ok(NonceResponse {
            nonce: Some(base + submitted),
            processor: Some(MOCK_PROCESSOR.to_string()),
            masternode: Some(MOCK_HOST.to_string()),
            error: None,
        })
    }

    async fn send_transaction(
        &self,
        tx: &WireTransaction,
        host: Option<&str>,
    ) -> Result<TxResponse, TransportError> {
        self.record(MockCall::Send {
            tx: tx.clone(),
            host: host.map(str::to_string),
        });

        let delay = self.inner.lock().send_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        if let Some(scripted) = inner.send_script.pop_front() {
            return scripted;
        }
        if let Some(sender) = tx.payload.get("sender").and_then(Value::as_str) {
            *inner.submitted.entry(sender.to_string()).or_default() += 1;
        }
        Ok(TxResponse::accepted(mock_hash(tx)))
    }

    async fn check_transaction(&self, hash: &str) -> Result<TxResponse, TransportError> {
        self.record(MockCall::Check {
            hash: hash.to_string(),
        });

        let delay = self.inner.lock().check_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        if let Some(scripted) = inner.check_script.pop_front() {
            return scripted;
        }
        Ok(inner
            .check_default
            .clone()
            .unwrap_or_else(|| TxResponse::settled(0, 0)))
    }

    async fn ping(&self) -> bool {
        self.record(MockCall::Ping);
        !self.inner.lock().offline
    }
}

#[async_trait]
impl StateReader for MockTransport {
    async fn get_variable(
        &self,
        contract: &str,
        variable: &str,
        key: Option<&str>,
    ) -> Result<Option<Value>, TransportError> {
        self.read(format!("/contracts/{contract}/{variable}/"))?;
        Ok(self
            .inner
            .lock()
            .variables
            .get(&variable_key(contract, variable, key))
            .cloned())
    }

    async fn get_contract_info(
        &self,
        contract: &str,
    ) -> Result<Option<ContractInfo>, TransportError> {
        self.read(format!("/contracts/{contract}"))?;
        Ok(self.inner.lock().contracts.get(contract).map(|c| c.info.clone()))
    }

    async fn get_contract_methods(
        &self,
        contract: &str,
    ) -> Result<Vec<ContractMethod>, TransportError> {
        self.read(format!("/contracts/{contract}/methods"))?;
        Ok(self
            .inner
            .lock()
            .contracts
            .get(contract)
            .map(|c| c.methods.clone())
            .unwrap_or_default())
    }

    async fn get_contract_variables(
        &self,
        contract: &str,
    ) -> Result<ContractVariables, TransportError> {
        self.read(format!("/contracts/{contract}/variables"))?;
        Ok(self
            .inner
            .lock()
            .contracts
            .get(contract)
            .map(|c| c.variables.clone())
            .unwrap_or_default())
    }
}
