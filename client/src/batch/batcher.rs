//! # Transaction Batcher
//!
//! Fans queued intents into per-sender batches with contiguous nonces and
//! paces their submission.
//!
//! ## One run
//!
//! 1. Refuse if a run is already active ([`BatchError::AlreadyRunning`]).
//! 2. Refuse if any sender with queued work has no signer
//!    ([`BatchError::MissingSigningKey`]). Nothing is dequeued in either
//!    case.
//! 3. Take up to `max_batch_size` intents per sender.
//! 4. Per sender, concurrently with the other senders: fetch one starting
//!    nonce, assign `start, start + 1, ...` in queue order, sort by nonce,
//!    sign everything, then submit one by one on a fixed stagger.
//! 5. Re-admit the overflow (intents enqueued during the run) into the
//!    queues, in arrival order, and return to idle.
//!
//! A run never re-triggers itself. Whatever is left queued waits for the
//! caller's next `run_all`; the report says how much that is.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, PollConfig};
use crate::crypto::Signer;
use crate::events::{self, EventSender, TxEvent};
use crate::network::{NonceResponse, Transport};
use crate::transaction::{TransactionError, TransactionRecord, TxInfo, TxState};

// ---------------------------------------------------------------------------
// Errors & status
// ---------------------------------------------------------------------------

/// Batch-level failures. Per-transaction failures live on the records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    /// `run_all` was called while another run was in progress.
    #[error("a batch run is already in progress")]
    AlreadyRunning,

    /// A sender has queued work but no signer was supplied for it.
    #[error("cannot sign batch for {sender}: no signing key provided")]
    MissingSigningKey { sender: String },

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Where the batcher is in its run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    /// No run active. New intents go straight to the queues.
    Idle,
    /// A run is submitting. New intents go to the overflow.
    Running,
    /// The run finished and the overflow is being re-admitted.
    DrainingOverflow,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::DrainingOverflow => write!(f, "DrainingOverflow"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one sender's batch.
#[derive(Debug)]
pub struct SenderReport {
    pub sender: String,
    /// The nonce the batch started from, if one was obtained.
    pub starting_nonce: Option<u64>,
    /// Records in nonce order, in whatever state submission left them.
    pub records: Vec<TransactionRecord>,
    /// Why the batch (or part of it) did not go out. Intents that never got
    /// a nonce are back at the front of the queue, in order.
    pub error: Option<String>,
}

impl SenderReport {
    fn failed(sender: String, error: String) -> Self {
        Self {
            sender,
            starting_nonce: None,
            records: Vec::new(),
            error: Some(error),
        }
    }
}

/// Outcome of one `run_all`.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub senders: Vec<SenderReport>,
    /// Intents still queued after the run (deferred plus re-admitted
    /// overflow).
    pub remaining: usize,
}

impl BatchReport {
    /// Every record the run created.
    pub fn records(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.senders.iter().flat_map(|s| s.records.iter())
    }

    /// Consumes the report, yielding the records for confirmation polling.
    pub fn into_records(self) -> Vec<TransactionRecord> {
        self.senders.into_iter().flat_map(|s| s.records).collect()
    }

    /// Number of records the service accepted or settled successfully.
    pub fn submitted(&self) -> usize {
        self.records()
            .filter(|r| r.state() == TxState::Pending || r.state().is_success())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Batcher
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct State {
    status: BatchStatus,
    queues: BTreeMap<String, VecDeque<TxInfo>>,
    overflow: Vec<TxInfo>,
}

/// Nonce-safe, paced submission of many transactions per sender.
pub struct TransactionBatcher {
    transport: Arc<dyn Transport>,
    config: BatchConfig,
    poll: PollConfig,
    events: EventSender,
    state: Mutex<State>,
}

impl TransactionBatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, BatchConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: BatchConfig) -> Self {
        Self {
            transport,
            config,
            poll: PollConfig::default(),
            events: events::detached(),
            state: Mutex::new(State {
                status: BatchStatus::Idle,
                queues: BTreeMap::new(),
                overflow: Vec::new(),
            }),
        }
    }

    /// Poll settings handed to every record this batcher creates.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Events of every record created by this batcher.
    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> BatchStatus {
        self.state.lock().status
    }

    /// Validates and queues one intent. During a run it goes to the
    /// overflow instead.
    pub fn enqueue(&self, info: TxInfo) -> Result<(), BatchError> {
        info.validate()?;
        let mut state = self.state.lock();
        Self::admit(&mut state, info);
        Ok(())
    }

    /// Validates every intent, then queues them all. Nothing is queued if
    /// any is invalid.
    pub fn enqueue_many<I>(&self, infos: I) -> Result<usize, BatchError>
    where
        I: IntoIterator<Item = TxInfo>,
    {
        let infos: Vec<TxInfo> = infos.into_iter().collect();
        for info in &infos {
            info.validate()?;
        }
        let count = infos.len();
        let mut state = self.state.lock();
        for info in infos {
            Self::admit(&mut state, info);
        }
        Ok(count)
    }

    pub fn has_transactions(&self) -> bool {
        self.state.lock().queues.values().any(|q| !q.is_empty())
    }

    pub fn queued_len(&self, sender: &str) -> usize {
        self.state.lock().queues.get(sender).map_or(0, VecDeque::len)
    }

    pub fn total_queued(&self) -> usize {
        self.state.lock().queues.values().map(VecDeque::len).sum()
    }

    pub fn overflow_len(&self) -> usize {
        self.state.lock().overflow.len()
    }

    /// Runs one batch cycle over every sender with queued work.
    ///
    /// Resolves once every batch has been submitted (not confirmed).
    pub async fn run_all(
        &self,
        signers: &HashMap<String, Arc<dyn Signer>>,
    ) -> Result<BatchReport, BatchError> {
        let batches = self.begin_run(signers)?;
        let guard = RunGuard { batcher: self };

        info!(senders = batches.len(), "batch run started");
        let senders = join_all(batches.into_iter().map(|(sender, infos, signer)| {
            self.run_sender(sender, infos, signer)
        }))
        .await;

        drop(guard);
        let report = BatchReport {
            senders,
            remaining: self.total_queued(),
        };
        info!(
            submitted = report.submitted(),
            remaining = report.remaining,
            "batch run finished"
        );
        Ok(report)
    }

    // -- internals -----------------------------------------------------------

    fn admit(state: &mut State, info: TxInfo) {
        match state.status {
            BatchStatus::Idle => state
                .queues
                .entry(info.sender_vk.clone())
                .or_default()
                .push_back(info),
            BatchStatus::Running | BatchStatus::DrainingOverflow => state.overflow.push(info),
        }
    }

    /// Checks preconditions, flips to `Running` and dequeues the batches.
    fn begin_run(
        &self,
        signers: &HashMap<String, Arc<dyn Signer>>,
    ) -> Result<Vec<(String, Vec<TxInfo>, Arc<dyn Signer>)>, BatchError> {
        let mut state = self.state.lock();
        if state.status != BatchStatus::Idle {
            return Err(BatchError::AlreadyRunning);
        }

        let pending = state.queues.iter().filter(|(_, q)| !q.is_empty());
        for (sender, _) in pending {
            if !signers.contains_key(sender) {
                return Err(BatchError::MissingSigningKey {
                    sender: sender.clone(),
                });
            }
        }

        state.status = BatchStatus::Running;
        let max = self.config.max_batch_size;
        let mut batches = Vec::new();
        for (sender, queue) in state.queues.iter_mut() {
            let take = queue.len().min(max);
            if take == 0 {
                continue;
            }
            let infos: Vec<TxInfo> = queue.drain(..take).collect();
            if let Some(signer) = signers.get(sender) {
                batches.push((sender.clone(), infos, signer.clone()));
            }
        }
        state.queues.retain(|_, q| !q.is_empty());
        Ok(batches)
    }

    async fn run_sender(
        &self,
        sender: String,
        infos: Vec<TxInfo>,
        signer: Arc<dyn Signer>,
    ) -> SenderReport {
        let count = infos.len();
        let (start, processor, host) = match self.transport.get_nonce(&sender).await {
            Ok(NonceResponse {
                nonce: Some(nonce),
                processor: Some(processor),
                masternode,
                ..
            }) if !processor.trim().is_empty() => (nonce, processor, masternode),
            Ok(NonceResponse { error, .. }) => {
                let reason = error.unwrap_or_else(|| {
                    format!("Nonce response for {sender} carried no nonce or processor")
                });
                return self.requeue(sender, infos, reason);
            }
            Err(e) => {
                let reason = format!("Unable to get nonce for {sender}: {e}");
                return self.requeue(sender, infos, reason);
            }
        };
        debug!(%sender, start, count, "starting nonce fetched");

        // Nonces go only to prepared records. The first failure defers that
        // intent and everything after it, so the batch stays contiguous.
        let mut records: Vec<TransactionRecord> = Vec::with_capacity(count);
        let mut error = None;
        let mut infos = infos.into_iter();
        while let Some(info) = infos.next() {
            let prepared = start
                .checked_add(records.len() as u64)
                .ok_or_else(|| format!("nonce space exhausted after {start} for {sender}"))
                .and_then(|nonce| {
                    self.prepare(&info, nonce, &processor, host.clone(), &signer)
                        .map_err(|e| e.to_string())
                });
            match prepared {
                Ok(record) => records.push(record),
                Err(reason) => {
                    let mut deferred = vec![info];
                    deferred.extend(infos.by_ref());
                    warn!(%sender, count = deferred.len(), %reason, "deferring rest of batch");
                    self.push_front(&sender, deferred);
                    error = Some(reason);
                    break;
                }
            }
        }
        records.sort_by_key(|r| r.nonce());

        let began = Instant::now();
        for (index, record) in records.iter_mut().enumerate() {
            sleep_until(began + self.config.submit_stagger * index as u32).await;
            if let Err(e) = record.submit().await {
                warn!(%sender, nonce = ?record.nonce(), error = %e, "submission refused");
                error.get_or_insert_with(|| e.to_string());
            }
        }

        SenderReport {
            sender,
            starting_nonce: Some(start),
            records,
            error,
        }
    }

    fn prepare(
        &self,
        info: &TxInfo,
        nonce: u64,
        processor: &str,
        host: Option<String>,
        signer: &Arc<dyn Signer>,
    ) -> Result<TransactionRecord, TransactionError> {
        let mut record = TransactionRecord::new(self.transport.clone(), info.clone())?
            .with_events(self.events.clone())
            .with_poll_config(self.poll);
        record.assign_nonce(nonce, processor, host)?;
        record.sign(signer.clone())?;
        Ok(record)
    }

    /// Puts a sender's batch back at the front of its queue.
    fn requeue(&self, sender: String, infos: Vec<TxInfo>, reason: String) -> SenderReport {
        warn!(%sender, count = infos.len(), %reason, "batch deferred");
        self.push_front(&sender, infos);
        SenderReport::failed(sender, reason)
    }

    fn push_front(&self, sender: &str, infos: Vec<TxInfo>) {
        let mut state = self.state.lock();
        let queue = state.queues.entry(sender.to_string()).or_default();
        for info in infos.into_iter().rev() {
            queue.push_front(info);
        }
    }

    /// Re-admits the overflow in arrival order and returns to idle.
    fn finish_run(&self) {
        let mut state = self.state.lock();
        state.status = BatchStatus::DrainingOverflow;
        let overflow = std::mem::take(&mut state.overflow);
        let drained = overflow.len();
        for info in overflow {
            state
                .queues
                .entry(info.sender_vk.clone())
                .or_default()
                .push_back(info);
        }
        state.status = BatchStatus::Idle;
        if drained > 0 {
            debug!(drained, "overflow re-admitted");
        }
    }
}

impl fmt::Debug for TransactionBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionBatcher")
            .field("status", &state.status)
            .field("senders", &state.queues.len())
            .field("overflow", &state.overflow.len())
            .finish_non_exhaustive()
    }
}

/// Ends the run even if the `run_all` future is dropped mid-flight.
struct RunGuard<'a> {
    batcher: &'a TransactionBatcher,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.batcher.finish_run();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::network::{MockTransport, TransportError};
    use serde_json::json;
    use std::time::Duration;

    fn keypair(seed: u8) -> Keypair {
        Keypair::from_seed(&[seed; 32])
    }

    fn intent(kp: &Keypair, amount: u64) -> TxInfo {
        TxInfo::new(kp.public_key().to_hex(), "currency", "transfer", 50_000)
            .kwarg("to", json!("ab".repeat(32)))
            .kwarg("amount", json!(amount))
            .uid(format!("tx-{amount}"))
    }

    fn signers(kps: &[&Keypair]) -> HashMap<String, Arc<dyn Signer>> {
        kps.iter()
            .map(|kp| {
                let signer: Arc<dyn Signer> = Arc::new((*kp).clone());
                (kp.public_key().to_hex(), signer)
            })
            .collect()
    }

    fn setup() -> (Arc<MockTransport>, TransactionBatcher) {
        let mock = Arc::new(MockTransport::new());
        let transport: Arc<dyn Transport> = mock.clone();
        (mock, TransactionBatcher::new(transport))
    }

    #[test]
    fn enqueue_validates() {
        let (_, batcher) = setup();
        let mut bad = intent(&keypair(1), 1);
        bad.method_name = String::new();
        assert!(matches!(
            batcher.enqueue(bad),
            Err(BatchError::Transaction(TransactionError::Validation(_)))
        ));
        assert!(!batcher.has_transactions());
    }

    #[test]
    fn enqueue_many_is_all_or_nothing() {
        let (_, batcher) = setup();
        let kp = keypair(1);
        let mut bad = intent(&kp, 3);
        bad.sender_vk = "zz".into();
        assert!(batcher
            .enqueue_many(vec![intent(&kp, 1), intent(&kp, 2), bad])
            .is_err());
        assert_eq!(batcher.total_queued(), 0);

        assert_eq!(batcher.enqueue_many(vec![intent(&kp, 1), intent(&kp, 2)]), Ok(2));
        assert_eq!(batcher.queued_len(&kp.public_key().to_hex()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn nonces_are_contiguous_and_sorted() {
        let (mock, batcher) = setup();
        let kp = keypair(1);
        let vk = kp.public_key().to_hex();
        mock.set_nonce(&vk, 100);
        for amount in 0..5 {
            batcher.enqueue(intent(&kp, amount)).unwrap();
        }

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        let nonces: Vec<u64> = report.records().filter_map(|r| r.nonce()).collect();
        assert_eq!(nonces, vec![100, 101, 102, 103, 104]);
        assert_eq!(mock.nonce_requests(&vk), 1);

        let sent: Vec<u64> = mock
            .sent_by(&vk)
            .iter()
            .filter_map(|tx| tx.payload["nonce"].as_u64())
            .collect();
        assert_eq!(sent, nonces);
        assert!(report.records().all(|r| r.verify_signature() == Ok(true)));
        assert_eq!(report.submitted(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_size_is_capped_and_remainder_deferred() {
        let (mock, batcher) = setup();
        let kp = keypair(2);
        let vk = kp.public_key().to_hex();
        for amount in 0..20 {
            batcher.enqueue(intent(&kp, amount)).unwrap();
        }

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        assert_eq!(report.records().count(), 15);
        assert_eq!(report.remaining, 5);
        assert_eq!(batcher.queued_len(&vk), 5);

        // The deferred five go out on the next, caller-driven run, with
        // nonces continuing where the first batch stopped.
        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        let nonces: Vec<u64> = report.records().filter_map(|r| r.nonce()).collect();
        assert_eq!(nonces, vec![15, 16, 17, 18, 19]);
        assert_eq!(mock.sent_by(&vk).len(), 20);
        assert!(!batcher.has_transactions());
    }

    #[tokio::test(start_paused = true)]
    async fn submissions_are_staggered() {
        let (mock, batcher) = setup();
        let kp = keypair(3);
        for amount in 0..3 {
            batcher.enqueue(intent(&kp, amount)).unwrap();
        }
        batcher.run_all(&signers(&[&kp])).await.unwrap();

        let times: Vec<_> = mock.sent().into_iter().map(|(_, at)| at).collect();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_millis(1_200));
        assert_eq!(times[2] - times[1], Duration::from_millis(1_200));
    }

    #[tokio::test(start_paused = true)]
    async fn senders_run_concurrently() {
        let (mock, batcher) = setup();
        let (a, b) = (keypair(4), keypair(5));
        for amount in 0..2 {
            batcher.enqueue(intent(&a, amount)).unwrap();
            batcher.enqueue(intent(&b, amount)).unwrap();
        }

        let started = Instant::now();
        let report = batcher.run_all(&signers(&[&a, &b])).await.unwrap();
        assert_eq!(report.senders.len(), 2);
        assert_eq!(mock.sent().len(), 4);
        // Two staggered sends per sender, in parallel: one stagger total.
        assert_eq!(started.elapsed(), Duration::from_millis(1_200));
    }

    #[tokio::test]
    async fn missing_key_fails_without_touching_the_queue() {
        let (mock, batcher) = setup();
        let (a, b) = (keypair(6), keypair(7));
        batcher.enqueue(intent(&a, 1)).unwrap();
        batcher.enqueue(intent(&b, 1)).unwrap();

        let err = batcher.run_all(&signers(&[&a])).await.unwrap_err();
        assert_eq!(
            err,
            BatchError::MissingSigningKey {
                sender: b.public_key().to_hex()
            }
        );
        assert_eq!(batcher.total_queued(), 2);
        assert_eq!(batcher.status(), BatchStatus::Idle);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn nonce_failure_requeues_that_sender_only() {
        let (mock, batcher) = setup();
        let kp = keypair(8);
        let vk = kp.public_key().to_hex();
        mock.push_nonce(Err(TransportError::Http("connection reset".into())));
        batcher.enqueue(intent(&kp, 1)).unwrap();
        batcher.enqueue(intent(&kp, 2)).unwrap();

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        assert_eq!(report.senders.len(), 1);
        assert!(report.senders[0].error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(report.remaining, 2);
        assert!(mock.sent().is_empty());

        // Order survives the requeue.
        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        let uids: Vec<_> = report.records().filter_map(|r| r.uid()).collect();
        assert_eq!(uids, vec!["tx-1", "tx-2"]);
        assert_eq!(mock.sent_by(&vk).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_processor_defers_the_whole_batch() {
        let (mock, batcher) = setup();
        let kp = keypair(12);
        let vk = kp.public_key().to_hex();
        mock.push_nonce(Ok(NonceResponse {
            nonce: Some(3),
            processor: Some(String::new()),
            masternode: None,
            error: None,
        }));
        for amount in 0..3 {
            batcher.enqueue(intent(&kp, amount)).unwrap();
        }

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        assert_eq!(report.records().count(), 0);
        assert!(report.senders[0].error.is_some());
        assert_eq!(report.remaining, 3);
        assert_eq!(batcher.queued_len(&vk), 3);
        assert!(mock.sent().is_empty());

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        let nonces: Vec<u64> = report.records().filter_map(|r| r.nonce()).collect();
        assert_eq!(nonces, vec![0, 1, 2]);
        let uids: Vec<_> = report.records().filter_map(|r| r.uid()).collect();
        assert_eq!(uids, vec!["tx-0", "tx-1", "tx-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn nonce_space_exhaustion_defers_the_tail() {
        let (mock, batcher) = setup();
        let kp = keypair(13);
        let vk = kp.public_key().to_hex();
        mock.push_nonce(Ok(NonceResponse {
            nonce: Some(u64::MAX - 1),
            processor: Some("p1".into()),
            masternode: None,
            error: None,
        }));
        for amount in 0..4 {
            batcher.enqueue(intent(&kp, amount)).unwrap();
        }

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        let nonces: Vec<u64> = report.records().filter_map(|r| r.nonce()).collect();
        assert_eq!(nonces, vec![u64::MAX - 1, u64::MAX]);
        assert!(report.senders[0].error.as_deref().unwrap().contains("exhausted"));
        assert_eq!(report.remaining, 2);
        assert_eq!(mock.sent_by(&vk).len(), 2);

        let report = batcher.run_all(&signers(&[&kp])).await.unwrap();
        let uids: Vec<_> = report.records().filter_map(|r| r.uid()).collect();
        assert_eq!(uids, vec!["tx-2", "tx-3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reentrant_run_is_refused_and_enqueue_goes_to_overflow() {
        let (mock, batcher) = setup();
        let kp = keypair(9);
        let vk = kp.public_key().to_hex();
        let keys = signers(&[&kp]);
        for amount in 0..3 {
            batcher.enqueue(intent(&kp, amount)).unwrap();
        }

        let (first, (second, status)) = tokio::join!(batcher.run_all(&keys), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let second = batcher.run_all(&keys).await;
            batcher.enqueue(intent(&kp, 99)).unwrap();
            (second, batcher.status())
        });

        assert_eq!(second.unwrap_err(), BatchError::AlreadyRunning);
        assert_eq!(status, BatchStatus::Running);

        let first = first.unwrap();
        assert_eq!(first.records().count(), 3);
        assert!(first.records().all(|r| r.uid() != Some("tx-99")));
        assert_eq!(mock.sent_by(&vk).len(), 3);

        // The overflow entry is queued for the next run.
        assert_eq!(batcher.status(), BatchStatus::Idle);
        assert_eq!(batcher.overflow_len(), 0);
        assert_eq!(batcher.queued_len(&vk), 1);
        assert_eq!(first.remaining, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_keeps_arrival_order() {
        let (_, batcher) = setup();
        let kp = keypair(10);
        let vk = kp.public_key().to_hex();
        let keys = signers(&[&kp]);
        batcher.enqueue(intent(&kp, 0)).unwrap();
        batcher.enqueue(intent(&kp, 1)).unwrap();

        let (report, ()) = tokio::join!(batcher.run_all(&keys), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            for amount in [30, 10, 20] {
                batcher.enqueue(intent(&kp, amount)).unwrap();
            }
            assert_eq!(batcher.overflow_len(), 3);
        });
        report.unwrap();

        let report = batcher.run_all(&keys).await.unwrap();
        let uids: Vec<_> = report.records().filter_map(|r| r.uid()).collect();
        assert_eq!(uids, vec!["tx-30", "tx-10", "tx-20"]);
        assert_eq!(batcher.queued_len(&vk), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_records_share_the_event_channel() {
        let (_, batcher) = setup();
        let mut rx = batcher.subscribe();
        let kp = keypair(11);
        batcher.enqueue(intent(&kp, 1)).unwrap();
        batcher.enqueue(intent(&kp, 2)).unwrap();

        batcher.run_all(&signers(&[&kp])).await.unwrap();
        let mut seen = 0;
        while let Ok(TxEvent::Response { state, .. }) = rx.try_recv() {
            assert_eq!(state, TxState::Pending);
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn empty_run_is_a_no_op() {
        let (mock, batcher) = setup();
        let report = batcher.run_all(&HashMap::new()).await.unwrap();
        assert!(report.senders.is_empty());
        assert_eq!(report.remaining, 0);
        assert!(mock.calls().is_empty());
    }
}
