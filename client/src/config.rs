//! # Client Configuration & Constants
//!
//! Every tunable number in the client lives here. The remote service
//! publishes some of these limits (batch size) and the rest are pacing
//! choices that keep us polite towards the masternodes.
//!
//! The constants are the defaults; [`PollConfig`] and [`BatchConfig`]
//! carry them at runtime so tests and operators can shrink or stretch them.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Network API
// ---------------------------------------------------------------------------

/// Masternode API versions this client knows how to speak. Anything else
/// falls back to [`DEFAULT_NETWORK_VERSION`].
pub const SUPPORTED_NETWORK_VERSIONS: [u8; 2] = [1, 2];

/// API version assumed when none (or an unknown one) is configured.
pub const DEFAULT_NETWORK_VERSION: u8 = 1;

/// Currency symbol used when the network config does not name one.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "TAU";

/// Network name used when the network config does not name one.
pub const DEFAULT_NETWORK_NAME: &str = "ledger network";

/// Contract holding the native currency's balances.
pub const CURRENCY_CONTRACT: &str = "currency";

/// Hash variable of [`CURRENCY_CONTRACT`] keyed by verifying key.
pub const BALANCES_VARIABLE: &str = "balances";

/// Error string the masternode returns while a submitted transaction has
/// not been processed yet. Polling treats it as transient.
pub const TX_NOT_FOUND_ERROR: &str = "Transaction not found.";

/// Verifying and signing keys are 32 bytes, rendered as 64 hex chars.
pub const KEY_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Confirmation Polling
// ---------------------------------------------------------------------------

/// Delay before each confirmation poll. The first poll also waits this
/// long: a transaction is never settled the instant it is accepted.
pub const TX_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of confirmation polls before the record gives up with a
/// retry-exhaustion failure.
pub const TX_CHECK_LIMIT: u32 = 10;

/// Upper bound on a single poll request. A masternode that never answers
/// burns one attempt per timeout instead of hanging the loop forever.
pub const TX_CHECK_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

/// Maximum records submitted per sender in one batch run. Matches the
/// masternode's per-request nonce window.
pub const MAX_BATCH_SIZE: usize = 15;

/// Delay between successive submissions inside one sender's batch.
pub const SUBMIT_STAGGER: Duration = Duration::from_millis(1_200);

/// Capacity of the broadcast channel records publish their events on.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Runtime Config
// ---------------------------------------------------------------------------

/// Confirmation polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait before every poll attempt.
    pub interval: Duration,
    /// Attempt cap. Reaching it is a terminal failure.
    pub max_attempts: u32,
    /// Per-request deadline. A timed-out request consumes one attempt.
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: TX_CHECK_INTERVAL,
            max_attempts: TX_CHECK_LIMIT,
            request_timeout: TX_CHECK_REQUEST_TIMEOUT,
        }
    }
}

/// Batch submission parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Records taken per sender per run.
    pub max_batch_size: usize,
    /// Pause between two submissions of the same sender.
    pub submit_stagger: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            submit_stagger: SUBMIT_STAGGER,
        }
    }
}
