//! Record event stream.
//!
//! Every response a record handles (submission or confirmation) is
//! published on a `tokio::sync::broadcast` channel. Subscribers that lag
//! simply miss events; records never block on them.

use tokio::sync::broadcast;

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::network::TxResponse;
use crate::transaction::TxState;

/// Something happened to a transaction record.
#[derive(Debug, Clone, PartialEq)]
pub enum TxEvent {
    /// A service response was handled.
    Response {
        /// The record's caller-chosen id, if any.
        uid: Option<String>,
        /// Sender of the transaction.
        sender: String,
        /// Nonce the transaction carried, once assigned.
        nonce: Option<u64>,
        /// Subtitle of the record's updated result info.
        subtitle: String,
        /// The record's state after handling the response.
        state: TxState,
        /// The response as stored on the record.
        response: TxResponse,
    },
}

/// Sending half shared by records.
pub type EventSender = broadcast::Sender<TxEvent>;

/// Creates an event channel with the default capacity.
pub fn channel() -> (EventSender, broadcast::Receiver<TxEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

/// A sender with no subscribers yet. Events are dropped until someone
/// subscribes.
pub fn detached() -> EventSender {
    channel().0
}
