//! # Network Module
//!
//! Everything between a transaction record and the remote ledger service.
//!
//! ## Architecture
//!
//! ```text
//! transport.rs  : the Transport trait and the wire types crossing it
//! info.rs       : validated network description (hosts, type, version)
//! reader.rs     : read-only state queries (contracts, variables, balances)
//! masternode.rs : reqwest-backed Transport against the masternode REST API
//! mock.rs       : scriptable in-memory Transport for tests and dry runs
//! ```
//!
//! ## Design Decisions
//!
//! - Records hold an `Arc<dyn Transport>` rather than being a network
//!   client themselves. Swapping the mock in for tests is one line.
//! - Host selection belongs to the transport. A record only ever names a
//!   host when it wants its submission to land on the node that issued
//!   its nonce.
//! - The mock guards its state with `parking_lot::Mutex` and never holds
//!   the lock across an `.await`.

pub mod info;
pub mod masternode;
pub mod mock;
pub mod reader;
pub mod transport;

pub use info::{NetworkInfo, NetworkType};
pub use masternode::MasternodeClient;
pub use mock::MockTransport;
pub use reader::{balance_text, ContractInfo, ContractMethod, ContractVariables, StateReader};
pub use transport::{
    NonceResponse, Transport, TransportError, TxResponse, WireMetadata, WireTransaction,
};
