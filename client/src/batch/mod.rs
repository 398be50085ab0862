//! # Batching
//!
//! Many transactions from the same sender, submitted without the caller
//! sequencing nonces by hand. See [`batcher`] for the run cycle.

pub mod batcher;

pub use batcher::{BatchError, BatchReport, BatchStatus, SenderReport, TransactionBatcher};
