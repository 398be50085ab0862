// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledgerline: Client Library
//!
//! Client-side transaction pipeline for an account-based ledger reached
//! over HTTP masternodes. Callers describe an intent (contract, method,
//! keyword arguments); the library canonicalizes it, signs it, sends it,
//! and polls until the ledger settles it.
//!
//! ## Architecture
//!
//! - **codec**: Canonical payload form: sorted keys, stable bytes to sign.
//! - **crypto**: Ed25519 keys and the [`crypto::Signer`] seam.
//! - **network**: Masternode transport, network descriptor, and a mock.
//! - **transaction**: One record per intent, from unsigned to terminal.
//! - **batch**: Many intents per sender with contiguous nonces.
//! - **events**: Broadcast stream of handled service responses.
//! - **config**: Protocol constants and poll/batch tuning.
//!
//! ## Design Philosophy
//!
//! 1. A signature always covers the exact bytes that go on the wire.
//! 2. Network failures end a record in a terminal state; they are data,
//!    not panics.
//! 3. Nonces for one sender are fetched once per batch and never reused
//!    within a run.

pub mod batch;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod events;
pub mod network;
pub mod transaction;
