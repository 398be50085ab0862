//! # Cryptographic Capability
//!
//! Everything the pipeline needs from cryptography, and not a byte more:
//! Ed25519 keypairs, hex wire encodings, and a [`Signer`] trait the
//! transaction record signs through.
//!
//! - **Ed25519** for signatures. Deterministic, fast, and what the ledger
//!   expects.
//! - **SHA-256** only shows up in the mock transport, to fabricate
//!   believable transaction hashes.
//!
//! Nothing here is hand-rolled. These are thin typed wrappers around
//! `ed25519-dalek`; if you feel the urge to optimize them, don't.

pub mod keys;
pub mod signatures;

pub use keys::{is_valid_key, verifying_key_hex, KeyError, Keypair, PublicKey, Signature};
pub use signatures::{sign, verify, verify_hex, SignatureError, Signer};
