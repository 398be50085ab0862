//! # Payload Codec
//!
//! Two small, pure pieces that sit underneath signing:
//!
//! ```text
//! canonical.rs: recursively key-sorted JSON rendering used as the signed bytes
//! encoder.rs  : typed encoding of contract arguments (fixed-point, datetime, ...)
//! ```
//!
//! The canonical form is the only thing that ever gets signed. Whatever
//! order a caller inserted kwargs in, the bytes handed to Ed25519 are the
//! same, so a verifier that rebuilds the payload gets a matching signature.

pub mod canonical;
pub mod encoder;

pub use canonical::{canonicalize, canonicalize_serializable, CanonicalForm, CodecError};
pub use encoder::{encode, EncodeError, ValueType};
