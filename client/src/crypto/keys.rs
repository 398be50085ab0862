//! # Key Management
//!
//! Ed25519 keypairs for transaction senders.
//!
//! Ledger accounts are identified by their verifying key rendered as 64
//! lowercase hex characters (the "vk"); the signing key ("sk") travels in
//! the same format. This module converts between those strings and
//! ed25519-dalek types and nothing more. Persisting key material is the
//! wallet's job, not ours.
//!
//! Key bytes are never logged. `Debug` prints only the public half.

use ed25519_dalek::{
    Signature as DalekSignature, Signer as _, SigningKey, Verifier, VerifyingKey,
    SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::KEY_HEX_LENGTH;

/// Errors that can occur while parsing key material.
///
/// Deliberately vague: error text must never echo secret bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid signing key: expected {KEY_HEX_LENGTH} hex characters")]
    InvalidSecretKey,

    #[error("invalid verifying key: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature: expected 64 bytes of hex")]
    InvalidSignature,
}

/// Returns `true` for a well-formed vk/sk string: exactly 64 hex characters.
pub fn is_valid_key(s: &str) -> bool {
    s.len() == KEY_HEX_LENGTH && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Derives the hex verifying key for a hex signing key.
pub fn verifying_key_hex(secret_hex: &str) -> Result<String, KeyError> {
    Keypair::from_hex(secret_hex).map(|kp| kp.public_key().to_hex())
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// A sender's Ed25519 keypair.
///
/// Intentionally not `Serialize`: writing a signing key anywhere should be
/// an explicit call to [`Keypair::secret_hex`], not a side effect of
/// dumping a struct.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Builds a keypair from a 32-byte seed. In Ed25519 the seed *is* the
    /// secret key.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses a hex signing key (the wallet's `sk`).
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public half.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Hex-encoded signing key. Handle with care.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signs `message`. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Verifies a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(message, signature)
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(vk={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A sender's verifying key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; 32],
}

impl PublicKey {
    /// Parses a hex vk, rejecting strings that are not a curve point.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Returns `true` if `signature` is valid for `message` under this key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let dalek_sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; 64],
}

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// 128 lowercase hex characters, the wire format.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|_| KeyError::InvalidSignature)?;
        let bytes: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_sign_verify_roundtrip() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"transfer 100");
        assert!(kp.verify(b"transfer 100", &sig));
        assert!(!kp.verify(b"transfer 101", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.verify(b"message", &sig));
    }

    #[test]
    fn secret_hex_roundtrip() {
        let kp = Keypair::generate();
        let restored = Keypair::from_hex(&kp.secret_hex()).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn invalid_secret_hex_rejected() {
        assert_eq!(
            Keypair::from_hex("deadbeef").unwrap_err(),
            KeyError::InvalidSecretKey
        );
        assert_eq!(
            Keypair::from_hex("not-hex-at-all").unwrap_err(),
            KeyError::InvalidSecretKey
        );
    }

    #[test]
    fn verifying_key_is_derived_from_secret() {
        let kp = Keypair::from_seed(&[7u8; 32]);
        let vk = verifying_key_hex(&kp.secret_hex()).unwrap();
        assert_eq!(vk, kp.public_key().to_hex());
        assert!(is_valid_key(&vk));
    }

    #[test]
    fn is_valid_key_checks_length_and_alphabet() {
        assert!(is_valid_key(&"ab".repeat(32)));
        assert!(!is_valid_key(&"ab".repeat(31)));
        assert!(!is_valid_key(&"zz".repeat(32)));
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let pk = Keypair::generate().public_key();
        assert_eq!(PublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
    }

    #[test]
    fn signature_hex_roundtrip() {
        let sig = Keypair::generate().sign(b"test");
        assert_eq!(sig.to_hex().len(), 128);
        assert_eq!(Signature::from_hex(&sig.to_hex()).unwrap(), sig);
        assert!(Signature::from_hex("abcd").is_err());
    }

    #[test]
    fn deterministic_from_seed() {
        let a = Keypair::from_seed(&[42u8; 32]);
        let b = Keypair::from_seed(&[42u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = Keypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("Keypair(vk="));
        assert!(!debug_str.contains(&kp.secret_hex()));
    }
}
