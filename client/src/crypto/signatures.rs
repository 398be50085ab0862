//! # Signing Capability
//!
//! The transaction pipeline never touches key material directly. It asks a
//! [`Signer`] for a signature over canonical payload bytes and checks the
//! result with [`verify_hex`]. A local [`Keypair`] is one `Signer`; a
//! hardware wallet or a remote signing service would be another.

use thiserror::Error;

use super::keys::{KeyError, Keypair, PublicKey, Signature};

/// Errors during signature verification.
///
/// No detail on *why* verification failed beyond "bad input" vs "no".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Something that can sign on behalf of one sender.
///
/// Implementations must be deterministic for the same message (Ed25519 is)
/// and safe to share across tasks.
pub trait Signer: Send + Sync {
    /// The sender this signer signs for, as a 64-char hex vk.
    fn verifying_key_hex(&self) -> String;

    /// Signs `message`.
    fn sign(&self, message: &[u8]) -> Signature;
}

impl Signer for Keypair {
    fn verifying_key_hex(&self) -> String {
        self.public_key().to_hex()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        Keypair::sign(self, message)
    }
}

/// Signs a message with a keypair.
pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verifies a typed signature.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}

/// Verifies a signature given the wire representations: hex vk and hex
/// signature.
pub fn verify_hex(vk_hex: &str, message: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
    let public_key = PublicKey::from_hex(vk_hex)?;
    let signature = Signature::from_hex(signature_hex)?;
    if public_key.verify(message, &signature) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_hex() {
        let kp = Keypair::generate();
        let msg = br#"{"contract":"currency"}"#;
        let sig = sign(&kp, msg);
        assert!(verify(&kp.public_key(), msg, &sig));
        assert!(verify_hex(&kp.public_key().to_hex(), msg, &sig.to_hex()).is_ok());
    }

    #[test]
    fn flipping_any_byte_breaks_verification() {
        let kp = Keypair::generate();
        let msg = br#"{"amount":100,"to":"abc"}"#.to_vec();
        let sig = sign(&kp, &msg);

        for i in 0..msg.len() {
            let mut tampered = msg.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                verify_hex(&kp.public_key().to_hex(), &tampered, &sig.to_hex()),
                Err(SignatureError::VerificationFailed),
                "byte {i} was flipped but the signature still verified"
            );
        }
    }

    #[test]
    fn malformed_inputs_are_key_errors() {
        let kp = Keypair::generate();
        let sig = sign(&kp, b"m");
        assert_eq!(
            verify_hex("xyz", b"m", &sig.to_hex()),
            Err(SignatureError::Key(KeyError::InvalidPublicKey))
        );
        assert_eq!(
            verify_hex(&kp.public_key().to_hex(), b"m", "00"),
            Err(SignatureError::Key(KeyError::InvalidSignature))
        );
    }

    #[test]
    fn keypair_acts_as_signer() {
        let kp = Keypair::generate();
        let signer: &dyn Signer = &kp;
        assert_eq!(signer.verifying_key_hex(), kp.public_key().to_hex());
        assert_eq!(signer.sign(b"abc"), kp.sign(b"abc"));
    }
}
