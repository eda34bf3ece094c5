//! Signature operations

use crate::keys::{PrivateKey, PublicKey};
use signature::{Signer, Verifier};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("verification failed")]
    VerificationFailed,
}

/// Sign a message with a private key.
///
/// secp256k1 hashes the message with SHA-256 and returns the 64-byte
/// `r || s` form with low S, which is what Cosmos chains verify. ed25519
/// signs the message directly.
pub fn sign_message(key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    match key {
        PrivateKey::Secp256k1(k) => {
            use k256::ecdsa::Signature;
            let sig: Signature = k
                .try_sign(message)
                .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;
            Ok(sig.to_bytes().to_vec())
        }
        PrivateKey::Ed25519(k) => {
            use ed25519_dalek::Signature;
            let sig: Signature = k
                .try_sign(message)
                .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;
            Ok(sig.to_bytes().to_vec())
        }
    }
}

/// Verify a signature produced by [`sign_message`]
pub fn verify_signature(
    key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    match key {
        PublicKey::Secp256k1(k) => {
            use k256::ecdsa::Signature;
            let sig =
                Signature::from_slice(signature).map_err(|_| SignatureError::VerificationFailed)?;
            k.verify(message, &sig)
                .map_err(|_| SignatureError::VerificationFailed)
        }
        PublicKey::Ed25519(k) => {
            use ed25519_dalek::Signature;
            let sig = Signature::from_slice(signature)
                .map_err(|_| SignatureError::VerificationFailed)?;
            k.verify(message, &sig)
                .map_err(|_| SignatureError::VerificationFailed)
        }
    }
}
