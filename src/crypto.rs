//! Cryptographic primitives for GasChain
//!
//! Station identities are hex-encoded compressed secp256k1 public keys. Messages
//! are hashed with SHA-256 before ECDSA signing, and signatures travel as
//! hex-encoded 64-byte compact signatures.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| ChainError::CryptoError(format!("Invalid hex secret key: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    /// The station identity used as a transaction `sender`.
    pub fn identity(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], ChainError> {
        let message = digest_message(message)?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

fn digest_message(message: &[u8]) -> Result<Message, ChainError> {
    let digest = Sha256::digest(message);
    Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))
}

/// Decodes a station identity back into its public key.
pub fn public_key_from_identity(identity: &str) -> Result<PublicKey, ChainError> {
    let bytes = hex::decode(identity).map_err(|e| {
        ChainError::InvalidSignatureEncoding(format!("Sender is not a hex public key: {}", e))
    })?;
    if bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::InvalidSignatureEncoding(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }
    PublicKey::from_slice(&bytes)
        .map_err(|e| ChainError::InvalidSignatureEncoding(format!("Invalid public key: {}", e)))
}

/// Verifies a hex-encoded compact signature over `message` for the given public key.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), ChainError> {
    let signature_bytes = hex::decode(signature_hex).map_err(|e| {
        ChainError::InvalidSignatureEncoding(format!("Signature is not hex: {}", e))
    })?;
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::InvalidSignatureEncoding(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }
    let signature = Signature::from_compact(&signature_bytes)
        .map_err(|e| ChainError::InvalidSignatureEncoding(format!("Invalid signature: {}", e)))?;

    let message = digest_message(message)?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, public_key)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}
