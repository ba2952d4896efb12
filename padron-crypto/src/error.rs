//! Error types for the field encryption engine.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the encryption pipeline.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Empty plaintext or a malformed storage triple.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Outer-layer authentication tag mismatch (tampered or corrupted data).
    #[error("authentication failed: ciphertext tampered or corrupted")]
    AuthenticationFailed,

    /// An inner layer failed to reverse its transform (framing, padding,
    /// encoding). Nothing is partially returned.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Missing or malformed key material. Fatal at startup in production.
    #[error("key configuration error: {0}")]
    KeyConfiguration(String),
}
