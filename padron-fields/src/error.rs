//! Error types for the field codec.

use padron_crypto::CryptoError;
use thiserror::Error;

/// Result type for codec operations.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors that can occur when bridging application fields to storage triples.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The value is null, absent, or empty. Callers must branch around
    /// absent optional fields rather than encrypting emptiness.
    #[error("cannot encrypt an empty or absent value")]
    EmptyValue,

    /// A stored triple is incomplete. Distinct from authentication failure:
    /// the material never reached the cipher.
    #[error("missing encryption material: {part}")]
    MissingMaterial { part: String },

    /// The value cannot be coerced to a string for encryption.
    #[error("unsupported field value: {0}")]
    Unsupported(String),

    /// Underlying pipeline failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
