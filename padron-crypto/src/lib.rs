//! Multi-layer field encryption for the padron registry.
//!
//! Transforms plaintext personal-data fields (names, national identifiers,
//! addresses, phone numbers) into an authenticated three-part ciphertext
//! before persistence, and reverses the transform on read:
//!
//! 1. XOR obfuscation against a repeating pad (base64 output)
//! 2. AES-256-CBC under k4 (`iv:ct` hex framing)
//! 3. AES-256-CTR under k3
//! 4. AES-256-CBC under k2
//! 5. AES-256-GCM under k1 — the only authenticated layer; its nonce and
//!    detached tag become the `iv` and `authTag` of the stored triple
//!
//! Decrypt verifies the tag first and mirrors the order exactly. All
//! operations are pure functions of (input, key ring): no globals, no I/O,
//! safe to parallelize across records.

mod error;
mod key;
mod layer;
mod pipeline;

pub use error::{CryptoError, CryptoResult};
pub use key::{KeyMaterial, KeyMode, KeyRing, LayerKey, Salt, KEY_SIZE, SALT_SIZE};
pub use layer::{CbcLayer, CtrLayer, LayerCipher, XorObfuscation, IV_SIZE};
pub use pipeline::{AeadLayer, LayerPipeline, StoredField, OUTER_IV_SIZE, TAG_SIZE};
