//! The ordered five-layer pipeline and its persisted output.
//!
//! Encrypt order is obfuscation → CBC(k4) → CTR(k3) → CBC(k2) → GCM(k1);
//! decrypt is the exact mirror, enforced structurally by folding one layer
//! list forward on seal and reversed on open. Only the outermost GCM layer
//! is authenticated; the inner layers add obfuscation depth, not provable
//! strength beyond the AEAD.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyRing, LayerKey};
use crate::layer::{CbcLayer, CtrLayer, LayerCipher, XorObfuscation};
use aes::Aes256;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{AesGcm, KeyInit, Nonce, Tag};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Size of the outer GCM nonce in bytes. The storage format persists it as a
/// 32-character hex column, so the full 16 bytes are used rather than the
/// usual 12.
pub const OUTER_IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// The persisted three-part representation of one encrypted attribute.
///
/// All parts are hex strings stored as-is by the persistence layer.
/// Immutable once written; updates replace the whole triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    /// Output of the full pipeline, hex-encoded.
    pub ciphertext: String,
    /// The outer GCM nonce, hex-encoded.
    pub iv: String,
    /// The detached GCM authentication tag, hex-encoded.
    #[serde(rename = "authTag")]
    pub auth_tag: String,
}

/// The outermost, authenticated layer: AES-256-GCM with a detached tag.
///
/// Unlike the inner layers it does not frame its IV inline; nonce and tag
/// become the externally visible `iv` and `authTag` of the stored triple.
pub struct AeadLayer {
    key: LayerKey,
}

impl AeadLayer {
    pub fn new(key: LayerKey) -> Self {
        Self { key }
    }

    fn seal(&self, input: &str) -> CryptoResult<StoredField> {
        let cipher = Aes256Gcm16::new(self.key.as_bytes().into());

        let mut iv = [0u8; OUTER_IV_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let mut buffer = input.as_bytes().to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(StoredField {
            ciphertext: hex::encode(buffer),
            iv: hex::encode(iv),
            auth_tag: hex::encode(tag),
        })
    }

    /// Verifies the tag and peels the outer layer. Runs before any inner
    /// layer is attempted; a mismatch is [`CryptoError::AuthenticationFailed`].
    fn open(&self, field: &StoredField) -> CryptoResult<String> {
        let ciphertext = decode_part("ciphertext", &field.ciphertext)?;
        let iv = decode_part("iv", &field.iv)?;
        let tag = decode_part("authTag", &field.auth_tag)?;

        if iv.len() != OUTER_IV_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "iv must be {} bytes, got {}",
                OUTER_IV_SIZE,
                iv.len()
            )));
        }
        if tag.len() != TAG_SIZE {
            return Err(CryptoError::InvalidInput(format!(
                "authTag must be {} bytes, got {}",
                TAG_SIZE,
                tag.len()
            )));
        }

        let cipher = Aes256Gcm16::new(self.key.as_bytes().into());
        let mut buffer = ciphertext;
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&iv),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        String::from_utf8(buffer)
            .map_err(|_| CryptoError::DecryptionFailed("outer layer: output is not UTF-8".into()))
    }
}

fn decode_part(part: &'static str, encoded: &str) -> CryptoResult<Vec<u8>> {
    hex::decode(encoded)
        .map_err(|_| CryptoError::InvalidInput(format!("{} is not valid hex", part)))
}

/// The full field-encryption pipeline.
///
/// Pure and stateless: every call allocates its own IVs and buffers, so
/// callers may encrypt or decrypt across records fully in parallel. Within
/// one field the layers run strictly in order, each consuming the previous
/// layer's output.
pub struct LayerPipeline {
    inner: Vec<Box<dyn LayerCipher>>,
    outer: AeadLayer,
}

impl LayerPipeline {
    /// Builds the standard five-layer stack from a key ring.
    pub fn new(keys: &KeyRing) -> Self {
        let inner: Vec<Box<dyn LayerCipher>> = vec![
            Box::new(XorObfuscation::new(keys.k5().clone(), keys.salt().clone())),
            Box::new(CbcLayer::new("cbc-4", keys.k4().clone())),
            Box::new(CtrLayer::new(keys.k3().clone())),
            Box::new(CbcLayer::new("cbc-2", keys.k2().clone())),
        ];
        Self::from_layers(inner, AeadLayer::new(keys.k1().clone()))
    }

    /// Builds a pipeline from an explicit layer stack.
    ///
    /// `inner` is applied innermost-first on encrypt and reversed on decrypt.
    /// A triple is only decryptable by a pipeline with the same stack in the
    /// same order.
    pub fn from_layers(inner: Vec<Box<dyn LayerCipher>>, outer: AeadLayer) -> Self {
        Self { inner, outer }
    }

    /// Encrypts a non-empty plaintext into a stored triple.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<StoredField> {
        if plaintext.is_empty() {
            return Err(CryptoError::InvalidInput(
                "cannot encrypt empty plaintext".to_string(),
            ));
        }

        let mut current = plaintext.to_string();
        for layer in &self.inner {
            current = layer.seal(&current)?;
        }
        self.outer.seal(&current)
    }

    /// Decrypts a stored triple back to its plaintext.
    ///
    /// The authentication tag is verified first; inner layers never run
    /// against unauthenticated ciphertext.
    pub fn decrypt(&self, field: &StoredField) -> CryptoResult<String> {
        let mut current = self.outer.open(field)?;
        for layer in self.inner.iter().rev() {
            current = layer.open(&current)?;
        }
        Ok(current)
    }
}
