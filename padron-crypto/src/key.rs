//! Key material for the five-layer pipeline.
//!
//! Keys are supplied once at process start by configuration and held in a
//! [`KeyRing`] that is passed by reference to every consumer. The engine
//! never generates keys in production mode; the deterministic-free ephemeral
//! generator exists for development and tests only and is logged as insecure.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of each layer key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Default salt size for ephemeral rings.
pub const SALT_SIZE: usize = 16;

/// A single 256-bit layer key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LayerKey {
    bytes: [u8; KEY_SIZE],
}

impl LayerKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Parses a key from a 64-character hex string.
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(encoded)
            .map_err(|e| CryptoError::KeyConfiguration(format!("invalid key hex: {}", e)))?;
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::KeyConfiguration(format!(
                "invalid key length: expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut array = [0u8; KEY_SIZE];
        array.copy_from_slice(&bytes);
        Ok(Self::from_bytes(array))
    }

    /// Generates a random key from the OS RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for LayerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Non-secret salt for the obfuscation layer.
///
/// Repeated cyclically over the plaintext; any non-empty length is valid.
#[derive(Clone, Debug)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    /// Creates a salt from raw bytes. Rejects empty input.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.is_empty() {
            return Err(CryptoError::KeyConfiguration(
                "obfuscation salt must not be empty".to_string(),
            ));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Parses a salt from a hex string.
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(encoded)
            .map_err(|e| CryptoError::KeyConfiguration(format!("invalid salt hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Generates a random salt.
    pub fn random() -> Self {
        let mut bytes = vec![0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Returns the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Startup mode controlling how missing key material is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyMode {
    /// All five keys and the salt must be present. Missing material is fatal.
    Production,
    /// Missing entries are synthesized from the OS RNG and logged as insecure.
    Development,
}

/// Raw key material as handed over by configuration: hex strings, each
/// optionally absent.
#[derive(Clone, Debug, Default)]
pub struct KeyMaterial {
    pub k1: Option<String>,
    pub k2: Option<String>,
    pub k3: Option<String>,
    pub k4: Option<String>,
    pub k5: Option<String>,
    pub salt: Option<String>,
}

/// The five layer keys plus the obfuscation salt.
///
/// Constructed once at startup and passed by reference; there is no ambient
/// global key state.
#[derive(Clone)]
pub struct KeyRing {
    k1: LayerKey,
    k2: LayerKey,
    k3: LayerKey,
    k4: LayerKey,
    k5: LayerKey,
    salt: Salt,
}

impl KeyRing {
    /// Assembles a ring from already-validated parts.
    pub fn from_parts(
        k1: LayerKey,
        k2: LayerKey,
        k3: LayerKey,
        k4: LayerKey,
        k5: LayerKey,
        salt: Salt,
    ) -> Self {
        Self {
            k1,
            k2,
            k3,
            k4,
            k5,
            salt,
        }
    }

    /// Builds a ring from configuration-supplied material.
    ///
    /// In [`KeyMode::Production`] every entry must be present and well-formed;
    /// any gap is a [`CryptoError::KeyConfiguration`] and startup must abort.
    /// In [`KeyMode::Development`] gaps are filled with ephemeral random
    /// material and a warning is logged for each.
    pub fn from_material(material: &KeyMaterial, mode: KeyMode) -> CryptoResult<Self> {
        let k1 = Self::resolve_key("k1", material.k1.as_deref(), mode)?;
        let k2 = Self::resolve_key("k2", material.k2.as_deref(), mode)?;
        let k3 = Self::resolve_key("k3", material.k3.as_deref(), mode)?;
        let k4 = Self::resolve_key("k4", material.k4.as_deref(), mode)?;
        let k5 = Self::resolve_key("k5", material.k5.as_deref(), mode)?;

        let salt = match material.salt.as_deref() {
            Some(encoded) => Salt::from_hex(encoded)?,
            None if mode == KeyMode::Production => {
                return Err(CryptoError::KeyConfiguration(
                    "missing obfuscation salt in production mode".to_string(),
                ));
            }
            None => {
                warn!("obfuscation salt missing; using ephemeral salt (INSECURE, dev only)");
                Salt::random()
            }
        };

        Ok(Self::from_parts(k1, k2, k3, k4, k5, salt))
    }

    /// All-random ring for development and tests. Data encrypted with it is
    /// unrecoverable after the process exits.
    pub fn ephemeral() -> Self {
        warn!("using ephemeral key ring (INSECURE, dev only)");
        Self::from_parts(
            LayerKey::random(),
            LayerKey::random(),
            LayerKey::random(),
            LayerKey::random(),
            LayerKey::random(),
            Salt::random(),
        )
    }

    fn resolve_key(name: &str, encoded: Option<&str>, mode: KeyMode) -> CryptoResult<LayerKey> {
        match encoded {
            Some(encoded) => LayerKey::from_hex(encoded)
                .map_err(|e| CryptoError::KeyConfiguration(format!("{}: {}", name, e))),
            None if mode == KeyMode::Production => Err(CryptoError::KeyConfiguration(format!(
                "missing key {} in production mode",
                name
            ))),
            None => {
                warn!(key = name, "key missing; using ephemeral key (INSECURE, dev only)");
                Ok(LayerKey::random())
            }
        }
    }

    pub fn k1(&self) -> &LayerKey {
        &self.k1
    }

    pub fn k2(&self) -> &LayerKey {
        &self.k2
    }

    pub fn k3(&self) -> &LayerKey {
        &self.k3
    }

    pub fn k4(&self) -> &LayerKey {
        &self.k4
    }

    pub fn k5(&self) -> &LayerKey {
        &self.k5
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &"[REDACTED]")
            .field("salt_len", &self.salt.as_bytes().len())
            .finish()
    }
}
