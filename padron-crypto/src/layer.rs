//! The inner transforms of the pipeline.
//!
//! Each layer is a keyed, reversible string-to-string transform. The string
//! encodings are part of the format: the obfuscation layer emits base64,
//! every other layer emits `"{iv_hex}:{ct_hex}"` with a fresh random IV per
//! call. The next layer always consumes the previous layer's *string*, not
//! raw bytes.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{LayerKey, Salt};
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ctr::cipher::StreamCipher;
use rand::RngCore;

/// Size of the inner-layer IVs in bytes.
pub const IV_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// One keyed, reversible transform in the pipeline.
///
/// `open` must exactly invert `seal` under the same key. Implementations are
/// pure: no shared state, a fresh IV per `seal` call.
pub trait LayerCipher: Send + Sync {
    /// Stable name used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Applies the transform.
    fn seal(&self, input: &str) -> CryptoResult<String>;

    /// Reverses the transform. Failures surface as
    /// [`CryptoError::DecryptionFailed`]; nothing is partially returned.
    fn open(&self, input: &str) -> CryptoResult<String>;
}

fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

/// Splits `"{iv_hex}:{ct_hex}"` framing into IV and ciphertext bytes.
fn split_frame(layer: &'static str, input: &str) -> CryptoResult<([u8; IV_SIZE], Vec<u8>)> {
    let (iv_hex, ct_hex) = input
        .split_once(':')
        .ok_or_else(|| CryptoError::DecryptionFailed(format!("{}: missing IV prefix", layer)))?;
    let iv_bytes = hex::decode(iv_hex)
        .map_err(|_| CryptoError::DecryptionFailed(format!("{}: malformed IV hex", layer)))?;
    if iv_bytes.len() != IV_SIZE {
        return Err(CryptoError::DecryptionFailed(format!(
            "{}: IV must be {} bytes, got {}",
            layer,
            IV_SIZE,
            iv_bytes.len()
        )));
    }
    let ciphertext = hex::decode(ct_hex).map_err(|_| {
        CryptoError::DecryptionFailed(format!("{}: malformed ciphertext hex", layer))
    })?;
    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&iv_bytes);
    Ok((iv, ciphertext))
}

fn utf8_string(layer: &'static str, bytes: Vec<u8>) -> CryptoResult<String> {
    String::from_utf8(bytes)
        .map_err(|_| CryptoError::DecryptionFailed(format!("{}: output is not UTF-8", layer)))
}

/// The innermost transform: plaintext bytes XORed against a repeating pad,
/// output base64. Length-preserving before encoding, carries no
/// authentication; it only keeps the next layer from ever seeing
/// recognizable plaintext structure.
///
/// The pad cycles the obfuscation key and the shared salt independently, so
/// its period is lcm(32, salt length) rather than either alone.
pub struct XorObfuscation {
    key: LayerKey,
    salt: Salt,
}

impl XorObfuscation {
    pub fn new(key: LayerKey, salt: Salt) -> Self {
        Self { key, salt }
    }

    fn apply_pad(&self, data: &[u8]) -> Vec<u8> {
        let key = self.key.as_bytes();
        let salt = self.salt.as_bytes();
        data.iter()
            .enumerate()
            .map(|(i, byte)| byte ^ key[i % key.len()] ^ salt[i % salt.len()])
            .collect()
    }
}

impl LayerCipher for XorObfuscation {
    fn name(&self) -> &'static str {
        "obfuscation"
    }

    fn seal(&self, input: &str) -> CryptoResult<String> {
        Ok(STANDARD.encode(self.apply_pad(input.as_bytes())))
    }

    fn open(&self, input: &str) -> CryptoResult<String> {
        let masked = STANDARD
            .decode(input)
            .map_err(|_| CryptoError::DecryptionFailed("obfuscation: invalid base64".into()))?;
        utf8_string(self.name(), self.apply_pad(&masked))
    }
}

/// AES-256-CBC with PKCS7 padding, `iv:ct` hex framing.
pub struct CbcLayer {
    name: &'static str,
    key: LayerKey,
}

impl CbcLayer {
    pub fn new(name: &'static str, key: LayerKey) -> Self {
        Self { name, key }
    }
}

impl LayerCipher for CbcLayer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn seal(&self, input: &str) -> CryptoResult<String> {
        let iv = random_iv();
        let ciphertext = Aes256CbcEnc::new(self.key.as_bytes().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(input.as_bytes());
        Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    fn open(&self, input: &str) -> CryptoResult<String> {
        let (iv, ciphertext) = split_frame(self.name, input)?;
        let plaintext = Aes256CbcDec::new(self.key.as_bytes().into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| {
                CryptoError::DecryptionFailed(format!("{}: bad padding", self.name))
            })?;
        utf8_string(self.name, plaintext)
    }
}

/// AES-256-CTR stream cipher, same `iv:ct` hex framing as the CBC layers.
pub struct CtrLayer {
    key: LayerKey,
}

impl CtrLayer {
    pub fn new(key: LayerKey) -> Self {
        Self { key }
    }

    fn keystream(&self, iv: &[u8; IV_SIZE], data: &[u8]) -> Vec<u8> {
        let mut buffer = data.to_vec();
        let mut cipher = Aes256Ctr::new(self.key.as_bytes().into(), iv.into());
        cipher.apply_keystream(&mut buffer);
        buffer
    }
}

impl LayerCipher for CtrLayer {
    fn name(&self) -> &'static str {
        "ctr"
    }

    fn seal(&self, input: &str) -> CryptoResult<String> {
        let iv = random_iv();
        let ciphertext = self.keystream(&iv, input.as_bytes());
        Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    fn open(&self, input: &str) -> CryptoResult<String> {
        let (iv, ciphertext) = split_frame(self.name(), input)?;
        utf8_string(self.name(), self.keystream(&iv, &ciphertext))
    }
}
