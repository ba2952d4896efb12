use padron_crypto::{
    AeadLayer, CbcLayer, CryptoError, CtrLayer, KeyRing, LayerCipher, LayerPipeline, StoredField,
    XorObfuscation,
};

fn pipeline() -> LayerPipeline {
    LayerPipeline::new(&KeyRing::ephemeral())
}

// ── Round-trip ───────────────────────────────────────────────────

#[test]
fn roundtrip_ascii() {
    let p = pipeline();
    let field = p.encrypt("Juan Pérez López").unwrap();
    assert_eq!(p.decrypt(&field).unwrap(), "Juan Pérez López");
}

#[test]
fn roundtrip_multibyte_and_emoji() {
    let p = pipeline();
    for text in ["Ñandú", "東京都", "🗳️ voto", "a", "  spaced  "] {
        let field = p.encrypt(text).unwrap();
        assert_eq!(p.decrypt(&field).unwrap(), text);
    }
}

#[test]
fn roundtrip_long_value() {
    let p = pipeline();
    let text = "Av. Insurgentes Sur 3000, Coyoacán, Ciudad de México ".repeat(40);
    let field = p.encrypt(&text).unwrap();
    assert_eq!(p.decrypt(&field).unwrap(), text);
}

#[test]
fn empty_plaintext_is_rejected() {
    let p = pipeline();
    let err = p.encrypt("").unwrap_err();
    assert!(matches!(err, CryptoError::InvalidInput(_)));
}

// ── Non-determinism ──────────────────────────────────────────────

#[test]
fn same_plaintext_yields_different_triples() {
    let p = pipeline();
    let a = p.encrypt("LOGJ790315HDFLRN09").unwrap();
    let b = p.encrypt("LOGJ790315HDFLRN09").unwrap();
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.auth_tag, b.auth_tag);
    assert_eq!(p.decrypt(&a).unwrap(), p.decrypt(&b).unwrap());
}

// ── Authentication ───────────────────────────────────────────────

fn flip_last_hex_char(value: &str) -> String {
    let mut chars: Vec<char> = value.chars().collect();
    let last = chars.last_mut().unwrap();
    *last = if *last == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let p = pipeline();
    let mut field = p.encrypt("dato sensible").unwrap();
    field.ciphertext = flip_last_hex_char(&field.ciphertext);
    let err = p.decrypt(&field).unwrap_err();
    assert!(matches!(err, CryptoError::AuthenticationFailed));
}

#[test]
fn tampered_auth_tag_fails_authentication() {
    let p = pipeline();
    let mut field = p.encrypt("dato sensible").unwrap();
    field.auth_tag = flip_last_hex_char(&field.auth_tag);
    let err = p.decrypt(&field).unwrap_err();
    assert!(matches!(err, CryptoError::AuthenticationFailed));
}

#[test]
fn every_ciphertext_bit_position_is_authenticated() {
    let p = pipeline();
    let field = p.encrypt("curp").unwrap();
    let bytes = hex::decode(&field.ciphertext).unwrap();
    for i in 0..bytes.len() {
        for bit in 0..8 {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= 1 << bit;
            let tampered = StoredField {
                ciphertext: hex::encode(&corrupted),
                ..field.clone()
            };
            assert!(matches!(
                p.decrypt(&tampered).unwrap_err(),
                CryptoError::AuthenticationFailed
            ));
        }
    }
}

#[test]
fn wrong_outer_key_fails_authentication() {
    let ring_a = KeyRing::ephemeral();
    let ring_b = KeyRing::ephemeral();
    let field = LayerPipeline::new(&ring_a).encrypt("secreto").unwrap();

    // Same inner keys, different k1 only.
    let mixed = KeyRing::from_parts(
        ring_b.k1().clone(),
        ring_a.k2().clone(),
        ring_a.k3().clone(),
        ring_a.k4().clone(),
        ring_a.k5().clone(),
        ring_a.salt().clone(),
    );
    let err = LayerPipeline::new(&mixed).decrypt(&field).unwrap_err();
    assert!(matches!(err, CryptoError::AuthenticationFailed));
}

// ── Malformed triples ────────────────────────────────────────────

#[test]
fn non_hex_triple_is_invalid_input() {
    let p = pipeline();
    let mut field = p.encrypt("x").unwrap();
    field.iv = "not hex at all".to_string();
    assert!(matches!(
        p.decrypt(&field).unwrap_err(),
        CryptoError::InvalidInput(_)
    ));
}

#[test]
fn wrong_iv_length_is_invalid_input() {
    let p = pipeline();
    let mut field = p.encrypt("x").unwrap();
    field.iv = "abcd".to_string();
    assert!(matches!(
        p.decrypt(&field).unwrap_err(),
        CryptoError::InvalidInput(_)
    ));
}

// ── Layer order ──────────────────────────────────────────────────

fn permuted_pipeline(ring: &KeyRing) -> LayerPipeline {
    // CTR and the outer CBC swapped relative to the canonical stack.
    let inner: Vec<Box<dyn LayerCipher>> = vec![
        Box::new(XorObfuscation::new(ring.k5().clone(), ring.salt().clone())),
        Box::new(CtrLayer::new(ring.k3().clone())),
        Box::new(CbcLayer::new("cbc-4", ring.k4().clone())),
        Box::new(CbcLayer::new("cbc-2", ring.k2().clone())),
    ];
    LayerPipeline::from_layers(inner, AeadLayer::new(ring.k1().clone()))
}

#[test]
fn decrypting_with_permuted_layer_order_breaks_roundtrip() {
    let ring = KeyRing::ephemeral();
    let canonical = LayerPipeline::new(&ring);
    let permuted = permuted_pipeline(&ring);

    let field = canonical.encrypt("LOGJ790315HDFLRN09").unwrap();
    match permuted.decrypt(&field) {
        Ok(text) => assert_ne!(text, "LOGJ790315HDFLRN09"),
        Err(err) => assert!(matches!(
            err,
            CryptoError::DecryptionFailed(_) | CryptoError::InvalidInput(_)
        )),
    }
}

#[test]
fn permuted_pipeline_roundtrips_against_itself() {
    // The asymmetry is between stacks, not within one: any stack is
    // self-consistent because decrypt folds the same list in reverse.
    let ring = KeyRing::ephemeral();
    let permuted = permuted_pipeline(&ring);
    let field = permuted.encrypt("autoconsistente").unwrap();
    assert_eq!(permuted.decrypt(&field).unwrap(), "autoconsistente");
}

// ── Concurrency contract ─────────────────────────────────────────

#[test]
fn pipeline_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<LayerPipeline>();
    assert_send_sync::<KeyRing>();
    assert_send_sync::<StoredField>();
}

#[test]
fn decryption_is_safe_across_threads() {
    use std::sync::Arc;

    let pipeline = Arc::new(LayerPipeline::new(&KeyRing::ephemeral()));
    let fields: Vec<StoredField> = (0..16)
        .map(|i| pipeline.encrypt(&format!("registro {}", i)).unwrap())
        .collect();

    let handles: Vec<_> = fields
        .into_iter()
        .enumerate()
        .map(|(i, field)| {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || {
                assert_eq!(pipeline.decrypt(&field).unwrap(), format!("registro {}", i));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

// ── Storage format scenario ──────────────────────────────────────

#[test]
fn national_identifier_scenario() {
    let p = pipeline();
    let field = p.encrypt("LOGJ790315HDFLRN09").unwrap();

    assert!(field.ciphertext.len() >= 36);
    assert_eq!(field.iv.len(), 32);
    assert_eq!(field.auth_tag.len(), 32);
    for part in [&field.ciphertext, &field.iv, &field.auth_tag] {
        assert!(hex::decode(part).is_ok());
    }

    assert_eq!(p.decrypt(&field).unwrap(), "LOGJ790315HDFLRN09");

    let tampered = StoredField {
        auth_tag: flip_last_hex_char(&field.auth_tag),
        ..field
    };
    assert!(matches!(
        p.decrypt(&tampered).unwrap_err(),
        CryptoError::AuthenticationFailed
    ));
}

#[test]
fn stored_field_serde_uses_auth_tag_column_name() {
    let p = pipeline();
    let field = p.encrypt("x").unwrap();
    let json = serde_json::to_string(&field).unwrap();
    assert!(json.contains("\"authTag\""));
    let parsed: StoredField = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, field);
}
