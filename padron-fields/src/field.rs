//! Single-field encrypt/decrypt operations.

use crate::error::{FieldError, FieldResult};
use padron_crypto::{LayerPipeline, StoredField};
use serde_json::Value;

/// Encrypts one application field.
///
/// Rejects values that are empty (or trim to empty) as a precondition
/// violation; optional fields must be skipped by the caller, not encrypted
/// as emptiness.
pub fn encrypt_field(pipeline: &LayerPipeline, value: &str) -> FieldResult<StoredField> {
    if value.trim().is_empty() {
        return Err(FieldError::EmptyValue);
    }
    Ok(pipeline.encrypt(value)?)
}

/// Encrypts a scalar JSON value, coercing non-strings to their string form.
///
/// Numbers and booleans encrypt as their display representation; parsing
/// back is the caller's concern. Null is rejected like an empty string;
/// arrays and objects are unsupported.
pub fn encrypt_json_field(pipeline: &LayerPipeline, value: &Value) -> FieldResult<StoredField> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => return Err(FieldError::EmptyValue),
        other => {
            return Err(FieldError::Unsupported(format!(
                "expected a scalar, got {}",
                type_name(other)
            )))
        }
    };
    encrypt_field(pipeline, &text)
}

/// Decrypts one stored triple back to its plaintext.
///
/// All three parts must be present and non-empty; a gap is
/// [`FieldError::MissingMaterial`], which is deliberately distinct from the
/// pipeline's authentication failure.
pub fn decrypt_field(pipeline: &LayerPipeline, field: &StoredField) -> FieldResult<String> {
    for (part, value) in [
        ("ciphertext", &field.ciphertext),
        ("iv", &field.iv),
        ("authTag", &field.auth_tag),
    ] {
        if value.is_empty() {
            return Err(FieldError::MissingMaterial { part: part.into() });
        }
    }
    Ok(pipeline.decrypt(field)?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
