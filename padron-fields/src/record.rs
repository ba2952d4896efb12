//! Batch helpers over record maps.
//!
//! Encrypted attributes are persisted as three sibling columns per field:
//! `{field}_encrypted`, `{field}_iv`, `{field}_tag`. These helpers apply
//! that convention to `serde_json` record maps in both directions.

use crate::error::{FieldError, FieldResult};
use crate::field::{decrypt_field, encrypt_json_field};
use padron_crypto::{CryptoError, LayerPipeline, StoredField};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A record as handed over by the persistence layer.
pub type Record = Map<String, Value>;

/// Sentinel substituted for a field that could not be decrypted in lossy
/// mode. Never a valid plaintext: real values are rejected when empty, and
/// this marker is checked against verbatim.
pub const UNREADABLE_SENTINEL: &str = "[unreadable]";

/// Returns the column triple names for a field.
pub fn column_names(field: &str) -> (String, String, String) {
    (
        format!("{}_encrypted", field),
        format!("{}_iv", field),
        format!("{}_tag", field),
    )
}

/// Reads a field's column triple from a record, if the field is present.
///
/// Absent means no `{field}_encrypted` column at all; a present ciphertext
/// with a missing `iv` or `tag` sibling is [`FieldError::MissingMaterial`].
pub fn read_triple(record: &Record, field: &str) -> FieldResult<Option<StoredField>> {
    let (ct_col, iv_col, tag_col) = column_names(field);

    let ciphertext = match record.get(&ct_col).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => return Ok(None),
    };
    let iv = record
        .get(&iv_col)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(FieldError::MissingMaterial {
            part: iv_col.clone(),
        })?;
    let auth_tag = record
        .get(&tag_col)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(FieldError::MissingMaterial {
            part: tag_col.clone(),
        })?;

    Ok(Some(StoredField {
        ciphertext,
        iv,
        auth_tag,
    }))
}

/// Encrypts the named fields of a record in place.
///
/// Each present field is replaced by its column triple; fields absent from
/// the record (or explicitly null) are skipped, never defaulted.
pub fn encrypt_record_fields(
    pipeline: &LayerPipeline,
    record: &mut Record,
    fields: &[&str],
) -> FieldResult<()> {
    for field in fields {
        let value = match record.get(*field) {
            None | Some(Value::Null) => continue,
            Some(value) => value.clone(),
        };
        let triple = encrypt_json_field(pipeline, &value)?;

        record.remove(*field);
        let (ct_col, iv_col, tag_col) = column_names(field);
        record.insert(ct_col, Value::String(triple.ciphertext));
        record.insert(iv_col, Value::String(triple.iv));
        record.insert(tag_col, Value::String(triple.auth_tag));
    }
    Ok(())
}

/// Decrypts the named fields of a record in place, strictly.
///
/// The first failure aborts and leaves the record partially transformed;
/// callers wanting per-field degradation use
/// [`decrypt_record_fields_lossy`].
pub fn decrypt_record_fields(
    pipeline: &LayerPipeline,
    record: &mut Record,
    fields: &[&str],
) -> FieldResult<()> {
    for field in fields {
        let triple = match read_triple(record, field)? {
            Some(triple) => triple,
            None => continue,
        };
        let plaintext = decrypt_field(pipeline, &triple)?;
        strip_triple(record, field);
        record.insert((*field).to_string(), Value::String(plaintext));
    }
    Ok(())
}

/// Decrypts the named fields of a record, substituting
/// [`UNREADABLE_SENTINEL`] for any field that cannot be recovered, so one
/// corrupted row does not abort a whole listing.
///
/// Authentication failures are logged at warn level as possible tampering;
/// everything else (incomplete triples, framing failures) at debug. Returns
/// the number of degraded fields.
pub fn decrypt_record_fields_lossy(
    pipeline: &LayerPipeline,
    record: &mut Record,
    fields: &[&str],
) -> usize {
    let mut degraded = 0;

    for field in fields {
        let outcome = read_triple(record, field)
            .and_then(|triple| triple.map(|t| decrypt_field(pipeline, &t)).transpose());

        let plaintext = match outcome {
            Ok(Some(plaintext)) => plaintext,
            Ok(None) => continue,
            Err(FieldError::Crypto(CryptoError::AuthenticationFailed)) => {
                warn!(field, "authentication failed: possible tampering");
                degraded += 1;
                UNREADABLE_SENTINEL.to_string()
            }
            Err(error) => {
                debug!(field, %error, "field unreadable");
                degraded += 1;
                UNREADABLE_SENTINEL.to_string()
            }
        };

        strip_triple(record, field);
        record.insert((*field).to_string(), Value::String(plaintext));
    }

    degraded
}

fn strip_triple(record: &mut Record, field: &str) {
    let (ct_col, iv_col, tag_col) = column_names(field);
    record.remove(&ct_col);
    record.remove(&iv_col);
    record.remove(&tag_col);
}
