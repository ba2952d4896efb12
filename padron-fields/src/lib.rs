//! Field codec for the padron registry.
//!
//! Bridges application-level fields to the three-column storage
//! representation consumed by persistence, on top of the
//! `padron-crypto` pipeline:
//! - single-field encrypt/decrypt with strict presence preconditions
//! - scalar JSON coercion (numbers and booleans encrypt as strings)
//! - batch helpers over record maps using the
//!   `{field}_encrypted` / `{field}_iv` / `{field}_tag` column convention
//! - a lossy decrypt variant that degrades unreadable fields to a sentinel
//!   instead of aborting a listing, while keeping tampering distinguishable
//!   in logs

mod error;
mod field;
mod record;

pub use error::{FieldError, FieldResult};
pub use field::{decrypt_field, encrypt_field, encrypt_json_field};
pub use record::{
    column_names, decrypt_record_fields, decrypt_record_fields_lossy, encrypt_record_fields,
    read_triple, Record, UNREADABLE_SENTINEL,
};
