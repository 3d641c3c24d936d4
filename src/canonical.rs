//! Canonical serialization for deterministic fingerprints.
//!
//! The fingerprint of a category index is the xxh64 of the canonical JSON of
//! its records sorted by id. Two builds from the same record set, in any
//! input order, produce the same fingerprint, which doubles as the HTTP ETag.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Callers sort before hashing
//! - No HashMap allowed: Use BTreeMap for maps in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::types::CategoryRecord;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Fingerprint a record set independent of its order.
pub fn records_fingerprint(records: &[CategoryRecord]) -> String {
    let mut sorted: Vec<&CategoryRecord> = records.iter().collect();
    sorted.sort();
    canonical_hash_hex(&sorted)
}
