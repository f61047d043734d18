use sha2::{Digest, Sha256};

use crate::model::ImportSource;

/// Fields that define one logical observation. One ad produces one row per
/// (day, age, gender), so the breakdown dimensions are part of identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintInput<'a> {
    pub client_id: &'a str,
    pub ad_name: &'a str,
    pub day: &'a str,
    pub age: &'a str,
    pub gender: &'a str,
    pub source: ImportSource,
}

/// SHA-256 over length-prefixed identity fields, lowercase hex.
pub fn fingerprint(input: &FingerprintInput<'_>) -> String {
    let mut hasher = Sha256::new();
    for field in [
        input.client_id,
        input.ad_name,
        input.day,
        input.age,
        input.gender,
        input.source.as_str(),
    ] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
