//! Corpus fingerprints for change detection and cache keys.

use crate::corpus::RawRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// 64-bit content digest of a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Returns the digest as a lowercase hexadecimal string
    pub fn as_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

/// Digest over every field of every record, in order.
///
/// Fields are length-prefixed and absent fields are tagged, so moving text between
/// fields or records always changes the fingerprint.
pub fn corpus_fingerprint(records: &[RawRecord]) -> Fingerprint {
    let mut hasher = Xxh3::new();
    hasher.update(&(records.len() as u64).to_le_bytes());

    for record in records {
        for field in [
            &record.location,
            &record.page,
            &record.title,
            &record.category,
            &record.text,
        ] {
            match field {
                Some(value) => {
                    hasher.update(&[1]);
                    hasher.update(&(value.len() as u64).to_le_bytes());
                    hasher.update(value.as_bytes());
                }
                None => hasher.update(&[0]),
            }
        }
    }

    Fingerprint(hasher.digest())
}

/// Digest of raw payload bytes, used to skip re-parsing an unchanged file.
pub fn payload_fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint(xxh3_64(bytes))
}
