//! MD5 check of the recovered save data.
//!
//! A mismatch is reported, never raised: the save is still written.

use md5::{Digest, Md5};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub expected_hex: String,
    pub computed_hex: String,
    pub matches:      bool,
}

impl IntegrityReport {
    pub fn is_mismatch(&self) -> bool {
        !self.matches
    }
}

pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Hash `payload` and compare against the digest carried in the header.
pub fn verify(payload: &[u8], expected: &[u8]) -> IntegrityReport {
    let expected_hex = hex::encode(expected);
    let computed_hex = md5_hex(payload);
    let matches = expected_hex.eq_ignore_ascii_case(&computed_hex);
    IntegrityReport { expected_hex, computed_hex, matches }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn matching_digest() {
        let digest = Md5::digest(b"save data");
        let r = verify(b"save data", &digest);
        assert!(r.matches);
        assert!(!r.is_mismatch());
        assert_eq!(r.expected_hex, r.computed_hex);
    }

    #[test]
    fn mismatch_is_reported_not_raised() {
        let digest = Md5::digest(b"save data");
        let r = verify(b"save dat4", &digest);
        assert!(r.is_mismatch());
        assert_eq!(r.expected_hex, hex::encode(digest));
    }
}
