//! Byte-stuffing used on the serial link.
//!
//! The modem reserves `SYNC_BYTE` (0xAB) for its preamble, so the encoded
//! stream never carries it raw.  Two escape sequences exist:
//!
//! | Wire        | Meaning |
//! |-------------|---------|
//! | `54 54`     | literal `0x54` |
//! | `54 9F`     | literal `0xAB` |
//!
//! Any other byte after `0x54`, or a `0x54` at the very end of the capture,
//! means the capture is corrupt.  There is no resynchronisation.

use thiserror::Error;

pub const ESCAPE_BYTE:  u8 = 0x54;
pub const SYNC_REPLACE: u8 = 0x9F;
pub const SYNC_BYTE:    u8 = 0xAB;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("Corrupted escape sequence at offset {offset}: 0x54 followed by {byte:#04x}")]
    InvalidEscape { offset: usize, byte: u8 },
    #[error("Escape byte at offset {offset} is the last byte of the capture")]
    TruncatedEscape { offset: usize },
}

/// Reverse the link byte-stuffing.
pub fn unescape(input: &[u8]) -> Result<Vec<u8>, FramingError> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let b = input[i];
        if b != ESCAPE_BYTE {
            out.push(b);
            i += 1;
            continue;
        }

        match input.get(i + 1) {
            Some(&ESCAPE_BYTE)  => out.push(ESCAPE_BYTE),
            Some(&SYNC_REPLACE) => out.push(SYNC_BYTE),
            Some(&other)        => return Err(FramingError::InvalidEscape { offset: i, byte: other }),
            None                => return Err(FramingError::TruncatedEscape { offset: i }),
        }
        i += 2;
    }

    Ok(out)
}

/// Apply the link byte-stuffing.  Inverse of [`unescape`].
pub fn escape(input: &[u8]) -> Vec<u8> {
    let extra = input.iter().filter(|&&b| b == ESCAPE_BYTE || b == SYNC_BYTE).count();
    let mut out = Vec::with_capacity(input.len() + extra);
    for &b in input {
        match b {
            ESCAPE_BYTE => out.extend_from_slice(&[ESCAPE_BYTE, ESCAPE_BYTE]),
            SYNC_BYTE   => out.extend_from_slice(&[ESCAPE_BYTE, SYNC_REPLACE]),
            _           => out.push(b),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_bytes_pass_through() {
        assert_eq!(unescape(b"hello").unwrap(), b"hello");
        assert_eq!(unescape(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn double_escape_yields_escape_byte() {
        assert_eq!(unescape(&[0x54, 0x54]).unwrap(), vec![0x54]);
    }

    #[test]
    fn escape_marker_yields_sync_byte() {
        assert_eq!(unescape(&[0x54, 0x9F]).unwrap(), vec![0xAB]);
    }

    #[test]
    fn escapes_inside_data() {
        let wire = [0x01, 0x54, 0x54, 0x02, 0x54, 0x9F, 0x03];
        assert_eq!(unescape(&wire).unwrap(), vec![0x01, 0x54, 0x02, 0xAB, 0x03]);
    }

    #[test]
    fn unknown_escape_fails() {
        assert_eq!(
            unescape(&[0x54, 0x00]),
            Err(FramingError::InvalidEscape { offset: 0, byte: 0x00 })
        );
    }

    #[test]
    fn trailing_escape_fails_without_panicking() {
        assert_eq!(
            unescape(&[0x10, 0x20, 0x54]),
            Err(FramingError::TruncatedEscape { offset: 2 })
        );
        assert_eq!(unescape(&[0x54]), Err(FramingError::TruncatedEscape { offset: 0 }));
    }

    #[test]
    fn escape_never_emits_sync_byte() {
        let data: Vec<u8> = (0..=255u8).collect();
        let wire = escape(&data);
        assert!(!wire.contains(&SYNC_BYTE));
        assert_eq!(wire.len(), 258);
        assert_eq!(unescape(&wire).unwrap(), data);
    }
}
