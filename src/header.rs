use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::{self, Write};
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"SGEX";
pub const HEADER_SIZE: usize = 36;
pub const MD5_HASH_SIZE: usize = 16;
/// Usable filename bytes; the 12th byte of the field is a NUL terminator.
pub const MAX_FILENAME_LEN: usize = 11;

// Field offsets.  The device is a big-endian SH-2, so the size is BE.
// Byte 31 terminates the filename; it is written as zero and never read.
const MAGIC_RANGE:    std::ops::Range<usize> = 0..4;
const MD5_RANGE:      std::ops::Range<usize> = 4..20;
const FILENAME_RANGE: std::ops::Range<usize> = 20..31;
const SIZE_RANGE:     std::ops::Range<usize> = 32..36;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Decompressed transmission is {len} bytes, smaller than the {HEADER_SIZE}-byte header")]
    TooSmall { len: usize },
    #[error("Invalid magic bytes {found:02x?}, expected \"SGEX\"")]
    InvalidMagic { found: [u8; 4] },
    #[error("Received incorrect number of bytes. Expected {expected}, got {actual}")]
    LengthMismatch { expected: u64, actual: usize },
    #[error("Filename {name:?} is longer than {MAX_FILENAME_LEN} bytes")]
    FilenameTooLong { name: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The fixed 36-byte header that precedes the save data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionHeader {
    pub magic:          [u8; 4],
    pub md5_hash:       [u8; MD5_HASH_SIZE],
    pub save_filename:  String,
    pub save_file_size: u32,
}

impl TransmissionHeader {
    pub fn new(save_filename: &str, md5_hash: [u8; MD5_HASH_SIZE], save_file_size: u32) -> Result<Self, HeaderError> {
        if save_filename.len() > MAX_FILENAME_LEN {
            return Err(HeaderError::FilenameTooLong { name: save_filename.to_owned() });
        }
        Ok(Self {
            magic: *MAGIC,
            md5_hash,
            save_filename: save_filename.to_owned(),
            save_file_size,
        })
    }

    /// Parse and validate the header at the front of a whole decompressed
    /// transmission.  `buf` must be the complete buffer: the length check
    /// compares the declared size against it.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_SIZE {
            return Err(HeaderError::TooSmall { len: buf.len() });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[MAGIC_RANGE]);
        if &magic != MAGIC {
            return Err(HeaderError::InvalidMagic { found: magic });
        }

        let save_file_size = BigEndian::read_u32(&buf[SIZE_RANGE]);
        let expected = HEADER_SIZE as u64 + save_file_size as u64;
        if expected != buf.len() as u64 {
            return Err(HeaderError::LengthMismatch { expected, actual: buf.len() });
        }

        let mut md5_hash = [0u8; MD5_HASH_SIZE];
        md5_hash.copy_from_slice(&buf[MD5_RANGE]);

        Ok(Self {
            magic,
            md5_hash,
            save_filename: decode_filename(&buf[FILENAME_RANGE]),
            save_file_size,
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), HeaderError> {
        let name = self.save_filename.as_bytes();
        if name.len() > MAX_FILENAME_LEN {
            return Err(HeaderError::FilenameTooLong { name: self.save_filename.clone() });
        }
        let mut field = [0u8; MAX_FILENAME_LEN + 1];
        field[..name.len()].copy_from_slice(name);

        writer.write_all(&self.magic)?;
        writer.write_all(&self.md5_hash)?;
        writer.write_all(&field)?;
        writer.write_u32::<BigEndian>(self.save_file_size)?;
        Ok(())
    }

    pub fn md5_hex(&self) -> String {
        hex::encode(self.md5_hash)
    }
}

/// Bytes up to the first NUL, trailing whitespace dropped.  No other
/// cleaning: the name comes off the wire untrusted.
fn decode_filename(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim_end().to_owned()
}
