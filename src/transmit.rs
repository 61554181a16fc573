//! Capture synthesizer: builds the byte stream the console puts on the wire.
//!
//! header + save → zlib → RS(255,223) → byte-stuffing.  The extractor never
//! needs this; it exists to generate realistic captures for tests, benches
//! and bench-top debugging of the receive chain.

use md5::{Digest, Md5};
use thiserror::Error;

use crate::codec::{self, CompressionError};
use crate::escape;
use crate::fec::{self, FecError, FecParams, ReedSolomon};
use crate::header::{HeaderError, TransmissionHeader, HEADER_SIZE, MD5_HASH_SIZE};

/// zlib level used by the device (`compress()` default).
pub const DEVICE_LEVEL: u32 = 6;

#[derive(Error, Debug)]
pub enum TransmitError {
    #[error("Save of {0} bytes does not fit the 32-bit size field")]
    TooLarge(usize),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    Fec(#[from] FecError),
}

/// The uncompressed transmission: 36-byte header followed by the save.
pub fn build_frame(filename: &str, save: &[u8]) -> Result<Vec<u8>, TransmitError> {
    let size = u32::try_from(save.len()).map_err(|_| TransmitError::TooLarge(save.len()))?;
    let mut md5_hash = [0u8; MD5_HASH_SIZE];
    md5_hash.copy_from_slice(&Md5::digest(save));
    let header = TransmissionHeader::new(filename, md5_hash, size)?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + save.len());
    header.write(&mut frame)?;
    frame.extend_from_slice(save);
    Ok(frame)
}

/// Compress, FEC-encode and escape an already built frame.
pub fn encode_frame(frame: &[u8]) -> Result<Vec<u8>, TransmitError> {
    let compressed = codec::deflate(frame, DEVICE_LEVEL)?;
    let rs = ReedSolomon::new(FecParams::SGEX);
    let protected = fec::encode(&rs, &compressed)?;
    Ok(escape::escape(&protected))
}

/// Full transmit path for one save.
pub fn encode_transmission(filename: &str, save: &[u8]) -> Result<Vec<u8>, TransmitError> {
    encode_frame(&build_frame(filename, save)?)
}
