//! zlib stream handling.
//!
//! The device compresses the header and save data with zlib `compress()`,
//! so the FEC-corrected payload is a zlib-wrapped deflate stream: 2-byte
//! header, deflate blocks, Adler-32 trailer.  Decoding is all-or-nothing.

use std::io::Write;

use flate2::{Compression, Decompress, FlushDecompress, Status, write::ZlibEncoder};
use thiserror::Error;

/// Output growth step while inflating.
const INFLATE_STEP: usize = 32 * 1024;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Malformed zlib stream: {0}")]
    Malformed(String),
    #[error("zlib stream ended early after {consumed} of {len} input bytes")]
    Truncated { consumed: usize, len: usize },
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),
}

/// Inflate a complete zlib stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut z = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(INFLATE_STEP));

    loop {
        if out.len() == out.capacity() {
            out.reserve(INFLATE_STEP);
        }
        let (in_before, out_before) = (z.total_in(), z.total_out());
        let consumed = in_before as usize;

        let status = z
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| CompressionError::Malformed(e.to_string()))?;

        match status {
            Status::StreamEnd => break,
            _ if z.total_in() == in_before && z.total_out() == out_before => {
                return Err(CompressionError::Truncated { consumed, len: data.len() });
            }
            _ => {}
        }
    }

    let trailing = data.len() - z.total_in() as usize;
    if trailing > 0 {
        log::warn!("Ignoring {trailing} byte(s) after the end of the zlib stream");
    }
    Ok(out)
}

/// Compress with zlib framing, as the device does.
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, CompressionError> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    enc.write_all(data)?;
    Ok(enc.finish()?)
}
