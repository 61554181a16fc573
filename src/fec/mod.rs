//! Forward error correction for the SGEX link.
//!
//! The device Reed–Solomon encodes the compressed transmission in 223-byte
//! chunks, each followed by 32 parity bytes.  The final chunk is usually
//! short; its codeword is then `chunk_len + 32` bytes (a shortened code).
//! On the receive side the unescaped capture is therefore split every 255
//! bytes and each piece is corrected independently.
//!
//! The decoder sits behind [`FecDecoder`] so that any correct RS
//! implementation matching [`FecParams::SGEX`] can be dropped in.

pub mod gf;
pub mod reed_solomon;

pub use reed_solomon::ReedSolomon;

use thiserror::Error;

/// Reed–Solomon wire parameters.  These must match the encoder bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FecParams {
    /// Codeword length in symbols.
    pub codeword: usize,
    /// Parity symbols per codeword.
    pub parity:   usize,
    /// First consecutive root of the generator polynomial.
    pub fcr:      usize,
    /// Exponent step between generator roots.
    pub root_gap: usize,
}

impl FecParams {
    /// RS(255,223), fcr = 1, gap = 1 over GF(256)/0x187.
    pub const SGEX: FecParams = FecParams { codeword: 255, parity: 32, fcr: 1, root_gap: 1 };

    /// Data symbols carried by a full codeword.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.codeword - self.parity
    }

    /// Symbol errors correctable per codeword.
    #[inline]
    pub fn correctable(&self) -> usize {
        self.parity / 2
    }

    /// Size of the encoded stream for `data_len` input bytes.
    pub fn encoded_len(&self, data_len: usize) -> usize {
        data_len + data_len.div_ceil(self.data_len()) * self.parity
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FecError {
    #[error("Nothing to decode: the unescaped capture is empty")]
    Empty,
    #[error("Final block is {len} bytes, too short to hold {parity} parity bytes and any data")]
    TruncatedBlock { len: usize, parity: usize },
    #[error("Block {block} of {blocks} has too many errors to correct")]
    Uncorrectable { block: usize, blocks: usize },
    #[error("Data chunk of {len} bytes exceeds the {max}-byte codeword payload")]
    BlockTooLong { len: usize, max: usize },
}

/// Corrected payload plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecOutput {
    pub data:             Vec<u8>,
    /// Total symbols corrected across all blocks.  Diagnostic only.
    pub errors_corrected: usize,
    pub blocks:           usize,
}

/// Narrow seam for the FEC stage.
pub trait FecDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<FecOutput, FecError>;
}

impl FecDecoder for ReedSolomon {
    fn decode(&self, data: &[u8]) -> Result<FecOutput, FecError> {
        let params = *self.params();
        if data.is_empty() {
            return Err(FecError::Empty);
        }

        let blocks = data.len().div_ceil(params.codeword);
        let last_len = data.len() - (blocks - 1) * params.codeword;
        if last_len <= params.parity {
            return Err(FecError::TruncatedBlock { len: last_len, parity: params.parity });
        }

        let corrected = decode_blocks(self, data, blocks)?;

        let mut out = FecOutput {
            data:             Vec::with_capacity(data.len() - blocks * params.parity),
            errors_corrected: 0,
            blocks,
        };
        for (block, fixed) in corrected {
            out.errors_corrected += fixed;
            out.data.extend_from_slice(&block[..block.len() - params.parity]);
        }
        Ok(out)
    }
}

fn correct_one(
    rs:     &ReedSolomon,
    index:  usize,
    chunk:  &[u8],
    blocks: usize,
) -> Result<(Vec<u8>, usize), FecError> {
    let mut block = chunk.to_vec();
    match rs.correct_block(&mut block) {
        Some(fixed) => {
            if fixed > 0 {
                log::debug!("FEC block {index}: corrected {fixed} symbol(s)");
            }
            Ok((block, fixed))
        }
        None => {
            log::debug!("FEC block {index}: uncorrectable");
            Err(FecError::Uncorrectable { block: index, blocks })
        }
    }
}

// Blocks are independent; rayon is optional.
#[cfg(feature = "parallel")]
fn decode_blocks(
    rs:     &ReedSolomon,
    data:   &[u8],
    blocks: usize,
) -> Result<Vec<(Vec<u8>, usize)>, FecError> {
    use rayon::prelude::*;

    let results: Vec<Result<(Vec<u8>, usize), FecError>> = data
        .par_chunks(rs.params().codeword)
        .enumerate()
        .map(|(i, chunk)| correct_one(rs, i, chunk, blocks))
        .collect();

    // Report the first failing block, same as the sequential path.
    results.into_iter().collect()
}

#[cfg(not(feature = "parallel"))]
fn decode_blocks(
    rs:     &ReedSolomon,
    data:   &[u8],
    blocks: usize,
) -> Result<Vec<(Vec<u8>, usize)>, FecError> {
    data.chunks(rs.params().codeword)
        .enumerate()
        .map(|(i, chunk)| correct_one(rs, i, chunk, blocks))
        .collect()
}

/// Encode `data` the way the device does: 223-byte chunks, each followed by
/// 32 parity bytes, last chunk shortened.
pub fn encode(rs: &ReedSolomon, data: &[u8]) -> Result<Vec<u8>, FecError> {
    let params = rs.params();
    let mut out = Vec::with_capacity(params.encoded_len(data.len()));
    for chunk in data.chunks(params.data_len()) {
        out.extend(rs.encode_block(chunk)?);
    }
    Ok(out)
}
