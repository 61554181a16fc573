//! Systematic Reed–Solomon codec over GF(2^8).
//!
//! Codewords are stored highest degree first: `[data | parity]`, byte 0 is
//! the coefficient of x^(n-1).  A codeword shorter than 255 bytes is a
//! shortened code whose missing leading symbols are implicit zeros, which is
//! exactly what the device's encoder emits for the final chunk.
//!
//! Decoding is the textbook chain: syndromes, Berlekamp–Massey for the error
//! locator, Chien search for positions, Forney for magnitudes.

use super::gf::GF;
use super::{FecParams, FecError};

#[derive(Debug, Clone)]
pub struct ReedSolomon {
    params:    FecParams,
    /// Generator polynomial, highest degree first, monic.
    generator: Vec<u8>,
}

impl ReedSolomon {
    pub fn new(params: FecParams) -> Self {
        let generator = build_generator(&params);
        Self { params, generator }
    }

    pub fn params(&self) -> &FecParams {
        &self.params
    }

    /// Encode one data chunk (≤ `data_len()` bytes) into `chunk ‖ parity`.
    pub fn encode_block(&self, data: &[u8]) -> Result<Vec<u8>, FecError> {
        let nsym = self.params.parity;
        if data.len() > self.params.data_len() {
            return Err(FecError::BlockTooLong { len: data.len(), max: self.params.data_len() });
        }

        let mut remainder = vec![0u8; nsym];
        for &byte in data {
            let feedback = byte ^ remainder[0];
            remainder.rotate_left(1);
            remainder[nsym - 1] = 0;
            if feedback != 0 {
                for (r, &g) in remainder.iter_mut().zip(&self.generator[1..]) {
                    *r ^= GF.mul(feedback, g);
                }
            }
        }

        let mut codeword = Vec::with_capacity(data.len() + nsym);
        codeword.extend_from_slice(data);
        codeword.extend_from_slice(&remainder);
        Ok(codeword)
    }

    /// Correct one (possibly shortened) codeword in place.
    ///
    /// Returns the number of symbols corrected, or `None` if the block holds
    /// more errors than the code can locate.
    pub fn correct_block(&self, codeword: &mut [u8]) -> Option<usize> {
        let n = codeword.len();
        let t = self.params.correctable();

        let syndromes = self.syndromes(codeword);
        if syndromes.iter().all(|&s| s == 0) {
            return Some(0);
        }

        let (locator, degree) = berlekamp_massey(&syndromes);
        if degree == 0 || degree > t {
            return None;
        }

        // Chien search restricted to the symbols actually present.
        let mut positions = Vec::with_capacity(degree);
        for idx in 0..n {
            let power = n - 1 - idx;
            let x_inv = GF.alpha_pow(255 - power % 255);
            if GF.eval_low_first(&locator, x_inv) == 0 {
                positions.push(idx);
            }
        }
        if positions.len() != degree {
            return None;
        }

        let omega = error_evaluator(&syndromes, &locator);
        for &idx in &positions {
            let power = n - 1 - idx;
            let x_inv = GF.alpha_pow(255 - power % 255);

            // Formal derivative of the locator; only odd terms survive in GF(2^m).
            let mut derivative = 0u8;
            let mut k = 1;
            while k < locator.len() {
                derivative ^= GF.mul(locator[k], pow(x_inv, k - 1));
                k += 2;
            }
            if derivative == 0 {
                return None;
            }

            // e = X^(1-fcr) * Ω(X⁻¹) / Λ'(X⁻¹)
            let x_factor = GF.alpha_pow(
                ((power as i64) * (1 - self.params.fcr as i64)).rem_euclid(255) as usize,
            );
            let magnitude = GF.div(GF.mul(x_factor, GF.eval_low_first(&omega, x_inv)), derivative);
            codeword[idx] ^= magnitude;
        }

        if self.syndromes(codeword).iter().any(|&s| s != 0) {
            return None;
        }
        Some(positions.len())
    }

    fn syndromes(&self, codeword: &[u8]) -> Vec<u8> {
        (0..self.params.parity)
            .map(|j| {
                let root = GF.alpha_pow((self.params.fcr + j) * self.params.root_gap);
                GF.eval_high_first(codeword, root)
            })
            .collect()
    }
}

/// g(x) = Π (x - α^((fcr + i) * gap)) for i in 0..parity, highest degree first.
fn build_generator(params: &FecParams) -> Vec<u8> {
    let mut gen = vec![1u8];
    for i in 0..params.parity {
        let root = GF.alpha_pow((params.fcr + i) * params.root_gap);
        let mut next = vec![0u8; gen.len() + 1];
        for (j, &c) in gen.iter().enumerate() {
            next[j] ^= c;
            next[j + 1] ^= GF.mul(c, root);
        }
        gen = next;
    }
    gen
}

/// Returns the error locator Λ (lowest degree first, Λ0 = 1) and its
/// linear-complexity L.
fn berlekamp_massey(syndromes: &[u8]) -> (Vec<u8>, usize) {
    let nsym = syndromes.len();
    let mut c = vec![0u8; nsym + 1];
    let mut b = vec![0u8; nsym + 1];
    c[0] = 1;
    b[0] = 1;

    let mut l = 0usize;
    let mut m = 1usize;
    let mut prev_discrepancy = 1u8;

    for n in 0..nsym {
        let mut d = syndromes[n];
        for i in 1..=l {
            d ^= GF.mul(c[i], syndromes[n - i]);
        }

        if d == 0 {
            m += 1;
            continue;
        }

        let coeff = GF.div(d, prev_discrepancy);
        let snapshot = (2 * l <= n).then(|| c.clone());
        if m <= nsym {
            for i in 0..=nsym - m {
                c[i + m] ^= GF.mul(coeff, b[i]);
            }
        }

        match snapshot {
            Some(t) => {
                l = n + 1 - l;
                b = t;
                prev_discrepancy = d;
                m = 1;
            }
            None => m += 1,
        }
    }

    let degree = c.iter().rposition(|&x| x != 0).unwrap_or(0);
    c.truncate(degree + 1);
    // A locator whose degree disagrees with L cannot be trusted.
    let l = if degree == l { l } else { usize::MAX };
    (c, l)
}

/// Ω(x) = S(x)·Λ(x) mod x^nsym, lowest degree first.
fn error_evaluator(syndromes: &[u8], locator: &[u8]) -> Vec<u8> {
    let nsym = syndromes.len();
    let mut omega = vec![0u8; nsym];
    for (i, slot) in omega.iter_mut().enumerate() {
        for (j, &l) in locator.iter().enumerate().take(i + 1) {
            *slot ^= GF.mul(l, syndromes[i - j]);
        }
    }
    omega
}

fn pow(x: u8, e: usize) -> u8 {
    (0..e).fold(1u8, |acc, _| GF.mul(acc, x))
}
