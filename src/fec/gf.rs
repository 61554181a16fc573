//! GF(2^8) arithmetic over the CCSDS conventional polynomial.
//!
//! Field: x^8 + x^7 + x^2 + x + 1 (0x187), generator element α = x (2).
//! Tables are built at compile time.

/// Primitive polynomial shared with the device encoder.
pub const PRIMITIVE_POLY: u16 = 0x187;

/// Multiplicative group order.
const ORDER: usize = 255;

pub struct GfTables {
    /// exp[i] = α^i, doubled so `log a + log b` never needs a reduction.
    exp: [u8; 2 * ORDER],
    /// log[x] = i where α^i = x.  log[0] is unused.
    log: [u8; 256],
}

impl GfTables {
    const fn build(poly: u16) -> Self {
        let mut exp = [0u8; 2 * ORDER];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        let mut i = 0;
        while i < ORDER {
            exp[i] = x as u8;
            exp[i + ORDER] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= poly;
            }
            i += 1;
        }
        Self { exp, log }
    }

    /// α^power, power taken modulo 255.
    #[inline]
    pub fn alpha_pow(&self, power: usize) -> u8 {
        self.exp[power % ORDER]
    }

    #[inline]
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    /// a / b.  Callers guarantee b != 0.
    #[inline]
    pub fn div(&self, a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "GF division by zero");
        if a == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + ORDER - self.log[b as usize] as usize]
    }

    /// Evaluate a polynomial stored highest degree first (codeword order).
    pub fn eval_high_first(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().fold(0u8, |acc, &c| self.mul(acc, x) ^ c)
    }

    /// Evaluate a polynomial stored lowest degree first (locator order).
    pub fn eval_low_first(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0u8, |acc, &c| self.mul(acc, x) ^ c)
    }
}

pub static GF: GfTables = GfTables::build(PRIMITIVE_POLY);
