//! Linear congruential generators modulo a power of two
//!
//! state' = (multiplier · state + addend) mod 2^modulus_bits

use num_bigint::BigInt;

use crate::error::{LatticeError, Result};

/// One LCG step, or a composition of several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lcg {
    pub multiplier: u64,
    pub addend: u64,
    pub modulus_bits: u32,
}

impl Lcg {
    /// `java.util.Random`
    pub const JAVA: Lcg = Lcg {
        multiplier: 0x5DEECE66D,
        addend: 0xB,
        modulus_bits: 48,
    };

    pub fn new(multiplier: u64, addend: u64, modulus_bits: u32) -> Result<Self> {
        if !(1..=64).contains(&modulus_bits) {
            return Err(LatticeError::Domain(format!(
                "modulus must be 2^1 to 2^64, got 2^{}",
                modulus_bits
            )));
        }
        let lcg = Self {
            multiplier,
            addend,
            modulus_bits,
        };
        Ok(Self {
            multiplier: multiplier & lcg.mask(),
            addend: addend & lcg.mask(),
            modulus_bits,
        })
    }

    /// 2^modulus_bits
    pub fn modulus(&self) -> BigInt {
        BigInt::from(1u8) << self.modulus_bits
    }

    pub fn mask(&self) -> u64 {
        if self.modulus_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.modulus_bits) - 1
        }
    }

    pub fn next(&self, state: u64) -> u64 {
        state
            .wrapping_mul(self.multiplier)
            .wrapping_add(self.addend)
            & self.mask()
    }

    /// The generator equivalent to `steps` applications of this one
    pub fn combine(&self, steps: u64) -> Lcg {
        let (mut multiplier, mut addend) = (1u64, 0u64);
        let (mut step_multiplier, mut step_addend) = (self.multiplier, self.addend);
        let mut remaining = steps;
        while remaining > 0 {
            if remaining & 1 == 1 {
                multiplier = multiplier.wrapping_mul(step_multiplier);
                addend = addend.wrapping_mul(step_multiplier).wrapping_add(step_addend);
            }
            step_addend = step_multiplier.wrapping_add(1).wrapping_mul(step_addend);
            step_multiplier = step_multiplier.wrapping_mul(step_multiplier);
            remaining >>= 1;
        }
        Lcg {
            multiplier: multiplier & self.mask(),
            addend: addend & self.mask(),
            modulus_bits: self.modulus_bits,
        }
    }

    /// State after `steps` calls starting from `state`
    pub fn skip(&self, state: u64, steps: u64) -> u64 {
        self.combine(steps).next(state)
    }

    /// Java's initial seed scrambling (also its inverse)
    pub fn scramble(&self, seed: u64) -> u64 {
        (seed ^ self.multiplier) & self.mask()
    }

    /// The top `bits` bits of `state`; zero bits read as 0
    pub fn top_bits(&self, state: u64, bits: u32) -> u64 {
        if bits == 0 {
            return 0;
        }
        (state & self.mask()) >> (self.modulus_bits - bits.min(self.modulus_bits))
    }

    /// Inverse of an odd `value` modulo 2^modulus_bits
    pub fn mod_inverse(&self, value: u64) -> Result<u64> {
        if value & 1 == 0 {
            return Err(LatticeError::Domain(format!(
                "{} is even and has no inverse modulo 2^{}",
                value, self.modulus_bits
            )));
        }
        // Newton iteration doubles the number of correct low bits each round
        let mut x = value;
        for _ in 0..6 {
            x = x.wrapping_mul(2u64.wrapping_sub(value.wrapping_mul(x)));
        }
        Ok(x & self.mask())
    }
}
