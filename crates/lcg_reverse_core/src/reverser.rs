//! Seed recovery from constraints on LCG states
//!
//! Observation i says that the state after `step_i` calls lies in
//! `[min_i, max_i]`. With state_i = a_i·seed + c_i (mod M), the vectors of
//! all states are the points `c + L` where the lattice L is generated by
//! `(a_1, ..., a_n)` and `M·e_1, ..., M·e_n`. The observations form a box,
//! so the candidate seeds are exactly the lattice points inside it. They are
//! found by reducing the generators with LLL and enumerating the box.

use log::{debug, info, warn};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::ToPrimitive;
use rayon::iter::ParallelIterator;

use crate::enumerate::{enumerate, Enumeration};
use crate::error::{LatticeError, Result};
use crate::lattice::{Lll, LllConfig};
use crate::lcg::Lcg;
use crate::matrix::{Matrix, MatrixLike};
use crate::optimize::OptimizeBuilder;
use crate::rational::Rational;
use crate::vector::{Vector, VectorLike};

/// The state after `step` calls lies in `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateRange {
    pub step: u64,
    pub min: u64,
    pub max: u64,
}

/// Configuration for [`RandomReverser`]
#[derive(Debug, Clone, Default)]
pub struct ReverserConfig {
    pub lll: LllConfig,
    /// Enumerate on the rayon thread pool
    pub parallel: bool,
}

/// Collects observations of one generator and recovers its seeds
#[derive(Debug, Clone)]
pub struct RandomReverser {
    lcg: Lcg,
    config: ReverserConfig,
    ranges: Vec<StateRange>,
}

impl RandomReverser {
    pub fn new(lcg: Lcg, config: ReverserConfig) -> Self {
        Self {
            lcg,
            config,
            ranges: Vec::new(),
        }
    }

    pub fn ranges(&self) -> &[StateRange] {
        &self.ranges
    }

    pub fn add_state_range(&mut self, step: u64, min: u64, max: u64) -> Result<()> {
        if min > max || max > self.lcg.mask() {
            return Err(LatticeError::Domain(format!(
                "state range [{}, {}] is empty or exceeds 2^{}",
                min, max, self.lcg.modulus_bits
            )));
        }
        self.ranges.push(StateRange { step, min, max });
        Ok(())
    }

    /// The top `bits` bits of the state after `step` calls equal `value`
    pub fn add_top_bits(&mut self, step: u64, bits: u32, value: u64) -> Result<()> {
        let width = self.lcg.modulus_bits;
        if bits == 0 || bits > width || (bits < 64 && value >> bits != 0) {
            return Err(LatticeError::Domain(format!(
                "{} does not fit in the top {} of {} state bits",
                value, bits, width
            )));
        }
        let free = width - bits;
        let min = value << free;
        let low_mask = if free == 0 { 0 } else { u64::MAX >> (64 - free) };
        self.add_state_range(step, min, min | low_mask)
    }

    /// All seeds consistent with every observation, sorted
    pub fn find_seeds(&self) -> Result<Vec<u64>> {
        let (enumeration, map) = self.search()?;
        let mut seeds: Vec<u64> = if self.config.parallel {
            enumeration.par().filter_map(|x| map.seed_or_warn(&x)).collect()
        } else {
            enumeration.filter_map(|x| map.seed_or_warn(&x)).collect()
        };
        seeds.sort_unstable();
        seeds.dedup();
        info!("found {} seed(s) for {} observation(s)", seeds.len(), self.ranges.len());
        Ok(seeds)
    }

    /// Lazily enumerated seeds, in search order
    pub fn seeds(&self) -> Result<Seeds> {
        let (enumeration, map) = self.search()?;
        Ok(Seeds { enumeration, map })
    }

    fn search(&self) -> Result<(Enumeration, SeedMap)> {
        if self.ranges.is_empty() {
            return Err(LatticeError::Domain("no observations to reverse".to_string()));
        }
        if self.lcg.multiplier & 1 == 0 {
            return Err(LatticeError::Domain(format!(
                "multiplier {:#x} is even, so states do not determine the seed",
                self.lcg.multiplier
            )));
        }

        let n = self.ranges.len();
        let modulus = Rational::from(self.lcg.modulus());
        let steps: Vec<Lcg> = self.ranges.iter().map(|r| self.lcg.combine(r.step)).collect();

        let mut generators = Vec::with_capacity(n + 1);
        generators.push(steps.iter().map(|s| Rational::from(s.multiplier)).collect::<Vector>());
        for i in 0..n {
            let mut row = Vector::zeros(n);
            row[i] = modulus.clone();
            generators.push(row);
        }
        let lattice = Matrix::from_rows(&generators)?;
        let reduced = Lll::reduce(&lattice, &self.config.lll)?;
        debug!(
            "reduced {} generators to a {}x{} basis ({} dependent)",
            n + 1,
            reduced.basis.row_count(),
            reduced.basis.col_count(),
            reduced.dependent_rows
        );

        let origin: Vector = steps.iter().map(|s| Rational::from(s.addend)).collect();
        let mut builder = OptimizeBuilder::of_size(n);
        for (i, range) in self.ranges.iter().enumerate() {
            builder = builder
                .with_lower_bound(i, Rational::from(range.min))
                .with_upper_bound(i, Rational::from(range.max));
        }
        let region = builder.build()?;
        let enumeration = enumerate(&reduced.basis, &origin, &region)?;

        let map = SeedMap {
            first_column: reduced.basis.column(0)?.to_vector(),
            inverse: self.lcg.mod_inverse(steps[0].multiplier)?,
            modulus: self.lcg.modulus(),
            mask: self.lcg.mask(),
        };
        Ok((enumeration, map))
    }
}

/// Maps enumerated lattice coordinates to the seed
#[derive(Debug, Clone)]
struct SeedMap {
    /// First coordinate of every basis vector
    first_column: Vector,
    /// a_1⁻¹ mod M
    inverse: u64,
    modulus: BigInt,
    mask: u64,
}

impl SeedMap {
    /// seed = (p_1 - c_1) · a_1⁻¹ mod M, where p_1 - c_1 is the first
    /// entry of Bᵗx
    fn seed(&self, coordinates: &Vector) -> Result<u64> {
        let scaled = self.first_column.dot(coordinates)?.to_integer().mod_floor(&self.modulus);
        let scaled = scaled
            .to_u64()
            .ok_or_else(|| LatticeError::Domain(format!("{} does not fit the state width", scaled)))?;
        Ok(scaled.wrapping_mul(self.inverse) & self.mask)
    }

    fn seed_or_warn(&self, coordinates: &Vector) -> Option<u64> {
        match self.seed(coordinates) {
            Ok(seed) => Some(seed),
            Err(e) => {
                warn!("skipping lattice point {}: {}", coordinates, e);
                None
            }
        }
    }
}

/// Seeds produced lazily by [`RandomReverser::seeds`]
#[derive(Debug)]
pub struct Seeds {
    enumeration: Enumeration,
    map: SeedMap,
}

impl Iterator for Seeds {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        for x in self.enumeration.by_ref() {
            if let Some(seed) = self.map.seed_or_warn(&x) {
                return Some(seed);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Lcg {
        Lcg::new(25173, 13849, 16).unwrap()
    }

    #[test]
    fn test_top_bits_range() {
        let mut reverser = RandomReverser::new(Lcg::JAVA, ReverserConfig::default());
        reverser.add_top_bits(1, 16, 0xABCD).unwrap();
        let range = reverser.ranges()[0];
        assert_eq!(range.min, 0xABCD_0000_0000);
        assert_eq!(range.max, 0xABCD_FFFF_FFFF);

        assert!(reverser.add_top_bits(1, 16, 0x1_0000).is_err());
        assert!(reverser.add_top_bits(1, 49, 0).is_err());
        assert!(reverser.add_state_range(1, 5, 4).is_err());
    }

    #[test]
    fn test_matches_brute_force() {
        let lcg = small();
        let secret = 0x3C5Au64;
        let mut reverser = RandomReverser::new(lcg, ReverserConfig::default());
        let mut observed = Vec::new();
        for step in [1u64, 2, 4] {
            let bits = lcg.top_bits(lcg.skip(secret, step), 4);
            reverser.add_top_bits(step, 4, bits).unwrap();
            observed.push((step, bits));
        }

        let expected: Vec<u64> = (0..=lcg.mask())
            .filter(|&seed| {
                observed
                    .iter()
                    .all(|&(step, bits)| lcg.top_bits(lcg.skip(seed, step), 4) == bits)
            })
            .collect();

        let found = reverser.find_seeds().unwrap();
        assert!(found.contains(&secret));
        assert_eq!(found, expected);

        let mut lazy: Vec<u64> = reverser.seeds().unwrap().collect();
        lazy.sort_unstable();
        assert_eq!(lazy, expected);
    }

    #[test]
    fn test_seed_itself_observed() {
        let lcg = small();
        let mut reverser = RandomReverser::new(lcg, ReverserConfig::default());
        reverser.add_state_range(0, 100, 103).unwrap();
        assert_eq!(reverser.find_seeds().unwrap(), vec![100, 101, 102, 103]);
    }

    #[test]
    fn test_requirements() {
        let reverser = RandomReverser::new(Lcg::JAVA, ReverserConfig::default());
        assert!(matches!(reverser.find_seeds(), Err(LatticeError::Domain(_))));

        let even = Lcg::new(6, 1, 16).unwrap();
        let mut reverser = RandomReverser::new(even, ReverserConfig::default());
        reverser.add_top_bits(1, 4, 3).unwrap();
        assert!(matches!(reverser.find_seeds(), Err(LatticeError::Domain(_))));
    }
}
