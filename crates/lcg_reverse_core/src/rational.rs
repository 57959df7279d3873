//! Exact rational number type
//!
//! An arbitrary-precision rational backed by `BigInt` numerator and denominator.
//! Values are always kept in canonical form: the denominator is positive, zero
//! is stored as `0/1`, and numerator and denominator are coprime. Equality and
//! hashing are therefore structural.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::{LatticeError, Result};

/// Exact rational number (numerator / denominator)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

impl Rational {
    /// Create a new rational number from numerator and denominator
    ///
    /// Fails with [`LatticeError::DivideByZero`] if the denominator is zero.
    pub fn new<N: Into<BigInt>, D: Into<BigInt>>(num: N, den: D) -> Result<Self> {
        let den = den.into();
        if den.is_zero() {
            return Err(LatticeError::DivideByZero);
        }
        Ok(Self::from_parts(num.into(), den))
    }

    /// Builds a canonical value; `den` must be nonzero.
    fn from_parts(num: BigInt, den: BigInt) -> Self {
        debug_assert!(!den.is_zero());
        let mut r = Self {
            numerator: num,
            denominator: den,
        };
        r.reduce();
        r
    }

    /// Create a rational from an integer
    pub fn from_int<T: Into<BigInt>>(n: T) -> Self {
        Self {
            numerator: n.into(),
            denominator: BigInt::one(),
        }
    }

    pub fn zero() -> Self {
        Self::from_int(0)
    }

    pub fn one() -> Self {
        Self::from_int(1)
    }

    /// One half, the rounding threshold used throughout LLL.
    pub fn half() -> Self {
        Self {
            numerator: BigInt::one(),
            denominator: BigInt::from(2),
        }
    }

    pub fn numer(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denom(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.numerator.is_one() && self.denominator.is_one()
    }

    pub fn is_integer(&self) -> bool {
        self.denominator.is_one()
    }

    pub fn is_positive(&self) -> bool {
        self.numerator.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    /// -1, 0 or 1 according to the sign of the value
    pub fn signum(&self) -> i32 {
        if self.numerator.is_positive() {
            1
        } else if self.numerator.is_negative() {
            -1
        } else {
            0
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator.clone(),
        }
    }

    /// Reduce to lowest terms
    fn reduce(&mut self) {
        if self.numerator.is_zero() {
            self.denominator = BigInt::one();
            return;
        }
        if self.denominator.is_negative() {
            self.numerator = -&self.numerator;
            self.denominator = -&self.denominator;
        }
        let g = self.numerator.gcd(&self.denominator);
        if !g.is_one() {
            self.numerator = &self.numerator / &g;
            self.denominator = &self.denominator / &g;
        }
    }

    /// Division that reports a zero divisor instead of panicking
    pub fn checked_div(&self, other: &Rational) -> Result<Rational> {
        if other.is_zero() {
            return Err(LatticeError::DivideByZero);
        }
        Ok(Self::from_parts(
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        ))
    }

    /// Multiplicative inverse
    pub fn recip(&self) -> Result<Rational> {
        if self.is_zero() {
            return Err(LatticeError::DivideByZero);
        }
        Ok(Self::from_parts(self.denominator.clone(), self.numerator.clone()))
    }

    /// Largest integer not greater than `self`
    pub fn floor(&self) -> BigInt {
        self.numerator.div_floor(&self.denominator)
    }

    /// Smallest integer not less than `self`
    pub fn ceil(&self) -> BigInt {
        -((-&self.numerator).div_floor(&self.denominator))
    }

    /// Nearest integer, halfway cases rounded towards +∞
    ///
    /// round(μ) = floor(μ + 1/2) = floor((2*num + den) / (2*den))
    pub fn round(&self) -> BigInt {
        let two_num: BigInt = &self.numerator * 2;
        let two_den: BigInt = &self.denominator * 2;
        (two_num + &self.denominator).div_floor(&two_den)
    }

    pub fn to_integer(&self) -> BigInt {
        self.floor()
    }

    pub fn square(&self) -> Rational {
        Self {
            numerator: &self.numerator * &self.numerator,
            denominator: &self.denominator * &self.denominator,
        }
    }

    /// Nearest `f64` (lossy, for reporting only)
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        // Scale the quotient to carry 64 significant bits before converting.
        let shift = 64 - (self.numerator.bits() as i64 - self.denominator.bits() as i64);
        let scaled = if shift >= 0 {
            (&self.numerator << shift as usize) / &self.denominator
        } else {
            &self.numerator / (&self.denominator << (-shift) as usize)
        };
        scaled.to_f64().unwrap_or(f64::NAN) * 2f64.powi(-(shift as i32))
    }

    /// Fixed-precision decimal expansion, truncated towards zero
    pub fn to_decimal_string(&self, digits: usize) -> String {
        let negative = self.is_negative();
        let num = self.numerator.abs();
        let (int_part, mut rem) = num.div_rem(&self.denominator);
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&int_part.to_string());
        if digits > 0 {
            out.push('.');
            for _ in 0..digits {
                rem *= 10u32;
                let (digit, next) = rem.div_rem(&self.denominator);
                out.push_str(&digit.to_string());
                rem = next;
            }
        }
        out
    }

    /// Natural logarithm by series expansion with the given number of terms
    ///
    /// The argument is divided by powers of ten until it lies in `(0, 2]`, the
    /// interval on which the series converges; `ln 10` is rebuilt from
    /// `ln 2` and `ln 5/4`. Non-positive arguments fail with
    /// [`LatticeError::Domain`].
    pub fn ln(&self, terms: usize) -> Result<Rational> {
        if !self.is_positive() {
            return Err(LatticeError::Domain(format!("ln of non-positive value {}", self)));
        }
        let two = Rational::from_int(2);
        let ten = Rational::from_int(10);
        let mut x = self.clone();
        let mut tens = 0i64;
        while x > two {
            x = &x / &ten;
            tens += 1;
        }
        let mut result = ln_series(&x, terms)?;
        if tens > 0 {
            let ln2 = -ln_series(&Rational::half(), terms)?;
            let ln_five_quarters = ln_series(&Rational::from_parts(5.into(), 4.into()), terms)?;
            let ln10 = &(&ln2 * &Rational::from_int(3)) + &ln_five_quarters;
            result += &(&ln10 * &Rational::from_int(tens));
        }
        Ok(result)
    }
}

/// ln(x) = 2 Σ_{k≥0} z^(2k+1) / (2k+1) with z = (x-1)/(x+1), for x in (0, 2]
fn ln_series(x: &Rational, terms: usize) -> Result<Rational> {
    if !x.is_positive() || *x > Rational::from_int(2) {
        return Err(LatticeError::Domain(format!("ln series argument {} not in (0, 2]", x)));
    }
    let one = Rational::one();
    let z = &(x - &one) / &(x + &one);
    let z_sq = z.square();
    let mut power = z;
    let mut sum = Rational::zero();
    for k in 0..terms {
        sum += &Rational::from_parts(power.numerator.clone(), &power.denominator * (2 * k + 1));
        power = &power * &z_sq;
    }
    Ok(&sum * &Rational::from_int(2))
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator.is_one() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rational {
    type Err = LatticeError;

    /// Parses `n` or `n/d`
    fn from_str(s: &str) -> Result<Self> {
        let parse_int = |part: &str, offset: usize| -> Result<BigInt> {
            part.trim().parse::<BigInt>().map_err(|e| LatticeError::Parse {
                position: offset,
                message: format!("invalid integer '{}': {}", part.trim(), e),
            })
        };
        match s.find('/') {
            Some(slash) => {
                let num = parse_int(&s[..slash], 0)?;
                let den = parse_int(&s[slash + 1..], slash + 1)?;
                Rational::new(num, den)
            }
            None => Ok(Rational::from_int(parse_int(s, 0)?)),
        }
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Self::from_int(n)
    }
}

impl From<u64> for Rational {
    fn from(n: u64) -> Self {
        Self::from_int(n)
    }
}

impl From<BigInt> for Rational {
    fn from(n: BigInt) -> Self {
        Self::from_int(n)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.denominator == other.denominator {
            return self.numerator.cmp(&other.numerator);
        }
        // a/b ? c/d  ⟺  a*d ? c*b  (b, d > 0)
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

impl Add for &Rational {
    type Output = Rational;

    fn add(self, other: Self) -> Rational {
        if self.denominator == other.denominator {
            return Rational::from_parts(&self.numerator + &other.numerator, self.denominator.clone());
        }
        let num = &self.numerator * &other.denominator + &other.numerator * &self.denominator;
        let den = &self.denominator * &other.denominator;
        Rational::from_parts(num, den)
    }
}

impl Sub for &Rational {
    type Output = Rational;

    fn sub(self, other: Self) -> Rational {
        if self.denominator == other.denominator {
            return Rational::from_parts(&self.numerator - &other.numerator, self.denominator.clone());
        }
        let num = &self.numerator * &other.denominator - &other.numerator * &self.denominator;
        let den = &self.denominator * &other.denominator;
        Rational::from_parts(num, den)
    }
}

impl Mul for &Rational {
    type Output = Rational;

    fn mul(self, other: Self) -> Rational {
        if self.is_zero() || other.is_zero() {
            return Rational::zero();
        }
        let num = &self.numerator * &other.numerator;
        let den = &self.denominator * &other.denominator;
        Rational::from_parts(num, den)
    }
}

impl Div for &Rational {
    type Output = Rational;

    /// Panics on a zero divisor; see [`Rational::checked_div`].
    fn div(self, other: Self) -> Rational {
        match self.checked_div(other) {
            Ok(q) => q,
            Err(_) => panic!("attempt to divide {} by zero", self),
        }
    }
}

macro_rules! forward_owned_binop {
    ($($imp:ident, $method:ident);*) => {$(
        impl $imp for Rational {
            type Output = Rational;

            fn $method(self, other: Rational) -> Rational {
                (&self).$method(&other)
            }
        }

        impl<'a> $imp<&'a Rational> for Rational {
            type Output = Rational;

            fn $method(self, other: &'a Rational) -> Rational {
                (&self).$method(other)
            }
        }
    )*};
}

forward_owned_binop!(Add, add; Sub, sub; Mul, mul; Div, div);

impl AddAssign<&Rational> for Rational {
    fn add_assign(&mut self, other: &Rational) {
        *self = &*self + other;
    }
}

impl SubAssign<&Rational> for Rational {
    fn sub_assign(&mut self, other: &Rational) {
        *self = &*self - other;
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl Neg for &Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            numerator: -&self.numerator,
            denominator: self.denominator.clone(),
        }
    }
}
