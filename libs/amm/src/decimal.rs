//! Arbitrary-precision decimal arithmetic with explicit rounding contexts
//!
//! ## Purpose
//!
//! Square-root prices live between 2^-64 and 2^64 and must carry 32
//! significant digits, which is beyond what fixed-width decimal types hold.
//! [`Decimal`] is a big-integer coefficient scaled by a power of ten. Every
//! arithmetic step goes through a [`Context`] that fixes the precision and
//! the rounding direction, so each formula states exactly which way it
//! rounds.
//!
//! ## Semantics
//!
//! - Operands are exact; only the result of an operation is rounded.
//! - `Down` truncates toward zero, `Up` rounds away from zero, `HalfUp`
//!   rounds to nearest with ties away from zero.
//! - Exact quotients and square roots drop trailing zeros back to their
//!   ideal exponent, so `1 / 2` is `0.5`, not `0.50000000000000000000000000000000`.
//! - Comparison is numeric: `0.5` and `0.50` are equal.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AmmError, Result};

/// Significant digits kept by every engine context
pub const PRECISION: u32 = 32;

/// Largest exponent magnitude accepted when parsing text
const MAX_PARSED_EXPONENT: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero
    Down,
    /// Away from zero
    Up,
    /// Nearest, ties away from zero
    HalfUp,
}

/// Precision and rounding mode applied to an arithmetic result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub precision: u32,
    pub rounding: Rounding,
}

/// Truncating context used by every "round down" step
pub const ROUND_DOWN: Context = Context::new(PRECISION, Rounding::Down);

/// Away-from-zero context used by every "round up" step
pub const ROUND_UP: Context = Context::new(PRECISION, Rounding::Up);

/// Half-up context for display prices and square roots of user input
pub const BASE: Context = Context::new(PRECISION, Rounding::HalfUp);

/// Decimal number `coeff * 10^exp`
#[derive(Clone)]
pub struct Decimal {
    coeff: BigInt,
    exp: i64,
}

impl Context {
    pub const fn new(precision: u32, rounding: Rounding) -> Self {
        Self { precision, rounding }
    }

    pub fn add(&self, a: &Decimal, b: &Decimal) -> Decimal {
        let exp = a.exp.min(b.exp);
        let sum = a.aligned(exp) + b.aligned(exp);
        self.round(sum.sign(), sum.magnitude().clone(), exp, false).0
    }

    pub fn sub(&self, a: &Decimal, b: &Decimal) -> Decimal {
        self.add(a, &b.negated())
    }

    pub fn mul(&self, a: &Decimal, b: &Decimal) -> Decimal {
        let product = &a.coeff * &b.coeff;
        self.round(product.sign(), product.magnitude().clone(), a.exp + b.exp, false).0
    }

    pub fn quo(&self, a: &Decimal, b: &Decimal) -> Result<Decimal> {
        if b.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        let ideal = a.exp - b.exp;
        if a.is_zero() {
            return Ok(Decimal { coeff: BigInt::zero(), exp: ideal });
        }

        let dividend = a.coeff.magnitude();
        let divisor = b.coeff.magnitude();
        // Scale so the integer quotient carries at least precision + 1 digits
        let shift = (u64::from(self.precision) + 1 + digit_count(divisor))
            .saturating_sub(digit_count(dividend));
        let scaled = dividend * pow10(shift);
        let quotient = &scaled / divisor;
        let remainder = &scaled % divisor;

        let sign = if a.coeff.sign() == b.coeff.sign() { Sign::Plus } else { Sign::Minus };
        let (result, inexact) =
            self.round(sign, quotient, ideal - shift as i64, !remainder.is_zero());
        Ok(if inexact { result } else { result.reduced_toward(ideal) })
    }

    pub fn sqrt(&self, a: &Decimal) -> Result<Decimal> {
        if a.is_negative() {
            return Err(AmmError::InvalidNumber);
        }
        let ideal = a.exp.div_euclid(2);
        if a.is_zero() {
            return Ok(Decimal { coeff: BigInt::zero(), exp: ideal });
        }

        let mut radicand = a.coeff.magnitude().clone();
        let mut exp = a.exp;
        if exp.rem_euclid(2) != 0 {
            radicand *= 10u32;
            exp -= 1;
        }
        // isqrt of an n-digit integer has ceil(n / 2) digits
        let half_digits = (digit_count(&radicand) + 1) / 2;
        let shift = (u64::from(self.precision) + 2).saturating_sub(half_digits);
        let scaled = radicand * pow10(2 * shift);
        let root = scaled.sqrt();
        let exact = &root * &root == scaled;

        let (result, inexact) = self.round(Sign::Plus, root, exp / 2 - shift as i64, !exact);
        Ok(if inexact { result } else { result.reduced_toward(ideal) })
    }

    /// Round `magnitude * 10^exp` to the context precision. `sticky` marks
    /// discarded non-zero digits below the magnitude.
    fn round(&self, sign: Sign, magnitude: BigUint, exp: i64, sticky: bool) -> (Decimal, bool) {
        let precision = u64::from(self.precision);
        let excess = digit_count(&magnitude).saturating_sub(precision);
        let divisor = pow10(excess);
        let mut kept = &magnitude / &divisor;
        let dropped = &magnitude % &divisor;
        let inexact = sticky || !dropped.is_zero();

        let bump = match self.rounding {
            Rounding::Down => false,
            Rounding::Up => inexact,
            Rounding::HalfUp => {
                let twice = &dropped * 2u32;
                twice >= divisor
            }
        };

        let mut exp = exp + excess as i64;
        if bump {
            kept += 1u32;
            if digit_count(&kept) > precision {
                kept /= 10u32;
                exp += 1;
            }
        }
        (Decimal { coeff: BigInt::from_biguint(sign, kept), exp }, inexact)
    }
}

impl Decimal {
    /// Build `coeff * 10^exp`
    pub fn new(coeff: impl Into<BigInt>, exp: i64) -> Self {
        Self { coeff: coeff.into(), exp }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn one() -> Self {
        Self::new(1, 0)
    }

    pub fn from_integer(value: &BigInt) -> Self {
        Self { coeff: value.clone(), exp: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.coeff.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.coeff.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.coeff.is_positive()
    }

    pub fn exponent(&self) -> i64 {
        self.exp
    }

    pub fn coefficient(&self) -> &BigInt {
        &self.coeff
    }

    pub fn negated(&self) -> Self {
        Self { coeff: -&self.coeff, exp: self.exp }
    }

    /// Integer part, plus one when `round_up` and a fraction was dropped.
    /// Negative values are rejected.
    pub fn to_integer(&self, round_up: bool) -> Result<BigInt> {
        if self.is_negative() {
            return Err(AmmError::NotImplemented);
        }
        if self.exp >= 0 {
            return Ok(&self.coeff * BigInt::from_biguint(Sign::Plus, pow10(self.exp as u64)));
        }
        let divisor = BigInt::from_biguint(Sign::Plus, pow10(self.exp.unsigned_abs()));
        let truncated = &self.coeff / &divisor;
        if round_up && !(&self.coeff % &divisor).is_zero() {
            Ok(truncated + 1)
        } else {
            Ok(truncated)
        }
    }

    /// Fixed-point rendering with no exponent, used for hashing and the wire
    pub fn to_plain_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let digits = self.coeff.magnitude().to_str_radix(10);
        if self.exp >= 0 {
            if self.is_zero() {
                return "0".to_string();
            }
            return format!("{sign}{digits}{}", "0".repeat(self.exp as usize));
        }

        let scale = self.exp.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            format!("{sign}{int_part}.{frac_part}")
        } else {
            format!("{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }

    fn aligned(&self, exp: i64) -> BigInt {
        let shift = (self.exp - exp) as u64;
        if shift == 0 {
            self.coeff.clone()
        } else {
            &self.coeff * BigInt::from_biguint(Sign::Plus, pow10(shift))
        }
    }

    fn reduced_toward(mut self, ideal: i64) -> Self {
        let mut magnitude = self.coeff.magnitude().clone();
        let sign = self.coeff.sign();
        while self.exp < ideal && !magnitude.is_zero() && (&magnitude % 10u32).is_zero() {
            magnitude /= 10u32;
            self.exp += 1;
        }
        self.coeff = BigInt::from_biguint(sign, magnitude);
        self
    }
}

fn pow10(n: u64) -> BigUint {
    BigUint::from(10u32).pow(n as u32)
}

fn digit_count(n: &BigUint) -> u64 {
    if n.is_zero() {
        1
    } else {
        n.to_str_radix(10).len() as u64
    }
}

impl FromStr for Decimal {
    type Err = AmmError;

    /// Accepts `[+-]digits[.digits][(e|E)[+-]digits]`
    fn from_str(s: &str) -> Result<Self> {
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
            None => (body, None),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmmError::InvalidNumber);
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(AmmError::InvalidNumber);
        }

        let mut exp: i64 = match exponent {
            Some(text) => {
                let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
                if unsigned.is_empty() || !all_digits(unsigned) {
                    return Err(AmmError::InvalidNumber);
                }
                text.parse().map_err(|_| AmmError::InvalidNumber)?
            }
            None => 0,
        };
        if exp.abs() > MAX_PARSED_EXPONENT {
            return Err(AmmError::InvalidNumber);
        }
        exp -= frac_part.len() as i64;

        let digits = format!("{int_part}{frac_part}");
        let magnitude =
            BigUint::parse_bytes(digits.as_bytes(), 10).ok_or(AmmError::InvalidNumber)?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(Self { coeff: BigInt::from_biguint(sign, magnitude), exp })
    }
}

impl fmt::Display for Decimal {
    /// Scientific form: plain notation unless the exponent is positive or
    /// the value is smaller than 1E-6.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.coeff.magnitude().to_str_radix(10);
        let adjusted = self.exp + digits.len() as i64 - 1;
        if self.exp <= 0 && adjusted >= -6 {
            return f.write_str(&self.to_plain_string());
        }

        if self.is_negative() {
            f.write_str("-")?;
        }
        let (lead, rest) = digits.split_at(1);
        f.write_str(lead)?;
        if !rest.is_empty() {
            write!(f, ".{rest}")?;
        }
        let exp_sign = if adjusted >= 0 { "+" } else { "-" };
        write!(f, "E{exp_sign}{}", adjusted.unsigned_abs())
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.coeff.sign(), other.coeff.sign()) {
            (a, b) if a != b => return sign_rank(a).cmp(&sign_rank(b)),
            (Sign::NoSign, _) => return Ordering::Equal,
            _ => {}
        }
        let exp = self.exp.min(other.exp);
        self.aligned(exp).cmp(&other.aligned(exp))
    }
}

fn sign_rank(sign: Sign) -> i8 {
    match sign {
        Sign::Minus => -1,
        Sign::NoSign => 0,
        Sign::Plus => 1,
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(value, 0)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_plain_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
