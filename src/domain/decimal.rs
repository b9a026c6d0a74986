//! Arbitrary-precision decimal arithmetic for the LMSR calculator.
//!
//! `BigDecimal` is an unbounded integer mantissa with a base-10 scale
//! (`value = digits * 10^-scale`). Arithmetic that cannot be exact
//! (division, `exp`, `ln`) takes an explicit target scale and truncates
//! toward zero; callers carry guard digits.
//!
//! `MathContext` holds the significant-digit budget. It is an explicit
//! value owned by each calculator: there is no process-wide numeric
//! configuration, so callers with different precision needs coexist.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use serde::{Serialize, Serializer};

use super::error::LmsrError;

/// Largest argument accepted by [`BigDecimal::exp_at`].
const MAX_EXP_ARGUMENT: f64 = 4096.0;

/// Largest decimal exponent accepted when parsing (`1e10000`).
const MAX_PARSE_EXPONENT: i64 = 10_000;

/// Halley iterations before `ln` gives up.
const MAX_LN_ITERATIONS: usize = 12;

/// `10^exponent` as a big integer.
pub(crate) fn pow10(exponent: u64) -> BigInt {
    let exponent = u32::try_from(exponent).unwrap_or(u32::MAX);
    BigInt::from(10u8).pow(exponent)
}

/// Number of decimal digits in `|value|` (zero has one digit).
pub(crate) fn decimal_digits(value: &BigInt) -> u32 {
    u32::try_from(value.magnitude().to_string().len()).unwrap_or(u32::MAX)
}

/// Rounding applied when a value loses fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero.
    Down,
    /// Toward negative infinity.
    Floor,
    /// Toward positive infinity.
    Ceiling,
    /// To nearest, ties away from zero.
    HalfUp,
}

/// Arbitrary-precision signed decimal number.
#[derive(Debug, Clone)]
pub struct BigDecimal {
    digits: BigInt,
    scale: i64,
}

impl BigDecimal {
    /// Creates `digits * 10^-scale`.
    pub fn new(digits: impl Into<BigInt>, scale: i64) -> Self {
        Self {
            digits: digits.into(),
            scale,
        }
    }

    pub fn zero() -> Self {
        Self::new(BigInt::zero(), 0)
    }

    pub fn one() -> Self {
        Self::new(BigInt::one(), 0)
    }

    /// The unscaled mantissa.
    pub fn digits(&self) -> &BigInt {
        &self.digits
    }

    /// Base-10 scale: number of digits after the decimal point.
    pub fn scale(&self) -> i64 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.digits.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.digits.is_positive()
    }

    /// True when the value has no fractional part.
    pub fn is_integer(&self) -> bool {
        self.scale <= 0 || (&self.digits % pow10(self.scale.unsigned_abs())).is_zero()
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        Self::new(self.digits.abs(), self.scale)
    }

    /// Re-expresses the value at `scale`, rounding when digits are dropped.
    #[must_use]
    pub fn rescale(&self, scale: i64, rounding: Rounding) -> Self {
        match scale.cmp(&self.scale) {
            Ordering::Equal => self.clone(),
            Ordering::Greater => {
                let factor = pow10((scale - self.scale).unsigned_abs());
                Self::new(&self.digits * factor, scale)
            }
            Ordering::Less => {
                let divisor = pow10((self.scale - scale).unsigned_abs());
                let (quotient, remainder) = self.digits.div_rem(&divisor);
                let adjust = match rounding {
                    Rounding::Down => 0,
                    Rounding::Floor if remainder.is_negative() => -1,
                    Rounding::Ceiling if remainder.is_positive() => 1,
                    Rounding::HalfUp if remainder.abs() * BigInt::from(2u8) >= divisor => {
                        if remainder.is_negative() { -1 } else { 1 }
                    }
                    _ => 0,
                };
                Self::new(quotient + BigInt::from(adjust), scale)
            }
        }
    }

    /// Largest integer not greater than the value.
    pub fn floor(&self) -> BigInt {
        self.rescale(0, Rounding::Floor).digits
    }

    /// Smallest integer not less than the value.
    pub fn ceil(&self) -> BigInt {
        self.rescale(0, Rounding::Ceiling).digits
    }

    /// The value as an integer, if it has no fractional part.
    pub fn to_bigint(&self) -> Option<BigInt> {
        self.is_integer().then(|| self.rescale(0, Rounding::Down).digits)
    }

    /// Strips trailing fractional zeros; integers end up with scale 0.
    #[must_use]
    pub fn normalized(&self) -> Self {
        if self.digits.is_zero() {
            return Self::zero();
        }
        let ten = BigInt::from(10u8);
        let mut digits = self.digits.clone();
        let mut scale = self.scale;
        while scale > 0 {
            let (quotient, remainder) = digits.div_rem(&ten);
            if !remainder.is_zero() {
                break;
            }
            digits = quotient;
            scale -= 1;
        }
        Self::new(digits, scale)
    }

    /// Rounds half-up to at most `significant` digits of mantissa.
    #[must_use]
    pub fn round_significant(&self, significant: u32) -> Self {
        let present = decimal_digits(&self.digits);
        if present <= significant {
            return self.clone();
        }
        let drop = i64::from(present - significant);
        self.rescale(self.scale - drop, Rounding::HalfUp)
    }

    /// Product truncated to `scale`.
    #[must_use]
    pub fn mul_scaled(&self, rhs: &Self, scale: i64) -> Self {
        Self::new(&self.digits * &rhs.digits, self.scale + rhs.scale).rescale(scale, Rounding::Down)
    }

    /// Quotient truncated to `scale`; `None` when dividing by zero.
    pub fn div_scaled(&self, rhs: &Self, scale: i64) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        // digits / 10^scale = (a / 10^sa) / (b / 10^sb)
        let shift = scale + rhs.scale - self.scale;
        let quotient = if shift >= 0 {
            (&self.digits * pow10(shift.unsigned_abs())) / &rhs.digits
        } else {
            &self.digits / (&rhs.digits * pow10(shift.unsigned_abs()))
        };
        Some(Self::new(quotient, scale))
    }

    /// Lossy conversion used for range checks and initial estimates.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Shortest round-trip decimal form of a finite `f64`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        format!("{value:e}").parse().ok()
    }

    /// `e^self` truncated to `scale`.
    ///
    /// Results below `10^-scale` underflow to zero. Returns `None` for
    /// arguments above 4096.
    pub fn exp_at(&self, scale: i64) -> Option<Self> {
        if self.is_zero() {
            return Some(Self::one());
        }
        let approx = self.to_f64();
        if approx.is_nan() || approx > MAX_EXP_ARGUMENT {
            return None;
        }
        if approx < -((scale + 2) as f64) * std::f64::consts::LN_10 {
            return Some(Self::zero());
        }

        // e^x = (e^(x / 2^k))^(2^k), with |x / 2^k| < 2^-8 for a fast series.
        let magnitude = approx.abs().ceil() as u64;
        let halvings = (u64::BITS - magnitude.leading_zeros()) + 8;
        let guard = i64::from(halvings) * 3 / 10 + 10;
        let work = scale + guard;

        let reduced = Self::new(
            self.rescale(work, Rounding::Down).digits / (BigInt::one() << halvings as usize),
            work,
        );

        let mut sum = Self::one().rescale(work, Rounding::Down);
        let mut term = sum.clone();
        let mut n = 1u64;
        loop {
            let next = term.mul_scaled(&reduced, work);
            term = Self::new(next.digits / BigInt::from(n), work);
            if term.is_zero() {
                break;
            }
            sum = &sum + &term;
            n += 1;
        }

        for _ in 0..halvings {
            sum = sum.mul_scaled(&sum, work);
        }
        Some(sum.rescale(scale, Rounding::Down))
    }

    /// Natural logarithm truncated to `scale`.
    ///
    /// Refines an `f64` estimate with Halley's iteration on `e^y = x`,
    /// which triples the correct digits per step. `None` for `x <= 0`
    /// or when the iteration fails to settle.
    pub fn ln_at(&self, scale: i64) -> Option<Self> {
        if !self.is_positive() {
            return None;
        }
        if *self == Self::one() {
            return Some(Self::zero());
        }

        let estimate = ln_estimate(self);
        // Tiny arguments need absolute resolution below their own size.
        let leading_zeros = (-estimate / std::f64::consts::LN_10).max(0.0).ceil() as i64;
        let work = scale + 10 + leading_zeros;
        let threshold = Self::new(1, work / 3 + 2);

        let mut y = Self::from_f64(estimate)?.rescale(work, Rounding::Down);
        for _ in 0..MAX_LN_ITERATIONS {
            let e = y.exp_at(work)?;
            let diff = self - &e;
            let numerator = &diff + &diff;
            let denominator = self + &e;
            let delta = numerator.div_scaled(&denominator, work)?;
            y = &y + &delta;
            if delta.abs() < threshold {
                return Some(y.rescale(scale, Rounding::Down));
            }
        }
        None
    }

    fn aligned(&self, other: &Self) -> (BigInt, BigInt, i64) {
        let scale = self.scale.max(other.scale);
        let lhs = self.rescale(scale, Rounding::Down).digits;
        let rhs = other.rescale(scale, Rounding::Down).digits;
        (lhs, rhs, scale)
    }
}

/// `f64` estimate of `ln(x)` from the leading digits, valid at any magnitude.
fn ln_estimate(x: &BigDecimal) -> f64 {
    let text = x.digits.magnitude().to_string();
    let lead_len = text.len().min(17);
    let lead: f64 = text[..lead_len].parse().unwrap_or(1.0);
    let exponent = (text.len() - lead_len) as i64 - x.scale;
    lead.ln() + exponent as f64 * std::f64::consts::LN_10
}

impl Default for BigDecimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for BigDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BigDecimal {}

impl PartialOrd for BigDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl Add for &BigDecimal {
    type Output = BigDecimal;

    fn add(self, rhs: &BigDecimal) -> BigDecimal {
        let (lhs, rhs, scale) = self.aligned(rhs);
        BigDecimal::new(lhs + rhs, scale)
    }
}

impl Add for BigDecimal {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        &self + &rhs
    }
}

impl Sub for &BigDecimal {
    type Output = BigDecimal;

    fn sub(self, rhs: &BigDecimal) -> BigDecimal {
        let (lhs, rhs, scale) = self.aligned(rhs);
        BigDecimal::new(lhs - rhs, scale)
    }
}

impl Sub for BigDecimal {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        &self - &rhs
    }
}

impl Neg for BigDecimal {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.digits, self.scale)
    }
}

impl From<BigInt> for BigDecimal {
    fn from(value: BigInt) -> Self {
        Self::new(value, 0)
    }
}

impl From<&BigInt> for BigDecimal {
    fn from(value: &BigInt) -> Self {
        Self::new(value.clone(), 0)
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BigDecimal {
                fn from(value: $t) -> Self {
                    Self::new(BigInt::from(value), 0)
                }
            }
        )*
    };
}

impl_from_primitive!(i32, i64, i128, u32, u64, u128, usize);

impl From<rust_decimal::Decimal> for BigDecimal {
    fn from(value: rust_decimal::Decimal) -> Self {
        Self::new(value.mantissa(), i64::from(value.scale()))
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.normalized();
        let sign = if value.digits.is_negative() { "-" } else { "" };
        let text = value.digits.magnitude().to_string();

        if value.scale <= 0 {
            let zeros = if value.digits.is_zero() { 0 } else { value.scale.unsigned_abs() as usize };
            return write!(f, "{sign}{text}{}", "0".repeat(zeros));
        }

        let scale = value.scale.unsigned_abs() as usize;
        if text.len() > scale {
            let (int_part, frac_part) = text.split_at(text.len() - scale);
            write!(f, "{sign}{int_part}.{frac_part}")
        } else {
            write!(f, "{sign}0.{}{text}", "0".repeat(scale - text.len()))
        }
    }
}

impl FromStr for BigDecimal {
    type Err = LmsrError;

    /// Parses decimal (`-12.5`), scientific (`1e+18`) and hex (`0xff`) text.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| LmsrError::invalid("value", format!("{input:?}"), reason);

        let trimmed = input.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
            let digits = BigInt::parse_bytes(hex.as_bytes(), 16)
                .filter(|_| !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| malformed("not a hexadecimal number"))?;
            let digits = if negative { -digits } else { digits };
            return Ok(Self::new(digits, 0));
        }

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exponent: i64 = body[pos + 1..]
                    .parse()
                    .map_err(|_| malformed("malformed exponent"))?;
                if exponent.abs() > MAX_PARSE_EXPONENT {
                    return Err(malformed("exponent out of range"));
                }
                (&body[..pos], exponent)
            }
            None => (body, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed("no digits"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed("not a number"));
        }

        let all_digits = format!("{int_part}{frac_part}");
        let digits = BigInt::parse_bytes(all_digits.as_bytes(), 10)
            .ok_or_else(|| malformed("not a number"))?;
        let digits = if negative { -digits } else { digits };
        Ok(Self::new(digits, frac_part.len() as i64 - exponent))
    }
}

impl Serialize for BigDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Significant-digit budget for LMSR computations.
///
/// The default of 80 digits keeps relative error far below the 1e-9
/// tolerance used when cross-checking against the on-chain contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathContext {
    precision: u32,
}

impl MathContext {
    pub const DEFAULT_PRECISION: u32 = 80;
    pub const MIN_PRECISION: u32 = 32;
    pub const MAX_PRECISION: u32 = 1000;
    /// Fractional digits that must remain after the integer part of the inputs.
    pub const MIN_FRACTION_DIGITS: u32 = 24;
    /// Extra digits carried by every internal computation.
    pub const GUARD_DIGITS: i64 = 10;

    /// Creates a context with `precision` significant digits.
    pub fn new(precision: u32) -> Result<Self, LmsrError> {
        if !(Self::MIN_PRECISION..=Self::MAX_PRECISION).contains(&precision) {
            return Err(LmsrError::precision(
                precision,
                format!(
                    "precision must be within {}..={}",
                    Self::MIN_PRECISION,
                    Self::MAX_PRECISION
                ),
            ));
        }
        Ok(Self { precision })
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Fractional scale for a computation over the given integer inputs.
    ///
    /// Fails when the largest input leaves fewer than
    /// [`Self::MIN_FRACTION_DIGITS`] digits of headroom.
    pub fn working_scale<'a>(
        &self,
        magnitudes: impl IntoIterator<Item = &'a BigInt>,
    ) -> Result<i64, LmsrError> {
        let widest = magnitudes.into_iter().map(decimal_digits).max().unwrap_or(1);
        let headroom = self.precision.saturating_sub(widest);
        if headroom < Self::MIN_FRACTION_DIGITS {
            return Err(LmsrError::precision(
                self.precision,
                format!(
                    "inputs with {widest} integer digits leave {headroom} fractional digits, need {}",
                    Self::MIN_FRACTION_DIGITS
                ),
            ));
        }
        Ok(i64::from(self.precision) + Self::GUARD_DIGITS)
    }

    pub fn exp(&self, x: &BigDecimal, scale: i64) -> Result<BigDecimal, LmsrError> {
        x.exp_at(scale).ok_or_else(|| {
            LmsrError::precision(self.precision, format!("exp({x}) is out of range"))
        })
    }

    pub fn ln(&self, x: &BigDecimal, scale: i64) -> Result<BigDecimal, LmsrError> {
        x.ln_at(scale).ok_or_else(|| {
            LmsrError::precision(
                self.precision,
                format!("ln({x}) did not converge at scale {scale}"),
            )
        })
    }

    pub fn div(
        &self,
        numerator: &BigDecimal,
        denominator: &BigDecimal,
        scale: i64,
    ) -> Result<BigDecimal, LmsrError> {
        numerator.div_scaled(denominator, scale).ok_or_else(|| {
            LmsrError::precision(
                self.precision,
                format!("denominator of {numerator} vanished at scale {scale}"),
            )
        })
    }

    /// Rounds a result to the context's significant digits.
    pub fn round(&self, value: &BigDecimal) -> BigDecimal {
        value.round_significant(self.precision).normalized()
    }
}

impl Default for MathContext {
    fn default() -> Self {
        Self {
            precision: Self::DEFAULT_PRECISION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(text: &str) -> BigDecimal {
        text.parse().expect("valid decimal")
    }

    fn close(a: &BigDecimal, b: &BigDecimal, digits: i64) -> bool {
        (a - b).abs() < BigDecimal::new(1, digits)
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(d("12.50").to_string(), "12.5");
        assert_eq!(d("-0.001").to_string(), "-0.001");
        assert_eq!(d("1e+18").to_string(), "1000000000000000000");
        assert_eq!(d("2.5E17").to_string(), "250000000000000000");
        assert_eq!(d("0xff").to_string(), "255");
        assert_eq!(d(".5").to_string(), "0.5");
        assert_eq!(d("0").to_string(), "0");
        assert_eq!(d("-0").to_string(), "0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "1.2.3", "1e", "0x", "0xzz", "--1", "1e99999999"] {
            assert!(bad.parse::<BigDecimal>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_value_equality_ignores_scale() {
        assert_eq!(BigDecimal::new(50, 2), BigDecimal::new(5, 1));
        assert!(d("0.49") < d("0.5"));
        assert!(d("-3") < d("-2.99"));
    }

    #[test]
    fn test_rounding_modes() {
        let x = d("-2.5");
        assert_eq!(x.floor(), BigInt::from(-3));
        assert_eq!(x.ceil(), BigInt::from(-2));
        assert_eq!(x.rescale(0, Rounding::HalfUp), d("-3"));
        assert_eq!(x.rescale(0, Rounding::Down), d("-2"));
        assert_eq!(d("7").ceil(), BigInt::from(7));
        assert_eq!(d("7.000001").ceil(), BigInt::from(8));
        assert_eq!(d("7.999999").floor(), BigInt::from(7));
    }

    #[test]
    fn test_integer_detection() {
        assert!(d("100.000").is_integer());
        assert!(!d("100.001").is_integer());
        assert_eq!(d("4e3").to_bigint(), Some(BigInt::from(4000)));
        assert_eq!(d("0.5").to_bigint(), None);
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(d("123456").round_significant(3), d("123000"));
        assert_eq!(d("0.000123456").round_significant(2), d("0.00012"));
        assert_eq!(d("9.99").round_significant(2), d("10"));
    }

    #[test]
    fn test_division() {
        let third = d("1").div_scaled(&d("3"), 10).unwrap();
        assert_eq!(third.to_string(), "0.3333333333");
        assert!(d("1").div_scaled(&BigDecimal::zero(), 10).is_none());
        assert_eq!(d("1").div_scaled(&d("2"), 40).unwrap().to_string(), "0.5");
    }

    #[test]
    fn test_exp_known_values() {
        let e = d("1").exp_at(60).unwrap();
        let expected = d("2.718281828459045235360287471352662497757247093699959574966967");
        assert!(close(&e, &expected, 58), "e = {e}");

        let inv = d("-1").exp_at(60).unwrap();
        let expected = d("0.367879441171442321595523770161460867445811131031767834507836");
        assert!(close(&inv, &expected, 58), "1/e = {inv}");
    }

    #[test]
    fn test_exp_underflows_to_zero() {
        assert!(d("-1000").exp_at(50).unwrap().is_zero());
        assert!(d("5000").exp_at(50).is_none());
    }

    #[test]
    fn test_ln_known_values() {
        let ln2 = d("2").ln_at(60).unwrap();
        let expected = d("0.693147180559945309417232121458176568075500134360255254120680");
        assert!(close(&ln2, &expected, 58), "ln 2 = {ln2}");

        let ln10 = d("10").ln_at(60).unwrap();
        let expected = d("2.302585092994045684017991454684364207601101488628772976033327");
        assert!(close(&ln10, &expected, 58), "ln 10 = {ln10}");

        assert!(d("1").ln_at(60).unwrap().is_zero());
        assert!(d("0").ln_at(60).is_none());
        assert!(d("-1").ln_at(60).is_none());
    }

    #[test]
    fn test_ln_of_tiny_and_huge_values_inverts_exp() {
        for text in ["1e-40", "0.75", "3", "1e30"] {
            let x = d(text);
            let y = x.ln_at(70).unwrap();
            let back = y.exp_at(130).unwrap();
            let relative = (&back - &x).abs().div_scaled(&x, 70).unwrap();
            assert!(relative < BigDecimal::new(1, 50), "exp(ln({text})) = {back}");
        }
    }

    #[test]
    fn test_rust_decimal_interop() {
        let from = BigDecimal::from(dec!(0.05));
        assert_eq!(from, d("0.05"));
        assert_eq!(BigDecimal::from(dec!(-12.500)), d("-12.5"));
    }

    #[test]
    fn test_context_bounds() {
        assert!(MathContext::new(8).is_err());
        assert!(MathContext::new(80).is_ok());
        assert_eq!(MathContext::default().precision(), 80);
    }

    #[test]
    fn test_working_scale_rejects_oversized_inputs() {
        let ctx = MathContext::new(40).unwrap();
        let small = BigInt::from(10u64.pow(12));
        assert_eq!(ctx.working_scale([&small]).unwrap(), 50);
        let large = pow10(20);
        let err = ctx.working_scale([&small, &large]).unwrap_err();
        assert!(matches!(err, LmsrError::PrecisionConfiguration { precision: 40, .. }));
    }
}
