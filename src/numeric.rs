use std::cmp::Ordering;
use std::fmt;
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest value (digits plus positive exponent) whose exact rational still fits in an `i128`.
const MAX_DIGITS: usize = 38;

#[derive(Debug, PartialEq, Error)]
pub enum NumericError {
    #[error("invalid decimal {0:?}")]
    InvalidDecimal(String),
    #[error("decimal {0:?} is out of range")]
    OutOfRange(String),
    #[error("invalid rational {0:?}")]
    InvalidRational(String),
    #[error("denominator must not be zero")]
    ZeroDenominator,
    #[error("arithmetic overflow")]
    Overflow,
}

/// A decimal kept as parsed: sign, base-10 digits (most significant first) and exponent.
///
/// `"1.50"` keeps its trailing zero as digits `[1, 5, 0]` with exponent `-2`, so the
/// rational built from it carries the same precision the input was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledDecimal {
    negative: bool,
    digits: Vec<u8>,
    exponent: i32,
}

impl ScaledDecimal {
    pub fn new(negative: bool, digits: Vec<u8>, exponent: i32) -> Result<ScaledDecimal, NumericError> {
        let describe = || format!("{}{:?}E{}", if negative { "-" } else { "" }, digits, exponent);

        if digits.is_empty() || digits.iter().any(|d| *d > 9) {
            return Err(NumericError::InvalidDecimal(describe()));
        }

        let leading = digits.iter().take_while(|d| **d == 0).count().min(digits.len() - 1);
        let significant = digits.len() - leading;
        let widened = significant + usize::try_from(exponent.max(0)).unwrap_or(usize::MAX);
        if widened > MAX_DIGITS || exponent < -(MAX_DIGITS as i32) {
            return Err(NumericError::OutOfRange(describe()));
        }

        Ok(ScaledDecimal {
            negative,
            digits: digits[leading..].to_vec(),
            exponent,
        })
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.digits.iter().all(|d| *d == 0)
    }
}

impl FromStr for ScaledDecimal {
    type Err = NumericError;

    /// Accepts `[+-]digits[.digits][(e|E)[+-]digits]`, surrounding whitespace ignored.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || NumericError::InvalidDecimal(text.to_string());
        let trimmed = text.trim();

        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => {
                let exponent: i32 = unsigned[pos + 1..].parse().map_err(|err: ParseIntError| match err.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => NumericError::OutOfRange(text.to_string()),
                    _ => invalid(),
                })?;
                (&unsigned[..pos], exponent)
            },
            None => (unsigned, 0),
        };

        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let mut digits = Vec::with_capacity(integer.len() + fraction.len());
        for c in integer.chars().chain(fraction.chars()) {
            let digit = c.to_digit(10).ok_or_else(invalid)?;
            digits.push(digit as u8);
        }

        let fraction_len = i32::try_from(fraction.len()).map_err(|_| NumericError::OutOfRange(text.to_string()))?;
        let exponent = exponent
            .checked_sub(fraction_len)
            .ok_or_else(|| NumericError::OutOfRange(text.to_string()))?;

        ScaledDecimal::new(negative, digits, exponent).map_err(|err| match err {
            NumericError::OutOfRange(_) => NumericError::OutOfRange(text.to_string()),
            _ => invalid(),
        })
    }
}

impl From<Decimal> for ScaledDecimal {
    fn from(value: Decimal) -> Self {
        let digits = value
            .mantissa()
            .unsigned_abs()
            .to_string()
            .bytes()
            .map(|b| b - b'0')
            .collect();

        // A `Decimal` mantissa has at most 29 digits and a scale of at most 28.
        ScaledDecimal {
            negative: value.is_sign_negative(),
            digits,
            exponent: -(value.scale() as i32),
        }
    }
}

impl fmt::Display for ScaledDecimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        for digit in &self.digits {
            write!(f, "{}", digit)?;
        }
        if self.exponent != 0 {
            write!(f, "E{}", self.exponent)?;
        }
        Ok(())
    }
}

/// Converts a decimal into an exact, unreduced `numerator / denominator` pair.
pub fn to_rational(value: &ScaledDecimal) -> Rational {
    let mut numerator: i128 = 0;
    let mut place_value: i128 = 1;
    for digit in value.digits.iter().rev() {
        numerator += i128::from(*digit) * place_value;
        place_value *= 10;
    }

    if value.negative {
        numerator = -numerator;
    }

    if value.exponent < 0 {
        Rational {
            numerator,
            denominator: 10i128.pow(value.exponent.unsigned_abs()),
        }
    } else {
        Rational {
            numerator: numerator * 10i128.pow(value.exponent.unsigned_abs()),
            denominator: 1,
        }
    }
}

/// Exact fraction with a positive denominator.
///
/// Equality and ordering compare values, so `150/100 == 3/2`. Use [`Rational::numerator`]
/// and [`Rational::denominator`] to look at the stored representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rational {
    numerator: i128,
    denominator: i128,
}

impl Rational {
    pub const ZERO: Rational = Rational {
        numerator: 0,
        denominator: 1,
    };

    pub fn new(numerator: i128, denominator: i128) -> Result<Rational, NumericError> {
        match denominator.cmp(&0) {
            Ordering::Equal => Err(NumericError::ZeroDenominator),
            Ordering::Greater => Ok(Rational { numerator, denominator }),
            Ordering::Less => Ok(Rational {
                numerator: numerator.checked_neg().ok_or(NumericError::Overflow)?,
                denominator: denominator.checked_neg().ok_or(NumericError::Overflow)?,
            }),
        }
    }

    pub fn numerator(&self) -> i128 {
        self.numerator
    }

    pub fn denominator(&self) -> i128 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_positive(&self) -> bool {
        self.numerator > 0
    }

    pub fn reduced(&self) -> Rational {
        // Bounded by the positive denominator, so it always fits back into an i128.
        let divisor = gcd(self.numerator.unsigned_abs(), self.denominator.unsigned_abs()) as i128;
        if divisor <= 1 {
            return *self;
        }
        Rational {
            numerator: self.numerator / divisor,
            denominator: self.denominator / divisor,
        }
    }

    pub fn checked_add(&self, other: &Rational) -> Result<Rational, NumericError> {
        let (a, b) = (self.reduced(), other.reduced());
        let divisor = gcd(a.denominator.unsigned_abs(), b.denominator.unsigned_abs()) as i128;
        let scale_a = b.denominator / divisor;
        let scale_b = a.denominator / divisor;

        let numerator = a
            .numerator
            .checked_mul(scale_a)
            .zip(b.numerator.checked_mul(scale_b))
            .and_then(|(x, y)| x.checked_add(y))
            .ok_or(NumericError::Overflow)?;
        let denominator = a.denominator.checked_mul(scale_a).ok_or(NumericError::Overflow)?;

        Ok(Rational { numerator, denominator }.reduced())
    }

    pub fn checked_sub(&self, other: &Rational) -> Result<Rational, NumericError> {
        self.checked_add(&other.checked_neg()?)
    }

    pub fn checked_mul(&self, other: &Rational) -> Result<Rational, NumericError> {
        // Cross-reduce first so intermediate products stay as small as possible.
        let (a, b) = (self.reduced(), other.reduced());
        let g1 = gcd(a.numerator.unsigned_abs(), b.denominator.unsigned_abs()).max(1) as i128;
        let g2 = gcd(b.numerator.unsigned_abs(), a.denominator.unsigned_abs()).max(1) as i128;

        let numerator = (a.numerator / g1)
            .checked_mul(b.numerator / g2)
            .ok_or(NumericError::Overflow)?;
        let denominator = (a.denominator / g2)
            .checked_mul(b.denominator / g1)
            .ok_or(NumericError::Overflow)?;

        Ok(Rational { numerator, denominator })
    }

    pub fn checked_neg(&self) -> Result<Rational, NumericError> {
        Ok(Rational {
            numerator: self.numerator.checked_neg().ok_or(NumericError::Overflow)?,
            denominator: self.denominator,
        })
    }

    /// Decimal rendering for reports; rounds when the fraction does not terminate.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let reduced = self.reduced();
        let numerator = Decimal::try_from_i128_with_scale(reduced.numerator, 0).ok()?;
        let denominator = Decimal::try_from_i128_with_scale(reduced.denominator, 0).ok()?;
        numerator.checked_div(denominator).map(|value| value.normalize())
    }
}

impl Default for Rational {
    fn default() -> Self {
        Rational::ZERO
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Rational {
            numerator: i128::from(value),
            denominator: 1,
        }
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.reduced(), other.reduced());
        a.numerator == b.numerator && a.denominator == b.denominator
    }
}

impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_fractions(self.numerator, self.denominator, other.numerator, other.denominator)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Rational {
    type Err = NumericError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || NumericError::InvalidRational(text.to_string());
        let (numerator, denominator) = text.trim().split_once('/').unwrap_or((text.trim(), "1"));
        let numerator = numerator.trim().parse::<i128>().map_err(|_| invalid())?;
        let denominator = denominator.trim().parse::<i128>().map_err(|_| invalid())?;
        Rational::new(numerator, denominator)
    }
}

impl TryFrom<String> for Rational {
    type Error = NumericError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rational> for String {
    fn from(value: Rational) -> Self {
        value.to_string()
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Compares `a/b` with `c/d` (positive denominators) without multiplying, by
/// comparing integer parts and then the reciprocals of the remainders.
fn compare_fractions(a: i128, b: i128, c: i128, d: i128) -> Ordering {
    let (q1, r1) = (a.div_euclid(b), a.rem_euclid(b));
    let (q2, r2) = (c.div_euclid(d), c.rem_euclid(d));

    match q1.cmp(&q2) {
        Ordering::Equal => match (r1 == 0, r2 == 0) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare_fractions(d, r2, b, r1),
        },
        unequal => unequal,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn parts(value: &str) -> Result<(i128, i128)> {
        let rational = to_rational(&value.parse::<ScaledDecimal>()?);
        Ok((rational.numerator(), rational.denominator()))
    }

    fn same_value(a: Rational, b: Rational) -> bool {
        a.numerator() * b.denominator() == b.numerator() * a.denominator()
    }

    #[test]
    fn test_negative_exponent_sets_denominator() -> Result<()> {
        let value = ScaledDecimal::new(false, vec![1, 2, 3], -2)?;
        let rational = to_rational(&value);

        assert_eq!((rational.numerator(), rational.denominator()), (123, 100));
        Ok(())
    }

    #[test]
    fn test_positive_exponent_scales_numerator() -> Result<()> {
        let value = ScaledDecimal::new(false, vec![5], 1)?;
        let rational = to_rational(&value);

        assert_eq!((rational.numerator(), rational.denominator()), (50, 1));
        assert_eq!(parts("2E3")?, (2000, 1));
        Ok(())
    }

    #[test]
    fn test_sign_is_applied() -> Result<()> {
        assert_eq!(parts("-12.5")?, (-125, 10));
        assert_eq!(parts("+7")?, (7, 1));
        Ok(())
    }

    #[test]
    fn test_trailing_zeros_are_kept_unreduced() -> Result<()> {
        let a = to_rational(&"1.50".parse::<ScaledDecimal>()?);
        let b = to_rational(&"1.5".parse::<ScaledDecimal>()?);

        assert_eq!((a.numerator(), a.denominator()), (150, 100));
        assert_eq!((b.numerator(), b.denominator()), (15, 10));
        assert!(same_value(a, b));
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_parse_forms() -> Result<()> {
        assert_eq!(parts(" 42 ")?, (42, 1));
        assert_eq!(parts(".25")?, (25, 100));
        assert_eq!(parts("3.")?, (3, 1));
        assert_eq!(parts("0.001")?, (1, 1000));
        assert_eq!(parts("1.5e-2")?, (15, 1000));
        assert_eq!(parts("0")?, (0, 1));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["", " ", "-", ".", "abc", "1,5", "1.2.3", "1e", "NaN", "Infinity", "--1"] {
            assert!(text.parse::<ScaledDecimal>().is_err(), "{:?} should not parse", text);
        }
    }

    #[test]
    fn test_parse_rejects_values_too_wide_for_i128() {
        assert_eq!(
            "1E40".parse::<ScaledDecimal>(),
            Err(NumericError::OutOfRange("1E40".to_string()))
        );
        assert!("1E-39".parse::<ScaledDecimal>().is_err());
        assert!("123456789012345678901234567890123456789".parse::<ScaledDecimal>().is_err());
    }

    #[test]
    fn test_widest_value_converts() -> Result<()> {
        let value: ScaledDecimal = "99999999999999999999999999999999999999".parse()?;
        let rational = to_rational(&value);
        assert_eq!(rational.numerator(), 99999999999999999999999999999999999999);

        let tiny = to_rational(&"1E-38".parse::<ScaledDecimal>()?);
        assert_eq!(tiny.denominator(), 10i128.pow(38));
        Ok(())
    }

    #[test]
    fn test_from_rust_decimal() {
        let value = ScaledDecimal::from(dec!(-3.140));
        assert!(value.is_negative());
        assert_eq!(value.digits(), &[3, 1, 4, 0]);
        assert_eq!(value.exponent(), -3);

        let rational = to_rational(&value);
        assert_eq!((rational.numerator(), rational.denominator()), (-3140, 1000));
    }

    #[test]
    fn test_rational_arithmetic_is_exact() -> Result<()> {
        let third = Rational::new(1, 3)?;
        let sixth = Rational::new(1, 6)?;

        assert_eq!(third.checked_add(&sixth)?, Rational::new(1, 2)?);
        assert_eq!(third.checked_sub(&sixth)?, sixth);
        assert_eq!(third.checked_mul(&Rational::from(3))?, Rational::from(1));
        Ok(())
    }

    #[test]
    fn test_rational_overflow_is_reported() -> Result<()> {
        let huge = Rational::new(i128::MAX, 1)?;
        assert_eq!(huge.checked_add(&Rational::from(1)), Err(NumericError::Overflow));
        assert_eq!(huge.checked_mul(&Rational::from(2)), Err(NumericError::Overflow));
        Ok(())
    }

    #[test]
    fn test_rational_ordering() -> Result<()> {
        assert!(Rational::new(2, 3)? > Rational::new(3, 5)?);
        assert!(Rational::new(-1, 2)? < Rational::ZERO);
        assert!(Rational::new(i128::MAX, 3)? > Rational::new(i128::MAX - 1, 3)?);
        assert_eq!(Rational::new(4, 8)?.cmp(&Rational::new(1, 2)?), Ordering::Equal);
        Ok(())
    }

    #[test]
    fn test_rational_negative_denominator_is_normalized() -> Result<()> {
        let value = Rational::new(3, -4)?;
        assert_eq!((value.numerator(), value.denominator()), (-3, 4));
        assert_eq!(Rational::new(1, 0), Err(NumericError::ZeroDenominator));
        Ok(())
    }

    #[test]
    fn test_rational_text_form() -> Result<()> {
        let value: Rational = "150/100".parse()?;
        assert_eq!(value.to_string(), "150/100");
        assert_eq!("7".parse::<Rational>()?, Rational::from(7));
        assert!("1/x".parse::<Rational>().is_err());

        let json = serde_json::to_string(&value)?;
        assert_eq!(json, "\"150/100\"");
        assert_eq!(serde_json::from_str::<Rational>(&json)?, value);
        Ok(())
    }

    #[test]
    fn test_to_decimal() -> Result<()> {
        assert_eq!(Rational::new(150, 100)?.to_decimal(), Some(dec!(1.5)));
        assert_eq!(Rational::new(-5, 4)?.to_decimal(), Some(dec!(-1.25)));
        Ok(())
    }
}
