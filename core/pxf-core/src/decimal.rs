//! Fixed-point decimal limited to 38 significant digits.
//!
//! 값은 `i128` unscaled 정수와 scale로 표현되며, 항상 정규화(소수부 끝의 0 제거)된 상태를 유지합니다.
//! 38자리를 넘는 정수부는 표현할 수 없고, 소수부는 HALF_UP으로 반올림됩니다.

use crate::error::{PxfError, PxfResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Largest number of significant digits a decimal can hold.
pub const MAX_PRECISION: usize = 38;

/// Largest number of fractional digits a decimal can hold.
pub const MAX_SCALE: usize = 38;

/// Precision and scale of a decimal column declared without modifiers.
pub const SYSTEM_DEFAULT_PRECISION: u8 = 38;
pub const SYSTEM_DEFAULT_SCALE: u8 = 10;

// beyond this many shifted positions a non-zero value can never be represented
const EXPONENT_LIMIT: i64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Decimal {
    unscaled: i128,
    scale: u8,
}

impl Default for Decimal {
    fn default() -> Self {
        Decimal::ZERO
    }
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        unscaled: 0,
        scale: 0,
    };

    /// Build from an unscaled value and scale, trimming trailing fractional zeros.
    ///
    /// Returns `None` when the scale exceeds [`MAX_SCALE`] or the value has
    /// more than [`MAX_PRECISION`] digits.
    pub fn new(unscaled: i128, scale: u8) -> Option<Decimal> {
        if scale as usize > MAX_SCALE || digit_count(unscaled) > MAX_PRECISION {
            return None;
        }
        let mut unscaled = unscaled;
        let mut scale = scale;
        while scale > 0 && unscaled % 10 == 0 {
            unscaled /= 10;
            scale -= 1;
        }
        Some(Decimal { unscaled, scale })
    }

    pub fn from_i64(value: i64) -> Decimal {
        Decimal {
            unscaled: value as i128,
            scale: 0,
        }
    }

    /// Parse decimal text.
    ///
    /// Malformed text is an error; a value whose integer part needs more than
    /// 38 digits yields `Ok(None)`. The fraction is rounded HALF_UP to the
    /// digits left over by the integer part.
    pub fn create(text: &str) -> PxfResult<Option<Decimal>> {
        let malformed = || PxfError::runtime(format!("invalid decimal literal \"{}\"", text));

        let trimmed = text.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            Some(_) => (false, trimmed),
            None => return Err(malformed()),
        };

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exponent = body[pos + 1..]
                    .parse::<i64>()
                    .map_err(|_| malformed())?;
                (&body[..pos], exponent)
            }
            None => (body, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .map(|b| b - b'0')
            .collect();
        if digits.iter().all(|d| *d == 0) {
            return Ok(Some(Decimal::ZERO));
        }

        let point = int_part.len() as i64 + exponent;
        if point > EXPONENT_LIMIT {
            return Ok(None);
        }
        if point < -EXPONENT_LIMIT {
            return Ok(Some(Decimal::ZERO));
        }

        // shift the decimal point by the exponent
        let (mut int_digits, mut frac_digits) = if point <= 0 {
            let mut frac = vec![0u8; (-point) as usize];
            frac.extend_from_slice(&digits);
            (Vec::new(), frac)
        } else if point as usize >= digits.len() {
            let mut int = digits.clone();
            int.resize(point as usize, 0);
            (int, Vec::new())
        } else {
            let (int, frac) = digits.split_at(point as usize);
            (int.to_vec(), frac.to_vec())
        };

        let leading = int_digits.iter().take_while(|d| **d == 0).count();
        int_digits.drain(..leading);
        while frac_digits.last() == Some(&0) {
            frac_digits.pop();
        }

        if int_digits.len() > MAX_PRECISION {
            return Ok(None);
        }

        let keep = frac_digits.len().min(MAX_PRECISION - int_digits.len());
        let round_up = frac_digits.get(keep).is_some_and(|d| *d >= 5);
        frac_digits.truncate(keep);

        let mut all: Vec<u8> = int_digits.iter().chain(frac_digits.iter()).copied().collect();
        if round_up && increment(&mut all) {
            all.insert(0, 1);
        }

        let mut scale = keep;
        while scale > 0 && all.last() == Some(&0) {
            all.pop();
            scale -= 1;
        }
        if all.len().saturating_sub(scale) > MAX_PRECISION || all.len() > MAX_PRECISION {
            return Ok(None);
        }

        let magnitude = all.iter().fold(0i128, |acc, d| acc * 10 + *d as i128);
        Ok(Decimal::new(
            if negative { -magnitude } else { magnitude },
            scale as u8,
        ))
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Number of significant digits, counting fractional zeros after the point.
    pub fn precision(&self) -> usize {
        digit_count(self.unscaled).max(self.scale as usize)
    }

    /// Digits left of the decimal point (zero for `|x| < 1`).
    pub fn integer_digits(&self) -> usize {
        let magnitude = self.unscaled.unsigned_abs() / 10u128.pow(self.scale as u32);
        if magnitude == 0 {
            0
        } else {
            magnitude.ilog10() as usize + 1
        }
    }

    pub fn signum(&self) -> i32 {
        self.unscaled.signum() as i32
    }

    /// Bound this value by `decimal(precision, scale)`.
    ///
    /// Rounds HALF_UP to `scale` fractional digits; `None` when the integer
    /// part does not fit into `precision - scale` digits.
    pub fn enforce_precision_scale(&self, precision: u8, scale: u8) -> Option<Decimal> {
        if precision as usize > MAX_PRECISION || scale > precision {
            return None;
        }
        let rounded = if self.scale > scale {
            let divisor = 10i128.pow((self.scale - scale) as u32);
            let quotient = self.unscaled / divisor;
            let remainder = (self.unscaled % divisor).abs();
            let quotient = if remainder >= divisor - remainder {
                quotient + self.unscaled.signum()
            } else {
                quotient
            };
            Decimal::new(quotient, scale)?
        } else {
            *self
        };

        if rounded.integer_digits() > (precision - scale) as usize {
            None
        } else {
            Some(rounded)
        }
    }

    /// Fit this value into a column declared as `decimal(precision, scale)`.
    ///
    /// The undeclared default `decimal(38,10)` keeps whatever `create` accepted;
    /// any other declaration goes through [`Decimal::enforce_precision_scale`].
    pub fn fit(&self, precision: u8, scale: u8) -> Option<Decimal> {
        if precision == SYSTEM_DEFAULT_PRECISION && scale == SYSTEM_DEFAULT_SCALE {
            Some(*self)
        } else {
            self.enforce_precision_scale(precision, scale)
        }
    }

    /// Unscaled value at a fixed scale, `None` if it would overflow or lose digits.
    pub fn rescale(&self, scale: u8) -> Option<i128> {
        if scale < self.scale {
            return None;
        }
        10i128
            .checked_pow((scale - self.scale) as u32)
            .and_then(|factor| self.unscaled.checked_mul(factor))
    }

    pub fn to_f64(&self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale as i32)
    }
}

/// Add one to a big-endian digit string; returns true on carry out.
fn increment(digits: &mut [u8]) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == 9 {
            *digit = 0;
        } else {
            *digit += 1;
            return false;
        }
    }
    true
}

fn digit_count(value: i128) -> usize {
    let magnitude = value.unsigned_abs();
    if magnitude == 0 {
        1
    } else {
        magnitude.ilog10() as usize + 1
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign = self.signum().cmp(&other.signum());
        if sign != Ordering::Equal {
            return sign;
        }
        let scale = self.scale.max(other.scale);
        match (self.rescale(scale), other.rescale(scale)) {
            (Some(a), Some(b)) => a.cmp(&b),
            // overflowing side has the larger magnitude
            (None, _) if self.signum() >= 0 => Ordering::Greater,
            (None, _) => Ordering::Less,
            (_, None) if other.signum() >= 0 => Ordering::Less,
            (_, None) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if self.unscaled < 0 {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}.{}", int_part, frac_part)
    }
}

impl From<Decimal> for String {
    fn from(value: Decimal) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Decimal {
    type Error = PxfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Decimal::create(&value)?
            .ok_or_else(|| PxfError::runtime(format!("decimal {} exceeds precision 38", value)))
    }
}
