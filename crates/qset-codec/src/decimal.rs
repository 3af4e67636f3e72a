//! Arbitrary-precision decimal value.
//!
//! An [`ExactDecimal`] is stored as its three semantic parts: a sign, the
//! unscaled coefficient as decimal digits, and a base-10 exponent. No binary
//! floating-point value is ever involved, so `"0.120000"` keeps its six
//! fractional digits through parsing, encoding and printing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseDecimalError;

/// Signed decimal number `(-1)^sign * coefficient * 10^exponent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactDecimal {
    negative: bool,
    /// ASCII digits without leading zeros; `"0"` for a zero coefficient.
    digits: String,
    exponent: i32,
}

impl ExactDecimal {
    /// Build a decimal from its parts. `digits` must be ASCII decimal digits.
    pub fn from_parts(
        negative: bool,
        digits: &str,
        exponent: i32,
    ) -> Result<Self, ParseDecimalError> {
        if digits.is_empty() {
            return Err(ParseDecimalError::new(digits, "empty coefficient"));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseDecimalError::new(digits, "coefficient is not decimal"));
        }
        Ok(Self {
            negative,
            digits: strip_leading_zeros(digits),
            exponent,
        })
    }

    /// Returns `true` for negative values, including negative zero.
    pub fn is_sign_negative(&self) -> bool {
        self.negative
    }

    /// The unscaled coefficient as decimal digits.
    pub fn coefficient(&self) -> &str {
        &self.digits
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Number of digits after the decimal point (0 for non-negative exponents).
    pub fn scale(&self) -> u32 {
        if self.exponent < 0 {
            self.exponent.unsigned_abs()
        } else {
            0
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits == "0"
    }

    /// The coefficient as a big-endian unsigned integer. Zero is empty.
    pub fn coefficient_be_bytes(&self) -> Vec<u8> {
        // little-endian base-256 limbs while accumulating
        let mut limbs: Vec<u8> = Vec::new();
        for d in self.digits.bytes() {
            let mut carry = u32::from(d - b'0');
            for limb in limbs.iter_mut() {
                let v = u32::from(*limb) * 10 + carry;
                *limb = (v & 0xff) as u8;
                carry = v >> 8;
            }
            while carry > 0 {
                limbs.push((carry & 0xff) as u8);
                carry >>= 8;
            }
        }
        while limbs.last() == Some(&0) {
            limbs.pop();
        }
        limbs.reverse();
        limbs
    }

    /// Rebuild a decimal from a big-endian coefficient, sign and exponent.
    pub fn from_coefficient_be_bytes(negative: bool, magnitude: &[u8], exponent: i32) -> Self {
        let mut work: Vec<u8> = magnitude.iter().copied().skip_while(|b| *b == 0).collect();
        let mut reversed_digits = Vec::new();
        while !work.is_empty() {
            let mut rem = 0u32;
            for byte in work.iter_mut() {
                let acc = (rem << 8) | u32::from(*byte);
                *byte = (acc / 10) as u8;
                rem = acc % 10;
            }
            reversed_digits.push(b'0' + rem as u8);
            let leading = work.iter().take_while(|b| **b == 0).count();
            work.drain(..leading);
        }
        let digits = if reversed_digits.is_empty() {
            "0".to_string()
        } else {
            reversed_digits.iter().rev().map(|b| *b as char).collect()
        };
        Self {
            negative,
            digits,
            exponent,
        }
    }
}

fn strip_leading_zeros(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

impl FromStr for ExactDecimal {
    type Err = ParseDecimalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exp_part) = match rest.find(['e', 'E']) {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecimalError::new(input, "no digits"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(ParseDecimalError::new(input, "unexpected character"));
        }

        let explicit_exp: i64 = match exp_part {
            Some(e) if !e.is_empty() => e
                .parse()
                .map_err(|_| ParseDecimalError::new(input, "invalid exponent"))?,
            Some(_) => return Err(ParseDecimalError::new(input, "empty exponent")),
            None => 0,
        };
        let exponent = i64::try_from(frac_part.len())
            .ok()
            .and_then(|frac| explicit_exp.checked_sub(frac))
            .and_then(|e| i32::try_from(e).ok())
            .ok_or_else(|| ParseDecimalError::new(input, "exponent out of range"))?;

        let mut digits = String::with_capacity(int_part.len() + frac_part.len());
        digits.push_str(int_part);
        digits.push_str(frac_part);

        Ok(Self {
            negative,
            digits: strip_leading_zeros(&digits),
            exponent,
        })
    }
}

/// Leading fraction zeros rendered before switching to `E` notation.
const MAX_PLAIN_ZEROS: usize = 32;

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        match self.exponent {
            0 => f.write_str(&self.digits),
            e if e > 0 => write!(f, "{}E+{}", self.digits, e),
            e => {
                let scale = e.unsigned_abs() as usize;
                let len = self.digits.len();
                if scale > len + MAX_PLAIN_ZEROS {
                    write!(f, "{}E{}", self.digits, e)
                } else if len > scale {
                    let (int, frac) = self.digits.split_at(len - scale);
                    write!(f, "{int}.{frac}")
                } else {
                    write!(f, "0.{}{}", "0".repeat(scale - len), self.digits)
                }
            }
        }
    }
}

impl Serialize for ExactDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExactDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
