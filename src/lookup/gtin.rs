//! GS1 Global Trade Item Numbers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Why a string is not a valid GTIN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GtinError {
    /// Not 8, 12, 13 or 14 characters long.
    #[error("expected 8, 12, 13 or 14 digits, got {0}")]
    Length(usize),

    /// Contains something other than ASCII digits.
    #[error("GTIN may only contain digits")]
    NonDigit,

    /// The final digit does not match the GS1 mod-10 checksum.
    #[error("check digit should be {expected}, got {actual}")]
    CheckDigit {
        /// Digit the checksum calls for.
        expected: u8,
        /// Digit that was supplied.
        actual: u8,
    },
}

/// A validated GTIN-8, GTIN-12 (UPC-A), GTIN-13 (EAN) or GTIN-14.
///
/// ```rust
/// use retrace::lookup::Gtin;
///
/// let gtin: Gtin = " 4006381333931 ".parse().unwrap();
/// assert_eq!(gtin.as_str(), "4006381333931");
/// assert!(Gtin::parse("4006381333932").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gtin(String);

impl Gtin {
    /// Parse and checksum a GTIN, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, GtinError> {
        let code = input.trim();
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GtinError::NonDigit);
        }
        if !matches!(code.len(), 8 | 12 | 13 | 14) {
            return Err(GtinError::Length(code.len()));
        }

        let digits: Vec<u8> = code.bytes().map(|b| b - b'0').collect();
        let Some((&actual, body)) = digits.split_last() else {
            return Err(GtinError::Length(0));
        };
        let expected = check_digit(body);
        if expected != actual {
            return Err(GtinError::CheckDigit { expected, actual });
        }

        Ok(Self(code.to_owned()))
    }

    /// The digits of the GTIN.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// GS1 mod-10: weight digits 3, 1, 3, ... from the right.
fn check_digit(body: &[u8]) -> u8 {
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    // always < 10
    ((10 - sum % 10) % 10) as u8
}

impl FromStr for Gtin {
    type Err = GtinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Gtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
