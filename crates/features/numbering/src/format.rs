//! Number-code arithmetic.
//!
//! The numeric part of a code is its rightmost run of ASCII digits; everything before and
//! after it is kept verbatim. The digit run keeps its zero padding when the value changes
//! and widens when the value needs more digits (`S99` + 1 = `S100`).

use crate::error::NumberingError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed number code such as `S00042` or `INV-2024-0007/B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberCode {
    prefix: String,
    value: u64,
    width: usize,
    suffix: String,
}

impl NumberCode {
    /// Parses `code`, locating its rightmost digit run.
    ///
    /// # Errors
    /// Returns [`NumberingError::InvalidNumber`] if `code` has no digits or its numeric
    /// part does not fit in a `u64`.
    pub fn parse(code: &str) -> Result<Self, NumberingError> {
        let bytes = code.as_bytes();
        let Some(end) = bytes.iter().rposition(u8::is_ascii_digit).map(|i| i + 1) else {
            return Err(invalid(code, "it contains no digits"));
        };
        let start = bytes[..end].iter().rposition(|b| !b.is_ascii_digit()).map_or(0, |i| i + 1);

        let digits = &code[start..end];
        let value = digits.parse::<u64>().map_err(|_| invalid(code, "the numeric part is too large"))?;

        Ok(Self {
            prefix: code[..start].to_owned(),
            value,
            width: digits.len(),
            suffix: code[end..].to_owned(),
        })
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// The same code shape carrying `value`.
    #[must_use]
    pub fn with_value(&self, value: u64) -> Self {
        Self { value, ..self.clone() }
    }

    /// The code `by` steps further.
    ///
    /// # Errors
    /// Returns [`NumberingError::InvalidNumber`] if the numeric part would overflow.
    pub fn increment(&self, by: u32) -> Result<Self, NumberingError> {
        self.value
            .checked_add(u64::from(by))
            .map(|value| self.with_value(value))
            .ok_or_else(|| invalid(&self.to_string(), "the numeric part cannot grow further"))
    }

    /// Compares numeric parts only.
    #[must_use]
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for NumberCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}{}", self.prefix, self.value, self.suffix, width = self.width)
    }
}

impl FromStr for NumberCode {
    type Err = NumberingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `code` advanced by `by`.
///
/// # Errors
/// See [`NumberCode::parse`] and [`NumberCode::increment`].
pub fn increment(code: &str, by: u32) -> Result<String, NumberingError> {
    Ok(NumberCode::parse(code)?.increment(by)?.to_string())
}

/// Compares the numeric parts of two codes.
///
/// # Errors
/// See [`NumberCode::parse`].
pub fn compare(a: &str, b: &str) -> Result<Ordering, NumberingError> {
    Ok(NumberCode::parse(a)?.cmp_value(&NumberCode::parse(b)?))
}

fn invalid(code: &str, message: &'static str) -> NumberingError {
    NumberingError::InvalidNumber { number: code.to_owned(), message: message.into(), context: None }
}
