//! Numeric passcodes entered digit by digit on the dashboard
use heapless::Vec;
use serde::{Deserialize, Serialize};

use super::Error;

/// Longest passcode that still fits a `u32`
pub const MAX_PASSCODE_DIGITS: usize = 9;

/// Stored numeric secret with an explicit digit count
///
/// The digit count is part of the secret: `0042` and `42` are different passcodes, and only the
/// first `len` digits of an input are compared against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(try_from = "RawPasscode")]
pub struct Passcode {
    value: u32,
    len: u8,
}

/// Unvalidated wire form, checked on the way in
#[derive(Deserialize)]
struct RawPasscode {
    value: u32,
    len: u8,
}

impl TryFrom<RawPasscode> for Passcode {
    type Error = Error;

    fn try_from(raw: RawPasscode) -> Result<Self, Self::Error> {
        Passcode::new(raw.value, raw.len)
    }
}

impl Passcode {
    /// Create a passcode of `len` digits, zero padded on the left
    pub fn new(value: u32, len: u8) -> Result<Self, Error> {
        if len == 0 || len as usize > MAX_PASSCODE_DIGITS {
            return Err(Error::InputOutOfRange);
        }

        if value >= 10u32.pow(len as u32) {
            return Err(Error::InputOutOfRange);
        }

        Ok(Self { value, len })
    }

    /// Create a passcode from entered digits, most significant first
    pub fn from_digits(digits: &[u8]) -> Result<Self, Error> {
        if digits.is_empty() || digits.len() > MAX_PASSCODE_DIGITS {
            return Err(Error::InputOutOfRange);
        }

        let mut value = 0u32;
        for digit in digits {
            if *digit > 9 {
                return Err(Error::InputOutOfRange);
            }
            value = value * 10 + *digit as u32;
        }

        Self::new(value, digits.len() as u8)
    }

    /// Number of significant digits
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Digits of the passcode, most significant first, including leading zeros
    pub fn digits(&self) -> Vec<u8, MAX_PASSCODE_DIGITS> {
        let mut digits = Vec::new();
        let mut divisor = 10u32.pow(self.len as u32 - 1);
        while divisor > 0 {
            // Capacity is MAX_PASSCODE_DIGITS and len never exceeds it
            let _ = digits.push(((self.value / divisor) % 10) as u8);
            divisor /= 10;
        }
        digits
    }

    /// Compare entered digits against this passcode
    ///
    /// Only the first `len` entered digits are significant. Shorter input never matches.
    pub fn matches(&self, input: &[u8]) -> Result<bool, Error> {
        if input.iter().any(|digit| *digit > 9) {
            return Err(Error::InputOutOfRange);
        }

        let len = self.len as usize;
        if input.len() < len {
            return Ok(false);
        }

        // Visit every digit regardless of where the first mismatch is
        let mismatches = self
            .digits()
            .iter()
            .zip(&input[..len])
            .fold(0u8, |acc, (stored, entered)| acc | (stored ^ entered));
        Ok(mismatches == 0)
    }
}

impl Default for Passcode {
    /// Factory passcode `0000`
    fn default() -> Self {
        Self { value: 0, len: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds() {
        assert_eq!(Passcode::new(1, 0), Err(Error::InputOutOfRange));
        assert_eq!(Passcode::new(1, 10), Err(Error::InputOutOfRange));
        assert_eq!(Passcode::new(12345, 4), Err(Error::InputOutOfRange));
        assert!(Passcode::new(999_999_999, 9).is_ok());
        assert_eq!(Passcode::from_digits(&[]), Err(Error::InputOutOfRange));
        assert_eq!(Passcode::from_digits(&[1, 10]), Err(Error::InputOutOfRange));
    }

    #[test]
    fn digits_keep_leading_zeros() {
        let passcode = Passcode::new(42, 4).unwrap();
        assert_eq!(passcode.digits().as_slice(), &[0, 0, 4, 2]);
        assert_eq!(Passcode::from_digits(&[0, 0, 4, 2]).unwrap(), passcode);
    }

    #[test]
    fn only_significant_digits_compared() {
        let passcode = Passcode::new(1234, 4).unwrap();
        assert_eq!(passcode.matches(&[1, 2, 3, 4]), Ok(true));
        assert_eq!(passcode.matches(&[1, 2, 3, 4, 5]), Ok(true));
        assert_eq!(passcode.matches(&[1, 2, 3, 4, 9]), Ok(true));
        assert_eq!(passcode.matches(&[1, 2, 3]), Ok(false));
        assert_eq!(passcode.matches(&[1, 2, 3, 5]), Ok(false));
        assert_eq!(passcode.matches(&[1, 2, 3, 11]), Err(Error::InputOutOfRange));
    }

    #[test]
    fn short_passcode_does_not_match_padded_input() {
        let passcode = Passcode::new(12, 2).unwrap();
        assert_eq!(passcode.matches(&[0, 0, 1, 2]), Ok(false));
        assert_eq!(passcode.matches(&[1, 2]), Ok(true));

        let padded = Passcode::new(12, 4).unwrap();
        assert_eq!(padded.matches(&[1, 2]), Ok(false));
        assert_eq!(padded.matches(&[0, 0, 1, 2]), Ok(true));
    }
}
