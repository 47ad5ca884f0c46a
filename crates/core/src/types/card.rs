//! Payment card data.
//!
//! Checkout never charges cards; it only keeps a receipt-style snapshot. The
//! raw [`CardNumber`] therefore has no `Serialize` impl and a redacting
//! `Debug` impl, and the only thing that can be derived from it is a
//! [`MaskedCardNumber`] holding the last four digits.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing card data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    /// Card number contains something other than digits, spaces or dashes.
    #[error("card number must contain only digits")]
    NonDigit,
    /// Card number has fewer than 15 digits.
    #[error("card number must have at least {min} digits (got {len})")]
    TooShort {
        /// Digits supplied.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },
    /// Expiry is not in `MM/YY` form.
    #[error("expiry must be in MM/YY format")]
    ExpiryFormat,
    /// Expiry month outside 01-12.
    #[error("expiry month must be between 01 and 12")]
    ExpiryMonth,
    /// Stored masked value is malformed.
    #[error("malformed masked card number")]
    Masked,
}

/// A full card number as typed by the customer.
///
/// Spaces and dashes are stripped before validation. This value must never
/// leave the checkout assembler; call [`CardNumber::mask`] instead.
#[derive(Clone, PartialEq, Eq)]
pub struct CardNumber(String);

impl CardNumber {
    /// Minimum number of digits (American Express).
    pub const MIN_DIGITS: usize = 15;

    /// Parse a card number, ignoring whitespace and dashes.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::NonDigit`] or [`CardError::TooShort`].
    pub fn parse(s: &str) -> Result<Self, CardError> {
        let digits: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(CardError::NonDigit);
        }

        let len = digits.len();
        if len < Self::MIN_DIGITS {
            return Err(CardError::TooShort {
                len,
                min: Self::MIN_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Reduce to the persisted representation (`****` + last four digits).
    #[must_use]
    pub fn mask(&self) -> MaskedCardNumber {
        let start = self.0.len().saturating_sub(4);
        let last4 = self.0.get(start..).unwrap_or_default();
        MaskedCardNumber(format!("{}{last4}", MaskedCardNumber::PREFIX))
    }
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CardNumber").field(&"[REDACTED]").finish()
    }
}

/// A card number reduced to its last four digits, e.g. `****4242`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MaskedCardNumber(String);

impl MaskedCardNumber {
    const PREFIX: &'static str = "****";

    /// Rebuild from a stored value, checking it holds at most four digits.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Masked`] if the value is not `****` followed by
    /// exactly four digits.
    pub fn from_stored(s: &str) -> Result<Self, CardError> {
        let last4 = s.strip_prefix(Self::PREFIX).ok_or(CardError::Masked)?;
        if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
            return Err(CardError::Masked);
        }
        Ok(Self(s.to_owned()))
    }

    /// The masked representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The visible last four digits.
    #[must_use]
    pub fn last4(&self) -> &str {
        self.0.get(Self::PREFIX.len()..).unwrap_or_default()
    }
}

impl fmt::Display for MaskedCardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Card expiry in `MM/YY` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardExpiry {
    month: u8,
    year: u8,
}

impl CardExpiry {
    /// Parse `MM/YY` (surrounding whitespace allowed).
    ///
    /// # Errors
    ///
    /// Returns [`CardError::ExpiryFormat`] or [`CardError::ExpiryMonth`].
    pub fn parse(s: &str) -> Result<Self, CardError> {
        let (mm, yy) = s.trim().split_once('/').ok_or(CardError::ExpiryFormat)?;
        let two_digits = |part: &str| part.len() == 2 && part.chars().all(|c| c.is_ascii_digit());
        if !two_digits(mm) || !two_digits(yy) {
            return Err(CardError::ExpiryFormat);
        }

        let month: u8 = mm.parse().map_err(|_| CardError::ExpiryFormat)?;
        let year: u8 = yy.parse().map_err(|_| CardError::ExpiryFormat)?;
        if !(1..=12).contains(&month) {
            return Err(CardError::ExpiryMonth);
        }

        Ok(Self { month, year })
    }

    /// Month, 1-12.
    #[must_use]
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// Two-digit year.
    #[must_use]
    pub const fn year(&self) -> u8 {
        self.year
    }
}

impl fmt::Display for CardExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year)
    }
}

impl Serialize for CardExpiry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CardExpiry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
