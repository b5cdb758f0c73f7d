//! Country code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CountryCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryCodeError {
    /// The input string is empty.
    #[error("country code cannot be empty")]
    Empty,
    /// The input is not exactly two characters long.
    #[error("country code must be exactly {expected} letters (got {got})")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Length of the input.
        got: usize,
    },
    /// The input contains something other than ASCII letters.
    #[error("country code must contain only ASCII letters: {0}")]
    NotAlphabetic(String),
}

/// An ISO 3166-1 alpha-2 country code as used by the Storefront API
/// `CountryCode` enum (e.g. `US`, `CA`).
///
/// ## Constraints
///
/// - Exactly two ASCII letters
/// - Stored uppercase; lowercase input is normalized
///
/// ## Examples
///
/// ```
/// use pineapple_cart_core::CountryCode;
///
/// assert_eq!(CountryCode::parse("ca").unwrap().as_str(), "CA");
/// assert!(CountryCode::parse("").is_err());
/// assert!(CountryCode::parse("USA").is_err());
/// assert!(CountryCode::parse("U1").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Length of an alpha-2 code.
    pub const LENGTH: usize = 2;

    /// Parse a `CountryCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Is not exactly two characters long
    /// - Contains anything other than ASCII letters
    pub fn parse(s: &str) -> Result<Self, CountryCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CountryCodeError::Empty);
        }

        let len = s.chars().count();
        if len != Self::LENGTH {
            return Err(CountryCodeError::WrongLength {
                expected: Self::LENGTH,
                got: len,
            });
        }

        if !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError::NotAlphabetic(s.to_owned()));
        }

        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the country code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CountryCode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// `US`, the country carts are created in when none is configured.
impl Default for CountryCode {
    fn default() -> Self {
        Self("US".to_string())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CountryCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CountryCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
