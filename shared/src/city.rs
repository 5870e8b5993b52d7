use std::fmt;
use std::str::FromStr;

pub const MIN_CITY_LEN: usize = 3;
pub const MAX_CITY_LEN: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CityNameError {
    #[error("city name must be at least 3 characters, got {0}")]
    TooShort(usize),
    #[error("city name must be at most 150 characters, got {0}")]
    TooLong(usize),
    #[error("city name must contain letters only")]
    NotLetters,
}

/// A trimmed city name made of 3 to 150 letters of any alphabet.
///
/// Lookups against stored records are case-insensitive, so the original
/// casing is kept as typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityName(String);

impl CityName {
    pub fn parse(raw: &str) -> Result<Self, CityNameError> {
        let name = raw.trim();
        let len = name.chars().count();
        if len < MIN_CITY_LEN {
            return Err(CityNameError::TooShort(len));
        }
        if len > MAX_CITY_LEN {
            return Err(CityNameError::TooLong(len));
        }
        // Letter-like numerals such as `Ⅻ` are alphabetic but still digits.
        if !name.chars().all(|c| c.is_alphabetic() && !c.is_numeric()) {
            return Err(CityNameError::NotLetters);
        }
        Ok(CityName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for CityName {
    type Err = CityNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CityName::parse(s)
    }
}

impl AsRef<str> for CityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
