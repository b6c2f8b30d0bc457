//! Short identifiers used for creators, edge labels and type tags

use std::borrow::{Borrow, Cow};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Maximum length of a [`Name`] in bytes
pub const MAX_NAME_LEN: usize = 32;

/// Lowercase identifier: `[a-z0-9._]`, 1 to 32 bytes
///
/// Names label edges (`original`, `next_time_share`), tag document types
/// (`edit`, `timeshare`) and identify members. Well-known names are declared
/// as constants through [`Name::from_static`], which validates at compile time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Cow<'static, str>);

impl Name {
    /// Sorts before every valid name. Only used as a range bound.
    pub(crate) const MIN: Name = Name(Cow::Borrowed(""));

    /// Build a name from a static string
    ///
    /// # Panics
    /// Panics (at compile time in const context) if `s` is not a valid name.
    #[must_use]
    pub const fn from_static(s: &'static str) -> Self {
        assert!(check(s.as_bytes()).is_ok(), "invalid name");
        Self(Cow::Borrowed(s))
    }

    /// Parse and validate a name
    ///
    /// # Errors
    /// Returns error if the name is empty, too long, or has invalid characters
    pub fn new(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        check(s.as_bytes())?;
        Ok(Self(Cow::Owned(s)))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn check(bytes: &[u8]) -> Result<(), NameError> {
    if bytes.is_empty() {
        return Err(NameError::Empty);
    }
    if bytes.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong(bytes.len()));
    }
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !(b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'_') {
            return Err(NameError::InvalidChar(b as char));
        }
        i += 1;
    }
    Ok(())
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Name> for String {
    fn from(value: Name) -> Self {
        value.0.into_owned()
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Name::new(s).map_err(serde::de::Error::custom)
    }
}

/// Name validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name is {0} bytes long (max {MAX_NAME_LEN})")]
    TooLong(usize),

    #[error("invalid character {0:?} in name")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: Name = Name::from_static("original");

    #[test]
    fn static_and_parsed_names_compare_equal() {
        let parsed: Name = "original".parse().unwrap();
        assert_eq!(parsed, ORIGINAL);
    }

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(Name::new(""), Err(NameError::Empty));
        assert_eq!(Name::new("Alice"), Err(NameError::InvalidChar('A')));
        assert_eq!(Name::new("a b"), Err(NameError::InvalidChar(' ')));
        assert_eq!(Name::new("a".repeat(33)), Err(NameError::TooLong(33)));
    }

    #[test]
    fn serde_round_trip_validates() {
        let json = serde_json::to_string(&ORIGINAL).unwrap();
        assert_eq!(json, "\"original\"");
        assert!(serde_json::from_str::<Name>("\"Not Valid\"").is_err());
    }

    #[test]
    fn min_sorts_first() {
        assert!(Name::MIN < Name::from_static("a"));
    }
}
