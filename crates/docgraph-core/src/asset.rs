//! Fixed-precision quantities carried as content values

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Decimal quantity with a symbol, e.g. `100.00 HVOICE`
///
/// Stored as an integer amount scaled by `10^precision`, so equal strings map
/// to equal values and hashing stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    amount: i64,
    precision: u8,
    symbol: String,
}

impl Asset {
    /// Create an asset from a raw (scaled) amount
    ///
    /// # Errors
    /// Returns error if the symbol is not 1-7 uppercase letters or the
    /// precision exceeds 18
    pub fn new(amount: i64, precision: u8, symbol: impl Into<String>) -> Result<Self, AssetError> {
        let symbol = symbol.into();
        if symbol.is_empty() || symbol.len() > 7 || !symbol.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(AssetError::InvalidSymbol(symbol));
        }
        if precision > 18 {
            return Err(AssetError::PrecisionTooLarge(precision));
        }
        Ok(Self {
            amount,
            precision,
            symbol,
        })
    }

    #[inline]
    #[must_use]
    pub fn amount(&self) -> i64 {
        self.amount
    }

    #[inline]
    #[must_use]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        if self.precision == 0 {
            return write!(f, "{sign}{abs} {}", self.symbol);
        }
        let scale = 10u64.pow(u32::from(self.precision));
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / scale,
            abs % scale,
            self.symbol,
            width = usize::from(self.precision)
        )
    }
}

impl FromStr for Asset {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (quantity, symbol) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| AssetError::Malformed(s.to_string()))?;
        let (negative, digits) = match quantity.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, quantity),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(AssetError::Malformed(s.to_string()));
        }
        let precision =
            u8::try_from(fraction.len()).map_err(|_| AssetError::Malformed(s.to_string()))?;
        let amount: i64 = format!("{whole}{fraction}")
            .parse()
            .map_err(|_| AssetError::Malformed(s.to_string()))?;
        Self::new(if negative { -amount } else { amount }, precision, symbol.trim())
    }
}

impl serde::Serialize for Asset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Asset parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("malformed asset: {0:?}")]
    Malformed(String),

    #[error("invalid asset symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("asset precision {0} too large")]
    PrecisionTooLarge(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_vote_power() {
        let asset: Asset = "100.00 HVOICE".parse().unwrap();
        assert_eq!(asset.amount(), 10_000);
        assert_eq!(asset.precision(), 2);
        assert_eq!(asset.symbol(), "HVOICE");
        assert_eq!(asset.to_string(), "100.00 HVOICE");
    }

    #[test]
    fn keeps_leading_zeros_in_fraction() {
        let asset: Asset = "0.0500 SEEDS".parse().unwrap();
        assert_eq!(asset.amount(), 500);
        assert_eq!(asset.to_string(), "0.0500 SEEDS");
    }

    #[test]
    fn negative_and_integral_amounts() {
        assert_eq!("-1.50 HUSD".parse::<Asset>().unwrap().to_string(), "-1.50 HUSD");
        assert_eq!("7 HYPHA".parse::<Asset>().unwrap().to_string(), "7 HYPHA");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!("12.5".parse::<Asset>(), Err(AssetError::Malformed(_))));
        assert!(matches!("1.x0 HUSD".parse::<Asset>(), Err(AssetError::Malformed(_))));
        assert!(matches!("1.00 husd".parse::<Asset>(), Err(AssetError::InvalidSymbol(_))));
    }
}
