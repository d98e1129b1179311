use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FiatError {
    #[error("Not a recognized fiat currency: `{0}`")]
    Parse(String),
}

/// Fiat currencies that settle trades. Records in these assets never become inventory.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Fiat {
    Aud,
    Cad,
    Chf,
    Eur,
    Gbp,
    Jpy,
    Usd,
}

impl Fiat {
    /// Check whether an asset symbol names a fiat currency.
    pub fn is_fiat(asset: &str) -> bool {
        asset.parse::<Self>().is_ok()
    }
}

impl fmt::Display for Fiat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aud => "AUD",
            Self::Cad => "CAD",
            Self::Chf => "CHF",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Usd => "USD",
        })
    }
}

impl FromStr for Fiat {
    type Err = FiatError;

    /// Case-insensitive. Kraken's `Z`-prefixed ledger codes are accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUD" | "ZAUD" => Ok(Self::Aud),
            "CAD" | "ZCAD" => Ok(Self::Cad),
            "CHF" => Ok(Self::Chf),
            "EUR" | "ZEUR" => Ok(Self::Eur),
            "GBP" | "ZGBP" => Ok(Self::Gbp),
            "JPY" | "ZJPY" => Ok(Self::Jpy),
            "USD" | "ZUSD" => Ok(Self::Usd),
            _ => Err(FiatError::Parse(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fiat() {
        assert_eq!("eur".parse::<Fiat>().unwrap(), Fiat::Eur);
        assert_eq!("ZUSD".parse::<Fiat>().unwrap(), Fiat::Usd);
        assert_eq!(" Chf ".parse::<Fiat>().unwrap(), Fiat::Chf);
        assert!(Fiat::is_fiat("jpy"));
        assert!(!Fiat::is_fiat("BTC"));
        assert!(!Fiat::is_fiat("USDT"));
        assert!(!Fiat::is_fiat("XXBT"));
    }
}
