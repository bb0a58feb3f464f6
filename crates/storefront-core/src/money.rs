//! Currency codes and minor-unit amounts
//!
//! Prices travel through the storefront as integer minor units (cents) tagged
//! with an ISO 4217 code. Formatting for display depends on the request locale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Locale, Result};

/// ISO 4217 currency code (three uppercase ASCII letters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::UnsupportedCurrency(code));
        }
        Ok(Self(code))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of digits after the decimal separator
    pub fn minor_digits(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "CLP" | "ISK" | "VND" | "HUF" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" => 3,
            _ => 2,
        }
    }

    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "EUR" => Some("€"),
            "USD" => Some("$"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "TRY" => Some("₺"),
            "PLN" => Some("zł"),
            "CHF" => Some("CHF"),
            "SEK" | "NOK" | "DKK" => Some("kr"),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("EUR".to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

/// An amount of money in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Format for display in the given locale, e.g. `1.234,50 €` for `de`
    /// and `€1,234.50` for `en`.
    pub fn format(&self, locale: &Locale) -> String {
        let comma_decimal = locale.uses_comma_decimal();
        let (group_sep, decimal_sep) = if comma_decimal { ('.', ',') } else { (',', '.') };

        let digits = self.currency.minor_digits();
        let divisor = 10i64.pow(digits);
        let negative = self.amount_minor < 0;
        let abs = self.amount_minor.unsigned_abs();
        let major = abs / divisor as u64;
        let minor = abs % divisor as u64;

        let mut number = group_thousands(major, group_sep);
        if digits > 0 {
            number.push(decimal_sep);
            number.push_str(&format!("{:0width$}", minor, width = digits as usize));
        }
        if negative {
            number.insert(0, '-');
        }

        match self.currency.symbol() {
            Some(symbol) if comma_decimal => format!("{} {}", number, symbol),
            Some(symbol) => format!("{}{}", symbol, number),
            None => format!("{} {}", number, self.currency.code()),
        }
    }
}

fn group_thousands(value: u64, sep: char) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur() -> Currency {
        Currency::parse("eur").unwrap()
    }

    #[test]
    fn test_currency_parse_normalizes_case() {
        assert_eq!(eur().code(), "EUR");
        assert!(Currency::parse("EURO").is_err());
        assert!(Currency::parse("E1R").is_err());
    }

    #[test]
    fn test_format_english() {
        let money = Money::new(123450, Currency::parse("USD").unwrap());
        assert_eq!(money.format(&Locale::parse("en").unwrap()), "$1,234.50");
    }

    #[test]
    fn test_format_german() {
        let money = Money::new(123450, eur());
        assert_eq!(money.format(&Locale::parse("de-DE").unwrap()), "1.234,50 €");
    }

    #[test]
    fn test_format_zero_decimal_currency() {
        let money = Money::new(1500, Currency::parse("JPY").unwrap());
        assert_eq!(money.format(&Locale::parse("en").unwrap()), "¥1,500");
    }

    #[test]
    fn test_format_unknown_symbol_uses_code() {
        let money = Money::new(999, Currency::parse("BRL").unwrap());
        assert_eq!(money.format(&Locale::parse("en").unwrap()), "9.99 BRL");
    }

    #[test]
    fn test_format_negative() {
        let money = Money::new(-250, eur());
        assert_eq!(money.format(&Locale::parse("en").unwrap()), "€-2.50");
    }

    #[test]
    fn test_currency_serde_roundtrip_rejects_invalid() {
        let parsed: std::result::Result<Currency, _> = serde_json::from_str("\"XX\"");
        assert!(parsed.is_err());
    }
}
