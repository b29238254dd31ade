//! Fiat/token conversion at an explicit rate.
//!
//! All arithmetic is exact integer math on minor units. Every rounding step
//! uses round-half-to-even so repeated conversions stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DECIMAL_SCALE_MAX: u32 = 18;

/// Basis points in one whole (100%).
pub const BASIS_POINTS: u64 = 10_000;

/// Errors raised by pricing arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// The rate string is not a positive decimal.
    #[error("invalid token rate '{0}'")]
    InvalidRate(String),
    /// The result does not fit in 64 bits.
    #[error("conversion of {value} overflows")]
    Overflow {
        /// Input that overflowed.
        value: u64,
    },
}

/// Tokens granted per fiat cent, as a decimal `mantissa × 10^-scale`.
///
/// Serialized as its decimal string (`"10"`, `"0.5"`) so it can be recorded
/// verbatim on ledger entries and in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenRate {
    mantissa: u64,
    scale: u32,
}

impl TokenRate {
    /// Builds a rate from mantissa and scale, normalizing trailing zeros.
    pub fn new(mantissa: u64, scale: u32) -> Result<Self, PricingError> {
        if mantissa == 0 || scale > DECIMAL_SCALE_MAX {
            return Err(PricingError::InvalidRate(format!("{}e-{}", mantissa, scale)));
        }
        let (mut mantissa, mut scale) = (mantissa, scale);
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Ok(Self { mantissa, scale })
    }

    /// Whole-number rate.
    pub fn whole(tokens_per_cent: u64) -> Result<Self, PricingError> {
        Self::new(tokens_per_cent, 0)
    }

    /// Decimal mantissa.
    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    /// Decimal scale.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    fn denominator(&self) -> u128 {
        10u128.pow(self.scale)
    }
}

impl fmt::Display for TokenRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let digits = format!("{:0>width$}", self.mantissa, width = self.scale as usize + 1);
        let split = digits.len() - self.scale as usize;
        write!(f, "{}.{}", &digits[..split], &digits[split..])
    }
}

impl FromStr for TokenRate {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PricingError::InvalidRate(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || (s.contains('.') && frac_part.is_empty())
        {
            return Err(invalid());
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        let mantissa: u64 = format!("{}{}", int_part, frac_part)
            .parse()
            .map_err(|_| invalid())?;
        Self::new(mantissa, scale).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TokenRate {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenRate> for String {
    fn from(value: TokenRate) -> Self {
        value.to_string()
    }
}

/// Stateless converter bound to one injected rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConverter {
    rate: TokenRate,
}

impl PricingConverter {
    /// Creates a converter for `rate`.
    pub fn new(rate: TokenRate) -> Self {
        Self { rate }
    }

    /// Rate used by this converter; record it next to any converted amount.
    pub fn rate(&self) -> TokenRate {
        self.rate
    }

    /// `round(fiat_cents × rate)`.
    pub fn fiat_to_tokens(&self, fiat_cents: u64) -> Result<u64, PricingError> {
        let numerator = u128::from(fiat_cents)
            .checked_mul(u128::from(self.rate.mantissa))
            .ok_or(PricingError::Overflow { value: fiat_cents })?;
        narrow(
            div_round_half_even(numerator, self.rate.denominator()),
            fiat_cents,
        )
    }

    /// `round(tokens / rate)`.
    pub fn tokens_to_fiat(&self, tokens: u64) -> Result<u64, PricingError> {
        let numerator = u128::from(tokens)
            .checked_mul(self.rate.denominator())
            .ok_or(PricingError::Overflow { value: tokens })?;
        narrow(
            div_round_half_even(numerator, u128::from(self.rate.mantissa)),
            tokens,
        )
    }
}

/// `round(amount × bps / 10 000)`, half to even.
pub fn apply_basis_points(amount: u64, bps: u32) -> Result<u64, PricingError> {
    let numerator = u128::from(amount) * u128::from(bps);
    narrow(div_round_half_even(numerator, u128::from(BASIS_POINTS)), amount)
}

fn narrow(value: u128, input: u64) -> Result<u64, PricingError> {
    u64::try_from(value).map_err(|_| PricingError::Overflow { value: input })
}

/// Integer division rounding ties to the even quotient. `d` must be non-zero.
fn div_round_half_even(n: u128, d: u128) -> u128 {
    let q = n / d;
    let r = n % d;
    let twice = r * 2;
    if twice > d || (twice == d && q % 2 == 1) {
        q + 1
    } else {
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(rate: &str) -> PricingConverter {
        PricingConverter::new(rate.parse().unwrap())
    }

    #[test]
    fn whole_rate_boundaries() {
        let c = converter("10");
        assert_eq!(c.fiat_to_tokens(2500).unwrap(), 25_000);
        assert_eq!(c.tokens_to_fiat(25_000).unwrap(), 2500);
        assert_eq!(c.fiat_to_tokens(0).unwrap(), 0);
        // Ties go to the even neighbour.
        assert_eq!(c.tokens_to_fiat(5).unwrap(), 0);
        assert_eq!(c.tokens_to_fiat(15).unwrap(), 2);
        assert_eq!(c.tokens_to_fiat(25).unwrap(), 2);
        assert_eq!(c.tokens_to_fiat(35).unwrap(), 4);
        assert_eq!(c.tokens_to_fiat(14).unwrap(), 1);
        assert_eq!(c.tokens_to_fiat(16).unwrap(), 2);
    }

    #[test]
    fn fractional_rate_boundaries() {
        let c = converter("0.5");
        assert_eq!(c.fiat_to_tokens(1).unwrap(), 0);
        assert_eq!(c.fiat_to_tokens(3).unwrap(), 2);
        assert_eq!(c.fiat_to_tokens(5).unwrap(), 2);
        assert_eq!(c.fiat_to_tokens(7).unwrap(), 4);
        assert_eq!(c.tokens_to_fiat(3).unwrap(), 6);
    }

    #[test]
    fn round_trips_follow_the_rounding_rule() {
        let c = converter("10");
        for x in [0u64, 1, 49, 50, 2500, 999_999] {
            assert_eq!(c.tokens_to_fiat(c.fiat_to_tokens(x).unwrap()).unwrap(), x);
        }
        // 25 tokens -> 2.5 cents -> 2 cents -> 20 tokens.
        assert_eq!(c.fiat_to_tokens(c.tokens_to_fiat(25).unwrap()).unwrap(), 20);
        // 35 tokens -> 3.5 cents -> 4 cents -> 40 tokens.
        assert_eq!(c.fiat_to_tokens(c.tokens_to_fiat(35).unwrap()).unwrap(), 40);
        assert_eq!(c.fiat_to_tokens(c.tokens_to_fiat(30).unwrap()).unwrap(), 30);
    }

    #[test]
    fn rate_parsing_and_display() {
        assert_eq!("10".parse::<TokenRate>().unwrap().to_string(), "10");
        assert_eq!("0.5".parse::<TokenRate>().unwrap().to_string(), "0.5");
        assert_eq!("0.05".parse::<TokenRate>().unwrap().to_string(), "0.05");
        assert_eq!("12.50".parse::<TokenRate>().unwrap().to_string(), "12.5");
        assert_eq!(
            "10.0".parse::<TokenRate>().unwrap(),
            TokenRate::whole(10).unwrap()
        );
        for bad in ["", "0", "0.0", "-1", "1.", ".5", "1e3", "abc"] {
            assert!(bad.parse::<TokenRate>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn overflow_is_reported() {
        let c = converter("10");
        assert_eq!(
            c.fiat_to_tokens(u64::MAX),
            Err(PricingError::Overflow { value: u64::MAX })
        );
    }

    #[test]
    fn basis_points() {
        assert_eq!(apply_basis_points(1000, 1000).unwrap(), 100);
        assert_eq!(apply_basis_points(5, 1000).unwrap(), 0);
        assert_eq!(apply_basis_points(15, 1000).unwrap(), 2);
        assert_eq!(apply_basis_points(7, 0).unwrap(), 0);
        assert_eq!(apply_basis_points(7, 10_000).unwrap(), 7);
    }
}
