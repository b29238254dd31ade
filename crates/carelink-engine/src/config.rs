use carelink_core::{TokenRate, UserId, BASIS_POINTS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for [`EngineConfig`].
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fixed platform fees. Amounts are fiat cents and are converted to tokens at
/// the configured rate when charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeSchedule {
    /// One-time credit granted when a wallet is activated.
    #[serde(default = "default_activation_credit_cents")]
    pub activation_credit_cents: u64,
    /// Origination fee charged to each party of a new contract.
    #[serde(default = "default_contract_fee_cents")]
    pub contract_fee_cents: u64,
    /// Commission withheld from tips, in basis points.
    #[serde(default = "default_commission_bps")]
    pub commission_bps: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            activation_credit_cents: default_activation_credit_cents(),
            contract_fee_cents: default_contract_fee_cents(),
            commission_bps: default_commission_bps(),
        }
    }
}

/// Engine configuration.
///
/// ```toml
/// token_rate = "10"
/// treasury_user = "platform-treasury"
/// anchor_timeout_ms = 5000
/// max_commit_attempts = 16
///
/// [fees]
/// activation_credit_cents = 100
/// contract_fee_cents = 50
/// commission_bps = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Tokens per fiat cent.
    #[serde(default = "default_token_rate")]
    pub token_rate: TokenRate,
    /// Fee schedule.
    #[serde(default)]
    pub fees: FeeSchedule,
    /// User whose account collects fees and commissions.
    #[serde(default = "default_treasury_user")]
    pub treasury_user: UserId,
    /// Upper bound on one anchoring call.
    #[serde(default = "default_anchor_timeout_ms")]
    pub anchor_timeout_ms: u64,
    /// Optimistic commit attempts before giving up with `Contention`.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

fn default_token_rate() -> TokenRate {
    TokenRate::whole(10).expect("10 is a valid rate")
}

fn default_treasury_user() -> UserId {
    UserId::new("platform-treasury")
}

fn default_activation_credit_cents() -> u64 {
    100
}

fn default_contract_fee_cents() -> u64 {
    50
}

fn default_commission_bps() -> u32 {
    1000
}

fn default_anchor_timeout_ms() -> u64 {
    5000
}

fn default_max_commit_attempts() -> u32 {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_rate: default_token_rate(),
            fees: FeeSchedule::default(),
            treasury_user: default_treasury_user(),
            anchor_timeout_ms: default_anchor_timeout_ms(),
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if u64::from(self.fees.commission_bps) > BASIS_POINTS {
            return Err(ConfigError::Invalid(format!(
                "commission_bps {} exceeds {}",
                self.fees.commission_bps, BASIS_POINTS
            )));
        }
        if self.anchor_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "anchor_timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_commit_attempts must be positive".to_string(),
            ));
        }
        if self.treasury_user.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "treasury_user must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Anchor timeout as a duration.
    pub fn anchor_timeout(&self) -> Duration {
        Duration::from_millis(self.anchor_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = EngineConfig::from_toml_str(
            r#"
            token_rate = "0.5"
            [fees]
            contract_fee_cents = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.token_rate.to_string(), "0.5");
        assert_eq!(config.fees.contract_fee_cents, 5000);
        assert_eq!(config.fees.commission_bps, 1000);
        assert_eq!(config.anchor_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("token_rate = \"0\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[fees]\ncommission_bps = 10001"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(EngineConfig::from_toml_str("anchor_timeout_ms = 0").is_err());
        assert!(EngineConfig::from_toml_str("max_commit_attempts = 0").is_err());
        assert!(EngineConfig::from_toml_str("surprise = 1").is_err());
    }
}
