//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::debug;

use super::AppConfig;
use crate::domain::decimal::MathContext;

/// File consulted when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
  let path = path.as_ref();

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)
    .with_context(|| format!("Invalid configuration in {}", path.display()))?;

  debug!(
    path = %path.display(),
    precision = config.calculator.precision,
    limit_margin = %config.trading.limit_margin,
    "Configuration loaded"
  );

  Ok(config)
}

/// Load `path` if given, else `config.toml` when present, else defaults.
///
/// An explicitly requested file must exist.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
  match path {
    Some(path) => load_config(path),
    None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
    None => Ok(AppConfig::default()),
  }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse TOML")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Calculator precision within the supported range
/// - Limit margin in [0, 1)
/// - Non-zero ledger timeout
pub fn validate_config(config: &AppConfig) -> Result<()> {
  let precision = config.calculator.precision;
  anyhow::ensure!(
    (MathContext::MIN_PRECISION..=MathContext::MAX_PRECISION).contains(&precision),
    "calculator.precision must be in [{}, {}], got {}",
    MathContext::MIN_PRECISION,
    MathContext::MAX_PRECISION,
    precision
  );

  let margin = config.trading.limit_margin;
  anyhow::ensure!(
    margin >= Decimal::ZERO && margin < Decimal::ONE,
    "trading.limit_margin must be in [0, 1), got {}",
    margin
  );
  anyhow::ensure!(
    config.trading.ledger_timeout_ms > 0,
    "trading.ledger_timeout_ms must be positive"
  );

  anyhow::ensure!(
    !config.logging.level.trim().is_empty(),
    "logging.level must not be empty"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_file_yields_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.calculator.precision, 80);
    assert_eq!(config.trading.limit_margin, dec!(0));
    assert_eq!(config.trading.ledger_timeout_ms, 10_000);
    assert_eq!(config.logging.level, "warn");
    assert!(!config.logging.json);
  }

  #[test]
  fn test_full_file() {
    let config = parse_config(
      r#"
        [calculator]
        precision = 120

        [trading]
        limit_margin = "0.05"
        ledger_timeout_ms = 2500

        [logging]
        level = "debug"
        json = true
      "#,
    )
    .unwrap();
    assert_eq!(config.calculator.precision, 120);
    assert_eq!(config.trading.limit_margin, dec!(0.05));
    assert_eq!(config.trading.ledger_timeout_ms, 2500);
    assert!(config.logging.json);
  }

  #[test]
  fn test_rejects_out_of_range_values() {
    assert!(parse_config("[calculator]\nprecision = 16").is_err());
    assert!(parse_config("[trading]\nlimit_margin = \"1\"").is_err());
    assert!(parse_config("[trading]\nlimit_margin = \"-0.1\"").is_err());
    assert!(parse_config("[trading]\nledger_timeout_ms = 0").is_err());
    assert!(parse_config("[bot]\nname = \"x\"").is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    assert!(load_or_default(Some(Path::new("does/not/exist.toml"))).is_err());
  }
}
