//! Configuration Module - TOML-based Calculator Configuration
//!
//! Loads and validates configuration from `config.toml`. Every section
//! is optional; omitted values fall back to the defaults below.

pub mod loader;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::decimal::MathContext;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Numeric precision of the calculator.
  #[serde(default)]
  pub calculator: CalculatorConfig,
  /// Limit margins and ledger timeouts for planned trades.
  #[serde(default)]
  pub trading: TradingConfig,
  /// Log filter and output format.
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Calculator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculatorConfig {
  /// Significant digits carried by every computation.
  #[serde(default = "default_precision")]
  pub precision: u32,
}

/// Trade planning configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
  /// Fractional slack on buy limits and sell minimums (0.05 = 5%).
  #[serde(default = "default_limit_margin")]
  pub limit_margin: Decimal,
  /// Upper bound for a single ledger call (milliseconds).
  #[serde(default = "default_ledger_timeout")]
  pub ledger_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Emit JSON lines instead of human-readable output.
  #[serde(default)]
  pub json: bool,
}

impl Default for CalculatorConfig {
  fn default() -> Self {
    Self {
      precision: default_precision(),
    }
  }
}

impl Default for TradingConfig {
  fn default() -> Self {
    Self {
      limit_margin: default_limit_margin(),
      ledger_timeout_ms: default_ledger_timeout(),
    }
  }
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: false,
    }
  }
}

// Default value functions for serde

fn default_precision() -> u32 {
  MathContext::DEFAULT_PRECISION
}

fn default_limit_margin() -> Decimal {
  dec!(0)
}

fn default_ledger_timeout() -> u64 {
  10_000
}

fn default_log_level() -> String {
  "warn".to_string()
}
