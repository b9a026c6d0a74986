//! Domain layer - LMSR math and the types it operates on.
//!
//! Pure computation: no I/O, no async, no logging. Everything here is
//! deterministic and testable in isolation.

pub mod amount;
pub mod decimal;
pub mod error;
pub mod fees;
pub mod lmsr;
pub mod market;

// Re-export core types for convenience
pub use amount::Amount;
pub use decimal::{BigDecimal, MathContext, Rounding};
pub use error::LmsrError;
pub use fees::{FeeFactor, FEE_RANGE};
pub use lmsr::LmsrCalculator;
pub use market::{
    CostRequest, MarginalPriceRequest, MarketId, MarketSnapshot, OutcomeDistribution,
    OutcomeTokenCountRequest, ProfitRequest, TradeQuoteRequest,
};
