//! Ledger Port - Remote Market Maker Interface
//!
//! The ledger is the source of truth for a market: it holds the
//! outcome distribution, the funding and the fee, and it executes the
//! actual trades. Off-chain quotes are only estimates of what the
//! ledger will charge, which is why every trade carries a limit.

use async_trait::async_trait;
use num_bigint::BigInt;

use crate::domain::market::{MarketId, MarketSnapshot};

/// Outcome of a trade executed by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
  /// Outcome that was traded.
  pub outcome_token_index: usize,
  /// Tokens bought or sold.
  pub outcome_token_count: BigInt,
  /// Collateral paid (buy) or received (sell), fees included.
  pub collateral: BigInt,
  /// Portion of `collateral` kept by the market as fees.
  pub market_fees: BigInt,
}

/// Trait for ledger providers.
///
/// Implementors talk to whatever executes the market maker: a chain
/// node, an RPC gateway, or the in-memory simulation.
#[async_trait]
pub trait LedgerService: Send + Sync + 'static {
  /// Current state of a market.
  async fn market_state(&self, market: &MarketId) -> anyhow::Result<MarketSnapshot>;

  /// Buy `count` tokens of `outcome`, paying at most `max_cost`.
  ///
  /// Must fail without side effects if the actual cost exceeds the limit.
  async fn buy(
    &self,
    market: &MarketId,
    outcome: usize,
    count: &BigInt,
    max_cost: &BigInt,
  ) -> anyhow::Result<TradeReceipt>;

  /// Sell `count` tokens of `outcome`, receiving at least `min_profit`.
  ///
  /// Must fail without side effects if the actual profit is below the limit.
  async fn sell(
    &self,
    market: &MarketId,
    outcome: usize,
    count: &BigInt,
    min_profit: &BigInt,
  ) -> anyhow::Result<TradeReceipt>;
}
