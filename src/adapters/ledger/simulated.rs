//! Simulated Ledger - In-Memory Market Maker
//!
//! Executes trades against in-memory markets the way an independent
//! on-chain market maker would: amounts are computed at a higher
//! precision than the caller's calculator and rounded to the nearest
//! unit, fees are charged on top, and submitted limits are enforced.
//! Used for dry runs and to exercise the trade planner end to end.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use num_bigint::BigInt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::amount::Amount;
use crate::domain::decimal::{BigDecimal, MathContext, Rounding};
use crate::domain::fees::FeeFactor;
use crate::domain::lmsr::LmsrCalculator;
use crate::domain::market::{MarketId, MarketSnapshot};
use crate::ports::ledger::{LedgerService, TradeReceipt};

/// Digits the simulation carries beyond the default calculator.
const EXTRA_PRECISION: u32 = 40;

/// Per-market book kept by the simulation.
#[derive(Debug, Clone)]
struct MarketBook {
  snapshot: MarketSnapshot,
  /// Fees collected so far.
  collected_fees: BigInt,
}

/// In-memory `LedgerService`.
pub struct SimulatedLedger {
  calculator: LmsrCalculator,
  markets: RwLock<HashMap<MarketId, MarketBook>>,
}

impl SimulatedLedger {
  /// Ledger computing at the default precision plus a margin.
  pub fn new() -> Self {
    let precision = (MathContext::DEFAULT_PRECISION + EXTRA_PRECISION).min(MathContext::MAX_PRECISION);
    let calculator = LmsrCalculator::with_precision(precision).unwrap_or_default();
    Self::with_calculator(calculator)
  }

  pub fn with_calculator(calculator: LmsrCalculator) -> Self {
    Self {
      calculator,
      markets: RwLock::new(HashMap::new()),
    }
  }

  /// Create a market with `outcome_count` outcomes and no inventory.
  #[instrument(skip(self, funding, fee_factor), fields(funding = %funding, fee = %fee_factor))]
  pub async fn open_market(
    &self,
    market: impl Into<MarketId> + std::fmt::Debug,
    outcome_count: usize,
    funding: Amount,
    fee_factor: Amount,
  ) -> Result<()> {
    anyhow::ensure!(outcome_count > 0, "A market needs at least one outcome");
    anyhow::ensure!(!funding.is_negative(), "Funding must be non-negative, got {}", funding);
    FeeFactor::new(fee_factor.as_bigint().clone())?;

    let snapshot = MarketSnapshot {
      net_outcome_tokens_sold: vec![Amount::zero(); outcome_count],
      funding,
      fee_factor,
    };
    self.insert_market(market, snapshot).await
  }

  /// Register a market with an arbitrary starting state.
  pub async fn insert_market(&self, market: impl Into<MarketId>, snapshot: MarketSnapshot) -> Result<()> {
    let market = market.into();
    let mut markets = self.markets.write().await;
    anyhow::ensure!(!markets.contains_key(&market), "Market {market} already exists");
    info!(%market, outcomes = snapshot.outcome_count(), "Simulated market opened");
    markets.insert(
      market,
      MarketBook {
        snapshot,
        collected_fees: BigInt::default(),
      },
    );
    Ok(())
  }

  /// Fees the market has collected so far.
  pub async fn collected_fees(&self, market: &MarketId) -> Result<BigInt> {
    let markets = self.markets.read().await;
    let book = markets
      .get(market)
      .with_context(|| format!("Unknown market {market}"))?;
    Ok(book.collected_fees.clone())
  }
}

impl Default for SimulatedLedger {
  fn default() -> Self {
    Self::new()
  }
}

/// Nearest integer, halves away from zero.
fn nearest(value: &BigDecimal) -> BigInt {
  value.rescale(0, Rounding::HalfUp).floor()
}

#[async_trait]
impl LedgerService for SimulatedLedger {
  async fn market_state(&self, market: &MarketId) -> Result<MarketSnapshot> {
    let markets = self.markets.read().await;
    markets
      .get(market)
      .map(|book| book.snapshot.clone())
      .with_context(|| format!("Unknown market {market}"))
  }

  #[instrument(skip(self, count, max_cost), fields(count = %count, max_cost = %max_cost))]
  async fn buy(
    &self,
    market: &MarketId,
    outcome: usize,
    count: &BigInt,
    max_cost: &BigInt,
  ) -> Result<TradeReceipt> {
    let mut markets = self.markets.write().await;
    let book = markets
      .get_mut(market)
      .with_context(|| format!("Unknown market {market}"))?;

    let mut request = book.snapshot.cost_request(outcome, Amount::from(count.clone()));
    request.fee_factor = None;
    let base = nearest(&self.calculator.unrounded_cost(&request)?);
    let fee = FeeFactor::new(book.snapshot.fee_factor.as_bigint().clone())?;
    let market_fees = fee.fee_on(&base);
    let collateral = &base + &market_fees;

    anyhow::ensure!(
      &collateral <= max_cost,
      "Buy of {} tokens costs {} which exceeds the limit {}",
      count,
      collateral,
      max_cost
    );

    let slot = &mut book.snapshot.net_outcome_tokens_sold[outcome];
    *slot = Amount::from(slot.as_bigint() + count);
    book.collected_fees += &market_fees;
    debug!(%collateral, %market_fees, "Simulated buy executed");

    Ok(TradeReceipt {
      outcome_token_index: outcome,
      outcome_token_count: count.clone(),
      collateral,
      market_fees,
    })
  }

  #[instrument(skip(self, count, min_profit), fields(count = %count, min_profit = %min_profit))]
  async fn sell(
    &self,
    market: &MarketId,
    outcome: usize,
    count: &BigInt,
    min_profit: &BigInt,
  ) -> Result<TradeReceipt> {
    let mut markets = self.markets.write().await;
    let book = markets
      .get_mut(market)
      .with_context(|| format!("Unknown market {market}"))?;

    let mut request = book.snapshot.profit_request(outcome, Amount::from(count.clone()));
    request.fee_factor = None;
    let base = nearest(&self.calculator.unrounded_profit(&request)?);
    let fee = FeeFactor::new(book.snapshot.fee_factor.as_bigint().clone())?;
    let market_fees = fee.fee_on(&base);
    let collateral = &base - &market_fees;

    anyhow::ensure!(
      &collateral >= min_profit,
      "Sale of {} tokens yields {} which is below the minimum {}",
      count,
      collateral,
      min_profit
    );

    let slot = &mut book.snapshot.net_outcome_tokens_sold[outcome];
    *slot = Amount::from(slot.as_bigint() - count);
    book.collected_fees += &market_fees;
    debug!(%collateral, %market_fees, "Simulated sell executed");

    Ok(TradeReceipt {
      outcome_token_index: outcome,
      outcome_token_count: count.clone(),
      collateral,
      market_fees,
    })
  }
}
