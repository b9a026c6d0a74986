//! Trade Planner - Quote-then-Submit Sequencing
//!
//! Turns a trading intent into a bounded ledger transaction:
//! - Fetch the market state from the ledger
//! - Quote the trade off-chain with the market's fee
//! - Derive a spending limit (buy) or minimum proceeds (sell)
//! - Submit the trade with that limit
//!
//! The ledger recomputes the amounts itself; the limit only protects the
//! trader against the state moving between quote and execution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use num_bigint::BigInt;
use num_traits::Zero;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::TradingConfig;
use crate::domain::amount::Amount;
use crate::domain::decimal::BigDecimal;
use crate::domain::lmsr::LmsrCalculator;
use crate::domain::market::MarketId;
use crate::ports::ledger::{LedgerService, TradeReceipt};

/// Intent to buy outcome tokens.
#[derive(Debug, Clone)]
pub struct BuyOrder {
  pub market: MarketId,
  pub outcome_token_index: usize,
  pub outcome_token_count: Amount,
  /// Explicit spending limit; skips the quote when set.
  pub cost: Option<Amount>,
  /// Overrides the planner's default margin.
  pub limit_margin: Option<Decimal>,
}

/// Intent to sell outcome tokens.
#[derive(Debug, Clone)]
pub struct SellOrder {
  pub market: MarketId,
  pub outcome_token_index: usize,
  pub outcome_token_count: Amount,
  /// Explicit minimum proceeds; skips the quote when set.
  pub min_profit: Option<Amount>,
  /// Overrides the planner's default margin.
  pub limit_margin: Option<Decimal>,
}

impl BuyOrder {
  pub fn new(market: impl Into<MarketId>, outcome_token_index: usize, outcome_token_count: Amount) -> Self {
    Self {
      market: market.into(),
      outcome_token_index,
      outcome_token_count,
      cost: None,
      limit_margin: None,
    }
  }
}

impl SellOrder {
  pub fn new(market: impl Into<MarketId>, outcome_token_index: usize, outcome_token_count: Amount) -> Self {
    Self {
      market: market.into(),
      outcome_token_index,
      outcome_token_count,
      min_profit: None,
      limit_margin: None,
    }
  }
}

/// Plans and submits LMSR trades against a ledger.
pub struct TradePlanner<L: LedgerService> {
  /// Ledger port.
  ledger: Arc<L>,
  /// Off-chain pricing.
  calculator: LmsrCalculator,
  /// Default slack applied to quotes.
  limit_margin: Decimal,
  /// Bound on every ledger call.
  ledger_timeout: Duration,
}

impl<L: LedgerService> TradePlanner<L> {
  /// Create a new planner.
  ///
  /// Fails if the configured limit margin is outside `[0, 1)`.
  pub fn new(ledger: Arc<L>, calculator: LmsrCalculator, config: &TradingConfig) -> Result<Self> {
    check_margin(config.limit_margin)?;
    Ok(Self {
      ledger,
      calculator,
      limit_margin: config.limit_margin,
      ledger_timeout: Duration::from_millis(config.ledger_timeout_ms),
    })
  }

  pub fn calculator(&self) -> &LmsrCalculator {
    &self.calculator
  }

  /// Buy outcome tokens with a cost limit.
  ///
  /// The limit is the explicit `cost` if given, else the quoted cost
  /// widened by the limit margin and rounded up.
  #[instrument(skip(self, order), fields(market = %order.market, outcome = order.outcome_token_index))]
  pub async fn buy_outcome_tokens(&self, order: &BuyOrder) -> Result<TradeReceipt> {
    let ticket = Uuid::new_v4();
    let count = order.outcome_token_count.as_bigint();

    let max_cost = match &order.cost {
      Some(cost) => cost.as_bigint().clone(),
      None => {
        let margin = self.margin(order.limit_margin)?;
        let snapshot = self
          .with_timeout("market_state", self.ledger.market_state(&order.market))
          .await?;
        let request = snapshot.cost_request(order.outcome_token_index, order.outcome_token_count.clone());
        let quote = self
          .calculator
          .calc_cost(&request)
          .context("Failed to quote buy")?
          .ceil();
        let limit = buy_limit(&quote, margin);
        debug!(%ticket, %quote, %limit, %margin, "Buy quoted");
        limit
      }
    };

    let receipt = self
      .with_timeout(
        "buy",
        self
          .ledger
          .buy(&order.market, order.outcome_token_index, count, &max_cost),
      )
      .await?;

    info!(
      %ticket,
      count = %receipt.outcome_token_count,
      paid = %receipt.collateral,
      fees = %receipt.market_fees,
      %max_cost,
      "Outcome tokens bought"
    );
    Ok(receipt)
  }

  /// Sell outcome tokens with a minimum-proceeds limit.
  ///
  /// The limit is the explicit `min_profit` if given, else the quoted
  /// profit narrowed by the limit margin and rounded down.
  #[instrument(skip(self, order), fields(market = %order.market, outcome = order.outcome_token_index))]
  pub async fn sell_outcome_tokens(&self, order: &SellOrder) -> Result<TradeReceipt> {
    let ticket = Uuid::new_v4();
    let count = order.outcome_token_count.as_bigint();

    let min_profit = match &order.min_profit {
      Some(min_profit) => min_profit.as_bigint().clone(),
      None => {
        let margin = self.margin(order.limit_margin)?;
        let snapshot = self
          .with_timeout("market_state", self.ledger.market_state(&order.market))
          .await?;
        let request = snapshot.profit_request(order.outcome_token_index, order.outcome_token_count.clone());
        let quote = self
          .calculator
          .calc_profit(&request)
          .context("Failed to quote sell")?
          .floor();
        let limit = sell_minimum(&quote, margin);
        debug!(%ticket, %quote, %limit, %margin, "Sell quoted");
        limit
      }
    };

    let receipt = self
      .with_timeout(
        "sell",
        self
          .ledger
          .sell(&order.market, order.outcome_token_index, count, &min_profit),
      )
      .await?;

    info!(
      %ticket,
      count = %receipt.outcome_token_count,
      received = %receipt.collateral,
      fees = %receipt.market_fees,
      %min_profit,
      "Outcome tokens sold"
    );
    Ok(receipt)
  }

  /// Most tokens of `outcome` that `budget` buys at the market's current
  /// state, fees included.
  #[instrument(skip(self, budget), fields(budget = %budget))]
  pub async fn max_purchasable(&self, market: &MarketId, outcome: usize, budget: &Amount) -> Result<BigInt> {
    let snapshot = self
      .with_timeout("market_state", self.ledger.market_state(market))
      .await?;
    let request = snapshot.outcome_token_count_request(outcome, budget.clone());
    let count = self
      .calculator
      .calc_outcome_token_count(&request)
      .context("Failed to compute purchasable token count")?
      .floor();
    debug!(%count, "Purchasable tokens computed");
    Ok(count)
  }

  /// Marginal price of every outcome of `market`.
  #[instrument(skip(self))]
  pub async fn marginal_prices(&self, market: &MarketId) -> Result<Vec<BigDecimal>> {
    let snapshot = self
      .with_timeout("market_state", self.ledger.market_state(market))
      .await?;
    (0..snapshot.outcome_count())
      .map(|index| {
        self
          .calculator
          .calc_marginal_price(&snapshot.marginal_price_request(index))
          .with_context(|| format!("Failed to price outcome {index}"))
      })
      .collect()
  }

  fn margin(&self, requested: Option<Decimal>) -> Result<Decimal> {
    let margin = requested.unwrap_or(self.limit_margin);
    check_margin(margin)?;
    Ok(margin)
  }

  async fn with_timeout<T>(
    &self,
    operation: &'static str,
    call: impl Future<Output = Result<T>>,
  ) -> Result<T> {
    match tokio::time::timeout(self.ledger_timeout, call).await {
      Ok(result) => result.with_context(|| format!("Ledger {operation} failed")),
      Err(_) => {
        warn!(
          operation,
          timeout_ms = self.ledger_timeout.as_millis() as u64,
          "Ledger call timed out"
        );
        anyhow::bail!(
          "Ledger {operation} timed out after {} ms",
          self.ledger_timeout.as_millis()
        )
      }
    }
  }
}

fn check_margin(margin: Decimal) -> Result<()> {
  anyhow::ensure!(
    margin >= Decimal::ZERO && margin < Decimal::ONE,
    "limit margin must be in [0, 1), got {}",
    margin
  );
  Ok(())
}

/// `ceil(cost * (1 + margin))`.
pub fn buy_limit(cost: &BigInt, margin: Decimal) -> BigInt {
  let cost = BigDecimal::from(cost);
  (&cost + &slack(&cost, margin)).ceil()
}

/// `floor(profit * (1 - margin))`, never negative.
pub fn sell_minimum(profit: &BigInt, margin: Decimal) -> BigInt {
  let profit = BigDecimal::from(profit);
  (&profit - &slack(&profit, margin)).floor().max(BigInt::zero())
}

fn slack(amount: &BigDecimal, margin: Decimal) -> BigDecimal {
  let margin = BigDecimal::from(margin);
  amount.mul_scaled(&margin, margin.scale().max(0))
}
