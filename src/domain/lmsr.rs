//! Logarithmic Market Scoring Rule (LMSR) calculator.
//!
//! Mirrors, off-chain, the math of an on-chain LMSR market maker with
//! `n` outcomes:
//!
//! - cost function `C(q) = b * ln(sum_i exp(q_i / b))`
//! - liquidity `b = funding / ln(n)`
//! - price `p_i = exp(q_i / b) / sum_j exp(q_j / b)`
//!
//! Reference: Hanson (2003) "Combinatorial Information Market Design".
//!
//! The chain computes in fixed-point integers; this module computes in
//! arbitrary-precision decimals and then rounds *against the trader*
//! (cost up, profit and share counts down), so limits derived from a
//! quote never make the transaction fail for being too optimistic.
//!
//! Every sum of exponentials is evaluated with the largest quantity
//! subtracted from each exponent (log-sum-exp), so exponent arguments
//! are never positive and nothing overflows.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use super::amount::Amount;
use super::decimal::{BigDecimal, MathContext};
use super::error::LmsrError;
use super::fees::FeeFactor;
use super::market::{CostRequest, MarginalPriceRequest, OutcomeTokenCountRequest, ProfitRequest};

/// How the market's liquidity enters the formulas.
#[derive(Debug)]
enum Liquidity {
    /// `funding == 0`: the `b -> 0` limit, handled in closed form.
    Unfunded,
    /// One outcome: every formula reduces to the identity for any `b`.
    SingleOutcome,
    /// Regular market with liquidity `b`, computed at `scale` digits.
    Scaled { b: BigDecimal, scale: i64 },
}

/// Pure LMSR calculator bound to an explicit precision context.
///
/// Cheap to clone, `Send + Sync`, holds no mutable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LmsrCalculator {
    context: MathContext,
}

impl LmsrCalculator {
    pub fn new(context: MathContext) -> Self {
        Self { context }
    }

    /// Calculator with `precision` significant digits.
    pub fn with_precision(precision: u32) -> Result<Self, LmsrError> {
        Ok(Self::new(MathContext::new(precision)?))
    }

    pub fn context(&self) -> &MathContext {
        &self.context
    }

    /// Collateral needed to buy `outcome_token_count` tokens, fee included.
    ///
    /// The LMSR cost is rounded up; the fee is added rounded up.
    pub fn calc_cost(&self, request: &CostRequest) -> Result<BigDecimal, LmsrError> {
        let fee = FeeFactor::from_option(request.fee_factor.as_ref())?;
        let base = self.unrounded_cost(request)?.ceil();
        Ok(BigDecimal::from(fee.add_to_cost(&base)))
    }

    /// Collateral received for selling `outcome_token_count` tokens, net of fee.
    ///
    /// The LMSR profit is rounded down; the fee is deducted rounded up.
    pub fn calc_profit(&self, request: &ProfitRequest) -> Result<BigDecimal, LmsrError> {
        let fee = FeeFactor::from_option(request.fee_factor.as_ref())?;
        let base = self.unrounded_profit(request)?.floor().max(BigInt::zero());
        Ok(BigDecimal::from(fee.deduct_from_profit(&base)))
    }

    /// Largest number of tokens purchasable without exceeding `cost`.
    ///
    /// Rounded down. With a fee factor, the budget has to cover the fee
    /// as well.
    pub fn calc_outcome_token_count(
        &self,
        request: &OutcomeTokenCountRequest,
    ) -> Result<BigDecimal, LmsrError> {
        let count = self.unrounded_outcome_token_count(request)?.floor();
        debug_assert!(!count.is_negative(), "negative token count {count}");
        Ok(BigDecimal::from(count))
    }

    /// Instantaneous price of an outcome, in `[0, 1]`.
    ///
    /// An estimate rather than a transactional amount: no rounding bias,
    /// rounded half-up to the context's significant digits.
    pub fn calc_marginal_price(&self, request: &MarginalPriceRequest) -> Result<BigDecimal, LmsrError> {
        let quantities = validate_market(
            &request.net_outcome_tokens_sold,
            &request.funding,
            request.outcome_token_index,
        )?;
        let index = request.outcome_token_index;

        let price = match self.liquidity(&quantities, request.funding.as_bigint(), &BigInt::zero())? {
            Liquidity::Unfunded => {
                let scale = i64::from(self.context.precision()) + MathContext::GUARD_DIGITS;
                self.context.div(&BigDecimal::one(), &BigDecimal::from(quantities.len()), scale)?
            }
            Liquidity::SingleOutcome => BigDecimal::one(),
            Liquidity::Scaled { b, scale } => {
                let (_, terms) = self.shifted_exponentials(&quantities, &b, scale)?;
                let sum = terms.iter().fold(BigDecimal::zero(), |acc, term| &acc + term);
                self.context.div(&terms[index], &sum, scale)?
            }
        };
        Ok(self.context.round(&price))
    }

    /// LMSR cost before rounding and fees.
    pub fn unrounded_cost(&self, request: &CostRequest) -> Result<BigDecimal, LmsrError> {
        let quantities = validate_market(
            &request.net_outcome_tokens_sold,
            &request.funding,
            request.outcome_token_index,
        )?;
        let shares = non_negative("outcome_token_count", &request.outcome_token_count)?;

        match self.liquidity(&quantities, request.funding.as_bigint(), shares)? {
            Liquidity::Unfunded | Liquidity::SingleOutcome => Ok(BigDecimal::from(shares)),
            Liquidity::Scaled { b, scale } => {
                let mut after = quantities.clone();
                after[request.outcome_token_index] += shares;
                self.cost_delta(&quantities, &after, &b, scale)
            }
        }
    }

    /// LMSR profit before rounding and fees.
    pub fn unrounded_profit(&self, request: &ProfitRequest) -> Result<BigDecimal, LmsrError> {
        let quantities = validate_market(
            &request.net_outcome_tokens_sold,
            &request.funding,
            request.outcome_token_index,
        )?;
        let shares = non_negative("outcome_token_count", &request.outcome_token_count)?;

        match self.liquidity(&quantities, request.funding.as_bigint(), shares)? {
            Liquidity::Unfunded => Ok(BigDecimal::zero()),
            Liquidity::SingleOutcome => Ok(BigDecimal::from(shares)),
            Liquidity::Scaled { b, scale } => {
                let mut after = quantities.clone();
                after[request.outcome_token_index] -= shares;
                self.cost_delta(&after, &quantities, &b, scale)
            }
        }
    }

    /// Exact (unfloored) token count for the budget left after fees.
    pub fn unrounded_outcome_token_count(
        &self,
        request: &OutcomeTokenCountRequest,
    ) -> Result<BigDecimal, LmsrError> {
        let quantities = validate_market(
            &request.net_outcome_tokens_sold,
            &request.funding,
            request.outcome_token_index,
        )?;
        let budget = non_negative("cost", &request.cost)?;
        let fee = FeeFactor::from_option(request.fee_factor.as_ref())?;
        let budget = fee.max_base_within(budget);

        let (b, scale) = match self.liquidity(&quantities, request.funding.as_bigint(), &budget)? {
            Liquidity::Unfunded | Liquidity::SingleOutcome => return Ok(BigDecimal::from(budget)),
            Liquidity::Scaled { b, scale } => (b, scale),
        };
        if budget.is_zero() {
            return Ok(BigDecimal::zero());
        }

        // Spending c on outcome i moves q_i to q_i + x with
        //   exp((q_i + x) / b) = exp(c / b) * S - sum_{j != i} exp(q_j / b).
        // Factoring out exp((c + m) / b) keeps every exponent non-positive:
        //   x = c + m - q_i + b * ln(S' * (1 - e^{-c/b}) + t_i * e^{-c/b})
        // with m = max(q), t_j = exp((q_j - m) / b), S' = sum_j t_j.
        let index = request.outcome_token_index;
        let (max, terms) = self.shifted_exponentials(&quantities, &b, scale)?;
        let sum = terms.iter().fold(BigDecimal::zero(), |acc, term| &acc + term);

        let exponent = -self.context.div(&BigDecimal::from(&budget), &b, scale)?;
        let decay = self.context.exp(&exponent, scale)?;
        let remaining = &BigDecimal::one() - &decay;
        let inner = &sum.mul_scaled(&remaining, scale) + &terms[index].mul_scaled(&decay, scale);
        let log = self.context.ln(&inner, scale)?;

        let offset = BigDecimal::from(budget + max - &quantities[index]);
        Ok(&offset + &b.mul_scaled(&log, scale))
    }

    /// `C(to) - C(from)` computed as `(m_to - m_from) + b * (L_to - L_from)`.
    fn cost_delta(
        &self,
        from: &[BigInt],
        to: &[BigInt],
        b: &BigDecimal,
        scale: i64,
    ) -> Result<BigDecimal, LmsrError> {
        let (max_from, log_from) = self.log_sum_exp(from, b, scale)?;
        let (max_to, log_to) = self.log_sum_exp(to, b, scale)?;
        let shift = BigDecimal::from(max_to - max_from);
        Ok(&shift + &b.mul_scaled(&(&log_to - &log_from), scale))
    }

    /// `(m, ln(sum_j exp((q_j - m) / b)))` with `m = max(q)`.
    fn log_sum_exp(
        &self,
        quantities: &[BigInt],
        b: &BigDecimal,
        scale: i64,
    ) -> Result<(BigInt, BigDecimal), LmsrError> {
        let (max, terms) = self.shifted_exponentials(quantities, b, scale)?;
        let sum = terms.iter().fold(BigDecimal::zero(), |acc, term| &acc + term);
        Ok((max, self.context.ln(&sum, scale)?))
    }

    /// `(m, [exp((q_j - m) / b)])`: every term is in `(0, 1]`, the largest is 1.
    fn shifted_exponentials(
        &self,
        quantities: &[BigInt],
        b: &BigDecimal,
        scale: i64,
    ) -> Result<(BigInt, Vec<BigDecimal>), LmsrError> {
        let max = quantities.iter().max().cloned().unwrap_or_default();
        let terms = quantities
            .iter()
            .map(|q| {
                let exponent = self.context.div(&BigDecimal::from(q - &max), b, scale)?;
                self.context.exp(&exponent, scale)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((max, terms))
    }

    fn liquidity(
        &self,
        quantities: &[BigInt],
        funding: &BigInt,
        amount: &BigInt,
    ) -> Result<Liquidity, LmsrError> {
        if funding.is_zero() {
            return Ok(Liquidity::Unfunded);
        }
        if quantities.len() == 1 {
            return Ok(Liquidity::SingleOutcome);
        }
        let scale = self
            .context
            .working_scale(quantities.iter().chain([funding, amount]))?;
        let outcomes = self.context.ln(&BigDecimal::from(quantities.len()), scale)?;
        let b = self.context.div(&BigDecimal::from(funding), &outcomes, scale)?;
        Ok(Liquidity::Scaled { b, scale })
    }
}

/// Checks the market arguments shared by every operation and copies the
/// quantities out, leaving the caller's distribution untouched.
fn validate_market(
    distribution: &[Amount],
    funding: &Amount,
    index: usize,
) -> Result<Vec<BigInt>, LmsrError> {
    if distribution.is_empty() {
        return Err(LmsrError::invalid(
            "net_outcome_tokens_sold",
            "[]",
            "at least one outcome is required",
        ));
    }
    if funding.is_negative() {
        return Err(LmsrError::invalid("funding", funding, "funding must be non-negative"));
    }
    if index >= distribution.len() {
        return Err(LmsrError::invalid(
            "outcome_token_index",
            index,
            format!("must be below the outcome count {}", distribution.len()),
        ));
    }
    Ok(distribution.iter().map(|amount| amount.as_bigint().clone()).collect())
}

fn non_negative<'a>(argument: &str, amount: &'a Amount) -> Result<&'a BigInt, LmsrError> {
    let value = amount.as_bigint();
    if value.is_negative() {
        return Err(LmsrError::invalid(argument, value, "amount must be non-negative"));
    }
    Ok(value)
}
