//! Property-Based Tests — Calculator Invariants
//!
//! Uses `proptest` to verify that the LMSR calculator keeps its
//! rounding, monotonicity and inversion guarantees across random
//! markets. Markets are generated relative to their funding so every
//! case stays within the default precision.

use num_bigint::BigInt;
use proptest::prelude::*;
use proptest::sample::Index;

use lmsr_calculator::domain::{
    Amount, BigDecimal, FeeFactor, LmsrCalculator, MarginalPriceRequest, OutcomeTokenCountRequest,
    TradeQuoteRequest,
};

/// Random market: distribution, funding, outcome index, trade size.
#[derive(Debug, Clone)]
struct Market {
    net: Vec<Amount>,
    funding: Amount,
    index: usize,
    shares: Amount,
}

impl Market {
    fn quote(&self, shares: &Amount, fee: Option<u32>) -> TradeQuoteRequest {
        TradeQuoteRequest {
            net_outcome_tokens_sold: self.net.clone(),
            funding: self.funding.clone(),
            outcome_token_index: self.index,
            outcome_token_count: shares.clone(),
            fee_factor: fee.map(Amount::from),
        }
    }

    fn inverse(&self, cost: &BigDecimal) -> OutcomeTokenCountRequest {
        OutcomeTokenCountRequest {
            net_outcome_tokens_sold: self.net.clone(),
            funding: self.funding.clone(),
            outcome_token_index: self.index,
            cost: Amount::try_from(cost).unwrap(),
            fee_factor: None,
        }
    }

    fn price(&self, index: usize) -> MarginalPriceRequest {
        MarginalPriceRequest {
            net_outcome_tokens_sold: self.net.clone(),
            funding: self.funding.clone(),
            outcome_token_index: index,
        }
    }
}

/// Funding in [1e18, 1e21], inventories in [-F, F], trades in [F/1000, F].
fn market() -> impl Strategy<Value = Market> {
    (
        1u64..=1_000,
        prop::collection::vec(-1_000i64..=1_000, 2..=5),
        any::<Index>(),
        1u64..=1_000,
    )
        .prop_map(|(funding, ratios, index, shares)| {
            let unit = BigInt::from(funding) * BigInt::from(10u64.pow(15));
            Market {
                net: ratios.iter().map(|r| Amount::from(&unit * *r)).collect(),
                funding: Amount::from(&unit * 1_000u32),
                index: index.index(ratios.len()),
                shares: Amount::from(&unit * shares),
            }
        })
}

fn tolerance(value: &BigDecimal) -> BigDecimal {
    // 2e-9 relative, never below one unit
    let relative = value.abs().mul_scaled(&BigDecimal::new(2, 9), 0);
    relative.max(BigDecimal::one())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Spending the quoted cost buys back at least the requested shares.
    #[test]
    fn cost_then_count_round_trips(m in market()) {
        let calc = LmsrCalculator::default();
        let cost = calc.calc_cost(&m.quote(&m.shares, None)).unwrap();
        let count = calc.calc_outcome_token_count(&m.inverse(&cost)).unwrap();

        let shares = BigDecimal::from(&m.shares);
        prop_assert!(count >= shares, "count {count} < shares {shares}");
        let excess = &count - &shares;
        prop_assert!(excess <= tolerance(&shares), "count {count} drifted from {shares}");
    }

    /// Cost rounds up, profit and share counts round down.
    #[test]
    fn rounding_is_biased_against_the_trader(m in market()) {
        let calc = LmsrCalculator::default();
        let request = m.quote(&m.shares, None);

        let cost = calc.calc_cost(&request).unwrap();
        let exact_cost = calc.unrounded_cost(&request).unwrap();
        prop_assert!(cost >= exact_cost);
        prop_assert!(&cost - &exact_cost < BigDecimal::one());

        let profit = calc.calc_profit(&request).unwrap();
        let exact_profit = calc.unrounded_profit(&request).unwrap();
        prop_assert!(profit <= exact_profit);

        let inverse = m.inverse(&cost);
        let count = calc.calc_outcome_token_count(&inverse).unwrap();
        let exact_count = calc.unrounded_outcome_token_count(&inverse).unwrap();
        prop_assert!(count <= exact_count);

        prop_assert!(cost.is_integer() && profit.is_integer() && count.is_integer());
    }

    /// More shares always cost strictly more and never sell for less.
    #[test]
    fn quotes_are_monotonic_in_size(m in market(), extra in 1u64..=1_000) {
        let calc = LmsrCalculator::default();
        let bigger = Amount::from(m.shares.as_bigint() + BigInt::from(extra) * BigInt::from(10u64.pow(15)));

        let small_cost = calc.calc_cost(&m.quote(&m.shares, None)).unwrap();
        let large_cost = calc.calc_cost(&m.quote(&bigger, None)).unwrap();
        prop_assert!(large_cost > small_cost);

        let small_profit = calc.calc_profit(&m.quote(&m.shares, None)).unwrap();
        let large_profit = calc.calc_profit(&m.quote(&bigger, None)).unwrap();
        prop_assert!(large_profit >= small_profit);
    }

    /// Fees add to cost and come off profit, rounded up.
    #[test]
    fn fees_apply_on_top_of_rounded_amounts(m in market(), ppm in 0u32..=1_000_000) {
        let calc = LmsrCalculator::default();
        let fee = FeeFactor::new(ppm).unwrap();

        let base_cost = calc.calc_cost(&m.quote(&m.shares, None)).unwrap().floor();
        let cost = calc.calc_cost(&m.quote(&m.shares, Some(ppm))).unwrap();
        prop_assert_eq!(cost, BigDecimal::from(fee.add_to_cost(&base_cost)));

        let base_profit = calc.calc_profit(&m.quote(&m.shares, None)).unwrap().floor();
        let profit = calc.calc_profit(&m.quote(&m.shares, Some(ppm))).unwrap();
        prop_assert_eq!(profit, BigDecimal::from(fee.deduct_from_profit(&base_profit)));
    }

    /// Buying and immediately selling the same shares never yields a profit.
    #[test]
    fn buy_then_sell_is_not_an_arbitrage(m in market()) {
        let calc = LmsrCalculator::default();
        let cost = calc.calc_cost(&m.quote(&m.shares, None)).unwrap();

        let mut after = m.clone();
        let slot = &mut after.net[m.index];
        *slot = Amount::from(slot.as_bigint() + m.shares.as_bigint());
        let profit = calc.calc_profit(&after.quote(&m.shares, None)).unwrap();
        prop_assert!(profit <= cost);
    }

    /// Marginal prices are probabilities and sum to one.
    #[test]
    fn marginal_prices_form_a_distribution(m in market()) {
        let calc = LmsrCalculator::default();
        let mut total = BigDecimal::zero();
        for index in 0..m.net.len() {
            let price = calc.calc_marginal_price(&m.price(index)).unwrap();
            prop_assert!(!price.is_negative() && price <= BigDecimal::one());
            total = &total + &price;
        }
        prop_assert!((&total - &BigDecimal::one()).abs() < BigDecimal::new(1, 60));
    }

    /// Without funding the market trades one-for-one and pays nothing back.
    #[test]
    fn unfunded_market_is_degenerate(m in market()) {
        let calc = LmsrCalculator::default();
        let mut unfunded = m.clone();
        unfunded.funding = Amount::zero();

        let cost = calc.calc_cost(&unfunded.quote(&m.shares, None)).unwrap();
        prop_assert_eq!(cost, BigDecimal::from(&m.shares));
        let profit = calc.calc_profit(&unfunded.quote(&m.shares, None)).unwrap();
        prop_assert!(profit.is_zero());

        let price = calc.calc_marginal_price(&unfunded.price(m.index)).unwrap();
        let n = BigDecimal::from(m.net.len());
        let expected = BigDecimal::one().div_scaled(&n, 90).unwrap();
        prop_assert!((&price - &expected).abs() < BigDecimal::new(1, 70));
    }

    /// Calculations leave their inputs untouched.
    #[test]
    fn inputs_are_not_mutated(m in market()) {
        let calc = LmsrCalculator::default();
        let request = m.quote(&m.shares, Some(10_000));
        let before = request.clone();
        let _ = calc.calc_cost(&request).unwrap();
        let _ = calc.calc_profit(&request).unwrap();
        prop_assert_eq!(request, before);
    }
}
