//! Market state and calculator request records.
//!
//! Each calculator operation takes exactly one strongly-typed record.
//! Records serialize with the camelCase keys used by the SDK options
//! objects (`netOutcomeTokensSold`, `outcomeTokenIndex`, ...), and every
//! numeric field accepts numbers or numeric strings on input.

use serde::{Deserialize, Serialize};

use super::amount::{deserialize_index, Amount};

/// Lightweight market identifier used at the ports boundary.
pub type MarketId = String;

/// Per-outcome net shares sold by the market maker.
///
/// Negative entries mean the market maker has bought back more than it
/// sold. The length is the market's outcome count.
pub type OutcomeDistribution = Vec<Amount>;

/// Quote request for buying (`calc_cost`) or selling (`calc_profit`)
/// a number of outcome tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeQuoteRequest {
    pub net_outcome_tokens_sold: OutcomeDistribution,
    pub funding: Amount,
    #[serde(deserialize_with = "deserialize_index")]
    pub outcome_token_index: usize,
    pub outcome_token_count: Amount,
    /// Parts-per-million; absent means no fee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_factor: Option<Amount>,
}

/// Request record for `calc_cost`.
pub type CostRequest = TradeQuoteRequest;

/// Request record for `calc_profit`.
pub type ProfitRequest = TradeQuoteRequest;

/// Inverse quote: how many tokens a collateral budget buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeTokenCountRequest {
    pub net_outcome_tokens_sold: OutcomeDistribution,
    pub funding: Amount,
    #[serde(deserialize_with = "deserialize_index")]
    pub outcome_token_index: usize,
    /// Collateral budget.
    pub cost: Amount,
    /// When set, the budget must also cover the market fee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_factor: Option<Amount>,
}

/// Instantaneous price of one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginalPriceRequest {
    pub net_outcome_tokens_sold: OutcomeDistribution,
    pub funding: Amount,
    #[serde(deserialize_with = "deserialize_index")]
    pub outcome_token_index: usize,
}

/// Market maker state as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub net_outcome_tokens_sold: OutcomeDistribution,
    pub funding: Amount,
    #[serde(default)]
    pub fee_factor: Amount,
}

impl MarketSnapshot {
    pub fn outcome_count(&self) -> usize {
        self.net_outcome_tokens_sold.len()
    }

    /// Cost quote for buying `count` tokens of `index` at this state.
    pub fn cost_request(&self, index: usize, count: Amount) -> CostRequest {
        TradeQuoteRequest {
            net_outcome_tokens_sold: self.net_outcome_tokens_sold.clone(),
            funding: self.funding.clone(),
            outcome_token_index: index,
            outcome_token_count: count,
            fee_factor: Some(self.fee_factor.clone()),
        }
    }

    /// Profit quote for selling `count` tokens of `index` at this state.
    pub fn profit_request(&self, index: usize, count: Amount) -> ProfitRequest {
        self.cost_request(index, count)
    }

    pub fn outcome_token_count_request(&self, index: usize, cost: Amount) -> OutcomeTokenCountRequest {
        OutcomeTokenCountRequest {
            net_outcome_tokens_sold: self.net_outcome_tokens_sold.clone(),
            funding: self.funding.clone(),
            outcome_token_index: index,
            cost,
            fee_factor: Some(self.fee_factor.clone()),
        }
    }

    pub fn marginal_price_request(&self, index: usize) -> MarginalPriceRequest {
        MarginalPriceRequest {
            net_outcome_tokens_sold: self.net_outcome_tokens_sold.clone(),
            funding: self.funding.clone(),
            outcome_token_index: index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_sdk_style_options() {
        let json = r#"{
            "netOutcomeTokensSold": [0, "1.2e25"],
            "funding": 1e27,
            "outcomeTokenIndex": "0",
            "outcomeTokenCount": "10000000000000000000000000",
            "feeFactor": 500
        }"#;
        let request: CostRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.outcome_token_index, 0);
        assert_eq!(request.net_outcome_tokens_sold[1], "12000000000000000000000000".parse().unwrap());
        assert_eq!(request.fee_factor, Some(Amount::from(500)));
    }

    #[test]
    fn test_fee_factor_is_optional() {
        let json = r#"{"netOutcomeTokensSold":[0,0],"funding":100,"outcomeTokenIndex":1,"cost":5}"#;
        let request: OutcomeTokenCountRequest = serde_json::from_str(json).unwrap();
        assert!(request.fee_factor.is_none());
        let back = serde_json::to_value(&request).unwrap();
        assert!(back.get("feeFactor").is_none());
        assert_eq!(back["cost"], "5");
    }

    #[test]
    fn test_negative_index_rejected_by_serde() {
        let json = r#"{"netOutcomeTokensSold":[0,0],"funding":100,"outcomeTokenIndex":-1}"#;
        assert!(serde_json::from_str::<MarginalPriceRequest>(json).is_err());
    }

    #[test]
    fn test_snapshot_builds_requests_with_market_fee() {
        let snapshot = MarketSnapshot {
            net_outcome_tokens_sold: vec![Amount::from(5), Amount::from(-5)],
            funding: Amount::from(1_000),
            fee_factor: Amount::from(25_000),
        };
        assert_eq!(snapshot.outcome_count(), 2);
        let request = snapshot.cost_request(1, Amount::from(10));
        assert_eq!(request.fee_factor, Some(Amount::from(25_000)));
        assert_eq!(request.outcome_token_index, 1);
        let price = snapshot.marginal_price_request(0);
        assert_eq!(price.net_outcome_tokens_sold, snapshot.net_outcome_tokens_sold);
    }
}
