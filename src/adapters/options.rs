//! Options Adapter - Loose JSON Options to Typed Requests
//!
//! Accepts the SDK-style options object
//! (`{"netOutcomeTokensSold": [...], "funding": ..., ...}`) where every
//! number may also be a numeric string (`"1e+18"`, `"0x..."`) and the
//! outcome index may be a string. Missing keys are reported as
//! `missing argument <key>`.

use std::fmt;

use serde_json::{Map, Value};

use crate::domain::amount::Amount;
use crate::domain::decimal::BigDecimal;
use crate::domain::error::LmsrError;
use crate::domain::lmsr::LmsrCalculator;
use crate::domain::market::{
    CostRequest, MarginalPriceRequest, OutcomeDistribution, OutcomeTokenCountRequest, ProfitRequest,
    TradeQuoteRequest,
};

/// Calculator operation selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Operation {
    /// Collateral to buy `outcomeTokenCount` tokens.
    Cost,
    /// Collateral received for selling `outcomeTokenCount` tokens.
    Profit,
    /// Tokens purchasable for `cost` collateral.
    Count,
    /// Marginal price of the outcome.
    Price,
}

impl Operation {
    /// Parses `options` for this operation and runs it.
    pub fn evaluate(self, calculator: &LmsrCalculator, options: &Value) -> Result<BigDecimal, LmsrError> {
        match self {
            Self::Cost => calculator.calc_cost(&cost_request(options)?),
            Self::Profit => calculator.calc_profit(&profit_request(options)?),
            Self::Count => calculator.calc_outcome_token_count(&outcome_token_count_request(options)?),
            Self::Price => calculator.calc_marginal_price(&marginal_price_request(options)?),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cost => "cost",
            Self::Profit => "profit",
            Self::Count => "count",
            Self::Price => "price",
        };
        f.write_str(name)
    }
}

pub fn cost_request(options: &Value) -> Result<CostRequest, LmsrError> {
    trade_quote(options)
}

pub fn profit_request(options: &Value) -> Result<ProfitRequest, LmsrError> {
    trade_quote(options)
}

pub fn outcome_token_count_request(options: &Value) -> Result<OutcomeTokenCountRequest, LmsrError> {
    let options = object(options)?;
    Ok(OutcomeTokenCountRequest {
        net_outcome_tokens_sold: distribution(options)?,
        funding: amount(options, "funding")?,
        outcome_token_index: index(options)?,
        cost: amount(options, "cost")?,
        fee_factor: optional_amount(options, "feeFactor")?,
    })
}

pub fn marginal_price_request(options: &Value) -> Result<MarginalPriceRequest, LmsrError> {
    let options = object(options)?;
    Ok(MarginalPriceRequest {
        net_outcome_tokens_sold: distribution(options)?,
        funding: amount(options, "funding")?,
        outcome_token_index: index(options)?,
    })
}

fn trade_quote(options: &Value) -> Result<TradeQuoteRequest, LmsrError> {
    let options = object(options)?;
    Ok(TradeQuoteRequest {
        net_outcome_tokens_sold: distribution(options)?,
        funding: amount(options, "funding")?,
        outcome_token_index: index(options)?,
        outcome_token_count: amount(options, "outcomeTokenCount")?,
        fee_factor: optional_amount(options, "feeFactor")?,
    })
}

fn object(options: &Value) -> Result<&Map<String, Value>, LmsrError> {
    options
        .as_object()
        .ok_or_else(|| LmsrError::invalid("options", options, "options must be a JSON object"))
}

fn required<'a>(options: &'a Map<String, Value>, key: &str) -> Result<&'a Value, LmsrError> {
    match options.get(key) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(LmsrError::invalid(key, "undefined", format!("missing argument {key}"))),
    }
}

fn distribution(options: &Map<String, Value>) -> Result<OutcomeDistribution, LmsrError> {
    const KEY: &str = "netOutcomeTokensSold";
    let value = required(options, KEY)?;
    let entries = value
        .as_array()
        .ok_or_else(|| LmsrError::invalid(KEY, value, "expected an array of amounts"))?;
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| to_amount(&format!("{KEY}[{i}]"), entry))
        .collect()
}

fn amount(options: &Map<String, Value>, key: &str) -> Result<Amount, LmsrError> {
    to_amount(key, required(options, key)?)
}

fn optional_amount(options: &Map<String, Value>, key: &str) -> Result<Option<Amount>, LmsrError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => to_amount(key, value).map(Some),
    }
}

fn index(options: &Map<String, Value>) -> Result<usize, LmsrError> {
    amount(options, "outcomeTokenIndex")?.to_index("outcomeTokenIndex")
}

fn to_amount(argument: &str, value: &Value) -> Result<Amount, LmsrError> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(Amount::from(int))
            } else if let Some(uint) = number.as_u64() {
                Ok(Amount::from(uint))
            } else {
                let float = number.as_f64().unwrap_or(f64::NAN);
                let decimal = BigDecimal::from_f64(float)
                    .ok_or_else(|| LmsrError::invalid(argument, number, "amount must be finite"))?;
                Amount::from_decimal_named(argument, &decimal)
            }
        }
        Value::String(text) => Amount::parse_named(argument, text.trim()),
        other => Err(LmsrError::invalid(argument, other, "expected a number or a numeric string")),
    }
}
