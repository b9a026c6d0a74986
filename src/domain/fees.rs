//! Market fee factor.
//!
//! Markets charge a proportional fee quoted in parts-per-million
//! (1,000,000 = 100%). The fee is always rounded against the trader:
//! added with a ceiling on buys, deducted with a ceiling on sells, so a
//! quote never promises more than the contract will honor.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

use super::amount::Amount;
use super::error::LmsrError;

/// Denominator of the fee factor: 1,000,000 = 100%.
pub const FEE_RANGE: u32 = 1_000_000;

/// Proportional trading fee in parts-per-million.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeFactor {
    ppm: BigInt,
}

impl FeeFactor {
    /// No fee.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a fee factor, rejecting negative values.
    pub fn new(ppm: impl Into<BigInt>) -> Result<Self, LmsrError> {
        let ppm = ppm.into();
        if ppm.is_negative() {
            return Err(LmsrError::invalid("fee_factor", &ppm, "fee factor must be non-negative"));
        }
        Ok(Self { ppm })
    }

    /// Normalizes the optional fee carried by a request.
    pub fn from_option(fee_factor: Option<&Amount>) -> Result<Self, LmsrError> {
        fee_factor.map_or_else(|| Ok(Self::none()), |fee| Self::new(fee.as_bigint().clone()))
    }

    pub fn ppm(&self) -> &BigInt {
        &self.ppm
    }

    pub fn is_zero(&self) -> bool {
        self.ppm.is_zero()
    }

    /// Fee charged on `amount`, rounded up.
    pub fn fee_on(&self, amount: &BigInt) -> BigInt {
        let numerator = amount * &self.ppm;
        let range = BigInt::from(FEE_RANGE);
        -(-numerator).div_floor(&range)
    }

    /// Buy side: what the trader pays for a base cost.
    pub fn add_to_cost(&self, cost: &BigInt) -> BigInt {
        cost + self.fee_on(cost)
    }

    /// Sell side: what the trader keeps from a base profit.
    pub fn deduct_from_profit(&self, profit: &BigInt) -> BigInt {
        profit - self.fee_on(profit)
    }

    /// Largest base cost `c` such that `c + fee_on(c) <= budget`.
    ///
    /// `c = floor(budget * R / (R + fee))` already satisfies the bound,
    /// and `c + 1` never does.
    pub fn max_base_within(&self, budget: &BigInt) -> BigInt {
        if budget.is_negative() {
            return BigInt::zero();
        }
        let range = BigInt::from(FEE_RANGE);
        (budget * &range).div_floor(&(&range + &self.ppm))
    }
}
