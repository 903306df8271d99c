use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::errors::StrategyError;
use crate::result::DiscountResult;
use crate::strategies::{percentage::ZERO_DISCOUNT_NOTE, AdjustmentKind, DiscountType};

/// Fixed amount off the unit price, never below zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedConfig {
    pub value: Money,
}

impl FixedConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.value < Decimal::ZERO {
            return Err(StrategyError::InvalidConfig(format!(
                "fixed discount {} must not be negative",
                self.value
            )));
        }
        Ok(())
    }

    pub(crate) fn calculate(&self, price: Money) -> DiscountResult {
        let discounted = AdjustmentKind::Fixed.apply(price, self.value);
        let mut result = DiscountResult::applied(DiscountType::Fixed, price, discounted)
            .with_metadata("fixed_amount", self.value.to_string());

        if discounted < Decimal::ZERO {
            result = result.with_metadata("clamped", true);
        }
        if self.value.is_zero() {
            result = result.with_note(ZERO_DISCOUNT_NOTE);
        }
        result
    }
}
