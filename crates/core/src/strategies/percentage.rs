use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::{is_valid_percent, Money};
use crate::errors::StrategyError;
use crate::result::DiscountResult;
use crate::strategies::{AdjustmentKind, DiscountType};

pub const ZERO_DISCOUNT_NOTE: &str = "zero_discount";

/// Percent off the unit price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentageConfig {
    pub value: Decimal,
}

impl PercentageConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !is_valid_percent(self.value) {
            return Err(StrategyError::InvalidConfig(format!(
                "percentage value {} must be within 0..=100",
                self.value
            )));
        }
        Ok(())
    }

    pub(crate) fn calculate(&self, price: Money) -> DiscountResult {
        let discounted = AdjustmentKind::Percentage.apply(price, self.value);
        let result = DiscountResult::applied(DiscountType::Percentage, price, discounted)
            .with_metadata("percentage", self.value.to_string());

        if self.value.is_zero() {
            result.with_note(ZERO_DISCOUNT_NOTE)
        } else {
            result
        }
    }
}
