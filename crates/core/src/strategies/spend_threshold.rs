use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::errors::StrategyError;
use crate::result::{money_value, DiscountResult};
use crate::strategies::{
    select_breakpoint, validate_ascending, AdjustmentKind, DiscountType, PricingContext,
};

pub const NO_THRESHOLD_NOTE: &str = "no_threshold_qualified";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendThreshold {
    pub spend_amount: Money,
    pub discount_type: AdjustmentKind,
    pub discount_value: Decimal,
}

/// Cart-spend breakpoints; the largest one reached applies to the unit price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendThresholdConfig {
    pub thresholds: Vec<SpendThreshold>,
}

impl SpendThresholdConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        validate_ascending(
            self.thresholds.iter().map(|threshold| threshold.spend_amount),
            "spend_amount",
        )?;

        for threshold in &self.thresholds {
            if threshold.spend_amount <= Decimal::ZERO {
                return Err(StrategyError::InvalidConfig(format!(
                    "spend_amount {} must be greater than zero",
                    threshold.spend_amount
                )));
            }
            threshold.discount_type.validate_value(
                threshold.discount_value,
                &format!("threshold at {}", threshold.spend_amount),
            )?;
        }
        Ok(())
    }

    pub fn select_threshold(&self, cart_spend: Money) -> Option<&SpendThreshold> {
        let amounts = self.thresholds.iter().map(|threshold| threshold.spend_amount);
        select_breakpoint(amounts, &cart_spend).and_then(|index| self.thresholds.get(index))
    }

    pub(crate) fn calculate(&self, price: Money, context: &PricingContext) -> DiscountResult {
        let Some(threshold) = self.select_threshold(context.cart_spend) else {
            let next = self.thresholds.first().map(|threshold| threshold.spend_amount);
            let mut result = DiscountResult::not_applied(DiscountType::SpendThreshold, price)
                .with_note(NO_THRESHOLD_NOTE)
                .with_metadata("cart_spend", money_value(context.cart_spend));
            if let Some(next) = next {
                let remaining = money_value(next - context.cart_spend);
                result = result.with_metadata("amount_to_next_threshold", remaining);
            }
            return result;
        };

        let discounted = threshold.discount_type.apply(price, threshold.discount_value);
        DiscountResult::applied(DiscountType::SpendThreshold, price, discounted)
            .with_metadata("cart_spend", money_value(context.cart_spend))
            .with_metadata("threshold_spend_amount", money_value(threshold.spend_amount))
            .with_metadata("threshold_discount_type", threshold.discount_type.as_str())
            .with_metadata("threshold_discount_value", threshold.discount_value.to_string())
    }
}
