use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::errors::StrategyError;
use crate::result::DiscountResult;
use crate::strategies::{
    select_breakpoint, validate_ascending, AdjustmentKind, DiscountType, PricingContext,
};

pub const NO_TIER_NOTE: &str = "no_tier_qualified";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityTier {
    pub min_quantity: u32,
    pub discount_type: AdjustmentKind,
    pub discount_value: Decimal,
}

/// Volume pricing: the deepest tier whose minimum the line quantity reaches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredConfig {
    pub tiers: Vec<QuantityTier>,
}

impl TieredConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        validate_ascending(self.tiers.iter().map(|tier| tier.min_quantity), "min_quantity")?;

        for tier in &self.tiers {
            if tier.min_quantity == 0 {
                return Err(StrategyError::InvalidConfig(
                    "tier min_quantity must be at least 1".to_string(),
                ));
            }
            tier.discount_type.validate_value(
                tier.discount_value,
                &format!("tier at {} units", tier.min_quantity),
            )?;
        }
        Ok(())
    }

    pub fn select_tier(&self, quantity: u32) -> Option<&QuantityTier> {
        select_breakpoint(self.tiers.iter().map(|tier| tier.min_quantity), &quantity)
            .and_then(|index| self.tiers.get(index))
    }

    pub(crate) fn calculate(&self, price: Money, context: &PricingContext) -> DiscountResult {
        let Some(tier) = self.select_tier(context.quantity) else {
            return DiscountResult::not_applied(DiscountType::Tiered, price)
                .with_note(NO_TIER_NOTE)
                .with_metadata("quantity", context.quantity);
        };

        let discounted = tier.discount_type.apply(price, tier.discount_value);
        DiscountResult::applied(DiscountType::Tiered, price, discounted)
            .with_metadata("quantity", context.quantity)
            .with_metadata("tier_min_quantity", tier.min_quantity)
            .with_metadata("tier_discount_type", tier.discount_type.as_str())
            .with_metadata("tier_discount_value", tier.discount_value.to_string())
    }
}
