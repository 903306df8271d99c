use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::money::{is_valid_percent, percent_of, round_money, Money};
use crate::domain::product::ProductId;
use crate::errors::StrategyError;
use crate::result::{money_value, DiscountResult};
use crate::strategies::{DiscountType, PricingContext};

pub const MAX_BOGO_RULES: usize = 5;
pub const NO_COMPLETE_GROUP_NOTE: &str = "no_complete_group";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BogoApplyTo {
    #[default]
    Same,
    Different { target_product_ids: BTreeSet<ProductId> },
}

/// Buy `buy_quantity`, get `get_quantity` at `discount_percent` off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BogoRule {
    pub buy_quantity: u32,
    pub get_quantity: u32,
    pub discount_percent: Decimal,
    #[serde(default)]
    pub apply_to: BogoApplyTo,
}

impl BogoRule {
    /// Complete buy groups in a line of `quantity` purchased units.
    pub fn complete_groups(&self, quantity: u32) -> u32 {
        if self.buy_quantity == 0 {
            return 0;
        }
        quantity / self.buy_quantity
    }

    /// Units granted at the rule's discount for `quantity` purchased units.
    pub fn granted_units(&self, quantity: u32) -> u64 {
        u64::from(self.complete_groups(quantity)) * u64::from(self.get_quantity)
    }

    fn validate(&self, position: usize) -> Result<(), StrategyError> {
        if self.buy_quantity == 0 || self.get_quantity == 0 {
            return Err(StrategyError::InvalidConfig(format!(
                "bogo rule #{position} needs positive buy and get quantities (buy {}, get {})",
                self.buy_quantity, self.get_quantity
            )));
        }
        if !is_valid_percent(self.discount_percent) {
            return Err(StrategyError::InvalidConfig(format!(
                "bogo rule #{position} discount_percent {} must be within 0..=100",
                self.discount_percent
            )));
        }
        if let BogoApplyTo::Different { target_product_ids } = &self.apply_to {
            if target_product_ids.is_empty() {
                return Err(StrategyError::InvalidConfig(format!(
                    "bogo rule #{position} targets other products but lists none"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BogoConfig {
    pub rules: Vec<BogoRule>,
}

/// Discount granted on another cart line by a `Different` rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDiscount {
    pub product_id: ProductId,
    pub discounted_units: u64,
    pub discount_amount: Money,
}

#[derive(Debug, Default)]
struct Allocation {
    same_units: u64,
    same_discount: Money,
    targets: BTreeMap<ProductId, (u64, Money)>,
    missing_targets: BTreeSet<ProductId>,
}

impl BogoConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.rules.is_empty() || self.rules.len() > MAX_BOGO_RULES {
            return Err(StrategyError::InvalidConfig(format!(
                "bogo campaigns need 1..={MAX_BOGO_RULES} rules, got {}",
                self.rules.len()
            )));
        }
        self.rules.iter().enumerate().try_for_each(|(index, rule)| rule.validate(index + 1))
    }

    /// Every rule is evaluated on its own against the undiscounted price and
    /// the discounts are summed per line; rules never compound.
    fn allocate(&self, price: Money, context: &PricingContext) -> Allocation {
        let mut allocation = Allocation::default();

        for rule in &self.rules {
            let granted = rule.granted_units(context.quantity);
            if granted == 0 {
                continue;
            }

            match &rule.apply_to {
                BogoApplyTo::Same => {
                    allocation.same_units += granted;
                    allocation.same_discount +=
                        percent_of(price * Decimal::from(granted), rule.discount_percent);
                }
                BogoApplyTo::Different { target_product_ids } => {
                    for product_id in target_product_ids {
                        let Some(line) = context.cart_line(*product_id) else {
                            allocation.missing_targets.insert(*product_id);
                            continue;
                        };
                        let units = granted.min(u64::from(line.quantity));
                        if units == 0 {
                            continue;
                        }
                        let amount = percent_of(
                            line.unit_price * Decimal::from(units),
                            rule.discount_percent,
                        );
                        let entry =
                            allocation.targets.entry(*product_id).or_insert((0, Decimal::ZERO));
                        entry.0 += units;
                        entry.1 += amount;
                    }
                }
            }
        }

        allocation
    }

    pub(crate) fn calculate(&self, price: Money, context: &PricingContext) -> DiscountResult {
        let allocation = self.allocate(price, context);
        let missing: Vec<Value> =
            allocation.missing_targets.iter().map(|product_id| json!(product_id.0)).collect();

        if allocation.same_units == 0 && allocation.targets.is_empty() {
            let mut result = DiscountResult::not_applied(DiscountType::Bogo, price)
                .with_note(NO_COMPLETE_GROUP_NOTE)
                .with_metadata("paid_units", context.quantity);
            if !missing.is_empty() {
                result = result.with_metadata("missing_targets", missing);
            }
            return result;
        }

        let line_quantity = u64::from(context.quantity) + allocation.same_units;
        let line_original_total = price * Decimal::from(line_quantity);
        let line_discount = allocation.same_discount.min(line_original_total);
        let line_discounted_total = line_original_total - line_discount;
        let effective_unit_price = if line_quantity == 0 {
            price
        } else {
            line_discounted_total / Decimal::from(line_quantity)
        };

        let target_discounts: Vec<Value> = allocation
            .targets
            .iter()
            .map(|(product_id, (units, amount))| {
                json!({
                    "product_id": product_id.0,
                    "discounted_units": units,
                    "discount_amount": round_money(*amount).to_string(),
                })
            })
            .collect();

        let mut result = DiscountResult::applied(DiscountType::Bogo, price, effective_unit_price)
            .with_metadata("paid_units", context.quantity)
            .with_metadata("discounted_units", allocation.same_units)
            .with_metadata("line_quantity", line_quantity)
            .with_metadata("line_original_total", money_value(line_original_total))
            .with_metadata("line_discounted_total", money_value(line_discounted_total))
            .with_metadata("line_discount_amount", money_value(line_discount));
        if !target_discounts.is_empty() {
            result = result.with_metadata("target_discounts", target_discounts);
        }
        if !missing.is_empty() {
            result = result.with_metadata("missing_targets", missing);
        }
        result
    }

    /// Target-line discounts a `Different` rule set grants for a purchase of
    /// `context.quantity` units, without building a full result.
    pub fn target_discounts(&self, context: &PricingContext) -> Vec<TargetDiscount> {
        self.allocate(Decimal::ZERO, context)
            .targets
            .into_iter()
            .map(|(product_id, (discounted_units, amount))| TargetDiscount {
                product_id,
                discounted_units,
                discount_amount: round_money(amount),
            })
            .collect()
    }
}
