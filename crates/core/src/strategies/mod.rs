//! Discount strategies.
//!
//! Each campaign carries exactly one [`DiscountConfig`]. The calculator
//! validates the payload before touching any price, then dispatches with an
//! exhaustive match, so adding a strategy forces every call site to handle it.

pub mod bogo;
pub mod fixed;
pub mod percentage;
pub mod spend_threshold;
pub mod tiered;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::money::{is_valid_percent, percent_of, Money};
use crate::domain::product::ProductId;
use crate::errors::StrategyError;
use crate::result::DiscountResult;

pub use bogo::{BogoApplyTo, BogoConfig, BogoRule};
pub use fixed::FixedConfig;
pub use percentage::PercentageConfig;
pub use spend_threshold::{SpendThreshold, SpendThresholdConfig};
pub use tiered::{QuantityTier, TieredConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    Tiered,
    Bogo,
    SpendThreshold,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::Tiered => "tiered",
            Self::Bogo => "bogo",
            Self::SpendThreshold => "spend_threshold",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "discount_type", content = "discount_config", rename_all = "snake_case")]
pub enum DiscountConfig {
    Percentage(PercentageConfig),
    Fixed(FixedConfig),
    Tiered(TieredConfig),
    Bogo(BogoConfig),
    SpendThreshold(SpendThresholdConfig),
}

impl DiscountConfig {
    pub fn discount_type(&self) -> DiscountType {
        match self {
            Self::Percentage(_) => DiscountType::Percentage,
            Self::Fixed(_) => DiscountType::Fixed,
            Self::Tiered(_) => DiscountType::Tiered,
            Self::Bogo(_) => DiscountType::Bogo,
            Self::SpendThreshold(_) => DiscountType::SpendThreshold,
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        match self {
            Self::Percentage(config) => config.validate(),
            Self::Fixed(config) => config.validate(),
            Self::Tiered(config) => config.validate(),
            Self::Bogo(config) => config.validate(),
            Self::SpendThreshold(config) => config.validate(),
        }
    }
}

/// Shape of a per-tier or per-threshold adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Percentage,
    Fixed,
}

impl AdjustmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }

    pub fn validate_value(self, value: Decimal, label: &str) -> Result<(), StrategyError> {
        match self {
            Self::Percentage if !is_valid_percent(value) => Err(StrategyError::InvalidConfig(
                format!("{label} percentage {value} must be within 0..=100"),
            )),
            Self::Fixed if value < Decimal::ZERO => Err(StrategyError::InvalidConfig(format!(
                "{label} fixed amount {value} must not be negative"
            ))),
            _ => Ok(()),
        }
    }

    /// Unrounded unit price after the adjustment; may be negative for fixed
    /// amounts larger than the price, callers clamp.
    pub fn apply(self, price: Money, value: Decimal) -> Money {
        match self {
            Self::Percentage => price - percent_of(price, value),
            Self::Fixed => price - value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Cart-side inputs a strategy may read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingContext {
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub cart_spend: Money,
    /// Other lines in the cart; only buy-X-get-Y targeting reads these.
    #[serde(default)]
    pub cart_lines: Vec<CartLine>,
}

impl PricingContext {
    pub fn new(quantity: u32, cart_spend: Money) -> Self {
        Self { quantity, cart_spend, cart_lines: Vec::new() }
    }

    pub fn with_cart_lines(mut self, cart_lines: Vec<CartLine>) -> Self {
        self.cart_lines = cart_lines;
        self
    }

    pub fn cart_line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.cart_lines.iter().find(|line| line.product_id == product_id)
    }
}

pub trait StrategyCalculator: Send + Sync {
    fn calculate(
        &self,
        strategy: DiscountType,
        config: &DiscountConfig,
        price: Money,
        context: &PricingContext,
    ) -> Result<DiscountResult, StrategyError>;
}

#[derive(Default)]
pub struct DeterministicStrategyCalculator;

impl StrategyCalculator for DeterministicStrategyCalculator {
    fn calculate(
        &self,
        strategy: DiscountType,
        config: &DiscountConfig,
        price: Money,
        context: &PricingContext,
    ) -> Result<DiscountResult, StrategyError> {
        calculate(strategy, config, price, context)
    }
}

pub fn calculate(
    strategy: DiscountType,
    config: &DiscountConfig,
    price: Money,
    context: &PricingContext,
) -> Result<DiscountResult, StrategyError> {
    let configured = config.discount_type();
    if strategy != configured {
        return Err(StrategyError::StrategyMismatch { requested: strategy, configured });
    }
    if price < Decimal::ZERO {
        return Err(StrategyError::NegativePrice(price));
    }
    config.validate()?;

    let result = match config {
        DiscountConfig::Percentage(config) => config.calculate(price),
        DiscountConfig::Fixed(config) => config.calculate(price),
        DiscountConfig::Tiered(config) => config.calculate(price, context),
        DiscountConfig::Bogo(config) => config.calculate(price, context),
        DiscountConfig::SpendThreshold(config) => config.calculate(price, context),
    };

    debug!(
        event_name = "discount.strategy.applied",
        strategy = strategy.as_str(),
        applied = result.applied,
        original_price = %result.original_price,
        discounted_price = %result.discounted_price,
        "strategy calculation finished"
    );

    Ok(result)
}

/// Shared validation for ordered breakpoint lists (quantity tiers and spend
/// thresholds): non-empty and strictly ascending, which also rules out
/// duplicate keys.
pub(crate) fn validate_ascending<K: PartialOrd + fmt::Display>(
    keys: impl IntoIterator<Item = K>,
    label: &str,
) -> Result<(), StrategyError> {
    let mut previous: Option<K> = None;
    let mut count = 0_usize;
    for key in keys {
        count += 1;
        if let Some(prev) = &previous {
            if key == *prev {
                return Err(StrategyError::InvalidConfig(format!(
                    "duplicate {label} {key}; each breakpoint must be unique"
                )));
            }
            if key < *prev {
                return Err(StrategyError::InvalidConfig(format!(
                    "{label} values must be listed in ascending order ({key} follows {prev})"
                )));
            }
        }
        previous = Some(key);
    }

    if count == 0 {
        return Err(StrategyError::InvalidConfig(format!("at least one {label} is required")));
    }
    Ok(())
}

/// Index of the breakpoint with the largest key not above `reached`.
/// Keys must already be validated as ascending.
pub(crate) fn select_breakpoint<K: PartialOrd>(
    keys: impl IntoIterator<Item = K>,
    reached: &K,
) -> Option<usize> {
    keys.into_iter()
        .enumerate()
        .take_while(|(_, key)| key <= reached)
        .last()
        .map(|(index, _)| index)
}
