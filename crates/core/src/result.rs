use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::money::{clamp_price, round_money, Money};
use crate::strategies::DiscountType;

pub const NOTE_KEY: &str = "note";
pub const DISCOUNT_AMOUNT_KEY: &str = "discount_amount";

/// Outcome of pricing one product under one campaign.
///
/// Constructors keep `0 <= discounted_price <= original_price`, and an
/// unapplied result always carries the original price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountResult {
    pub original_price: Money,
    pub discounted_price: Money,
    pub strategy: DiscountType,
    pub applied: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl DiscountResult {
    pub fn applied(strategy: DiscountType, original_price: Money, discounted_price: Money) -> Self {
        let original_price = round_money(original_price.max(Decimal::ZERO));
        let discounted_price = clamp_price(discounted_price, original_price);
        let mut metadata = BTreeMap::new();
        metadata.insert(
            DISCOUNT_AMOUNT_KEY.to_string(),
            money_value(original_price - discounted_price),
        );

        Self { original_price, discounted_price, strategy, applied: true, metadata }
    }

    pub fn not_applied(strategy: DiscountType, original_price: Money) -> Self {
        let original_price = round_money(original_price.max(Decimal::ZERO));
        Self {
            original_price,
            discounted_price: original_price,
            strategy,
            applied: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_note(self, note: &str) -> Self {
        self.with_metadata(NOTE_KEY, note)
    }

    pub fn discount_amount(&self) -> Money {
        self.original_price - self.discounted_price
    }

    pub fn note(&self) -> Option<&str> {
        self.metadata.get(NOTE_KEY).and_then(Value::as_str)
    }
}

/// Monetary metadata is written as a decimal string so no precision is lost.
pub fn money_value(amount: Money) -> Value {
    Value::String(round_money(amount).to_string())
}
