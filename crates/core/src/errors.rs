use thiserror::Error;

use crate::conditions::{ConditionScope, Operator};
use crate::domain::{
    campaign::CampaignId,
    money::Money,
    product::{ProductId, PropertyKey, PropertyType},
};
use crate::strategies::DiscountType;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("operator `{operator}` is not valid for {property_type} property `{property}`")]
    UnsupportedOperator { property: PropertyKey, property_type: PropertyType, operator: Operator },
    #[error("operator `{operator}` on `{property}` requires a second value")]
    MissingSecondValue { property: PropertyKey, operator: Operator },
    #[error("range on `{property}` has its lower bound above its upper bound")]
    InvertedRange { property: PropertyKey },
    #[error("value for `{property}` is not a valid {expected} value")]
    ValueTypeMismatch { property: PropertyKey, expected: PropertyType },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("campaign {campaign_id} {scope} condition #{condition_index} is invalid: {source}")]
    InvalidCondition {
        campaign_id: CampaignId,
        scope: ConditionScope,
        condition_index: usize,
        #[source]
        source: ConditionError,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("invalid discount configuration: {0}")]
    InvalidConfig(String),
    #[error("requested {requested} strategy but campaign is configured for {configured}")]
    StrategyMismatch { requested: DiscountType, configured: DiscountType },
    #[error("unit price {0} is negative")]
    NegativePrice(Money),
}

/// Misconfiguration detected before any calculation runs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error("resolution received {received} campaigns but max allowed is {max_allowed}")]
    TooManyCampaigns { received: usize, max_allowed: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("campaign {campaign_id}: {source}")]
    Campaign {
        campaign_id: CampaignId,
        #[source]
        source: ConfigError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("product {0} has no price, sale price or regular price")]
    MissingPrice(ProductId),
}

impl EngineError {
    pub fn campaign_id(&self) -> Option<CampaignId> {
        match self {
            Self::Campaign { campaign_id, .. } => Some(*campaign_id),
            Self::Config(_) | Self::MissingPrice(_) => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Campaign { .. } => {
                "A discount campaign is misconfigured and was not applied. Check its settings."
            }
            Self::Config(ConfigError::TooManyCampaigns { .. }) => {
                "Too many campaigns were supplied for a single product."
            }
            Self::Config(_) => "The discount configuration is invalid.",
            Self::MissingPrice(_) => "The product has no price to discount.",
        }
    }
}
