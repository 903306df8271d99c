//! Discount resolution for storefront products.
//!
//! Given a product snapshot, the campaigns configured against it and a
//! pricing context, the engine decides which single campaign applies and what
//! the discounted price is. Everything here is pure: no I/O, no shared state,
//! and identical inputs always produce identical results.

pub mod conditions;
pub mod config;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod errors;
pub mod resolver;
pub mod result;
pub mod strategies;

pub use conditions::{Condition, ConditionLogic, ConditionSet, Operator, Scalar};
pub use domain::campaign::{Campaign, CampaignId, CampaignStatus, Priority, ProductSelection};
pub use domain::money::Money;
pub use domain::product::{ProductId, ProductSnapshot, PropertyKey, PropertyType};
pub use eligibility::{
    applicable_campaigns, is_applicable, validate_campaign, DeterministicEligibilityFilter,
    EligibilityFilter,
};
pub use engine::{DeterministicDiscountRuntime, DiscountRuntime, Resolution, ResolutionContext};
pub use errors::{ConditionError, ConfigError, EligibilityError, EngineError, StrategyError};
pub use resolver::{ConflictReport, ConflictResolver, DeterministicConflictResolver};
pub use result::DiscountResult;
pub use strategies::{
    calculate, DeterministicStrategyCalculator, DiscountConfig, DiscountType, PricingContext,
    StrategyCalculator,
};
