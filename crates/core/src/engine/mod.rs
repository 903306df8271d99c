//! Resolution pipeline: eligibility, conflict resolution, then the winning
//! campaign's strategy. Each stage sits behind a trait so callers can swap in
//! their own implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineSettings;
use crate::domain::campaign::{Campaign, CampaignId};
use crate::domain::money::Money;
use crate::domain::product::ProductSnapshot;
use crate::eligibility::{applicable_campaigns, DeterministicEligibilityFilter, EligibilityFilter};
use crate::errors::{ConfigError, EligibilityError, EngineError};
use crate::resolver::{ConflictReport, ConflictResolver, DeterministicConflictResolver};
use crate::result::DiscountResult;
use crate::strategies::{
    DeterministicStrategyCalculator, DiscountType, PricingContext, StrategyCalculator,
};

pub const DEFAULT_MAX_CAMPAIGNS: usize = 500;
pub const NO_CAMPAIGN_NOTE: &str = "no_applicable_campaign";

/// Everything a resolution call reads besides the product and campaigns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionContext {
    pub now: DateTime<Utc>,
    #[serde(flatten)]
    pub pricing: PricingContext,
}

impl ResolutionContext {
    pub fn new(now: DateTime<Utc>, pricing: PricingContext) -> Self {
        Self { now, pricing }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub winner: Option<CampaignId>,
    /// Applicable campaigns in input order.
    pub applicable: Vec<CampaignId>,
    pub result: DiscountResult,
    pub conflicts: Vec<ConflictReport>,
    pub diagnostics: Vec<EligibilityError>,
}

pub trait DiscountRuntime: Send + Sync {
    fn resolve(
        &self,
        product: &ProductSnapshot,
        campaigns: &[Campaign],
        context: &ResolutionContext,
    ) -> Result<Resolution, EngineError>;
}

pub struct DeterministicDiscountRuntime<E, R, S> {
    eligibility: E,
    resolver: R,
    calculator: S,
    max_campaigns: usize,
}

impl<E, R, S> DeterministicDiscountRuntime<E, R, S> {
    pub fn new(eligibility: E, resolver: R, calculator: S) -> Self {
        Self { eligibility, resolver, calculator, max_campaigns: DEFAULT_MAX_CAMPAIGNS }
    }

    pub fn with_max_campaigns(mut self, max_campaigns: usize) -> Self {
        self.max_campaigns = max_campaigns;
        self
    }

    pub fn max_campaigns(&self) -> usize {
        self.max_campaigns
    }
}

impl Default
    for DeterministicDiscountRuntime<
        DeterministicEligibilityFilter,
        DeterministicConflictResolver,
        DeterministicStrategyCalculator,
    >
{
    fn default() -> Self {
        Self::new(
            DeterministicEligibilityFilter::default(),
            DeterministicConflictResolver::default(),
            DeterministicStrategyCalculator,
        )
    }
}

impl
    DeterministicDiscountRuntime<
        DeterministicEligibilityFilter,
        DeterministicConflictResolver,
        DeterministicStrategyCalculator,
    >
{
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            DeterministicEligibilityFilter::new(settings.strict_conditions),
            DeterministicConflictResolver::new(settings.report_conflicts),
            DeterministicStrategyCalculator,
        )
        .with_max_campaigns(settings.max_campaigns as usize)
    }
}

impl<E, R, S> DiscountRuntime for DeterministicDiscountRuntime<E, R, S>
where
    E: EligibilityFilter,
    R: ConflictResolver,
    S: StrategyCalculator,
{
    fn resolve(
        &self,
        product: &ProductSnapshot,
        campaigns: &[Campaign],
        context: &ResolutionContext,
    ) -> Result<Resolution, EngineError> {
        if campaigns.len() > self.max_campaigns {
            return Err(ConfigError::TooManyCampaigns {
                received: campaigns.len(),
                max_allowed: self.max_campaigns,
            }
            .into());
        }
        let price = product.active_price().ok_or(EngineError::MissingPrice(product.id))?;

        let applicability =
            applicable_campaigns(&self.eligibility, campaigns, product, context.now);
        let applicable: Vec<CampaignId> =
            applicability.campaigns.iter().map(|campaign| campaign.id).collect();
        let outcome = self.resolver.resolve(product.id, &applicability.campaigns);

        let result = match outcome.winner {
            Some(winner) => self.price_with(winner, price, &context.pricing)?,
            None => DiscountResult::not_applied(DiscountType::Percentage, price)
                .with_note(NO_CAMPAIGN_NOTE),
        };

        debug!(
            event_name = "discount.resolution.completed",
            product_id = %product.id,
            campaigns = campaigns.len(),
            applicable = applicable.len(),
            winner_id = outcome.winner.map(|campaign| campaign.id.0),
            applied = result.applied,
            discounted_price = %result.discounted_price,
            "discount resolution completed"
        );

        Ok(Resolution {
            winner: outcome.winner.map(|campaign| campaign.id),
            applicable,
            result,
            conflicts: outcome.conflicts,
            diagnostics: applicability.errors,
        })
    }
}

impl<E, R, S> DeterministicDiscountRuntime<E, R, S>
where
    S: StrategyCalculator,
{
    fn price_with(
        &self,
        campaign: &Campaign,
        price: Money,
        pricing: &PricingContext,
    ) -> Result<DiscountResult, EngineError> {
        self.calculator
            .calculate(campaign.discount_type(), &campaign.discount, price, pricing)
            .map_err(|source| {
                warn!(
                    event_name = "discount.strategy.rejected",
                    campaign_id = %campaign.id,
                    strategy = campaign.discount_type().as_str(),
                    error = %source,
                    "winning campaign could not be priced"
                );
                EngineError::Campaign { campaign_id: campaign.id, source: source.into() }
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{
        DeterministicDiscountRuntime, DiscountRuntime, ResolutionContext, NO_CAMPAIGN_NOTE,
    };
    use crate::conditions::ConditionSet;
    use crate::config::EngineSettings;
    use crate::domain::campaign::{
        Campaign, CampaignId, CampaignStatus, Priority, ProductSelection,
    };
    use crate::domain::product::{ProductId, ProductSnapshot};
    use crate::errors::{ConfigError, EngineError, StrategyError};
    use crate::result::DiscountResult;
    use crate::strategies::{
        DiscountConfig, DiscountType, FixedConfig, PercentageConfig, PricingContext,
        StrategyCalculator,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).single().expect("valid timestamp")
    }

    fn campaign(id: u64, priority: u8, discount: DiscountConfig) -> Campaign {
        Campaign {
            id: CampaignId(id),
            name: format!("campaign-{id}"),
            priority: Priority::try_from(priority).expect("priority in range"),
            status: CampaignStatus::Active,
            starts_at: now() - Duration::days(7),
            ends_at: None,
            product_selection: ProductSelection::AllProducts,
            conditions: ConditionSet::default(),
            discount,
        }
    }

    fn percent(value: i64) -> DiscountConfig {
        DiscountConfig::Percentage(PercentageConfig { value: Decimal::from(value) })
    }

    fn product() -> ProductSnapshot {
        let mut product = ProductSnapshot::new(ProductId(1));
        product.regular_price = Some(Decimal::from(80));
        product
    }

    fn context() -> ResolutionContext {
        ResolutionContext::new(now(), PricingContext::new(1, Decimal::from(80)))
    }

    #[test]
    fn highest_priority_campaign_prices_the_product() -> Result<(), EngineError> {
        let campaigns = vec![campaign(1, 2, percent(50)), campaign(2, 4, percent(25))];
        let resolution =
            DeterministicDiscountRuntime::default().resolve(&product(), &campaigns, &context())?;

        assert_eq!(resolution.winner, Some(CampaignId(2)));
        assert_eq!(resolution.applicable, vec![CampaignId(1), CampaignId(2)]);
        assert_eq!(resolution.result.discounted_price, Decimal::from(60));
        assert!(resolution.conflicts.is_empty());
        Ok(())
    }

    #[test]
    fn no_applicable_campaign_keeps_the_original_price() -> Result<(), EngineError> {
        let mut expired = campaign(1, 5, percent(50));
        expired.ends_at = Some(now() - Duration::seconds(1));

        let resolution =
            DeterministicDiscountRuntime::default().resolve(&product(), &[expired], &context())?;
        assert_eq!(resolution.winner, None);
        assert!(!resolution.result.applied);
        assert_eq!(resolution.result.discounted_price, Decimal::from(80));
        assert_eq!(resolution.result.note(), Some(NO_CAMPAIGN_NOTE));
        Ok(())
    }

    #[test]
    fn misconfigured_winner_surfaces_as_campaign_error() {
        let campaigns = vec![campaign(9, 5, percent(120)), campaign(3, 1, percent(10))];
        let runtime = DeterministicDiscountRuntime::default();
        let error = runtime.resolve(&product(), &campaigns, &context());
        assert!(matches!(
            error,
            Err(EngineError::Campaign {
                campaign_id: CampaignId(9),
                source: ConfigError::Strategy(StrategyError::InvalidConfig(_)),
            })
        ));
    }

    #[test]
    fn campaign_guardrail_rejects_oversized_slices() {
        let settings = EngineSettings { max_campaigns: 1, ..EngineSettings::default() };
        let runtime = DeterministicDiscountRuntime::from_settings(&settings);
        let campaigns = vec![campaign(1, 3, percent(5)), campaign(2, 3, percent(5))];

        assert_eq!(
            runtime.resolve(&product(), &campaigns, &context()),
            Err(EngineError::Config(ConfigError::TooManyCampaigns { received: 2, max_allowed: 1 }))
        );
    }

    #[test]
    fn price_falls_back_and_missing_price_is_an_error() {
        let campaigns = vec![campaign(1, 3, percent(10))];
        let runtime = DeterministicDiscountRuntime::default();

        let unpriced = ProductSnapshot::new(ProductId(77));
        assert_eq!(
            runtime.resolve(&unpriced, &campaigns, &context()),
            Err(EngineError::MissingPrice(ProductId(77)))
        );

        let on_sale = ProductSnapshot { sale_price: Some(Decimal::from(60)), ..product() };
        let resolution = runtime.resolve(&on_sale, &campaigns, &context());
        assert_eq!(
            resolution.map(|resolution| resolution.result.discounted_price),
            Ok(Decimal::from(54))
        );
    }

    #[test]
    fn runtime_supports_explicit_calculator_interface() -> Result<(), EngineError> {
        struct HalfPriceCalculator;

        impl StrategyCalculator for HalfPriceCalculator {
            fn calculate(
                &self,
                strategy: DiscountType,
                _config: &DiscountConfig,
                price: Decimal,
                _context: &PricingContext,
            ) -> Result<DiscountResult, StrategyError> {
                Ok(DiscountResult::applied(strategy, price, price / Decimal::TWO))
            }
        }

        let runtime = DeterministicDiscountRuntime::new(
            crate::eligibility::DeterministicEligibilityFilter::default(),
            crate::resolver::DeterministicConflictResolver::default(),
            HalfPriceCalculator,
        );
        let campaigns =
            vec![campaign(4, 3, DiscountConfig::Fixed(FixedConfig { value: Decimal::ONE }))];
        let resolution = runtime.resolve(&product(), &campaigns, &context())?;
        assert_eq!(resolution.result.discounted_price, Decimal::from(40));
        assert_eq!(resolution.result.strategy, DiscountType::Fixed);
        Ok(())
    }
}
