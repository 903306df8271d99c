//! Decides whether a campaign applies to a product at a moment in time.
//!
//! A campaign is applicable when its status and schedule admit `now`, its
//! product selection covers the product, and its own condition set holds.
//! Invalid conditions never abort a batch: they evaluate to `false` and are
//! returned alongside the decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conditions::evaluator::evaluate_compiled;
use crate::conditions::{ConditionLogic, ConditionScope, ConditionSet};
use crate::domain::campaign::{Campaign, CampaignId, CampaignStatus, ProductSelection};
use crate::domain::product::ProductSnapshot;
use crate::errors::{ConfigError, EligibilityError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Paused, expired, draft or archived.
    Inactive,
    NotStarted,
    Ended,
    NotSelected,
    ConditionsUnmet,
    /// Only produced in strict mode.
    InvalidConditions,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::NotStarted => "not_started",
            Self::Ended => "ended",
            Self::NotSelected => "not_selected",
            Self::ConditionsUnmet => "conditions_unmet",
            Self::InvalidConditions => "invalid_conditions",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EligibilityDecision {
    pub applicable: bool,
    pub rejection: Option<RejectionReason>,
    pub errors: Vec<EligibilityError>,
}

impl EligibilityDecision {
    fn accept(errors: Vec<EligibilityError>) -> Self {
        Self { applicable: true, rejection: None, errors }
    }

    fn reject(reason: RejectionReason, errors: Vec<EligibilityError>) -> Self {
        Self { applicable: false, rejection: Some(reason), errors }
    }
}

pub trait EligibilityFilter: Send + Sync {
    fn check(
        &self,
        campaign: &Campaign,
        product: &ProductSnapshot,
        now: DateTime<Utc>,
    ) -> EligibilityDecision;

    fn is_applicable(
        &self,
        campaign: &Campaign,
        product: &ProductSnapshot,
        now: DateTime<Utc>,
    ) -> bool {
        self.check(campaign, product, now).applicable
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeterministicEligibilityFilter {
    strict_conditions: bool,
}

impl DeterministicEligibilityFilter {
    /// In strict mode one invalid condition rejects the whole campaign.
    pub fn new(strict_conditions: bool) -> Self {
        Self { strict_conditions }
    }

    pub fn strict_conditions(&self) -> bool {
        self.strict_conditions
    }
}

impl EligibilityFilter for DeterministicEligibilityFilter {
    fn check(
        &self,
        campaign: &Campaign,
        product: &ProductSnapshot,
        now: DateTime<Utc>,
    ) -> EligibilityDecision {
        let decision = self.decide(campaign, product, now);
        if let Some(reason) = decision.rejection {
            debug!(
                event_name = "discount.eligibility.rejected",
                campaign_id = %campaign.id,
                product_id = %product.id,
                reason = reason.as_str(),
                "campaign is not applicable to product"
            );
        }
        decision
    }
}

impl DeterministicEligibilityFilter {
    fn decide(
        &self,
        campaign: &Campaign,
        product: &ProductSnapshot,
        now: DateTime<Utc>,
    ) -> EligibilityDecision {
        if let Err(reason) = check_schedule(campaign, now) {
            return EligibilityDecision::reject(reason, Vec::new());
        }

        let mut errors = Vec::new();
        let selected = match &campaign.product_selection {
            ProductSelection::AllProducts => true,
            ProductSelection::ExplicitIds { product_ids }
            | ProductSelection::RandomSubset { product_ids } => product_ids.contains(&product.id),
            ProductSelection::ConditionDriven { conditions } => evaluate_set(
                campaign.id,
                ConditionScope::Selection,
                conditions,
                product,
                &mut errors,
            ),
        };
        if self.strict_conditions && !errors.is_empty() {
            return EligibilityDecision::reject(RejectionReason::InvalidConditions, errors);
        }
        if !selected {
            return EligibilityDecision::reject(RejectionReason::NotSelected, errors);
        }

        let matched = evaluate_set(
            campaign.id,
            ConditionScope::Campaign,
            &campaign.conditions,
            product,
            &mut errors,
        );
        if self.strict_conditions && !errors.is_empty() {
            return EligibilityDecision::reject(RejectionReason::InvalidConditions, errors);
        }
        if !matched {
            return EligibilityDecision::reject(RejectionReason::ConditionsUnmet, errors);
        }

        EligibilityDecision::accept(errors)
    }
}

/// Status and schedule window. `ends_at` is inclusive; an active campaign is
/// not held back by a future `starts_at`.
pub fn check_schedule(campaign: &Campaign, now: DateTime<Utc>) -> Result<(), RejectionReason> {
    match campaign.status {
        CampaignStatus::Active => {}
        CampaignStatus::Scheduled if now >= campaign.starts_at => {}
        CampaignStatus::Scheduled => return Err(RejectionReason::NotStarted),
        CampaignStatus::Paused
        | CampaignStatus::Expired
        | CampaignStatus::Draft
        | CampaignStatus::Archived => return Err(RejectionReason::Inactive),
    }

    match campaign.ends_at {
        Some(ends_at) if now > ends_at => Err(RejectionReason::Ended),
        _ => Ok(()),
    }
}

/// Evaluates every condition so all invalid ones are reported, then folds the
/// outcomes with the set's logic. An empty set always holds.
fn evaluate_set(
    campaign_id: CampaignId,
    scope: ConditionScope,
    set: &ConditionSet,
    product: &ProductSnapshot,
    errors: &mut Vec<EligibilityError>,
) -> bool {
    if set.is_empty() {
        return true;
    }

    let outcomes: Vec<bool> = set
        .conditions
        .iter()
        .enumerate()
        .map(|(condition_index, condition)| match condition.compile() {
            Ok(compiled) => evaluate_compiled(&compiled, product),
            Err(source) => {
                warn!(
                    event_name = "discount.condition.invalid",
                    campaign_id = %campaign_id,
                    scope = scope.as_str(),
                    condition_index,
                    error = %source,
                    "invalid condition evaluated as non-matching"
                );
                errors.push(EligibilityError::InvalidCondition {
                    campaign_id,
                    scope,
                    condition_index,
                    source,
                });
                false
            }
        })
        .collect();

    match set.logic {
        ConditionLogic::All => outcomes.iter().all(|matched| *matched),
        ConditionLogic::Any => outcomes.iter().any(|matched| *matched),
    }
}

/// Applicability under the default, fail-closed filter.
pub fn is_applicable(campaign: &Campaign, product: &ProductSnapshot, now: DateTime<Utc>) -> bool {
    DeterministicEligibilityFilter::default().is_applicable(campaign, product, now)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Applicability<'a> {
    pub campaigns: Vec<&'a Campaign>,
    pub errors: Vec<EligibilityError>,
}

/// Filters a campaign slice down to those applicable to `product`, keeping
/// input order. Callers pricing many products can compute this once per
/// product and reuse it.
pub fn applicable_campaigns<'a, F>(
    filter: &F,
    campaigns: &'a [Campaign],
    product: &ProductSnapshot,
    now: DateTime<Utc>,
) -> Applicability<'a>
where
    F: EligibilityFilter + ?Sized,
{
    let mut applicability = Applicability::default();
    for campaign in campaigns {
        let decision = filter.check(campaign, product, now);
        applicability.errors.extend(decision.errors);
        if decision.applicable {
            applicability.campaigns.push(campaign);
        }
    }
    applicability
}

/// Every misconfiguration in a campaign, found without a product: both
/// condition sets and the discount payload.
pub fn validate_campaign(campaign: &Campaign) -> Vec<ConfigError> {
    let mut errors: Vec<ConfigError> = Vec::new();

    if let ProductSelection::ConditionDriven { conditions } = &campaign.product_selection {
        errors.extend(conditions.validate().into_iter().map(|(_, error)| error.into()));
    }
    errors.extend(campaign.conditions.validate().into_iter().map(|(_, error)| error.into()));
    if let Err(error) = campaign.discount.validate() {
        errors.push(error.into());
    }

    errors
}
