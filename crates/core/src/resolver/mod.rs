use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::campaign::{Campaign, CampaignId, Priority};
use crate::domain::product::ProductId;

/// Campaigns that tied at the winning priority for one product. The winner is
/// always listed last; the others come in descending id order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub product_id: ProductId,
    pub priority: Priority,
    pub campaign_ids: Vec<CampaignId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConflictOutcome<'a> {
    pub winner: Option<&'a Campaign>,
    pub conflicts: Vec<ConflictReport>,
}

pub trait ConflictResolver: Send + Sync {
    fn resolve<'a>(
        &self,
        product_id: ProductId,
        applicable: &[&'a Campaign],
    ) -> ConflictOutcome<'a>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeterministicConflictResolver {
    report_conflicts: bool,
}

impl Default for DeterministicConflictResolver {
    fn default() -> Self {
        Self { report_conflicts: true }
    }
}

impl DeterministicConflictResolver {
    pub fn new(report_conflicts: bool) -> Self {
        Self { report_conflicts }
    }
}

impl ConflictResolver for DeterministicConflictResolver {
    fn resolve<'a>(
        &self,
        product_id: ProductId,
        applicable: &[&'a Campaign],
    ) -> ConflictOutcome<'a> {
        let mut ranked: Vec<&'a Campaign> = applicable.to_vec();
        ranked.sort_by(|left, right| rank(left, right));

        let Some(winner) = ranked.first().copied() else {
            return ConflictOutcome { winner: None, conflicts: Vec::new() };
        };

        let tied: Vec<CampaignId> = ranked
            .iter()
            .filter(|campaign| campaign.priority == winner.priority)
            .map(|campaign| campaign.id)
            .rev()
            .collect();

        let mut conflicts = Vec::new();
        if tied.len() > 1 {
            warn!(
                event_name = "discount.conflict.detected",
                product_id = %product_id,
                priority = winner.priority.value(),
                winner_id = %winner.id,
                tied_campaigns = tied.len(),
                "campaigns tied at the winning priority"
            );
            if self.report_conflicts {
                conflicts.push(ConflictReport {
                    product_id,
                    priority: winner.priority,
                    campaign_ids: tied,
                });
            }
        }

        ConflictOutcome { winner: Some(winner), conflicts }
    }
}

/// Higher priority first, then the lower campaign id.
fn rank(left: &Campaign, right: &Campaign) -> std::cmp::Ordering {
    right.priority.cmp(&left.priority).then_with(|| left.id.cmp(&right.id))
}

/// Winner and tie report under the default resolver.
pub fn resolve<'a>(product_id: ProductId, applicable: &[&'a Campaign]) -> ConflictOutcome<'a> {
    DeterministicConflictResolver::default().resolve(product_id, applicable)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{resolve, ConflictReport, ConflictResolver, DeterministicConflictResolver};
    use crate::conditions::ConditionSet;
    use crate::domain::campaign::{
        Campaign, CampaignId, CampaignStatus, Priority, ProductSelection,
    };
    use crate::domain::product::ProductId;
    use crate::strategies::{DiscountConfig, FixedConfig};

    fn campaign(id: u64, priority: u8) -> Campaign {
        Campaign {
            id: CampaignId(id),
            name: String::new(),
            priority: Priority::try_from(priority).expect("priority in range"),
            status: CampaignStatus::Active,
            starts_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().expect("timestamp"),
            ends_at: None,
            product_selection: ProductSelection::AllProducts,
            conditions: ConditionSet::default(),
            discount: DiscountConfig::Fixed(FixedConfig { value: Decimal::ONE }),
        }
    }

    #[test]
    fn equal_priority_resolves_to_lowest_id_and_reports_the_tie() {
        let twelve = campaign(12, 5);
        let seven = campaign(7, 5);
        let outcome = resolve(ProductId(3), &[&twelve, &seven]);

        assert_eq!(outcome.winner.map(|campaign| campaign.id), Some(CampaignId(7)));
        assert_eq!(
            outcome.conflicts,
            vec![ConflictReport {
                product_id: ProductId(3),
                priority: Priority::MAX,
                campaign_ids: vec![CampaignId(12), CampaignId(7)],
            }]
        );
    }

    #[test]
    fn higher_priority_wins_without_a_report() {
        let low = campaign(1, 2);
        let high = campaign(9, 4);
        let outcome = resolve(ProductId(3), &[&low, &high]);
        assert_eq!(outcome.winner.map(|campaign| campaign.id), Some(CampaignId(9)));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn ties_below_the_winning_priority_are_not_reported() {
        let top = campaign(20, 5);
        let (a, b) = (campaign(2, 1), campaign(1, 1));
        let outcome = resolve(ProductId(3), &[&a, &top, &b]);
        assert_eq!(outcome.winner.map(|campaign| campaign.id), Some(CampaignId(20)));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn empty_input_has_no_winner() {
        let outcome = resolve(ProductId(3), &[]);
        assert!(outcome.winner.is_none());
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn silenced_reports_keep_the_same_winner() {
        let (twelve, seven) = (campaign(12, 5), campaign(7, 5));
        let outcome =
            DeterministicConflictResolver::new(false).resolve(ProductId(3), &[&twelve, &seven]);
        assert_eq!(outcome.winner.map(|campaign| campaign.id), Some(CampaignId(7)));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn input_order_does_not_change_the_outcome() {
        let campaigns = [campaign(4, 3), campaign(2, 3), campaign(3, 3)];
        let forward: Vec<&Campaign> = campaigns.iter().collect();
        let backward: Vec<&Campaign> = campaigns.iter().rev().collect();
        assert_eq!(resolve(ProductId(1), &forward), resolve(ProductId(1), &backward));
    }
}
