use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::conditions::ConditionSet;
use crate::domain::product::ProductId;
use crate::strategies::{DiscountConfig, DiscountType};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CampaignId(pub u64);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Scheduled,
    Paused,
    Expired,
    Draft,
    Archived,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Scheduled => "scheduled",
            Self::Paused => "paused",
            Self::Expired => "expired",
            Self::Draft => "draft",
            Self::Archived => "archived",
        }
    }
}

/// Campaign priority, 1 (lowest) through 5 (highest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(1);
    pub const MAX: Priority = Priority(5);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("priority must be in range 1..=5, got {value}"))
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProductSelection {
    AllProducts,
    ExplicitIds { product_ids: BTreeSet<ProductId> },
    /// Already materialized by the authoring side; matched like `ExplicitIds`.
    RandomSubset { product_ids: BTreeSet<ProductId> },
    ConditionDriven { conditions: ConditionSet },
}

impl ProductSelection {
    /// Draw `count` distinct products from `pool` with a seeded generator, so
    /// the same seed always produces the same subset.
    pub fn random_subset(pool: &[ProductId], count: usize, seed: u64) -> Self {
        let unique: Vec<ProductId> =
            pool.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let product_ids = unique.choose_multiple(&mut rng, count).copied().collect();
        Self::RandomSubset { product_ids }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::AllProducts => "all_products",
            Self::ExplicitIds { .. } => "explicit_ids",
            Self::RandomSubset { .. } => "random_subset",
            Self::ConditionDriven { .. } => "condition_driven",
        }
    }
}

/// The slice of a campaign the resolution engine reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    pub status: CampaignStatus,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub product_selection: ProductSelection,
    #[serde(default)]
    pub conditions: ConditionSet,
    pub discount: DiscountConfig,
}

impl Campaign {
    pub fn discount_type(&self) -> DiscountType {
        self.discount.discount_type()
    }
}
