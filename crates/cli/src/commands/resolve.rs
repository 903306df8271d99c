use std::path::Path;

use chrono::{DateTime, Utc};
use rebate_core::config::AppConfig;
use rebate_core::{
    Campaign, CampaignId, ConflictReport, DeterministicDiscountRuntime, DiscountResult,
    DiscountRuntime, PricingContext, ProductId, ProductSnapshot, ResolutionContext,
};
use serde::{Deserialize, Serialize};

use crate::commands::{read_json, CommandResult, EXIT_ENGINE_CONFIG, EXIT_INPUT};

/// One product with the campaigns configured against it.
#[derive(Debug, Deserialize)]
pub struct ResolveInput {
    pub product: ProductSnapshot,
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub context: InputContext,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputContext {
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub pricing: PricingContext,
}

#[derive(Debug, Serialize)]
struct ResolveReport {
    command: &'static str,
    status: &'static str,
    product_id: ProductId,
    evaluated_at: DateTime<Utc>,
    winner: Option<CampaignId>,
    applicable: Vec<CampaignId>,
    result: DiscountResult,
    conflicts: Vec<ConflictReport>,
    diagnostics: Vec<String>,
}

/// `now` (RFC 3339) wins over the snapshot's own `context.now`, which wins
/// over the wall clock.
pub fn run(config: &AppConfig, input: &Path, now: Option<&str>) -> CommandResult {
    let snapshot: ResolveInput = match read_json(input) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return CommandResult::failure(
                "resolve",
                "invalid_input",
                format!("{error:#}"),
                EXIT_INPUT,
            );
        }
    };

    let explicit_now = match now.map(parse_now).transpose() {
        Ok(explicit_now) => explicit_now,
        Err(error) => {
            return CommandResult::failure(
                "resolve",
                "invalid_input",
                format!("--now must be an RFC 3339 timestamp: {error}"),
                EXIT_INPUT,
            );
        }
    };
    let evaluated_at = explicit_now.or(snapshot.context.now).unwrap_or_else(Utc::now);

    let runtime = DeterministicDiscountRuntime::from_settings(&config.engine);
    let context = ResolutionContext::new(evaluated_at, snapshot.context.pricing);

    match runtime.resolve(&snapshot.product, &snapshot.campaigns, &context) {
        Ok(resolution) => {
            let report = ResolveReport {
                command: "resolve",
                status: "ok",
                product_id: snapshot.product.id,
                evaluated_at,
                winner: resolution.winner,
                applicable: resolution.applicable,
                result: resolution.result,
                conflicts: resolution.conflicts,
                diagnostics: resolution.diagnostics.iter().map(ToString::to_string).collect(),
            };
            CommandResult::report("resolve", 0, &report)
        }
        Err(error) => CommandResult::failure(
            "resolve",
            "engine_config",
            format!("{} ({error})", error.user_message()),
            EXIT_ENGINE_CONFIG,
        ),
    }
}

fn parse_now(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value.trim()).map(|instant| instant.with_timezone(&Utc))
}
