use std::path::Path;

use rebate_core::config::AppConfig;
use rebate_core::{validate_campaign, Campaign, CampaignId, DiscountType};
use serde::{Deserialize, Serialize};

use crate::commands::{read_json, CommandResult, EXIT_ENGINE_CONFIG, EXIT_INPUT};

#[derive(Debug, Deserialize)]
struct ValidateInput {
    campaigns: Vec<Campaign>,
}

#[derive(Debug, Serialize)]
struct CampaignCheck {
    campaign_id: CampaignId,
    name: String,
    discount_type: DiscountType,
    valid: bool,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ValidateReport {
    command: &'static str,
    status: &'static str,
    summary: String,
    campaigns: Vec<CampaignCheck>,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let snapshot: ValidateInput = match read_json(input) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            return CommandResult::failure(
                "validate",
                "invalid_input",
                format!("{error:#}"),
                EXIT_INPUT,
            );
        }
    };

    let checks: Vec<CampaignCheck> = snapshot
        .campaigns
        .iter()
        .map(|campaign| {
            let errors: Vec<String> =
                validate_campaign(campaign).iter().map(ToString::to_string).collect();
            CampaignCheck {
                campaign_id: campaign.id,
                name: campaign.name.clone(),
                discount_type: campaign.discount_type(),
                valid: errors.is_empty(),
                errors,
            }
        })
        .collect();

    let invalid = checks.iter().filter(|check| !check.valid).count();
    let max_campaigns = config.engine.max_campaigns as usize;
    let over_limit = checks.len() > max_campaigns;

    let mut summary = format!("{} campaigns checked, {invalid} invalid", checks.len());
    if over_limit {
        summary.push_str(&format!("; exceeds engine.max_campaigns ({max_campaigns})"));
    }

    let passed = invalid == 0 && !over_limit;
    let report = ValidateReport {
        command: "validate",
        status: if passed { "ok" } else { "error" },
        summary,
        campaigns: checks,
    };
    CommandResult::report("validate", if passed { 0 } else { EXIT_ENGINE_CONFIG }, &report)
}
