use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use rebate_cli::commands::{config, resolve, validate};
use rebate_core::config::{AppConfig, EngineSettings};
use serde_json::Value;
use tempfile::TempDir;

const CAMPAIGNS: &str = r#"[
    {
        "id": 12,
        "name": "Spring mugs",
        "priority": 5,
        "status": "active",
        "starts_at": "2025-01-01T00:00:00Z",
        "ends_at": "2025-06-30T23:59:59Z",
        "product_selection": {"mode": "all_products"},
        "conditions": {
            "logic": "all",
            "conditions": [{"property": "sku", "operator": "starts_with", "value": "mug"}]
        },
        "discount": {"discount_type": "percentage", "discount_config": {"value": "10"}}
    },
    {
        "id": 7,
        "name": "Clearance",
        "priority": 5,
        "status": "active",
        "starts_at": "2025-01-01T00:00:00Z",
        "product_selection": {"mode": "explicit_ids", "product_ids": [5, 6]},
        "discount": {"discount_type": "fixed", "discount_config": {"value": "15"}}
    }
]"#;

#[test]
fn resolve_prints_winner_price_and_conflicts() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_fixture(
        &dir,
        "cart.json",
        &format!(
            r#"{{
                "product": {{"id": 5, "regular_price": "40.00", "sku": "MUG-BLUE"}},
                "campaigns": {CAMPAIGNS},
                "context": {{"quantity": 1, "cart_spend": "40.00"}}
            }}"#
        ),
    );

    let result = resolve::run(&AppConfig::default(), &input, Some("2025-06-01T12:00:00Z"));
    assert_eq!(result.exit_code, 0, "expected successful resolution: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "resolve");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["winner"], 7);
    assert_eq!(payload["result"]["applied"], true);
    assert_eq!(payload["result"]["discounted_price"], "25.00");
    assert_eq!(payload["conflicts"][0]["campaign_ids"], serde_json::json!([12, 7]));
}

#[test]
fn resolve_after_campaign_end_falls_back_to_remaining_campaign() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_fixture(
        &dir,
        "cart.json",
        &format!(
            r#"{{
                "product": {{"id": 9, "regular_price": "40.00", "sku": "MUG-RED"}},
                "campaigns": {CAMPAIGNS},
                "context": {{"now": "2025-07-01T00:00:00Z"}}
            }}"#
        ),
    );

    let result = resolve::run(&AppConfig::default(), &input, None);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["winner"], Value::Null);
    assert_eq!(payload["result"]["applied"], false);
    assert_eq!(payload["result"]["metadata"]["note"], "no_applicable_campaign");
}

#[test]
fn resolve_rejects_unreadable_input_and_bad_now() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("absent.json");
    let result = resolve::run(&AppConfig::default(), &missing, None);
    assert_eq!(result.exit_code, 3);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "invalid_input");

    let input = write_fixture(&dir, "cart.json", r#"{"product": {"id": 1, "price": "5"}}"#);
    let result = resolve::run(&AppConfig::default(), &input, Some("yesterday"));
    assert_eq!(result.exit_code, 3);
}

#[test]
fn resolve_reports_engine_configuration_errors() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_fixture(
        &dir,
        "cart.json",
        &format!(r#"{{"product": {{"id": 5, "price": "12"}}, "campaigns": {CAMPAIGNS}}}"#),
    );
    let config = AppConfig {
        engine: EngineSettings { max_campaigns: 1, ..EngineSettings::default() },
        ..AppConfig::default()
    };

    let result = resolve::run(&config, &input, Some("2025-06-01T00:00:00Z"));
    assert_eq!(result.exit_code, 4);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "engine_config");
}

#[test]
fn validate_flags_invalid_campaigns() {
    let dir = TempDir::new().expect("temp dir");
    let input = write_fixture(
        &dir,
        "campaigns.json",
        r#"{"campaigns": [
            {
                "id": 1,
                "status": "active",
                "starts_at": "2025-01-01T00:00:00Z",
                "product_selection": {"mode": "all_products"},
                "discount": {"discount_type": "tiered", "discount_config": {"tiers": [
                    {"min_quantity": 10, "discount_type": "percentage", "discount_value": "20"},
                    {"min_quantity": 5, "discount_type": "percentage", "discount_value": "10"}
                ]}}
            },
            {
                "id": 2,
                "status": "scheduled",
                "starts_at": "2025-01-01T00:00:00Z",
                "product_selection": {"mode": "all_products"},
                "discount": {"discount_type": "bogo", "discount_config": {"rules": [
                    {"buy_quantity": 2, "get_quantity": 1, "discount_percent": "100"}
                ]}}
            }
        ]}"#,
    );

    let result = validate::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 4);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["campaigns"][0]["valid"], false);
    assert_eq!(payload["campaigns"][1]["valid"], true);
    assert_eq!(payload["campaigns"][1]["discount_type"], "bogo");
}

#[test]
fn validate_accepts_well_formed_campaigns() {
    let dir = TempDir::new().expect("temp dir");
    let input =
        write_fixture(&dir, "campaigns.json", &format!(r#"{{"campaigns": {CAMPAIGNS}}}"#));

    let result = validate::run(&AppConfig::default(), &input);
    assert_eq!(result.exit_code, 0, "expected clean validation: {}", result.output);
    assert_eq!(parse_payload(&result.output)["status"], "ok");
}

#[test]
fn config_reports_sources_for_env_and_defaults() {
    with_env(&[("REBATE_ENGINE_MAX_CAMPAIGNS", "25"), ("REBATE_LOG_FORMAT", "json")], || {
        let output = config::run(None);
        assert!(output.contains(
            "- engine.max_campaigns = 25 (source: env (REBATE_ENGINE_MAX_CAMPAIGNS))"
        ));
        assert!(output.contains("- logging.format = json (source: env (REBATE_LOG_FORMAT))"));
        assert!(output.contains("- engine.report_conflicts = true (source: default)"));
    });
}

#[test]
fn config_reports_file_sources() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_fixture(&dir, "rebate.toml", "[engine]\nstrict_conditions = true\n");

        let output = config::run(Some(path.clone()));
        assert!(output.contains(&format!(
            "- engine.strict_conditions = true (source: file ({}))",
            path.display()
        )));
    });
}

#[test]
fn config_reports_validation_failures() {
    with_env(&[("REBATE_ENGINE_MAX_CAMPAIGNS", "0")], || {
        let output = config::run(None);
        assert!(output.starts_with("config validation failed:"));
    });
}

fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("fixture should be written");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "REBATE_ENGINE_STRICT_CONDITIONS",
        "REBATE_ENGINE_REPORT_CONFLICTS",
        "REBATE_ENGINE_MAX_CAMPAIGNS",
        "REBATE_LOGGING_LEVEL",
        "REBATE_LOGGING_FORMAT",
        "REBATE_LOG_LEVEL",
        "REBATE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
