use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rebate_core::config::{locate_config_file, AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match AppConfig::load(LoadOptions {
        config_path: config_path.clone(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = locate_config_file(config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        Field {
            key_path: "engine.strict_conditions",
            env_keys: &["REBATE_ENGINE_STRICT_CONDITIONS"],
            value: config.engine.strict_conditions.to_string(),
        },
        Field {
            key_path: "engine.report_conflicts",
            env_keys: &["REBATE_ENGINE_REPORT_CONFLICTS"],
            value: config.engine.report_conflicts.to_string(),
        },
        Field {
            key_path: "engine.max_campaigns",
            env_keys: &["REBATE_ENGINE_MAX_CAMPAIGNS"],
            value: config.engine.max_campaigns.to_string(),
        },
        Field {
            key_path: "logging.level",
            env_keys: &["REBATE_LOGGING_LEVEL", "REBATE_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["REBATE_LOGGING_FORMAT", "REBATE_LOG_FORMAT"],
            value: config.logging.format.as_str().to_string(),
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        render_line(
            field.key_path,
            &field.value,
            field_source(field, config_file_doc.as_ref(), config_file_path.as_deref()),
        )
    }));
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = field
        .env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
