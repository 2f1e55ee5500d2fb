//! Rendering of command output.

use std::collections::BTreeMap;

use pallas_config::{ConfigTree, VariableUsage};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::args::OutputFormat;
use crate::error::CliResult;

const REDACTED: &str = "***";

/// Field names whose values are never printed.
const SECRET_FIELDS: [&str; 7] = [
    "secret_key",
    "password",
    "secret_access_key",
    "api_key",
    "api_key_private",
    "api_token",
    "dsn",
];

#[derive(Serialize)]
struct UsedVariable<'a> {
    name: &'a str,
    is_required: bool,
    is_present: bool,
}

/// Render the usage ledger.
pub fn render_vars(
    used: &BTreeMap<String, VariableUsage>,
    format: OutputFormat,
) -> CliResult<String> {
    let rows: Vec<UsedVariable<'_>> = used
        .iter()
        .map(|(name, usage)| UsedVariable {
            name,
            is_required: usage.required,
            is_present: usage.present,
        })
        .collect();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => Ok(render_table(&rows)),
    }
}

fn render_table(rows: &[UsedVariable<'_>]) -> String {
    let width = rows
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  REQUIRED  PRESENT\n", "NAME");
    for row in rows {
        out.push_str(&format!(
            "{:<width$}  {:<8}  {}\n",
            row.name,
            yes_no(row.is_required),
            yes_no(row.is_present),
        ));
    }
    out
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Render the tree as pretty JSON with secrets masked.
pub fn render_tree(tree: &ConfigTree) -> CliResult<String> {
    let mut settings = serde_json::Map::new();
    for (name, mut value) in tree.to_settings_map()? {
        redact(&mut value);
        settings.insert(name, value);
    }

    let document = serde_json::json!({
        "features": tree.features().enabled().map(|f| f.as_str()).collect::<Vec<_>>(),
        "settings": settings,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// One-line summary for a successful `check`.
pub fn render_check(tree: &ConfigTree) -> String {
    let environment = tree.site().map_or("?", |site| site.environment.as_str());
    let subsystems: Vec<&str> = tree.subsystems().map(|s| s.as_str()).collect();
    format!(
        "ok: environment {environment}, {} variables, subsystems: {}",
        tree.used_variables().len(),
        subsystems.join(", ")
    )
}

/// Mask secret fields and URL passwords in place.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            for (key, field) in fields.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) && !field.is_null() {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        Value::String(s) => {
            if let Some(masked) = mask_url_password(s) {
                *s = masked;
            }
        }
        _ => {}
    }
}

fn mask_url_password(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    url.password()?;
    url.set_password(Some(REDACTED)).ok()?;
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallas_config::{ConfigResolver, EnvironmentSnapshot, FeatureOverrides, StaticProbe};

    fn tree() -> ConfigTree {
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("ENVIRONMENT", "ci"),
            ("SECRET_KEY", "top-secret"),
            ("DATABASE_URL", "postgres://app:hunter2@db/app"),
            ("EMAIL_MODE", "mandrill"),
            ("MANDRILL_API_KEY", "mandrill-key"),
        ]);
        let probe = StaticProbe::new(["postgres", "redis"]);
        ConfigResolver::new(&snapshot, FeatureOverrides::new(), &probe)
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_vars_table() {
        let mut used = BTreeMap::new();
        used.insert(
            "DATABASE_URL".to_string(),
            VariableUsage { required: true, present: true },
        );
        used.insert(
            "DEBUG".to_string(),
            VariableUsage { required: false, present: false },
        );

        let table = render_vars(&used, OutputFormat::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "NAME          REQUIRED  PRESENT");
        assert_eq!(lines[1], "DATABASE_URL  yes       yes");
        assert_eq!(lines[2], "DEBUG         no        no");
    }

    #[test]
    fn test_vars_json() {
        let mut used = BTreeMap::new();
        used.insert(
            "SECRET_KEY".to_string(),
            VariableUsage { required: true, present: false },
        );

        let json: Value = serde_json::from_str(&render_vars(&used, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "name": "SECRET_KEY", "is_required": true, "is_present": false }])
        );
    }

    #[test]
    fn test_tree_output_hides_secrets() {
        let out = render_tree(&tree()).unwrap();
        assert!(!out.contains("top-secret"));
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("mandrill-key"));

        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["settings"]["cache"]["key_prefix"], "ci:cache:");
        assert_eq!(json["settings"]["database"]["user"], "app");
        assert_eq!(json["features"], serde_json::json!(["cache"]));
    }

    #[test]
    fn test_check_summary() {
        let summary = render_check(&tree());
        assert!(summary.starts_with("ok: environment ci,"));
        assert!(summary.contains("database"));
        assert!(summary.contains("cache"));
    }

    #[test]
    fn test_redact_leaves_plain_urls() {
        let mut value = serde_json::json!({ "url": "redis://localhost:6379/0", "password": null });
        redact(&mut value);
        assert_eq!(value["url"], "redis://localhost:6379/0");
        assert!(value["password"].is_null());
    }
}
