use anyhow::Context as _;
use flowunit_http_tools::config::{HttpClientConfig, ResponseTransform};
use flowunit_units::{InputRecord, JsonObject, UnitKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A unit and everything needed to run it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnitFile {
    pub unit: UnitKind,
    /// Values for every record.
    #[serde(default)]
    pub parameters: JsonObject,
    /// Per-record overrides, by record index.
    #[serde(default)]
    pub items: Vec<JsonObject>,
    #[serde(default)]
    pub continue_on_fail: bool,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub shaping: Vec<ResponseTransform>,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

pub fn load_unit_file(path: &Path) -> anyhow::Result<UnitFile> {
    let bytes = std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: UnitFile = if is_json(path) {
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?
    } else {
        serde_yaml::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?
    };
    Ok(cfg)
}

/// Input records: a JSON array of objects.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<InputRecord>> {
    let bytes = std::fs::read(path).with_context(|| format!("read records {}", path.display()))?;
    let value: Value =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    parse_records(value).with_context(|| format!("records in {}", path.display()))
}

fn parse_records(value: Value) -> anyhow::Result<Vec<InputRecord>> {
    let Value::Array(rows) = value else {
        anyhow::bail!("expected a JSON array of objects");
    };
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(json) => Ok(InputRecord::new(json)),
            other => anyhow::bail!("record {i} is not an object: {other}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_unit_file_with_defaults() {
        let cfg: UnitFile = serde_yaml::from_str(
            r#"
unit: search
parameters:
  apiUrl: https://search.example.com/query
  query: "={{ $json.q }}"
http:
  timeoutSecs: 5
shaping:
  - type: limitArrays
    maxItems: 2
"#,
        )
        .unwrap();
        assert_eq!(cfg.unit, UnitKind::Search);
        assert_eq!(cfg.parameters["query"], "={{ $json.q }}");
        assert!(!cfg.continue_on_fail);
        assert!(cfg.items.is_empty());
        assert_eq!(cfg.http.timeout_secs, 5);
        assert_eq!(
            cfg.shaping,
            vec![ResponseTransform::LimitArrays { max_items: 2 }]
        );
    }

    #[test]
    fn unknown_keys_and_units_are_rejected() {
        assert!(serde_yaml::from_str::<UnitFile>("unit: fetch\ncontinueOnFial: true\n").is_err());
        assert!(serde_yaml::from_str::<UnitFile>("unit: teleport\n").is_err());
    }

    #[test]
    fn records_must_be_objects() {
        let records = parse_records(json!([{ "a": 1 }, {}])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].json["a"], 1);

        let err = parse_records(json!([{ "a": 1 }, 2])).unwrap_err();
        assert!(err.to_string().contains("record 1"));
        assert!(parse_records(json!({ "a": 1 })).is_err());
    }

    #[test]
    fn json_extension_uses_json_parser() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.JSON");
        std::fs::write(&path, r#"{"unit": "multiMode", "continueOnFail": true}"#).unwrap();
        let cfg = load_unit_file(&path).unwrap();
        assert_eq!(cfg.unit, UnitKind::MultiMode);
        assert!(cfg.continue_on_fail);

        let missing = load_unit_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(missing.to_string().starts_with("read config"));
    }
}
