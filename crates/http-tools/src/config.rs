//! Serde configuration types shared by units and the runner.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpClientConfig {
    /// Per-request timeout in seconds. `0` disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum response body size in bytes. Unlimited when absent.
    #[serde(default)]
    pub max_response_bytes: Option<usize>,

    /// If set, only these hosts may be called (case-insensitive).
    #[serde(default)]
    pub allowed_hosts: Option<HashSet<String>>,

    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_follow_redirects() -> bool {
    true
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_response_bytes: None,
            allowed_hosts: None,
            follow_redirects: default_follow_redirects(),
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// One step of a response shaping pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseTransform {
    /// Remove `null` object fields recursively.
    DropNulls,
    /// Keep only these top-level object fields.
    PickFields { fields: Vec<String> },
    /// Replace the values of matching keys (at any depth).
    RedactKeys {
        keys: Vec<String>,
        #[serde(default)]
        replacement: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TruncateStrings { max_chars: usize },
    #[serde(rename_all = "camelCase")]
    LimitArrays { max_items: usize },
    /// Map an array of objects to the value of one field per row.
    PluckField {
        field: String,
        #[serde(default)]
        default: Option<Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_config_defaults_apply_to_empty_object() {
        let cfg: HttpClientConfig = serde_json::from_value(json!({})).expect("config");
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
        assert!(cfg.follow_redirects);
        assert!(cfg.allowed_hosts.is_none());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cfg: HttpClientConfig =
            serde_json::from_value(json!({ "timeoutSecs": 0 })).expect("config");
        assert_eq!(cfg.timeout(), None);
    }

    #[test]
    fn transforms_deserialize_from_tagged_objects() {
        let t: Vec<ResponseTransform> = serde_json::from_value(json!([
            { "type": "dropNulls" },
            { "type": "limitArrays", "maxItems": 3 },
            { "type": "pluckField", "field": "page_content", "default": "" }
        ]))
        .expect("transforms");
        assert_eq!(t[0], ResponseTransform::DropNulls);
        assert_eq!(t[1], ResponseTransform::LimitArrays { max_items: 3 });
        assert_eq!(
            t[2],
            ResponseTransform::PluckField {
                field: "page_content".into(),
                default: Some(json!("")),
            }
        );
    }
}
