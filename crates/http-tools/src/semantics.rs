//! HTTP method semantics.
//!
//! Two decisions hang off the method of a call:
//! - whether filter arguments travel in the query string or in a JSON body
//! - which behavioral hints a tool advertises to the agent (RFC 9110-style)

use reqwest::Method;
use serde::Serialize;

/// Behavioral hints advertised alongside a tool description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
    /// `false` only for tools computed in-process.
    pub open_world: bool,
}

impl MethodHints {
    /// Hints for a tool that makes no outbound call.
    #[must_use]
    pub fn local() -> Self {
        Self {
            read_only: Some(true),
            destructive: Some(false),
            idempotent: Some(true),
            open_world: false,
        }
    }
}

/// Whether requests with this method carry their arguments as a JSON body.
#[must_use]
pub fn carries_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT || method == Method::PATCH
}

/// Generate tool hints based on HTTP method semantics.
///
/// For unknown/extension methods only `open_world` is set.
#[must_use]
pub fn hints_for_method(method: &Method) -> MethodHints {
    let (read_only, destructive, idempotent) = if method == Method::GET
        || method == Method::HEAD
        || method == Method::OPTIONS
    {
        (Some(true), Some(false), Some(true))
    } else if method == Method::POST {
        (Some(false), Some(false), Some(false))
    } else if method == Method::PUT || method == Method::DELETE {
        (Some(false), Some(true), Some(true))
    } else if method == Method::PATCH {
        // PATCH may or may not be idempotent; do not guess.
        (Some(false), Some(true), None)
    } else {
        (None, None, None)
    };

    MethodHints {
        read_only,
        destructive,
        idempotent,
        open_world: true,
    }
}

/// Parse a configured method name (case-insensitive, surrounding whitespace ignored).
///
/// # Errors
///
/// Returns the trimmed input when it is not a valid method token.
pub fn parse_method(raw: &str) -> Result<Method, String> {
    let trimmed = raw.trim();
    trimmed
        .to_uppercase()
        .parse()
        .map_err(|_| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_bearing_methods_are_the_write_family() {
        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::PUT));
        assert!(carries_body(&Method::PATCH));
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::DELETE));
    }

    #[test]
    fn get_is_readonly_and_idempotent() {
        let h = hints_for_method(&Method::GET);
        assert_eq!(h.read_only, Some(true));
        assert_eq!(h.destructive, Some(false));
        assert_eq!(h.idempotent, Some(true));
        assert!(h.open_world);
    }

    #[test]
    fn patch_leaves_idempotence_unknown() {
        let h = hints_for_method(&Method::PATCH);
        assert_eq!(h.destructive, Some(true));
        assert_eq!(h.idempotent, None);
    }

    #[test]
    fn unknown_method_only_sets_open_world() {
        let custom: Method = "PROPFIND".parse().expect("valid method token");
        let h = hints_for_method(&custom);
        assert_eq!(h.read_only, None);
        assert_eq!(h.destructive, None);
        assert_eq!(h.idempotent, None);
        assert!(h.open_world);
    }

    #[test]
    fn parse_method_is_case_insensitive() {
        assert_eq!(parse_method(" post ").expect("method"), Method::POST);
        assert!(parse_method("not a method").is_err());
    }
}
