//! Outbound HTTP policy: scheme/host checks and redaction of URLs in error text.

use crate::config::HttpClientConfig;
use crate::transport::TransportError;
use std::collections::HashSet;
use url::Url;

#[derive(Debug, Clone)]
pub struct OutboundPolicy {
    /// If set, only these hosts are allowed (compared lowercase).
    pub allowed_hosts: Option<HashSet<String>>,
    /// Maximum response body size (bytes). `None` = unlimited.
    pub max_response_bytes: Option<usize>,
    pub follow_redirects: bool,
}

impl OutboundPolicy {
    /// No host restrictions, no size limit, redirects followed.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allowed_hosts: None,
            max_response_bytes: None,
            follow_redirects: true,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &HttpClientConfig) -> Self {
        Self {
            allowed_hosts: cfg.allowed_hosts.as_ref().map(|hosts| {
                hosts
                    .iter()
                    .map(|h| h.to_ascii_lowercase())
                    .collect()
            }),
            max_response_bytes: cfg.max_response_bytes,
            follow_redirects: cfg.follow_redirects,
        }
    }

    /// Validate a URL before making an outbound request.
    ///
    /// # Errors
    ///
    /// Returns an error for non-`http(s)` schemes, a missing host, or a host outside the
    /// allowlist.
    pub fn check_url(&self, url: &Url) -> Result<(), TransportError> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(TransportError::new(format!(
                "Outbound HTTP blocked: unsupported URL scheme '{scheme}'"
            )));
        }

        let Some(host) = url.host_str() else {
            return Err(TransportError::new("Outbound HTTP blocked: missing URL host"));
        };

        if let Some(allowed) = &self.allowed_hosts
            && !allowed.contains(&host.to_ascii_lowercase())
        {
            return Err(TransportError::new(format!(
                "Outbound HTTP blocked: host '{host}' not in allowlist"
            )));
        }

        Ok(())
    }
}

impl Default for OutboundPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Drop credentials, query and fragment so a URL is safe to log.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
