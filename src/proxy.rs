//! Proxy decider (spec §4.5): decides whether to forward upstream, and the
//! `ProxyClient` contract used to perform that forward.

use crate::error::{Error, Result};
use crate::model::{ProxyFallbackSpecification, Response};
use async_trait::async_trait;
use http::{HeaderMap, Method};

/// Outbound proxy client contract (spec §6).
#[async_trait]
pub trait ProxyClient: Send + Sync {
    async fn call_external(
        &self,
        url: &str,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<ProxiedResponse>;
}

/// Response returned verbatim by [`ProxyClient::call_external`].
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// `reqwest`-backed [`ProxyClient`], the reference implementation used to
/// run the engine standalone.
#[derive(Default)]
pub struct HttpProxyClient {
    client: reqwest::Client,
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn call_external(
        &self,
        url: &str,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<ProxiedResponse> {
        let response = self
            .client
            .request(method.clone(), url)
            .headers(headers.clone())
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| Error::Proxy(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Proxy(e.to_string()))?
            .to_vec();

        Ok(ProxiedResponse {
            status,
            headers,
            body,
        })
    }
}

/// Decide whether to forward upstream and, if so, the target URL.
///
/// Returns `Some(url)` when either:
/// - `dispatcher == "PROXY"` (unconditional forward), or
/// - `proxy_fallback` is configured AND the selected response is `None` or
///   matches the proxy-fallback condition on status.
pub fn decide_proxy_url(
    dispatcher: Option<&str>,
    dispatcher_rules: Option<&str>,
    resource_path: &str,
    proxy_fallback: Option<&ProxyFallbackSpecification>,
    selected_response: Option<&Response>,
) -> Option<String> {
    if dispatcher == Some("PROXY") {
        let base = dispatcher_rules.unwrap_or("").trim_end_matches('/');
        return Some(format!("{base}{resource_path}"));
    }

    if let Some(fb) = proxy_fallback {
        let miss = selected_response.is_none();
        let status_matches = selected_response
            .and_then(|r| r.status)
            .map(|status| proxy_fallback_condition_matches(&fb.dispatcher_rules, status))
            .unwrap_or(false);
        if miss || status_matches {
            let base = fb.proxy_url.trim_end_matches('/');
            return Some(format!("{base}{resource_path}"));
        }
    }

    None
}

/// `dispatcher_rules` on a `ProxyFallbackSpecification` is a status-code
/// condition of the shape `">=400"`, `"404"`, or a comma-separated list of
/// codes; any of these forms may appear.
fn proxy_fallback_condition_matches(rules: &str, status: u16) -> bool {
    let rules = rules.trim();
    if rules.is_empty() {
        return false;
    }
    if let Some(threshold) = rules.strip_prefix(">=") {
        return threshold.trim().parse::<u16>().is_ok_and(|t| status >= t);
    }
    if let Some(threshold) = rules.strip_prefix('>') {
        return threshold.trim().parse::<u16>().is_ok_and(|t| status > t);
    }
    rules
        .split(',')
        .filter_map(|s| s.trim().parse::<u16>().ok())
        .any(|code| code == status)
}
