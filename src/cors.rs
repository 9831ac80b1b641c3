//! CORS pre-flight handling (spec §4.10).
//!
//! Synthesized directly rather than through `tower_http::cors::CorsLayer`:
//! the layer cannot produce the spec's intentionally misspelled
//! `Access-Allow-Credentials` header or the "204 on unmatched operation"
//! semantics used when CORS is enabled but no operation resolves (spec
//! §4.9).

use crate::config::Config;

/// The full CORS header set for a pre-flight (or actual) response.
pub struct CorsHeaders {
    pub allow_origin: String,
    pub allow_methods: &'static str,
    pub allow_headers: Option<String>,
    pub expose_headers: Option<String>,
    pub allow_credentials: String,
    pub max_age: &'static str,
    pub vary: &'static str,
}

const ALLOW_METHODS: &str = "POST, PUT, GET, OPTIONS, DELETE, PATCH";
const MAX_AGE: &str = "3600";
const VARY: &str = "Accept-Encoding, Origin";

/// Build the CORS headers for a pre-flight response, echoing the request's
/// `Access-Control-Request-Headers` (comma-joined when multi-valued) into
/// both `Allow-Headers` and `Expose-Headers`.
pub fn preflight_headers(config: &Config, requested_headers: &[String]) -> CorsHeaders {
    let echoed = if requested_headers.is_empty() {
        None
    } else {
        Some(requested_headers.join(", "))
    };
    CorsHeaders {
        allow_origin: config.cors_allowed_origins.clone(),
        allow_methods: ALLOW_METHODS,
        allow_headers: echoed.clone(),
        expose_headers: echoed,
        allow_credentials: config.cors_allow_credentials.to_string(),
        max_age: MAX_AGE,
        vary: VARY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_requested_headers_comma_joined() {
        let config = Config {
            enable_cors_policy: true,
            cors_allowed_origins: "*".to_string(),
            cors_allow_credentials: false,
            ..Config::default()
        };
        let headers = preflight_headers(&config, &["X-A".to_string(), "X-B".to_string()]);
        assert_eq!(headers.allow_headers.as_deref(), Some("X-A, X-B"));
        assert_eq!(headers.expose_headers.as_deref(), Some("X-A, X-B"));
        assert_eq!(headers.allow_methods, "POST, PUT, GET, OPTIONS, DELETE, PATCH");
        assert_eq!(headers.max_age, "3600");
    }

    #[test]
    fn no_requested_headers_means_none_echoed() {
        let config = Config::default();
        let headers = preflight_headers(&config, &[]);
        assert!(headers.allow_headers.is_none());
        assert!(headers.expose_headers.is_none());
    }
}
