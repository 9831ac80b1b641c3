//! Process configuration, loaded from environment variables.
//!
//! Mirrors the enumerated configuration keys of the specification: no
//! config-loading crate is pulled in, matching the teacher's habit of
//! hand-rolling small config structs with typed fields and explicit
//! defaults (see `server/observability/config.rs`).

/// Runtime configuration for the dispatch engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// `mocks.enable-invocation-stats` — enable telemetry emission.
    pub enable_invocation_stats: bool,
    /// `mocks.rest.enable-cors-policy` — enable CORS pre-flight synthesis.
    pub enable_cors_policy: bool,
    /// `mocks.rest.cors.allowedOrigins` — value for `Access-Control-Allow-Origin`.
    pub cors_allowed_origins: String,
    /// `mocks.rest.cors.allowCredentials` — credentials flag.
    pub cors_allow_credentials: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_invocation_stats: false,
            enable_cors_policy: false,
            cors_allowed_origins: "*".to_string(),
            cors_allow_credentials: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enable_invocation_stats: read_bool(
                "MOCKS_ENABLE_INVOCATION_STATS",
                defaults.enable_invocation_stats,
            ),
            enable_cors_policy: read_bool(
                "MOCKS_REST_ENABLE_CORS_POLICY",
                defaults.enable_cors_policy,
            ),
            cors_allowed_origins: std::env::var("MOCKS_REST_CORS_ALLOWED_ORIGINS")
                .unwrap_or(defaults.cors_allowed_origins),
            cors_allow_credentials: read_bool(
                "MOCKS_REST_CORS_ALLOW_CREDENTIALS",
                defaults.cors_allow_credentials,
            ),
        }
    }
}

fn read_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}
