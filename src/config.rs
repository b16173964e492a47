use std::{env, time::Duration};

/// AppConfig
///
/// Holds the site's entire configuration. Loaded once at startup and shared
/// read-only through `AppState` (pulled into extractors via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and the demo backend.
    pub env: Env,
    // Base URL of the content REST API (e.g. https://api.example.org/api).
    // `None` in local mode means the seeded in-memory API is used instead.
    pub api_base_url: Option<String>,
    // Secret used to sign the session cookie.
    pub session_secret: String,
    // Lifetime of a session cookie.
    pub session_ttl: Duration,
    // How long list responses stay cached before being refetched.
    pub cache_ttl: Duration,
    // Timeout applied to every outbound content API call.
    pub api_timeout: Duration,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: local development (pretty logs, optional demo backend)
/// or production (JSON logs, every secret required).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_SESSION_SECRET: &str = "pilabs-local-session-secret-change-me";

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for tests: local mode, in-memory API.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: None,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            cache_ttl: Duration::from_secs(30),
            api_timeout: Duration::from_secs(15),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast.
    ///
    /// # Panics
    /// Panics in production when `API_BASE_URL` or `SESSION_SECRET` is missing,
    /// or when a numeric setting cannot be parsed.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let (api_base_url, session_secret) = match env {
            Env::Production => (
                Some(
                    env::var("API_BASE_URL")
                        .expect("FATAL: API_BASE_URL must be set in production."),
                ),
                env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("API_BASE_URL").ok().filter(|url| !url.trim().is_empty()),
                env::var("SESSION_SECRET").unwrap_or(defaults.session_secret),
            ),
        };

        Self {
            env,
            api_base_url: api_base_url.map(|url| url.trim_end_matches('/').to_string()),
            session_secret,
            session_ttl: duration_var("SESSION_TTL_HOURS", 60 * 60)
                .unwrap_or(defaults.session_ttl),
            cache_ttl: duration_var("CACHE_TTL_SECS", 1).unwrap_or(defaults.cache_ttl),
            api_timeout: duration_var("API_TIMEOUT_SECS", 1).unwrap_or(defaults.api_timeout),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}

/// Reads `name` as an integer count of `unit_secs`-second units.
fn duration_var(name: &str, unit_secs: u64) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    let count: u64 = raw
        .trim()
        .parse()
        .unwrap_or_else(|_| panic!("FATAL: {name} must be a whole number, got {raw:?}"));
    Some(Duration::from_secs(count * unit_secs))
}
