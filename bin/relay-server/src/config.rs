//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for relay-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// JSON document holding the persona and chat history.
    pub data_file: PathBuf,

    /// `KEY=value` file the API key is persisted to.
    pub env_file: PathBuf,

    /// Name of the API key entry inside [`Config::env_file`].
    pub api_key_name: String,

    /// Base URL of the OpenAI-compatible completion API, without the
    /// `/chat/completions` suffix.
    pub upstream_url: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Sampling temperature for chat requests.
    pub temperature: f32,

    /// Upper bound on a single upstream round trip.
    pub upstream_timeout: Duration,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Mount Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("RELAY_BIND", "0.0.0.0:3000"),
            data_file: PathBuf::from(env_or("RELAY_DATA_FILE", "./database.json")),
            env_file: PathBuf::from(env_or("RELAY_ENV_FILE", "./.env")),
            api_key_name: env_or("RELAY_API_KEY_NAME", "DEEPSEEK_API_KEY"),
            upstream_url: env_or("RELAY_UPSTREAM_URL", "https://api.deepseek.com"),
            model: env_or("RELAY_MODEL", "deepseek-chat"),
            temperature: parse_env("RELAY_TEMPERATURE", 0.7),
            upstream_timeout: Duration::from_secs(parse_env("RELAY_UPSTREAM_TIMEOUT_SECS", 60)),
            log_level: env_or("RELAY_LOG", "info"),
            log_json: env_flag("RELAY_LOG_JSON", false),
            cors_allowed_origins: std::env::var("RELAY_CORS_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            enable_swagger: env_flag("RELAY_ENABLE_SWAGGER", true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            data_file: PathBuf::from("./database.json"),
            env_file: PathBuf::from("./.env"),
            api_key_name: "DEEPSEEK_API_KEY".to_owned(),
            upstream_url: "https://api.deepseek.com".to_owned(),
            model: "deepseek-chat".to_owned(),
            temperature: 0.7,
            upstream_timeout: Duration::from_secs(60),
            log_level: "info".to_owned(),
            log_json: false,
            cors_allowed_origins: None,
            enable_swagger: true,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
