//! Server configuration, loaded from environment variables at startup.

use sqlgen_core::{DbConfig, GeneratorConfig};

/// Runtime configuration for sqlgen-server.
///
/// Every field has a default so the server starts without any environment
/// variables set. Values are fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"127.0.0.1:5000"`).
    pub bind_address: String,

    /// Generation endpoint and model.
    pub generator: GeneratorConfig,

    /// SQL Server connection target.
    pub database: DbConfig,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let gen_defaults = GeneratorConfig::default();
        let db_defaults = DbConfig::default();

        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_owned());
        let flag = |key: &str, default: bool| get(key).map(|v| parse_bool(&v)).unwrap_or(default);

        Self {
            bind_address: or("SQLGEN_BIND", "127.0.0.1:5000"),
            generator: GeneratorConfig {
                base_url: or("SQLGEN_OLLAMA_URL", &gen_defaults.base_url),
                model: or("SQLGEN_MODEL", &gen_defaults.model),
                max_response_bytes: get("SQLGEN_MAX_GENERATION_BYTES")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(gen_defaults.max_response_bytes),
            },
            database: DbConfig {
                server: or("SQLGEN_DB_SERVER", &db_defaults.server),
                database: or("SQLGEN_DB_NAME", &db_defaults.database),
                schema: or("SQLGEN_DB_SCHEMA", &db_defaults.schema),
                trusted_connection: flag("SQLGEN_DB_TRUSTED", db_defaults.trusted_connection),
                trust_server_certificate: flag(
                    "SQLGEN_DB_TRUST_CERT",
                    db_defaults.trust_server_certificate,
                ),
            },
            log_level: or("SQLGEN_LOG", "info"),
            log_json: flag("SQLGEN_LOG_JSON", false),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}
