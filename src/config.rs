//! Configuration loader and validator for the Aviadata publishing bot.
//!
//! Everything comes from the process environment (a `.env` file is loaded
//! by `main` before this runs). Missing credentials are fatal at startup;
//! the bot never starts partially configured.
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration, constructed once at startup and passed by
/// reference to every component. No ambient global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub twitter: TwitterCredentials,
    pub backend: Backend,
    pub app: App,
}

/// Twitter/X API credentials (all five values are required).
#[derive(Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
    pub bearer_token: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials").finish_non_exhaustive()
    }
}

/// Aviadata backend settings. The two endpoint paths exist in different
/// spellings across deployments and are therefore configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub base_url: String,
    pub routes_endpoint: String,
    pub airport_comparison_endpoint: String,
}

/// App-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub catchup_interval_secs: u64,
    pub rollover_interval_secs: u64,
    pub debug_http_addr: Option<SocketAddr>,
}

impl Config {
    /// SQLite URL for the post log, honoring an explicit `DATABASE_URL`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/twitter_bot_logs.db", self.app.data_dir))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Default data dir: a mounted `/data` volume when present (Railway),
/// otherwise the working directory.
fn default_data_dir() -> String {
    if Path::new("/data").is_dir() {
        "/data".to_string()
    } else {
        ".".to_string()
    }
}

/// Load configuration from the environment and validate it.
pub fn load_from_env() -> Result<Config, ConfigError> {
    let twitter = TwitterCredentials {
        api_key: required("TWITTER_API_KEY")?,
        api_secret: required("TWITTER_API_SECRET")?,
        access_token: required("TWITTER_ACCESS_TOKEN")?,
        access_secret: required("TWITTER_ACCESS_SECRET")?,
        bearer_token: required("TWITTER_BEARER_TOKEN")?,
    };

    let backend = Backend {
        base_url: required("AVIADATA_API_URL")?
            .trim_end_matches('/')
            .to_string(),
        routes_endpoint: std::env::var("ROUTES_ENDPOINT")
            .unwrap_or_else(|_| "/vuelos/rutas-enriquecidas".to_string()),
        airport_comparison_endpoint: std::env::var("AIRPORT_COMPARISON_ENDPOINT")
            .unwrap_or_else(|_| "/aeropuertos/evolucion-mensual".to_string()),
    };

    let debug_http_addr = match std::env::var("DEBUG_HTTP_ADDR") {
        Ok(v) if !v.trim().is_empty() => Some(
            v.parse()
                .map_err(|_| ConfigError::Invalid("DEBUG_HTTP_ADDR must be host:port"))?,
        ),
        _ => None,
    };

    let app = App {
        data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| default_data_dir()),
        catchup_interval_secs: optional_secs("CATCHUP_INTERVAL_SECS", 3 * 3600),
        rollover_interval_secs: optional_secs("ROLLOVER_INTERVAL_SECS", 6 * 3600),
        debug_http_addr,
    };

    let cfg = Config {
        twitter,
        backend,
        app,
    };
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.backend.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("AVIADATA_API_URL must be non-empty"));
    }
    if !cfg.backend.routes_endpoint.starts_with('/') {
        return Err(ConfigError::Invalid("ROUTES_ENDPOINT must start with '/'"));
    }
    if !cfg.backend.airport_comparison_endpoint.starts_with('/') {
        return Err(ConfigError::Invalid(
            "AIRPORT_COMPARISON_ENDPOINT must start with '/'",
        ));
    }
    if cfg.app.catchup_interval_secs == 0 {
        return Err(ConfigError::Invalid("CATCHUP_INTERVAL_SECS must be > 0"));
    }
    if cfg.app.rollover_interval_secs == 0 {
        return Err(ConfigError::Invalid("ROLLOVER_INTERVAL_SECS must be > 0"));
    }
    Ok(())
}

/// Configuration used by unit and integration tests.
pub fn example() -> Config {
    Config {
        twitter: TwitterCredentials {
            api_key: "ck".into(),
            api_secret: "cs".into(),
            access_token: "at".into(),
            access_secret: "as".into(),
            bearer_token: "bt".into(),
        },
        backend: Backend {
            base_url: "http://backend.test".into(),
            routes_endpoint: "/vuelos/rutas-enriquecidas".into(),
            airport_comparison_endpoint: "/aeropuertos/evolucion-mensual".into(),
        },
        app: App {
            data_dir: ".".into(),
            catchup_interval_secs: 3 * 3600,
            rollover_interval_secs: 6 * 3600,
            debug_http_addr: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_is_valid() {
        validate(&example()).unwrap();
    }

    #[test]
    fn empty_base_url_rejected() {
        let mut cfg = example();
        cfg.backend.base_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("AVIADATA_API_URL")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn relative_endpoint_rejected() {
        let mut cfg = example();
        cfg.backend.routes_endpoint = "vuelos/rutas".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_intervals_rejected() {
        let mut cfg = example();
        cfg.app.catchup_interval_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg = example();
        cfg.app.rollover_interval_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let cfg = example();
        let shown = format!("{:?}", cfg.twitter);
        assert!(!shown.contains("ck"));
        assert!(!shown.contains("bt"));
    }
}
