//! Client for the Aviadata aggregation API.
//!
//! Error policy: every transport or decode failure is logged and mapped
//! to `None`. Formatters treat `None` as "no data" and suppress the post
//! for that tick, so backend hiccups never reach the driver.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Query parameters as repeated `key=value` pairs. List-valued filters
/// (e.g. several months) are expressed by repeating the key.
pub type Params = Vec<(String, String)>;

/// Seam for the stats backend, implemented by [`BackendClient`] and by
/// recording doubles in tests.
#[async_trait]
pub trait StatsBackend: Send + Sync {
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Option<Value>;

    /// Maximum month, "YYYY-MM", reported by the month-range endpoint.
    async fn latest_available_month(&self) -> Option<String>;
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        // Trailing slash so `Url::join` preserves any base path segment.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let http = Client::builder()
            .user_agent("aviadata-bot/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Ok(Self { http, base_url })
    }

    /// Helper for building the common month filter.
    pub fn month_params(month: &str) -> Params {
        vec![
            ("months".to_string(), month.to_string()),
            ("all_periods".to_string(), "false".to_string()),
        ]
    }
}

#[async_trait]
impl StatsBackend for BackendClient {
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Option<Value> {
        let url = match self.base_url.join(endpoint.trim_start_matches('/')) {
            Ok(url) => url,
            Err(err) => {
                warn!(?err, endpoint, "invalid backend endpoint");
                return None;
            }
        };
        info!(%url, "querying backend");

        let res = match self.http.get(url).query(params).send().await {
            Ok(res) => res,
            Err(err) => {
                warn!(?err, endpoint, "backend request failed");
                return None;
            }
        };
        if !res.status().is_success() {
            warn!(status = %res.status(), endpoint, "backend returned error status");
            return None;
        }
        match res.json::<Value>().await {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(?err, endpoint, "backend response was not valid JSON");
                None
            }
        }
    }

    async fn latest_available_month(&self) -> Option<String> {
        let data = self.fetch("/aeropuertos/rango-meses", &[]).await?;
        data.get("mes_maximo")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_params_are_repeated_pairs() {
        let params = BackendClient::month_params("2025-09");
        assert_eq!(
            params,
            vec![
                ("months".to_string(), "2025-09".to_string()),
                ("all_periods".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_join_keeps_path() {
        let client = BackendClient::new("http://backend.test/api/").unwrap();
        let joined = client.base_url.join("vuelos/kpis").unwrap();
        assert_eq!(joined.as_str(), "http://backend.test/api/vuelos/kpis");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(BackendClient::new("not a url").is_err());
    }
}
