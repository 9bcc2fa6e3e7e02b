//! Publisher: Twitter/X API v2 client and publish-outcome recording.
//!
//! `publish` is atomic from the caller's perspective: it either yields a
//! post id (recorded as a success row) or an error (recorded as an error
//! row). Retries are the engine's responsibility via the next tick.

use crate::config::TwitterCredentials;
use crate::content;
use crate::db::{self, Pool};
use crate::model::{ContentType, NewPost, PostStatus};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use sha1::Sha1;
use std::fmt;
use tracing::{info, warn};

const TWITTER_API_BASE: &str = "https://api.twitter.com/";

/// RFC 3986: unreserved characters stay literal, everything else escapes.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Seam for the social network, implemented by [`TwitterClient`] and by
/// recording doubles in tests.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Create a post and return its assigned id.
    async fn create_post(&self, text: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    base_url: Url,
    creds: TwitterCredentials,
}

impl fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    pub fn new(creds: TwitterCredentials) -> Self {
        let base_url = Url::parse(TWITTER_API_BASE).expect("valid default Twitter URL");
        Self::with_base_url(creds, base_url)
    }

    pub fn with_base_url(creds: TwitterCredentials, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("aviadata-bot/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            creds,
        }
    }

    /// OAuth 1.0a header for a request without query or form parameters
    /// (the JSON body is not part of the signature base).
    fn authorization_header(&self, method: &str, url: &str) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        oauth1_header(
            method,
            url,
            &self.creds.api_key,
            &self.creds.api_secret,
            &self.creds.access_token,
            &self.creds.access_secret,
            &nonce,
            &timestamp,
        )
    }
}

#[async_trait]
impl SocialClient for TwitterClient {
    async fn create_post(&self, text: &str) -> Result<String> {
        let endpoint = self
            .base_url
            .join("2/tweets")
            .context("invalid Twitter base URL")?;
        let auth = self.authorization_header("POST", endpoint.as_str());

        let res = self
            .http
            .post(endpoint)
            .header("Authorization", auth)
            .json(&json!({ "text": text }))
            .send()
            .await
            .context("failed to reach Twitter")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("twitter error {status}: {body}"));
        }

        let payload: CreateTweetResponse = res
            .json()
            .await
            .context("invalid Twitter response JSON")?;
        Ok(payload.data.id)
    }
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

fn percent(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE).to_string()
}

/// OAuth 1.0a signature base string: method, encoded URL and the
/// encoded-then-sorted parameter string.
fn signature_base(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent(k), percent(v)))
        .collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method, percent(url), percent(&joined))
}

fn hmac_sha1_signature(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", percent(consumer_secret), percent(token_secret));
    let mut mac =
        Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
    mac.update(base.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[allow(clippy::too_many_arguments)]
fn oauth1_header(
    method: &str,
    url: &str,
    consumer_key: &str,
    consumer_secret: &str,
    token: &str,
    token_secret: &str,
    nonce: &str,
    timestamp: &str,
) -> String {
    let params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), consumer_key.into()),
        ("oauth_nonce".into(), nonce.into()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.into()),
        ("oauth_token".into(), token.into()),
        ("oauth_version".into(), "1.0".into()),
    ];
    let base = signature_base(method, url, &params);
    let signature = hmac_sha1_signature(&base, consumer_secret, token_secret);

    let mut header_params = params;
    header_params.push(("oauth_signature".into(), signature));
    header_params.sort();
    let rendered = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent(k), percent(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {rendered}")
}

/// Send one post and append the outcome to the log. The text is
/// defensively truncated before sending. Returns true when the post was
/// accepted by the API; log-write failures are non-fatal either way.
pub async fn publish(
    pool: &Pool,
    client: &dyn SocialClient,
    text: &str,
    content_type: ContentType,
    month: &str,
    schedule_day: u32,
    source_data: Option<&serde_json::Value>,
) -> bool {
    let text = content::truncate_post(text);
    let source = source_data.map(|v| v.to_string());

    match client.create_post(&text).await {
        Ok(post_id) => {
            info!(
                post_id,
                content_type = content_type.as_str(),
                month,
                schedule_day,
                "post published"
            );
            let record = NewPost {
                text,
                status: PostStatus::Success,
                content_type,
                related_month: Some(month.to_string()),
                schedule_day: Some(schedule_day),
                post_id: Some(post_id),
                error_message: None,
                source_data: source,
            };
            if let Err(err) = db::record_post(pool, &record).await {
                warn!(?err, "failed to record successful post");
            }
            true
        }
        Err(err) => {
            warn!(
                ?err,
                content_type = content_type.as_str(),
                month,
                schedule_day,
                "publish failed"
            );
            let record = NewPost {
                text,
                status: PostStatus::Error,
                content_type,
                related_month: Some(month.to_string()),
                schedule_day: Some(schedule_day),
                post_id: None,
                error_message: Some(err.to_string()),
                source_data: source,
            };
            if let Err(err) = db::record_post(pool, &record).await {
                warn!(?err, "failed to record publish error");
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_encoding_is_rfc3986() {
        assert_eq!(percent("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent("safe-chars_~."), "safe-chars_~.");
        assert_eq!(percent("☃"), "%E2%98%83");
    }

    // The worked example from Twitter's "Creating a signature" docs.
    #[test]
    fn signature_matches_documented_example() {
        let params: Vec<(String, String)> = vec![
            ("status".into(), "Hello Ladies + Gentlemen, a signed OAuth request!".into()),
            ("include_entities".into(), "true".into()),
            ("oauth_consumer_key".into(), "xvz1evFS4wEEPTGEFPHBog".into()),
            (
                "oauth_nonce".into(),
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".into(),
            ),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "1318622958".into()),
            (
                "oauth_token".into(),
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
            ),
            ("oauth_version".into(), "1.0".into()),
        ];
        let base = signature_base(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
        );
        assert!(base.starts_with(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities"
        ));

        let signature = hmac_sha1_signature(
            &base,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn header_contains_all_oauth_fields() {
        let header = oauth1_header(
            "POST",
            "https://api.twitter.com/2/tweets",
            "ck",
            "cs",
            "at",
            "as",
            "nonce",
            "1318622958",
        );
        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"ck\"",
            "oauth_nonce=\"nonce\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1318622958\"",
            "oauth_token=\"at\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"",
        ] {
            assert!(header.contains(field), "missing {field} in {header}");
        }
    }
}
