//! IAM Authentication
//!
//! Exchanges an IBM Cloud API key for a bearer token and caches the token
//! until shortly before it expires.

use super::http::VpcHttpClient;
use crate::error::{self, Error};
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "IBMCLOUD_API_KEY";

/// Default IAM endpoint
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// TTL used when the IAM response carries no `expires_in`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// IAM credentials holder with token caching
#[derive(Clone)]
pub struct IamCredentials {
    api_key: Arc<str>,
    iam_url: String,
    http: VpcHttpClient,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl fmt::Debug for IamCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamCredentials")
            .field("api_key", &"<redacted>")
            .field("iam_url", &self.iam_url)
            .finish()
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl IamCredentials {
    /// Create credentials from an explicit API key
    pub fn new(api_key: &str, iam_url: &str, http: VpcHttpClient) -> Result<Self, Error> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::Authentication("API key is empty".to_string()));
        }

        Ok(Self {
            api_key: Arc::from(api_key),
            iam_url: iam_url.trim_end_matches('/').to_string(),
            http,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Create credentials from `IBMCLOUD_API_KEY`
    pub fn from_env(iam_url: &str, http: VpcHttpClient) -> Result<Self, Error> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Authentication(format!("{} environment variable not set", API_KEY_ENV)))?;
        Self::new(&api_key, iam_url, http)
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let url = format!("{}/identity/token", self.iam_url);
        let response = self
            .http
            .post_form(&url, &[("grant_type", GRANT_TYPE), ("apikey", &*self.api_key)])
            .await
            .map_err(|e| match error::status_of(&e) {
                Some(400) | Some(401) | Some(403) => {
                    Error::Authentication("API key was rejected by IAM".to_string()).into()
                }
                _ => e.context("Failed to get access token"),
            })?;

        let token = response
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .context("IAM response did not contain an access token")?;

        let ttl = response
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }
}
