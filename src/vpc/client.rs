//! VPC Client
//!
//! Region-bound client for the VPC REST API, combining authentication and
//! HTTP functionality.

use super::auth::IamCredentials;
use super::http::VpcHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;

/// Default regional endpoint template
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://{region}.iaas.cloud.ibm.com/v1";

/// Default API version date sent with every request
pub const DEFAULT_API_VERSION: &str = "2025-04-08";

/// How regional endpoints are addressed
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// URL template; `{region}` is replaced by the region code
    pub template: String,
    /// Value of the `version` query parameter
    pub api_version: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl Endpoint {
    /// Base URL for a region
    pub fn base_url(&self, region: &str) -> String {
        self.template
            .replace("{region}", region)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Authenticated connection bound to a single region
#[derive(Clone)]
pub struct VpcClient {
    pub credentials: IamCredentials,
    pub http: VpcHttpClient,
    pub region: String,
    base_url: String,
    api_version: String,
}

impl std::fmt::Debug for VpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpcClient")
            .field("region", &self.region)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl VpcClient {
    /// Create a client for `region` and authenticate it
    pub async fn connect(
        region: &str,
        credentials: IamCredentials,
        http: VpcHttpClient,
        endpoint: &Endpoint,
    ) -> Result<Self> {
        credentials
            .get_token()
            .await
            .with_context(|| format!("Failed to authenticate for region {}", region))?;

        Ok(Self {
            credentials,
            http,
            region: region.to_string(),
            base_url: endpoint.base_url(region),
            api_version: endpoint.api_version.clone(),
        })
    }

    /// Make a GET request to the VPC API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Base URL of this region's endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a versioned VPC API URL
    pub fn vpc_url(&self, path: &str) -> String {
        self.vpc_url_with(path, &[])
    }

    /// Build a versioned VPC API URL with extra query parameters
    pub fn vpc_url_with(&self, path: &str, params: &[(&str, &str)]) -> String {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut all: Vec<(&str, &str)> = vec![("version", self.api_version.as_str()), ("generation", "2")];
        all.extend_from_slice(params);
        add_query_params(&url, &all)
    }
}

/// Append url-encoded query parameters, skipping empty values
pub fn add_query_params(url: &str, params: &[(&str, &str)]) -> String {
    let query_parts: Vec<String> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}
