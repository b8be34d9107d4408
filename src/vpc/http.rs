//! HTTP utilities for VPC and IAM REST calls

use crate::error::{self, Error};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for VPC API calls
#[derive(Clone)]
pub struct VpcHttpClient {
    client: Client,
}

impl VpcHttpClient {
    /// Create a new HTTP client with a per-request timeout
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vpcaudit/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request with bearer auth
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request")?;

        Self::read_json(response).await
    }

    /// POST a urlencoded form (used for the IAM token exchange)
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .context("Failed to send request")?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only the sanitized/truncated body reaches the log
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(Error::Api {
                status: status.as_u16(),
            }
            .into());
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format an API error for display
///
/// Maps status codes to fixed messages so raw API payloads, tokens and
/// request details never reach the caller.
pub fn format_api_error(error: &anyhow::Error) -> String {
    if let Some(typed) = error::find_error(error) {
        match typed {
            Error::Authentication(_) => {
                return "Authentication failed. Check IBMCLOUD_API_KEY.".to_string()
            }
            Error::Validation(message) => return message.clone(),
            Error::NotFound { .. } | Error::RegionUnavailable { .. } => return typed.to_string(),
            Error::Api { .. } => {}
        }
    }

    if let Some(status) = error::status_of(error) {
        return match status {
            401 => "Authentication failed. Check IBMCLOUD_API_KEY.".to_string(),
            403 => "Permission denied. Check your IAM access policies.".to_string(),
            404 => "Resource not found.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => "Invalid request. Check your parameters.".to_string(),
            409 => "Resource conflict.".to_string(),
            500..=599 => "VPC service temporarily unavailable. Please try again.".to_string(),
            _ => "Request failed. Check your network connection and try again.".to_string(),
        };
    }

    if let Some(e) = error.chain().find_map(|c| c.downcast_ref::<reqwest::Error>()) {
        if e.is_timeout() {
            return "Request timed out.".to_string();
        }
        if e.is_connect() {
            return "Could not connect to the regional endpoint.".to_string();
        }
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
