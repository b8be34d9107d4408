//! VPC API interaction module
//!
//! Authentication, HTTP plumbing and region-bound connections for the
//! IBM Cloud VPC REST API.
//!
//! # Module Structure
//!
//! - [`auth`] - IAM API-key token exchange with token caching
//! - [`client`] - Region-bound client and URL building
//! - [`http`] - HTTP utilities and error formatting
//! - [`regions`] - Region discovery and the cached region directory
//! - [`registry`] - Per-region client cache
//!
//! # Example
//!
//! ```ignore
//! use vpcaudit::vpc::auth::{self, IamCredentials};
//! use vpcaudit::vpc::{client::Endpoint, http::VpcHttpClient};
//! use vpcaudit::vpc::registry::RegionalClientRegistry;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let http = VpcHttpClient::new(std::time::Duration::from_secs(30))?;
//!     let credentials = IamCredentials::from_env(auth::DEFAULT_IAM_URL, http.clone())?;
//!     let registry = RegionalClientRegistry::new(credentials, http, Endpoint::default());
//!     let client = registry.get("us-south").await?;
//!     let vpcs = client.get(&client.vpc_url("vpcs")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod regions;
pub mod registry;
