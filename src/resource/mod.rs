//! Resource abstraction layer
//!
//! Typed VPC resources and the paginated fetchers that produce them. Raw JSON
//! payloads stop here: everything past this module works on the structs in
//! [`model`].
//!
//! # Architecture
//!
//! - [`model`] - Typed resource structs (security groups, backups, volumes, ...)
//! - [`fetcher`] - Paginated collection listing and typed list functions
//!
//! # Example
//!
//! ```ignore
//! use vpcaudit::resource::fetcher;
//! use vpcaudit::vpc::client::VpcClient;
//!
//! async fn open_groups(client: &VpcClient) -> anyhow::Result<usize> {
//!     let groups = fetcher::list_security_groups(client, None).await?;
//!     Ok(groups.len())
//! }
//! ```

pub mod fetcher;
pub mod model;

pub use model::*;
