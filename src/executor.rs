//! Multi-region fan-out
//!
//! [`MultiRegionExecutor`] runs one region-scoped operation against a list of
//! regions and partitions the outcome into successes and failures. A failing
//! region never stops the others, and nothing escapes [`MultiRegionExecutor::run`]
//! as an error: region failures are data.

use crate::error::{self, Error};
use crate::vpc::http::format_api_error;
use crate::vpc::regions::{Region, RegionDirectory};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Why a region ended up in the failure ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Authentication,
    PermissionDenied,
    NotFound,
    RateLimited,
    Timeout,
    Validation,
    Unavailable,
}

/// Sanitized per-region failure summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RegionFailure {
    /// Classify an operation error. The message never carries raw API payloads.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let message = format_api_error(err);

        let kind = match error::find_error(err) {
            Some(Error::Authentication(_)) => FailureKind::Authentication,
            Some(Error::Validation(_)) => FailureKind::Validation,
            Some(Error::NotFound { .. }) => FailureKind::NotFound,
            _ => match error::status_of(err) {
                Some(401) => FailureKind::Authentication,
                Some(403) => FailureKind::PermissionDenied,
                Some(404) => FailureKind::NotFound,
                Some(429) => FailureKind::RateLimited,
                _ if is_transport_timeout(err) => FailureKind::Timeout,
                _ => FailureKind::Unavailable,
            },
        };

        Self { kind, message }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("Region did not respond within {}s", after.as_secs_f64()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            kind: FailureKind::Unavailable,
            message: "Region is not available".to_string(),
        }
    }
}

fn is_transport_timeout(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|c| c.downcast_ref::<reqwest::Error>())
        .any(|e| e.is_timeout())
}

/// Outcome of a multi-region operation.
///
/// Every requested region appears in exactly one of the two maps. Both maps
/// iterate in request order.
#[derive(Debug, Clone, Serialize)]
pub struct MultiRegionResult<T> {
    pub succeeded: IndexMap<String, T>,
    pub failed: IndexMap<String, RegionFailure>,
}

impl<T> Default for MultiRegionResult<T> {
    fn default() -> Self {
        Self {
            succeeded: IndexMap::new(),
            failed: IndexMap::new(),
        }
    }
}

impl<T> MultiRegionResult<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of regions covered (succeeded + failed)
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if regions were requested and none succeeded
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    /// The credential-level error hidden in the failure ledger, if any.
    ///
    /// A single IAM token serves every region, so one authentication failure
    /// means the credentials themselves are bad.
    pub fn authentication_failure(&self) -> Option<Error> {
        self.failed
            .values()
            .find(|f| f.kind == FailureKind::Authentication)
            .map(|f| Error::Authentication(f.message.clone()))
    }
}

/// Fans a region-scoped operation out across regions
#[derive(Clone)]
pub struct MultiRegionExecutor {
    directory: Arc<RegionDirectory>,
    region_timeout: Duration,
    max_concurrent: usize,
}

impl MultiRegionExecutor {
    /// `max_concurrent` of 1 runs regions strictly one after another
    pub fn new(directory: Arc<RegionDirectory>, region_timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            directory,
            region_timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn directory(&self) -> &RegionDirectory {
        &self.directory
    }

    /// Resolve `scope` (empty = all reachable regions) and run `op` in each region
    pub async fn run_scoped<T, F, Fut>(&self, scope: &[String], op: F) -> error::Result<MultiRegionResult<T>>
    where
        F: Fn(Region) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let regions = self.directory.resolve(scope).await?;
        Ok(self.run(&regions, op).await)
    }

    /// Run `op` once per region and partition the outcomes.
    ///
    /// Regions are processed in the given order; with `max_concurrent > 1` up
    /// to that many run at once but results are still reassembled in input
    /// order. Each call is bounded by the region timeout and never retried.
    pub async fn run<T, F, Fut>(&self, regions: &[Region], op: F) -> MultiRegionResult<T>
    where
        F: Fn(Region) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut unique: Vec<Region> = Vec::with_capacity(regions.len());
        for region in regions {
            if !unique.iter().any(|r| r.code == region.code) {
                unique.push(region.clone());
            }
        }

        let timeout = self.region_timeout;
        let op = &op;
        let outcomes: Vec<(String, Result<T, RegionFailure>)> = stream::iter(unique)
            .map(move |region| async move {
                let code = region.code.clone();
                if !region.reachable {
                    return (code, Err(RegionFailure::unreachable()));
                }

                tracing::debug!("Running operation in region {}", code);
                let outcome = match tokio::time::timeout(timeout, op(region)).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(RegionFailure::from_error(&e)),
                    Err(_) => Err(RegionFailure::timeout(timeout)),
                };
                (code, outcome)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut result = MultiRegionResult::new();
        for (code, outcome) in outcomes {
            match outcome {
                Ok(value) => {
                    result.succeeded.insert(code, value);
                }
                Err(failure) => {
                    tracing::warn!(
                        "Region {} failed ({:?}): {}",
                        code,
                        failure.kind,
                        failure.message
                    );
                    result.failed.insert(code, failure);
                }
            }
        }

        tracing::info!(
            "Multi-region run finished: {} succeeded, {} failed",
            result.succeeded.len(),
            result.failed.len()
        );
        result
    }
}
