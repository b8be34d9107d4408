//! VPC Regions
//!
//! Region discovery and the process-lifetime region directory.

use super::http::format_api_error;
use super::registry::RegionalClientRegistry;
use crate::error::{self, Error};
use crate::resource::fetcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Known regions and their display names, in the API's usual listing order
const KNOWN_REGIONS: &[(&str, &str)] = &[
    ("au-syd", "Sydney"),
    ("br-sao", "Sao Paulo"),
    ("ca-mon", "Montreal"),
    ("ca-tor", "Toronto"),
    ("eu-de", "Frankfurt"),
    ("eu-es", "Madrid"),
    ("eu-gb", "London"),
    ("in-che", "Chennai"),
    ("jp-osa", "Osaka"),
    ("jp-tok", "Tokyo"),
    ("us-east", "Washington DC"),
    ("us-south", "Dallas"),
];

/// Display name for a region code, falling back to the code itself
pub fn display_name(code: &str) -> String {
    KNOWN_REGIONS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Region information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub display_name: String,
    pub reachable: bool,
}

impl Region {
    pub fn new(code: &str, reachable: bool) -> Self {
        Self {
            code: code.to_string(),
            display_name: display_name(code),
            reachable,
        }
    }
}

impl From<&Value> for Region {
    fn from(value: &Value) -> Self {
        let code = value.get("name").and_then(|v| v.as_str()).unwrap_or("-");
        let reachable = value
            .get("status")
            .and_then(|v| v.as_str())
            .map(|s| s == "available")
            .unwrap_or(false);
        Self::new(code, reachable)
    }
}

/// Static fallback list used when discovery returns nothing
pub fn list_known_regions() -> Vec<Region> {
    KNOWN_REGIONS
        .iter()
        .map(|(code, _)| Region::new(code, true))
        .collect()
}

/// Set of known regions, discovered once and cached for the process lifetime
pub struct RegionDirectory {
    registry: Option<Arc<RegionalClientRegistry>>,
    bootstrap_region: String,
    regions: OnceCell<Vec<Region>>,
}

impl RegionDirectory {
    /// Directory that discovers regions through `bootstrap_region`'s endpoint
    pub fn new(registry: Arc<RegionalClientRegistry>, bootstrap_region: &str) -> Self {
        Self {
            registry: Some(registry),
            bootstrap_region: bootstrap_region.to_string(),
            regions: OnceCell::new(),
        }
    }

    /// Directory with a fixed region list; never touches the network
    pub fn preloaded(regions: Vec<Region>) -> Self {
        Self {
            registry: None,
            bootstrap_region: String::new(),
            regions: OnceCell::from(regions),
        }
    }

    /// All known regions in discovery order
    pub async fn regions(&self) -> error::Result<&[Region]> {
        let regions = self.regions.get_or_try_init(|| self.discover()).await?;
        Ok(regions.as_slice())
    }

    /// Known regions that reported themselves available
    pub async fn reachable(&self) -> error::Result<Vec<Region>> {
        Ok(self
            .regions()
            .await?
            .iter()
            .filter(|r| r.reachable)
            .cloned()
            .collect())
    }

    /// Turn a requested scope into regions.
    ///
    /// An empty scope means every reachable region. Explicit codes keep the
    /// caller's order (duplicates dropped) and must all be known.
    pub async fn resolve(&self, requested: &[String]) -> error::Result<Vec<Region>> {
        if requested.is_empty() {
            return self.reachable().await;
        }

        let known = self.regions().await?;
        let mut resolved: Vec<Region> = Vec::with_capacity(requested.len());
        for code in requested {
            let code = code.trim();
            if resolved.iter().any(|r| r.code == code) {
                continue;
            }
            let Some(region) = known.iter().find(|r| r.code == code) else {
                return Err(Error::validation(format!("Unknown region '{}'", code)));
            };
            resolved.push(region.clone());
        }
        Ok(resolved)
    }

    async fn discover(&self) -> error::Result<Vec<Region>> {
        let Some(registry) = &self.registry else {
            return Ok(Vec::new());
        };

        let region = &self.bootstrap_region;
        let listing = async {
            let client = registry.get(region).await?;
            fetcher::fetch_collection(&client, "regions", "regions", &[]).await
        }
        .await;

        match listing {
            Ok(items) if !items.is_empty() => {
                let regions: Vec<Region> = items.iter().map(Region::from).collect();
                tracing::info!("Discovered {} regions", regions.len());
                Ok(regions)
            }
            Ok(_) => {
                tracing::warn!("No regions returned, using static list");
                Ok(list_known_regions())
            }
            Err(e) => {
                if let Some(Error::Authentication(reason)) = error::find_error(&e) {
                    return Err(Error::Authentication(reason.clone()));
                }
                if matches!(error::status_of(&e), Some(401) | Some(403)) {
                    return Err(Error::Authentication(format_api_error(&e)));
                }
                Err(Error::RegionUnavailable {
                    region: region.clone(),
                    reason: format_api_error(&e),
                })
            }
        }
    }
}
