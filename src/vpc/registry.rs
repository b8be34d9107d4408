//! Regional client registry
//!
//! One authenticated [`VpcClient`] per region, created on first use and kept
//! for the lifetime of the registry. Entries are never evicted.

use super::auth::IamCredentials;
use super::client::{Endpoint, VpcClient};
use super::http::VpcHttpClient;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Lazily-populated map of region code to connection
pub struct RegionalClientRegistry {
    credentials: IamCredentials,
    http: VpcHttpClient,
    endpoint: Endpoint,
    // Each region gets its own cell so concurrent first calls for the same
    // region wait on a single connect instead of racing.
    clients: Mutex<HashMap<String, Arc<OnceCell<VpcClient>>>>,
    connects: AtomicUsize,
}

impl RegionalClientRegistry {
    pub fn new(credentials: IamCredentials, http: VpcHttpClient, endpoint: Endpoint) -> Self {
        Self {
            credentials,
            http,
            endpoint,
            clients: Mutex::new(HashMap::new()),
            connects: AtomicUsize::new(0),
        }
    }

    /// Get the connection for `region`, creating it on first use
    pub async fn get(&self, region: &str) -> Result<VpcClient> {
        let cell = {
            let mut clients = self.clients.lock().await;
            clients
                .entry(region.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let client = cell
            .get_or_try_init(|| async {
                tracing::info!("Creating VPC client for region {}", region);
                self.connects.fetch_add(1, Ordering::Relaxed);
                let client = VpcClient::connect(
                    region,
                    self.credentials.clone(),
                    self.http.clone(),
                    &self.endpoint,
                )
                .await?;
                tracing::debug!("Region {} served from {}", region, client.base_url());
                Ok::<_, anyhow::Error>(client)
            })
            .await?;

        Ok(client.clone())
    }

    /// Regions with an established connection
    pub async fn cached_regions(&self) -> Vec<String> {
        let clients = self.clients.lock().await;
        let mut regions: Vec<String> = clients
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(region, _)| region.clone())
            .collect();
        regions.sort();
        regions
    }

    /// Number of connection attempts made so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}
