use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info, warn};
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::RouteError;
use crate::road_network::{RawNetworkData, RoadNetwork};

/// Handle to the shared road network. Searches take the read side; weight
/// mutation takes the write side out-of-band.
pub type SharedNetwork = Arc<RwLock<RoadNetwork>>;

/// Supplies raw network data for (re)building the graph. Real OSM/Overpass
/// ingestion lives behind this seam; the engine only ever sees the parsed
/// result.
pub trait NetworkDataSource: Send + Sync {
    fn fetch(&self) -> Result<RawNetworkData>;
}

#[derive(Debug, Clone)]
pub struct NetworkCacheConfig {
    /// How long a built network stays valid before the next access rebuilds.
    pub ttl: Duration,
}

impl Default for NetworkCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
        }
    }
}

struct NetworkCache {
    network: SharedNetwork,
    built_at: Instant,
}

/// TTL-cached owner of the road network singleton.
///
/// Single-flight with blocking-until-ready semantics: all callers serialize
/// on the cache mutex, so at most one fetch+parse is in flight and concurrent
/// callers wait for it rather than observing a stale value.
pub struct RoadNetworkService {
    source: Arc<dyn NetworkDataSource>,
    config: NetworkCacheConfig,
    cache: Mutex<Option<NetworkCache>>,
}

impl RoadNetworkService {
    pub fn new(source: Arc<dyn NetworkDataSource>, config: NetworkCacheConfig) -> Self {
        Self {
            source,
            config,
            cache: Mutex::new(None),
        }
    }

    /// Returns the cached network while its age is under the TTL, otherwise
    /// rebuilds from the data source and recaches.
    pub async fn get_network(&self) -> Result<SharedNetwork, RouteError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref()
            && cached.built_at.elapsed() < self.config.ttl
        {
            debug!("Serving road network from cache");
            return Ok(Arc::clone(&cached.network));
        }

        let rebuild_start = Instant::now();
        let raw = self
            .source
            .fetch()
            .map_err(|e| RouteError::NetworkUnavailable(e.to_string()))?;
        let network = RoadNetwork::parse(&raw);

        if network.is_empty() {
            warn!("Network data source produced an empty graph");
            return Err(RouteError::NetworkUnavailable(
                "network has no nodes".to_string(),
            ));
        }

        info!(
            "Road network rebuilt: {} nodes in {:?}",
            network.nodes.len(),
            rebuild_start.elapsed()
        );

        let shared: SharedNetwork = Arc::new(RwLock::new(network));
        *cache = Some(NetworkCache {
            network: Arc::clone(&shared),
            built_at: Instant::now(),
        });
        Ok(shared)
    }

    /// Drops the cache, forcing a rebuild on the next access.
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.lock().await;
        if cache.take().is_some() {
            info!("Road network cache cleared");
        }
    }

    /// Applies a static congestion weight to the cached network, if any.
    /// No-op when the cache is cold or the edge does not exist.
    pub async fn update_congestion_weight(&self, from: u64, to: u64, weight: f64) -> bool {
        let cache = self.cache.lock().await;
        match cache.as_ref() {
            Some(cached) => {
                let mut network = cached.network.write().expect("network lock poisoned");
                let updated = network.update_congestion_weight(from, to, weight);
                if updated {
                    debug!("Congestion weight {} -> {} set to {}", from, to, weight);
                }
                updated
            }
            None => false,
        }
    }
}

/// Stand-in for OSM ingestion: a small fixed grid around central Paris,
/// including one footpath way that must not contribute edges.
pub struct StubDataSource;

impl NetworkDataSource for StubDataSource {
    fn fetch(&self) -> Result<RawNetworkData> {
        let raw = json!({
            "nodes": [
                { "id": 1, "lat": 48.8560, "lon": 2.3500 },
                { "id": 2, "lat": 48.8560, "lon": 2.3550 },
                { "id": 3, "lat": 48.8560, "lon": 2.3600 },
                { "id": 4, "lat": 48.8600, "lon": 2.3500 },
                { "id": 5, "lat": 48.8600, "lon": 2.3550 },
                { "id": 6, "lat": 48.8600, "lon": 2.3600 },
                { "id": 7, "lat": 48.8640, "lon": 2.3500 },
                { "id": 8, "lat": 48.8640, "lon": 2.3550 },
                { "id": 9, "lat": 48.8640, "lon": 2.3600 }
            ],
            "ways": [
                { "id": 101, "nodes": [1, 2, 3], "tags": { "highway": "primary" } },
                { "id": 102, "nodes": [4, 5, 6], "tags": { "highway": "secondary" } },
                { "id": 103, "nodes": [7, 8, 9], "tags": { "highway": "residential" } },
                { "id": 104, "nodes": [1, 4, 7], "tags": { "highway": "residential" } },
                { "id": 105, "nodes": [2, 5, 8], "tags": { "highway": "tertiary" } },
                { "id": 106, "nodes": [3, 6, 9], "tags": { "highway": "residential" } },
                { "id": 107, "nodes": [1, 5, 9], "tags": { "name": "Passage des Panoramas" } }
            ]
        });
        Ok(serde_json::from_value(raw)?)
    }
}
