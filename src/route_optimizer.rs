use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::time::sleep;

use crate::congestion::CongestionLevel;
use crate::error::{Endpoint, RouteError};
use crate::geospatial::{Coordinates, haversine_distance, validate_coordinates};
use crate::network_service::{RoadNetworkService, SharedNetwork};
use crate::pathfinder;
use crate::road_network::{DEFAULT_CONGESTION_WEIGHT, RoadNode};

/// Static-weight display thresholds.
///
/// These are deliberately distinct from the analyzer's density thresholds:
/// this mapping classifies the static `congestion_weight` carried on an edge
/// (the search cost multiplier), while the analyzer classifies live density
/// samples. Each call site evaluates its own scheme; do not unify them.
const RED_WEIGHT_THRESHOLD: f64 = 2.5;
const ORANGE_WEIGHT_THRESHOLD: f64 = 1.3;

/// Assumed travel speed per congestion band, km/h.
fn speed_kmh(level: CongestionLevel) -> f64 {
    match level {
        CongestionLevel::Green => 60.0,
        CongestionLevel::Orange => 30.0,
        CongestionLevel::Red => 15.0,
    }
}

fn level_for_weight(weight: f64) -> CongestionLevel {
    if weight >= RED_WEIGHT_THRESHOLD {
        CongestionLevel::Red
    } else if weight >= ORANGE_WEIGHT_THRESHOLD {
        CongestionLevel::Orange
    } else {
        CongestionLevel::Green
    }
}

/// One edge-length piece of a returned route.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RouteSegment {
    pub start: Coordinates,
    pub end: Coordinates,
    /// Haversine length in kilometers.
    pub distance: f64,
    pub congestion_level: CongestionLevel,
}

/// A displayable route; immutable once assembled.
#[derive(Clone, Debug, Serialize)]
pub struct Route {
    pub path: Vec<Coordinates>,
    pub segments: Vec<RouteSegment>,
    /// Kilometers.
    pub total_distance: f64,
    /// Minutes.
    pub estimated_time: f64,
}

#[derive(Debug, Clone)]
pub struct RouteOptimizerConfig {
    /// Attempt cap for the transient window (network load + snap + search).
    pub max_attempts: u32,
    /// Base backoff, doubled per attempt.
    pub retry_backoff: Duration,
}

impl Default for RouteOptimizerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Turns raw coordinates into a displayable route: validation, network
/// lookup, nearest-node snapping, A* search, segment building and travel
/// time estimation.
pub struct RouteOptimizerService {
    network_service: Arc<RoadNetworkService>,
    config: RouteOptimizerConfig,
}

impl RouteOptimizerService {
    pub fn new(network_service: Arc<RoadNetworkService>) -> Self {
        Self::with_config(network_service, RouteOptimizerConfig::default())
    }

    pub fn with_config(
        network_service: Arc<RoadNetworkService>,
        config: RouteOptimizerConfig,
    ) -> Self {
        Self {
            network_service,
            config,
        }
    }

    /// Computes the optimal route between two coordinates.
    ///
    /// Validation runs before any network access and is never retried.
    /// Transient network-load failures get a bounded exponential-backoff
    /// retry; snapping and search outcomes are deterministic and surface
    /// immediately.
    pub async fn calculate_route(
        &self,
        start: Coordinates,
        destination: Coordinates,
    ) -> Result<Route, RouteError> {
        validate_coordinates(start)?;
        validate_coordinates(destination)?;

        let (network, path) = self.resolve_path_with_retry(start, destination).await?;
        let route = self.assemble_route(&network, path);

        info!(
            "Route computed: {:.2} km, {:.1} min, {} segments",
            route.total_distance,
            route.estimated_time,
            route.segments.len()
        );
        Ok(route)
    }

    /// Re-derives the endpoints of an existing route and recomputes it.
    ///
    /// `cleared_blockage` is accepted but currently ignored; it is the hook
    /// for future blockage-aware recalculation.
    pub async fn recalculate_route(
        &self,
        current: &Route,
        cleared_blockage: Option<&str>,
    ) -> Result<Route, RouteError> {
        if let Some(blockage) = cleared_blockage {
            debug!("Cleared blockage hint '{}' noted, not yet used", blockage);
        }

        let (Some(&start), Some(&destination)) = (current.path.first(), current.path.last())
        else {
            return Err(RouteError::InvalidCoordinates(
                "current route has an empty path".to_string(),
            ));
        };

        self.calculate_route(start, destination).await
    }

    async fn resolve_path_with_retry(
        &self,
        start: Coordinates,
        destination: Coordinates,
    ) -> Result<(SharedNetwork, Vec<RoadNode>), RouteError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.resolve_path(start, destination).await {
                Ok(resolved) => return Ok(resolved),
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    let backoff = self.config.retry_backoff * 2u32.pow(attempt - 1);
                    warn!(
                        "Transient routing failure (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.config.max_attempts, backoff, e
                    );
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn resolve_path(
        &self,
        start: Coordinates,
        destination: Coordinates,
    ) -> Result<(SharedNetwork, Vec<RoadNode>), RouteError> {
        let shared = self.network_service.get_network().await?;

        let path = {
            let network = shared.read().expect("network lock poisoned");

            let from = network
                .find_nearest_node(start)
                .copied()
                .ok_or(RouteError::NoNearbyRoad(Endpoint::Start))?;
            let to = network
                .find_nearest_node(destination)
                .copied()
                .ok_or(RouteError::NoNearbyRoad(Endpoint::Destination))?;

            debug!(
                "Snapped {:?} -> node {}, {:?} -> node {}",
                start, from.id, destination, to.id
            );

            pathfinder::find_path(&network, &from, &to).map_err(|e| {
                debug!("Search failed: {}", e);
                RouteError::NoRouteAvailable
            })?
        };

        Ok((shared, path))
    }

    fn assemble_route(&self, shared: &SharedNetwork, path: Vec<RoadNode>) -> Route {
        let network = shared.read().expect("network lock poisoned");

        let segments: Vec<RouteSegment> = path
            .windows(2)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                let weight = network
                    .edge_between(a.id, b.id)
                    .map(|e| e.congestion_weight)
                    .unwrap_or(DEFAULT_CONGESTION_WEIGHT);
                RouteSegment {
                    start: a.coordinates,
                    end: b.coordinates,
                    distance: haversine_distance(a.coordinates, b.coordinates),
                    congestion_level: level_for_weight(weight),
                }
            })
            .collect();

        let total_distance = segments.iter().map(|s| s.distance).sum();
        let estimated_time = estimate_travel_time(&segments);

        Route {
            path: path.into_iter().map(|n| n.coordinates).collect(),
            segments,
            total_distance,
            estimated_time,
        }
    }
}

/// Estimated travel time over the segments, in minutes. Each segment is
/// traversed at the assumed speed of its congestion band; an empty segment
/// list estimates to zero.
pub fn estimate_travel_time(segments: &[RouteSegment]) -> f64 {
    segments
        .iter()
        .map(|s| (s.distance / speed_kmh(s.congestion_level)) * 60.0)
        .sum()
}

/// Renders a route as a GeoJSON LineString feature collection for map
/// display.
pub fn route_to_geojson(route: &Route) -> Value {
    let coordinates: Vec<Vec<f64>> = route.path.iter().map(|c| vec![c.lng, c.lat]).collect();

    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {
                "total_distance_km": route.total_distance,
                "estimated_time_min": route.estimated_time,
            },
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates
            }
        }]
    })
}
