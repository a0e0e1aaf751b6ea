//! Routeflow: a traffic-aware shortest-path routing engine.
//!
//! The engine owns the road-network graph, a congestion-weighted A* search,
//! a live congestion classification layer, and the orchestration turning raw
//! coordinates into a displayable route. Transport, persistence and map
//! ingestion live behind the [`network_service::NetworkDataSource`] seam and
//! the congestion feed entry points; they are not part of this crate.

pub mod congestion;
pub mod error;
pub mod geospatial;
pub mod network_service;
mod pathfinder;
pub mod road_network;
pub mod route_optimizer;

pub use congestion::{CongestionAnalyzer, CongestionLevel, CongestionReading, segment_id};
pub use error::{Endpoint, RouteError};
pub use geospatial::{Coordinates, haversine_distance, validate_coordinates};
pub use network_service::{
    NetworkCacheConfig, NetworkDataSource, RoadNetworkService, SharedNetwork, StubDataSource,
};
pub use road_network::{RawNetworkData, RoadEdge, RoadNetwork, RoadNode};
pub use route_optimizer::{
    Route, RouteOptimizerConfig, RouteOptimizerService, RouteSegment, estimate_travel_time,
    route_to_geojson,
};
