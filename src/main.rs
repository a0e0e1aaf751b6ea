use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;
use rand::Rng;

use routeflow::{
    CongestionAnalyzer, CongestionReading, Coordinates, NetworkCacheConfig, RoadNetworkService,
    RouteOptimizerService, StubDataSource, route_to_geojson, segment_id,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .format_target(false)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
    info!("Starting routeflow");

    let network_service = Arc::new(RoadNetworkService::new(
        Arc::new(StubDataSource),
        NetworkCacheConfig::default(),
    ));
    let analyzer = Arc::new(CongestionAnalyzer::new());

    // Simulated congestion feed over a few grid segments, standing in for
    // the external sensor ingestion.
    analyzer.start_periodic_refresh(
        || {
            let mut rng = rand::rng();
            [(1, 2), (2, 3), (4, 5), (5, 8)]
                .into_iter()
                .map(|(from, to)| CongestionReading {
                    segment_id: segment_id(from, to),
                    density: rng.random_range(0.0..1.0),
                    timestamp: chrono::Utc::now(),
                })
                .collect()
        },
        Duration::from_secs(30),
    );

    // Warm the cache, then mark the southern avenue as congested so the
    // demo route has something to steer around.
    network_service.get_network().await?;
    network_service.update_congestion_weight(1, 2, 3.0).await;
    network_service.update_congestion_weight(2, 1, 3.0).await;

    let optimizer = RouteOptimizerService::new(Arc::clone(&network_service));
    let route = optimizer
        .calculate_route(
            Coordinates::new(48.8558, 2.3498),
            Coordinates::new(48.8642, 2.3602),
        )
        .await?;

    info!(
        "Demo route: {:.2} km, {:.1} min over {} segments",
        route.total_distance,
        route.estimated_time,
        route.segments.len()
    );
    info!("Route GeoJSON: {}", route_to_geojson(&route));
    info!(
        "Per-segment congestion: {:?}",
        analyzer.get_route_congestion(&route)
    );

    analyzer.stop_periodic_refresh();
    Ok(())
}
