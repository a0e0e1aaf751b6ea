//! End-to-end behavior of the routing pipeline: network service, analyzer
//! and optimizer wired together the way the composition root wires them.

use std::sync::Arc;

use routeflow::{
    CongestionAnalyzer, CongestionLevel, CongestionReading, Coordinates, NetworkCacheConfig,
    RoadNetworkService, RouteOptimizerService, StubDataSource, segment_id,
};

fn services() -> (Arc<RoadNetworkService>, RouteOptimizerService) {
    let network_service = Arc::new(RoadNetworkService::new(
        Arc::new(StubDataSource),
        NetworkCacheConfig::default(),
    ));
    let optimizer = RouteOptimizerService::new(Arc::clone(&network_service));
    (network_service, optimizer)
}

const SOUTH_WEST: Coordinates = Coordinates {
    lat: 48.8558,
    lng: 2.3498,
};
const SOUTH_EAST: Coordinates = Coordinates {
    lat: 48.8558,
    lng: 2.3602,
};

#[tokio::test]
async fn route_congestion_query_is_keyed_by_segment_index() {
    let (_, optimizer) = services();
    let analyzer = CongestionAnalyzer::new();

    let route = optimizer
        .calculate_route(SOUTH_WEST, SOUTH_EAST)
        .await
        .unwrap();
    let congestion = analyzer.get_route_congestion(&route);

    assert_eq!(congestion.len(), route.segments.len());
    for (i, segment) in route.segments.iter().enumerate() {
        assert_eq!(congestion[&format!("segment-{}", i)], segment.congestion_level);
    }
}

#[tokio::test]
async fn live_density_never_feeds_the_search_or_the_displayed_levels() {
    let (_, optimizer) = services();
    let analyzer = CongestionAnalyzer::new();

    let baseline = optimizer
        .calculate_route(SOUTH_WEST, SOUTH_EAST)
        .await
        .unwrap();

    // Saturate the direct corridor in the live feed only.
    analyzer.update_congestion_data(vec![
        CongestionReading {
            segment_id: segment_id(1, 2),
            density: 0.95,
            timestamp: chrono::Utc::now(),
        },
        CongestionReading {
            segment_id: segment_id(2, 3),
            density: 0.95,
            timestamp: chrono::Utc::now(),
        },
    ]);

    let after = optimizer
        .calculate_route(SOUTH_WEST, SOUTH_EAST)
        .await
        .unwrap();

    // Search cost and the static display thresholds both ignore the live
    // density map, so the route is unchanged and still green.
    assert_eq!(after.path, baseline.path);
    assert!(
        after
            .segments
            .iter()
            .all(|s| s.congestion_level == CongestionLevel::Green)
    );
}

#[tokio::test]
async fn static_congestion_weights_steer_the_route_around_the_corridor() {
    let (network_service, optimizer) = services();

    let direct = optimizer
        .calculate_route(SOUTH_WEST, SOUTH_EAST)
        .await
        .unwrap();
    // The uncongested route runs straight along the southern avenue 1-2-3.
    assert_eq!(direct.path.len(), 3);

    network_service.update_congestion_weight(1, 2, 3.0).await;
    network_service.update_congestion_weight(2, 3, 3.0).await;

    let rerouted = optimizer
        .calculate_route(SOUTH_WEST, SOUTH_EAST)
        .await
        .unwrap();

    // Detour over the middle row 1-4-5-6-3 is now cheaper than the tripled
    // direct corridor.
    assert_eq!(rerouted.path.len(), 5);
    assert!(
        !rerouted
            .path
            .contains(&Coordinates::new(48.8560, 2.3550)),
        "rerouted path must avoid node 2"
    );
    assert!(rerouted.total_distance > direct.total_distance);
    assert!(
        rerouted
            .segments
            .iter()
            .all(|s| s.congestion_level == CongestionLevel::Green)
    );
}

#[tokio::test]
async fn recalculation_after_weight_changes_picks_up_the_new_graph() {
    let (network_service, optimizer) = services();

    let route = optimizer
        .calculate_route(SOUTH_WEST, SOUTH_EAST)
        .await
        .unwrap();

    network_service.update_congestion_weight(1, 2, 3.0).await;
    network_service.update_congestion_weight(2, 3, 3.0).await;

    let recalculated = optimizer.recalculate_route(&route, None).await.unwrap();

    // Same endpoints, different body: recalculation re-runs the full search
    // against the mutated graph.
    assert_eq!(recalculated.path.first(), route.path.first());
    assert_eq!(recalculated.path.last(), route.path.last());
    assert_ne!(recalculated.path, route.path);
}
