use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use log::debug;
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::geospatial::euclidean_degrees;
use crate::road_network::{RoadNetwork, RoadNode};

/// Internal search outcome: the open set was exhausted without reaching the
/// goal. The orchestrator translates this before it ever reaches a caller.
#[derive(Debug, Error)]
#[error("no path found between nodes {from} and {to}")]
pub(crate) struct NoPathFound {
    pub from: u64,
    pub to: u64,
}

/// Congestion-weighted A* over the road graph.
///
/// Search state (g/f scores, predecessor links, the open set) is local to
/// each call, so concurrent searches only ever share read access to the
/// network. The edge cost is `distance * congestion_weight` using the static
/// weight on the edge; live density classification never feeds the search.
///
/// The heuristic is straight-line distance in raw degree space. At road
/// scale it vastly underestimates the km-denominated cost, which makes the
/// search lean heavily on accumulated cost; tie-breaks between equal f
/// scores go to the earlier-enqueued entry. Both properties are load-bearing
/// and kept as-is.
///
/// Returns the node sequence start..goal inclusive, carrying ids alongside
/// coordinates so segment building can use exact edge lookups.
pub(crate) fn find_path(
    network: &RoadNetwork,
    start: &RoadNode,
    goal: &RoadNode,
) -> Result<Vec<RoadNode>, NoPathFound> {
    let mut g_score: HashMap<u64, f64> = HashMap::new();
    let mut f_score: HashMap<u64, f64> = HashMap::new();
    let mut came_from: HashMap<u64, u64> = HashMap::new();

    // Min-heap on (f score, insertion sequence): lazy-deletion open set with
    // insertion-order tie-breaking.
    let mut open: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, u64)>> = BinaryHeap::new();
    let mut sequence: u64 = 0;

    let start_f = euclidean_degrees(start.coordinates, goal.coordinates);
    g_score.insert(start.id, 0.0);
    f_score.insert(start.id, start_f);
    open.push(Reverse((OrderedFloat(start_f), sequence, start.id)));

    let mut expanded = 0usize;

    while let Some(Reverse((OrderedFloat(f), _, current))) = open.pop() {
        if current == goal.id {
            let path = reconstruct_path(network, &came_from, start.id, goal.id);
            debug!(
                "Path found: {} nodes, {} expansions",
                path.len(),
                expanded
            );
            return Ok(path);
        }

        // Stale duplicate left behind by a later, better requeue.
        if f > *f_score.get(&current).unwrap_or(&f64::INFINITY) {
            continue;
        }
        expanded += 1;

        let current_g = g_score[&current];
        for edge in network.edges_from(current) {
            let tentative = current_g + edge.distance * edge.congestion_weight;
            if tentative < *g_score.get(&edge.to).unwrap_or(&f64::INFINITY) {
                let neighbor = match network.node(edge.to) {
                    Some(node) => node,
                    None => continue,
                };

                came_from.insert(edge.to, current);
                g_score.insert(edge.to, tentative);
                let neighbor_f =
                    tentative + euclidean_degrees(neighbor.coordinates, goal.coordinates);
                f_score.insert(edge.to, neighbor_f);

                sequence += 1;
                open.push(Reverse((OrderedFloat(neighbor_f), sequence, edge.to)));
            }
        }
    }

    debug!(
        "Search exhausted after {} expansions without reaching node {}",
        expanded, goal.id
    );
    Err(NoPathFound {
        from: start.id,
        to: goal.id,
    })
}

fn reconstruct_path(
    network: &RoadNetwork,
    came_from: &HashMap<u64, u64>,
    start_id: u64,
    goal_id: u64,
) -> Vec<RoadNode> {
    let mut path = Vec::new();
    let mut current = goal_id;

    loop {
        if let Some(node) = network.node(current) {
            path.push(*node);
        }
        if current == start_id {
            break;
        }
        match came_from.get(&current) {
            Some(&previous) => current = previous,
            None => break,
        }
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geospatial::Coordinates;
    use crate::road_network::RoadEdge;

    fn network_with(nodes: &[(u64, f64, f64)], edges: &[(u64, u64, f64)]) -> RoadNetwork {
        let mut network = RoadNetwork::default();
        for &(id, lat, lng) in nodes {
            network.nodes.insert(
                id,
                RoadNode {
                    id,
                    coordinates: Coordinates::new(lat, lng),
                },
            );
        }
        for &(from, to, weight) in edges {
            let a = network.nodes[&from].coordinates;
            let b = network.nodes[&to].coordinates;
            network.add_edge(RoadEdge {
                from,
                to,
                distance: crate::geospatial::haversine_distance(a, b),
                congestion_weight: weight,
            });
        }
        network
    }

    fn ids(path: &[RoadNode]) -> Vec<u64> {
        path.iter().map(|n| n.id).collect()
    }

    #[test]
    fn identical_start_and_goal_yield_a_single_element_path() {
        let network = network_with(&[(1, 0.0, 0.0)], &[]);
        let node = *network.node(1).unwrap();
        let path = find_path(&network, &node, &node).unwrap();
        assert_eq!(ids(&path), vec![1]);
    }

    #[test]
    fn disconnected_goal_is_no_path_found() {
        let network = network_with(&[(1, 0.0, 0.0), (2, 0.0, 1.0)], &[]);
        let start = *network.node(1).unwrap();
        let goal = *network.node(2).unwrap();
        let err = find_path(&network, &start, &goal).unwrap_err();
        assert_eq!(err.from, 1);
        assert_eq!(err.to, 2);
    }

    #[test]
    fn straight_line_path_is_ordered_start_to_goal() {
        let network = network_with(
            &[(1, 0.0, 0.0), (2, 0.0, 0.01), (3, 0.0, 0.02)],
            &[(1, 2, 1.0), (2, 3, 1.0)],
        );
        let start = *network.node(1).unwrap();
        let goal = *network.node(3).unwrap();
        let path = find_path(&network, &start, &goal).unwrap();
        assert_eq!(ids(&path), vec![1, 2, 3]);
    }

    #[test]
    fn congestion_weight_steers_the_search_around_the_loaded_branch() {
        // Diamond A -> {B, C} -> D with symmetric geometry; the branch via B
        // carries weight 3.0, via C weight 1.0.
        let network = network_with(
            &[
                (1, 0.0, 0.0),
                (2, 0.01, 0.01),
                (3, -0.01, 0.01),
                (4, 0.0, 0.02),
            ],
            &[(1, 2, 3.0), (1, 3, 1.0), (2, 4, 3.0), (3, 4, 1.0)],
        );
        let start = *network.node(1).unwrap();
        let goal = *network.node(4).unwrap();
        let path = find_path(&network, &start, &goal).unwrap();
        assert_eq!(ids(&path), vec![1, 3, 4]);
    }

    #[test]
    fn equal_cost_branches_resolve_by_insertion_order() {
        // Same diamond with equal weights everywhere: the branch whose edge
        // was relaxed first (listed first on A) is kept, because a later
        // equal-cost relaxation never displaces a predecessor link.
        let network = network_with(
            &[
                (1, 0.0, 0.0),
                (2, 0.01, 0.01),
                (3, -0.01, 0.01),
                (4, 0.0, 0.02),
            ],
            &[(1, 2, 1.0), (1, 3, 1.0), (2, 4, 1.0), (3, 4, 1.0)],
        );
        let start = *network.node(1).unwrap();
        let goal = *network.node(4).unwrap();
        let path = find_path(&network, &start, &goal).unwrap();
        assert_eq!(ids(&path), vec![1, 2, 4]);
    }

    #[test]
    fn stale_heap_entries_are_skipped_not_revisited() {
        // Node 3 is first relaxed expensively via 2, then improved via 4,
        // leaving a stale heap entry. The goal edge 3 -> 5 is heavy enough
        // that the stale entry pops before the goal and must be skipped
        // without corrupting the reconstructed path.
        let network = network_with(
            &[
                (1, 0.0, 0.0),
                (2, 0.0, 0.01),
                (3, 0.0, 0.02),
                (4, 0.001, 0.01),
                (5, 0.0, 0.07),
            ],
            &[
                (1, 2, 1.0),
                (2, 3, 10.0),
                (1, 4, 1.5),
                (4, 3, 1.5),
                (3, 5, 3.0),
            ],
        );
        let start = *network.node(1).unwrap();
        let goal = *network.node(5).unwrap();
        let path = find_path(&network, &start, &goal).unwrap();
        assert_eq!(ids(&path), vec![1, 4, 3, 5]);
    }
}
