use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::geospatial::{Coordinates, haversine_distance};

/// Default multiplier for an edge nobody has reported congestion on.
pub const DEFAULT_CONGESTION_WEIGHT: f64 = 1.0;

/// A graph vertex; immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: u64,
    pub coordinates: Coordinates,
}

/// A directed edge between two nodes.
///
/// A bidirectional road is stored as two independent edges whose congestion
/// weights may diverge once mutated. `distance` is the haversine length in
/// kilometers; `congestion_weight` is the static multiplier (>= 1.0) consumed
/// only by the search cost function.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub from: u64,
    pub to: u64,
    pub distance: f64,
    pub congestion_weight: f64,
}

/// In-memory road graph: nodes by id, outgoing edges by source node id.
///
/// Invariant: every edge endpoint references an existing node id; `parse`
/// enforces this by dropping way node references that are missing from the
/// node list.
#[derive(Clone, Debug, Default)]
pub struct RoadNetwork {
    pub nodes: HashMap<u64, RoadNode>,
    pub edges: HashMap<u64, Vec<RoadEdge>>,
}

/// Raw network data in the shape the (stubbed) OSM-like source supplies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawNetworkData {
    pub nodes: Vec<RawNode>,
    pub ways: Vec<RawWay>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawNode {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawWay {
    pub id: u64,
    pub nodes: Vec<u64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl RoadNetwork {
    /// Builds a network from raw node/way data.
    ///
    /// Ways without a `highway` tag are not roads and contribute zero edges,
    /// though their referenced nodes still appear if listed in the node
    /// array. Every consecutive node pair of a qualifying way produces two
    /// directed edges with haversine distance and the default weight.
    pub fn parse(raw: &RawNetworkData) -> Self {
        let mut network = RoadNetwork::default();

        for raw_node in &raw.nodes {
            network.nodes.insert(
                raw_node.id,
                RoadNode {
                    id: raw_node.id,
                    coordinates: Coordinates::new(raw_node.lat, raw_node.lon),
                },
            );
        }

        let mut edge_count = 0usize;
        for way in &raw.ways {
            if !way.tags.contains_key("highway") {
                debug!("Skipping way {} without highway tag", way.id);
                continue;
            }

            for pair in way.nodes.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let (Some(a), Some(b)) = (
                    network.nodes.get(&from).copied(),
                    network.nodes.get(&to).copied(),
                ) else {
                    warn!(
                        "Way {} references missing node(s) {} -> {}, dropping pair",
                        way.id, from, to
                    );
                    continue;
                };

                let distance = haversine_distance(a.coordinates, b.coordinates);
                network.add_edge(RoadEdge {
                    from,
                    to,
                    distance,
                    congestion_weight: DEFAULT_CONGESTION_WEIGHT,
                });
                network.add_edge(RoadEdge {
                    from: to,
                    to: from,
                    distance,
                    congestion_weight: DEFAULT_CONGESTION_WEIGHT,
                });
                edge_count += 2;
            }
        }

        debug!(
            "Parsed network: {} nodes, {} edges",
            network.nodes.len(),
            edge_count
        );
        network
    }

    pub fn add_edge(&mut self, edge: RoadEdge) {
        self.edges.entry(edge.from).or_default().push(edge);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: u64) -> Option<&RoadNode> {
        self.nodes.get(&id)
    }

    /// Outgoing edges of a node; empty slice for unknown ids.
    pub fn edges_from(&self, id: u64) -> &[RoadEdge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_between(&self, from: u64, to: u64) -> Option<&RoadEdge> {
        self.edges_from(from).iter().find(|e| e.to == to)
    }

    /// Linear scan for the node closest to a coordinate by haversine
    /// distance. Returns `None` iff the network has zero nodes.
    pub fn find_nearest_node(&self, coord: Coordinates) -> Option<&RoadNode> {
        self.nodes.values().min_by(|a, b| {
            haversine_distance(coord, a.coordinates)
                .partial_cmp(&haversine_distance(coord, b.coordinates))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Mutates the matching edge's congestion weight in place; no-op if the
    /// edge does not exist. Returns whether an edge was updated.
    pub fn update_congestion_weight(&mut self, from: u64, to: u64, weight: f64) -> bool {
        if let Some(edges) = self.edges.get_mut(&from)
            && let Some(edge) = edges.iter_mut().find(|e| e.to == to)
        {
            edge.congestion_weight = weight;
            return true;
        }
        debug!("No edge {} -> {} to update, ignoring", from, to);
        false
    }
}
