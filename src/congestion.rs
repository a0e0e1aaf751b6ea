use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::road_network::RoadEdge;
use crate::route_optimizer::Route;

/// Discrete congestion bands used for display and travel-time estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Green,
    Orange,
    Red,
}

impl CongestionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CongestionLevel::Green => "green",
            CongestionLevel::Orange => "orange",
            CongestionLevel::Red => "red",
        }
    }
}

impl std::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live occupancy sample for one road segment, supplied by the external
/// congestion feed. Last write wins per segment id; readings are never
/// merged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CongestionReading {
    pub segment_id: String,
    /// Occupancy in [0, 1].
    pub density: f64,
    pub timestamp: DateTime<Utc>,
}

/// Key under which live readings for a directed edge are stored.
pub fn segment_id(from: u64, to: u64) -> String {
    format!("{}-{}", from, to)
}

/// Classifies live density readings into congestion levels and keeps them
/// fresh via a cancellable background refresh task.
///
/// The analyzer's density map is entirely independent of the static
/// `congestion_weight` carried on graph edges: the static weight drives the
/// search cost, the analyzer only ever informs display and time estimation.
pub struct CongestionAnalyzer {
    readings: Arc<RwLock<HashMap<String, CongestionReading>>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for CongestionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CongestionAnalyzer {
    pub fn new() -> Self {
        Self {
            readings: Arc::new(RwLock::new(HashMap::new())),
            refresh_task: Mutex::new(None),
        }
    }

    /// Maps a density sample to a band. The 0.3 and 0.7 boundaries belong to
    /// the higher band.
    pub fn classify(density: f64) -> CongestionLevel {
        if density < 0.3 {
            CongestionLevel::Green
        } else if density < 0.7 {
            CongestionLevel::Orange
        } else {
            CongestionLevel::Red
        }
    }

    /// Static cost multiplier associated with a band.
    pub fn weight_for_level(level: CongestionLevel) -> f64 {
        match level {
            CongestionLevel::Green => 1.0,
            CongestionLevel::Orange => 1.5,
            CongestionLevel::Red => 3.0,
        }
    }

    /// Classifies the latest reading for an edge; an edge nobody has
    /// reported on yet is assumed free-flowing.
    pub fn analyze_segment(&self, edge: &RoadEdge) -> CongestionLevel {
        let key = segment_id(edge.from, edge.to);
        let readings = self.readings.read().expect("readings lock poisoned");
        match readings.get(&key) {
            Some(reading) => Self::classify(reading.density),
            None => CongestionLevel::Green,
        }
    }

    /// Ingests a batch from the congestion feed, last write per key winning.
    pub fn update_congestion_data(&self, batch: Vec<CongestionReading>) {
        let mut readings = self.readings.write().expect("readings lock poisoned");
        let count = batch.len();
        for reading in batch {
            readings.insert(reading.segment_id.clone(), reading);
        }
        debug!("Ingested {} congestion readings", count);
    }

    /// Per-segment congestion for an already-built route, keyed
    /// `segment-{index}`. Derived purely from the route's segments; no
    /// re-lookup against the graph or the reading map.
    pub fn get_route_congestion(&self, route: &Route) -> HashMap<String, CongestionLevel> {
        route
            .segments
            .iter()
            .enumerate()
            .map(|(i, segment)| (format!("segment-{}", i), segment.congestion_level))
            .collect()
    }

    /// Starts the background refresh: the producer is invoked immediately,
    /// then once per interval, each batch ingested last-write-wins. Starting
    /// while a refresh is running atomically replaces it; two schedulers
    /// never run at once. Must be called from within a tokio runtime.
    pub fn start_periodic_refresh<F>(&self, producer: F, interval: Duration)
    where
        F: Fn() -> Vec<CongestionReading> + Send + 'static,
    {
        let mut slot = self.refresh_task.lock().expect("refresh slot poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
            info!("Congestion refresh restarted, previous scheduler cancelled");
        } else {
            info!("Congestion refresh started (interval {:?})", interval);
        }

        let readings = Arc::clone(&self.readings);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                let batch = producer();
                let mut readings = readings.write().expect("readings lock poisoned");
                for reading in batch {
                    readings.insert(reading.segment_id.clone(), reading);
                }
            }
        }));
    }

    /// Cancels the refresh task. After this returns no further mutation
    /// occurs, barring one already-dispatched in-flight tick.
    pub fn stop_periodic_refresh(&self) {
        let mut slot = self.refresh_task.lock().expect("refresh slot poisoned");
        if let Some(task) = slot.take() {
            task.abort();
            info!("Congestion refresh stopped");
        }
    }

    /// Whether a refresh scheduler is currently installed.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_task
            .lock()
            .expect("refresh slot poisoned")
            .is_some()
    }
}

impl Drop for CongestionAnalyzer {
    fn drop(&mut self) {
        self.stop_periodic_refresh();
    }
}
