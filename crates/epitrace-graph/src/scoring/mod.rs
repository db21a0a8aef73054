//! Outbreak score computation.
//!
//! Every outbreak source spreads downstream independently with a fresh
//! visited pair, so counts are per-source reachability, not flow. An
//! element's score is the fraction of sources reaching it; a count
//! equal to the source total marks a common link.

use std::collections::VecDeque;

use epitrace_core::collections::FxHashSet;
use tracing::debug;

use crate::store::{DeliveryHandle, StationHandle, TraceGraph};
use crate::trace::forward_deliveries;

/// Recompute `score` and `common_link` on every station and delivery.
///
/// Returns the maximum station score, `0.0` when no outbreak source is
/// set. Hidden and contained stations neither spread nor receive.
pub fn recompute(graph: &mut TraceGraph) -> f64 {
    for station in graph.stations_mut() {
        station.score = 0.0;
        station.common_link = false;
    }
    for delivery in graph.deliveries_mut() {
        delivery.score = 0.0;
        delivery.common_link = false;
    }

    let sources: Vec<StationHandle> = graph
        .station_handles()
        .filter(|&handle| {
            let station = graph.station(handle);
            station.outbreak && station.is_traceable()
        })
        .collect();
    if sources.is_empty() {
        return 0.0;
    }

    let total = sources.len() as u32;
    let n = sources.len() as f64;
    let mut station_counts = vec![0u32; graph.station_count()];
    let mut delivery_counts = vec![0u32; graph.delivery_count()];

    for &source in &sources {
        // A source always reaches itself.
        station_counts[source.index()] += 1;
        spread_from(graph, source, &mut station_counts, &mut delivery_counts);
    }

    let mut max_score = 0.0f64;
    for (index, station) in graph.stations_mut().enumerate() {
        let count = station_counts[index];
        station.score = f64::from(count) / n;
        station.common_link = count == total;
        if station.score > max_score {
            max_score = station.score;
        }
    }
    for (index, delivery) in graph.deliveries_mut().enumerate() {
        let count = delivery_counts[index];
        delivery.score = f64::from(count) / n;
        delivery.common_link = count == total;
    }

    debug!(sources = total, max_score, "recomputed outbreak scores");
    max_score
}

/// Downstream spread from one source over the trace successor rules.
///
/// Stations are counted once per source but expanded once per arriving
/// delivery, since successors depend on the delivery that reached them.
fn spread_from(
    graph: &TraceGraph,
    source: StationHandle,
    station_counts: &mut [u32],
    delivery_counts: &mut [u32],
) {
    let mut seen_stations: FxHashSet<StationHandle> = FxHashSet::default();
    let mut seen_deliveries: FxHashSet<DeliveryHandle> = FxHashSet::default();
    seen_stations.insert(source);

    let mut queue: VecDeque<DeliveryHandle> = VecDeque::new();
    for id in &graph.station(source).outgoing {
        let handle = match graph.find_delivery(id) {
            Some(handle) => handle,
            None => continue,
        };
        if graph.delivery(handle).invisible {
            continue;
        }
        if seen_deliveries.insert(handle) {
            queue.push_back(handle);
        }
    }

    while let Some(handle) = queue.pop_front() {
        delivery_counts[handle.index()] += 1;
        let target = match graph.find_station(graph.delivery(handle).target.as_str()) {
            Some(station) => station,
            None => continue,
        };
        if !graph.station(target).is_traceable() {
            continue;
        }
        if seen_stations.insert(target) {
            station_counts[target.index()] += 1;
        }
        for (next, _) in forward_deliveries(graph, target, handle) {
            if graph.delivery(next).invisible {
                continue;
            }
            if seen_deliveries.insert(next) {
                queue.push_back(next);
            }
        }
    }
}
