//! Forward/backward reachability propagation.
//!
//! Traversal runs over an explicit worklist; the `forward`/`backward`
//! flag on a delivery doubles as the visited marker, which keeps the
//! walk cycle-safe without recursion. Stations are marked every time a
//! delivery reaches them because the successor set depends on the
//! arriving delivery, not the station alone.

use std::collections::VecDeque;

use chrono::NaiveDate;
use epitrace_core::collections::{FxHashSet, SmallVec8};
use epitrace_core::errors::EpitraceResult;
use epitrace_core::model::{ObservedType, TraceDirection};
use tracing::debug;

use crate::store::{DeliveryHandle, StationHandle, TraceGraph};

/// Reset every trace marker graph-wide: `observed`, `forward`,
/// `backward`, and the derived delivery cross-contamination highlight.
pub fn clear(graph: &mut TraceGraph) {
    for station in graph.stations_mut() {
        station.observed = ObservedType::None;
        station.forward = false;
        station.backward = false;
    }
    for delivery in graph.deliveries_mut() {
        delivery.observed = ObservedType::None;
        delivery.forward = false;
        delivery.backward = false;
        delivery.cross_contamination = false;
    }
}

/// Focus a trace on a station.
///
/// Clears the previous trace graph-wide first, then spreads from the
/// focal station. A contained or invisible focal station resolves to a
/// cleared trace; `Ok(false)` reports that the focus did not take.
/// Unknown ids are a caller error.
pub fn trace_station(
    graph: &mut TraceGraph,
    id: &str,
    direction: TraceDirection,
) -> EpitraceResult<bool> {
    let handle = graph.station_handle(id)?;
    clear(graph);
    if !graph.station(handle).is_traceable() {
        debug!(station = %id, "focal station hidden or contained; trace cleared");
        return Ok(false);
    }
    graph.station_mut(handle).observed = direction.observed();
    if matches!(direction, TraceDirection::Backward | TraceDirection::Full) {
        let seeds = backward_seeds(graph, handle);
        spread_backward(graph, seeds);
    }
    if matches!(direction, TraceDirection::Forward | TraceDirection::Full) {
        let seeds = forward_seeds(graph, handle);
        spread_forward(graph, seeds);
    }
    debug!(station = %id, ?direction, "traced station");
    Ok(true)
}

/// Focus a trace on a delivery.
///
/// The focal delivery itself keeps only its `observed` marker; its
/// upstream side spreads backward and its downstream side forward.
pub fn trace_delivery(
    graph: &mut TraceGraph,
    id: &str,
    direction: TraceDirection,
) -> EpitraceResult<bool> {
    let handle = graph.delivery_handle(id)?;
    clear(graph);
    if graph.delivery(handle).invisible {
        debug!(delivery = %id, "focal delivery hidden; trace cleared");
        return Ok(false);
    }
    graph.delivery_mut(handle).observed = direction.observed();
    if matches!(direction, TraceDirection::Backward | TraceDirection::Full) {
        spread_backward(graph, VecDeque::from([handle]));
    }
    if matches!(direction, TraceDirection::Forward | TraceDirection::Full) {
        spread_forward(graph, VecDeque::from([handle]));
    }
    debug!(delivery = %id, ?direction, "traced delivery");
    Ok(true)
}

/// Outgoing deliveries contamination continues into after arriving at
/// `station` via `arriving`.
///
/// The base set is the station's explicit connections for the arriving
/// delivery (lot-level provenance). A cross-contamination station widens
/// the set with every other outgoing delivery not dated before the
/// arriving one; unknown dates never block the spread. Each entry
/// carries whether it was added by widening. A kill-contamination
/// station passes nothing on.
pub fn forward_deliveries(
    graph: &TraceGraph,
    station: StationHandle,
    arriving: DeliveryHandle,
) -> SmallVec8<(DeliveryHandle, bool)> {
    let s = graph.station(station);
    let mut successors: SmallVec8<(DeliveryHandle, bool)> = SmallVec8::new();
    if s.kill_contamination {
        return successors;
    }

    let arriving_id = graph.delivery(arriving).id.as_str();
    let arriving_date = graph.delivery(arriving).date;
    let mut seen: FxHashSet<DeliveryHandle> = FxHashSet::default();

    for relation in &s.connections {
        if relation.source != arriving_id {
            continue;
        }
        let next = match graph.find_delivery(&relation.target) {
            Some(handle) => handle,
            None => continue,
        };
        if seen.insert(next) {
            successors.push((next, false));
        }
    }

    if s.cross_contamination {
        for id in &s.outgoing {
            let next = match graph.find_delivery(id) {
                Some(handle) => handle,
                None => continue,
            };
            if next == arriving || seen.contains(&next) {
                continue;
            }
            if date_on_or_after(graph.delivery(next).date, arriving_date) {
                seen.insert(next);
                successors.push((next, true));
            }
        }
    }

    successors
}

/// Incoming deliveries contamination could have arrived through before
/// leaving `station` via `departing`. Mirror of [`forward_deliveries`]
/// with the date comparison reversed.
pub fn backward_deliveries(
    graph: &TraceGraph,
    station: StationHandle,
    departing: DeliveryHandle,
) -> SmallVec8<(DeliveryHandle, bool)> {
    let s = graph.station(station);
    let mut predecessors: SmallVec8<(DeliveryHandle, bool)> = SmallVec8::new();
    if s.kill_contamination {
        return predecessors;
    }

    let departing_id = graph.delivery(departing).id.as_str();
    let departing_date = graph.delivery(departing).date;
    let mut seen: FxHashSet<DeliveryHandle> = FxHashSet::default();

    for relation in &s.connections {
        if relation.target != departing_id {
            continue;
        }
        let previous = match graph.find_delivery(&relation.source) {
            Some(handle) => handle,
            None => continue,
        };
        if seen.insert(previous) {
            predecessors.push((previous, false));
        }
    }

    if s.cross_contamination {
        for id in &s.incoming {
            let previous = match graph.find_delivery(id) {
                Some(handle) => handle,
                None => continue,
            };
            if previous == departing || seen.contains(&previous) {
                continue;
            }
            if date_on_or_before(graph.delivery(previous).date, departing_date) {
                seen.insert(previous);
                predecessors.push((previous, true));
            }
        }
    }

    predecessors
}

fn forward_seeds(graph: &mut TraceGraph, station: StationHandle) -> VecDeque<DeliveryHandle> {
    let outgoing: Vec<DeliveryHandle> = graph
        .station(station)
        .outgoing
        .iter()
        .filter_map(|id| graph.find_delivery(id))
        .collect();
    let mut queue = VecDeque::new();
    for handle in outgoing {
        let delivery = graph.delivery_mut(handle);
        if delivery.invisible || delivery.forward {
            continue;
        }
        delivery.forward = true;
        queue.push_back(handle);
    }
    queue
}

fn backward_seeds(graph: &mut TraceGraph, station: StationHandle) -> VecDeque<DeliveryHandle> {
    let incoming: Vec<DeliveryHandle> = graph
        .station(station)
        .incoming
        .iter()
        .filter_map(|id| graph.find_delivery(id))
        .collect();
    let mut queue = VecDeque::new();
    for handle in incoming {
        let delivery = graph.delivery_mut(handle);
        if delivery.invisible || delivery.backward {
            continue;
        }
        delivery.backward = true;
        queue.push_back(handle);
    }
    queue
}

fn spread_forward(graph: &mut TraceGraph, mut queue: VecDeque<DeliveryHandle>) {
    while let Some(handle) = queue.pop_front() {
        let target = match graph.find_station(graph.delivery(handle).target.as_str()) {
            Some(station) => station,
            None => continue,
        };
        if !graph.station(target).is_traceable() {
            continue;
        }
        graph.station_mut(target).forward = true;
        let successors = forward_deliveries(graph, target, handle);
        for (next, widened) in successors {
            let delivery = graph.delivery_mut(next);
            if delivery.invisible || delivery.forward {
                continue;
            }
            delivery.forward = true;
            if widened {
                delivery.cross_contamination = true;
            }
            queue.push_back(next);
        }
    }
}

fn spread_backward(graph: &mut TraceGraph, mut queue: VecDeque<DeliveryHandle>) {
    while let Some(handle) = queue.pop_front() {
        let source = match graph.find_station(graph.delivery(handle).source.as_str()) {
            Some(station) => station,
            None => continue,
        };
        if !graph.station(source).is_traceable() {
            continue;
        }
        graph.station_mut(source).backward = true;
        let predecessors = backward_deliveries(graph, source, handle);
        for (previous, widened) in predecessors {
            let delivery = graph.delivery_mut(previous);
            if delivery.invisible || delivery.backward {
                continue;
            }
            delivery.backward = true;
            if widened {
                delivery.cross_contamination = true;
            }
            queue.push_back(previous);
        }
    }
}

fn date_on_or_after(candidate: Option<NaiveDate>, reference: Option<NaiveDate>) -> bool {
    match (candidate, reference) {
        (Some(candidate), Some(reference)) => candidate >= reference,
        _ => true,
    }
}

fn date_on_or_before(candidate: Option<NaiveDate>, reference: Option<NaiveDate>) -> bool {
    match (candidate, reference) {
        (Some(candidate), Some(reference)) => candidate <= reference,
        _ => true,
    }
}
