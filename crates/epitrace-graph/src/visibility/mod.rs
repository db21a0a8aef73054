//! Visibility, selection, and contamination flag setters.
//!
//! Setters taking id lists resolve every id before mutating, so an
//! unknown id aborts the whole call with the graph untouched. Callers
//! that change reachability (invisibility, outbreak, contamination
//! flags) must re-derive the trace and scores afterwards; the engine
//! facade does that.

use epitrace_core::collections::FxHashSet;
use epitrace_core::errors::{EpitraceResult, GraphError};
use epitrace_core::model::Station;

use crate::store::TraceGraph;

/// Select or deselect a station or delivery by id.
pub fn set_selected(graph: &mut TraceGraph, id: &str, selected: bool) -> EpitraceResult<()> {
    if let Some(handle) = graph.find_station(id) {
        graph.station_mut(handle).selected = selected;
        return Ok(());
    }
    if let Some(handle) = graph.find_delivery(id) {
        graph.delivery_mut(handle).selected = selected;
        return Ok(());
    }
    Err(GraphError::ElementNotFound { id: id.to_owned() }.into())
}

/// Hide the given stations and every delivery incident to them.
pub fn make_stations_invisible(graph: &mut TraceGraph, ids: &[String]) -> EpitraceResult<()> {
    let mut handles = Vec::with_capacity(ids.len());
    for id in ids {
        handles.push(graph.station_handle(id)?);
    }
    for handle in handles {
        graph.station_mut(handle).invisible = true;
    }
    let id_set: FxHashSet<&str> = ids.iter().map(String::as_str).collect();
    for delivery in graph.deliveries_mut() {
        if id_set.contains(delivery.source.as_str()) || id_set.contains(delivery.target.as_str()) {
            delivery.invisible = true;
        }
    }
    Ok(())
}

/// Restore visibility on every station and delivery.
pub fn clear_invisibility(graph: &mut TraceGraph) {
    for station in graph.stations_mut() {
        station.invisible = false;
    }
    for delivery in graph.deliveries_mut() {
        delivery.invisible = false;
    }
}

/// Mark or unmark the given stations as outbreak sources.
pub fn mark_stations_as_outbreak(
    graph: &mut TraceGraph,
    ids: &[String],
    outbreak: bool,
) -> EpitraceResult<()> {
    set_station_flags(graph, ids, |station| station.outbreak = outbreak)
}

/// Set the cross-contamination flag on the given stations.
pub fn set_cross_contamination_of_stations(
    graph: &mut TraceGraph,
    ids: &[String],
    cross_contamination: bool,
) -> EpitraceResult<()> {
    set_station_flags(graph, ids, |station| {
        station.cross_contamination = cross_contamination;
    })
}

/// Set the kill-contamination flag on the given stations.
pub fn set_kill_contamination_of_stations(
    graph: &mut TraceGraph,
    ids: &[String],
    kill_contamination: bool,
) -> EpitraceResult<()> {
    set_station_flags(graph, ids, |station| {
        station.kill_contamination = kill_contamination;
    })
}

fn set_station_flags<F>(graph: &mut TraceGraph, ids: &[String], mut apply: F) -> EpitraceResult<()>
where
    F: FnMut(&mut Station),
{
    let mut handles = Vec::with_capacity(ids.len());
    for id in ids {
        handles.push(graph.station_handle(id)?);
    }
    for handle in handles {
        apply(graph.station_mut(handle));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use epitrace_core::model::Delivery;

    use super::*;

    fn pair() -> TraceGraph {
        let stations = vec![Station::new("A"), Station::new("B"), Station::new("C")];
        let deliveries = vec![Delivery::new("d1", "A", "B"), Delivery::new("d2", "B", "C")];
        let mut graph = TraceGraph::new();
        graph.load(stations, deliveries).unwrap();
        graph
    }

    #[test]
    fn invisibility_cascades_to_incident_deliveries() {
        let mut graph = pair();
        make_stations_invisible(&mut graph, &["B".to_owned()]).unwrap();

        assert!(graph.station_by_id("B").unwrap().invisible);
        assert!(graph.delivery_by_id("d1").unwrap().invisible);
        assert!(graph.delivery_by_id("d2").unwrap().invisible);
        assert!(!graph.station_by_id("A").unwrap().invisible);

        clear_invisibility(&mut graph);
        assert!(!graph.station_by_id("B").unwrap().invisible);
        assert!(!graph.delivery_by_id("d1").unwrap().invisible);
    }

    #[test]
    fn unknown_id_aborts_without_partial_mutation() {
        let mut graph = pair();
        let result = make_stations_invisible(&mut graph, &["A".to_owned(), "nope".to_owned()]);
        assert!(result.is_err());
        assert!(!graph.station_by_id("A").unwrap().invisible);
    }

    #[test]
    fn selection_resolves_stations_then_deliveries() {
        let mut graph = pair();
        set_selected(&mut graph, "A", true).unwrap();
        set_selected(&mut graph, "d2", true).unwrap();
        assert!(graph.station_by_id("A").unwrap().selected);
        assert!(graph.delivery_by_id("d2").unwrap().selected);
        assert!(set_selected(&mut graph, "nope", true).is_err());
    }

    #[test]
    fn flag_setters_apply_to_every_listed_station() {
        let mut graph = pair();
        let ids = vec!["A".to_owned(), "C".to_owned()];
        mark_stations_as_outbreak(&mut graph, &ids, true).unwrap();
        set_cross_contamination_of_stations(&mut graph, &ids, true).unwrap();
        set_kill_contamination_of_stations(&mut graph, &["B".to_owned()], true).unwrap();

        assert!(graph.station_by_id("A").unwrap().outbreak);
        assert!(graph.station_by_id("C").unwrap().cross_contamination);
        assert!(graph.station_by_id("B").unwrap().kill_contamination);

        mark_stations_as_outbreak(&mut graph, &ids, false).unwrap();
        assert!(!graph.station_by_id("A").unwrap().outbreak);
    }
}
