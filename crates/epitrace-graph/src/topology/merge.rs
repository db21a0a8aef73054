//! Merge and expand surgery on the station set.
//!
//! Both operations validate everything before the first mutation, so a
//! failed call leaves the graph untouched. Delivery endpoint rewrites
//! touch `source`/`target` only; `original_source`/`original_target`
//! stay fixed and are what expand restores from.

use epitrace_core::collections::FxHashSet;
use epitrace_core::errors::{EpitraceResult, TopologyError};
use epitrace_core::model::{GroupType, ObservedType, Station};
use tracing::{debug, info};

use crate::store::TraceGraph;

/// Merge the given stations into a freshly allocated meta station and
/// return its id.
///
/// An input id that is itself a meta station is dissolved first and its
/// members merged flat; nesting is not supported.
pub fn merge_stations(
    graph: &mut TraceGraph,
    member_ids: &[String],
    name: &str,
    group_type: Option<GroupType>,
) -> EpitraceResult<String> {
    let meta_id = graph.allocate_meta_id();
    merge_stations_with_id(graph, &meta_id, member_ids, name, group_type)?;
    Ok(meta_id)
}

/// Merge under a caller-chosen meta id.
///
/// Rehydration goes through here so meta stations keep the ids their
/// group settings were recorded with.
pub fn merge_stations_with_id(
    graph: &mut TraceGraph,
    meta_id: &str,
    member_ids: &[String],
    name: &str,
    group_type: Option<GroupType>,
) -> EpitraceResult<()> {
    if member_ids.is_empty() {
        return Err(TopologyError::EmptyMergeSet.into());
    }
    if graph.contains_station(meta_id) || graph.contains_delivery(meta_id) {
        return Err(TopologyError::IdCollision {
            id: meta_id.to_owned(),
        }
        .into());
    }

    // Resolve and flatten the member set before touching anything.
    let mut dissolve: Vec<String> = Vec::new();
    let mut members: Vec<String> = Vec::new();
    for id in member_ids {
        let station = graph.station_by_id(id)?;
        if station.is_meta() {
            dissolve.push(station.id.clone());
            members.extend(station.contains.iter().cloned());
        } else {
            if station.contained {
                return Err(TopologyError::AlreadyContained { id: id.clone() }.into());
            }
            members.push(station.id.clone());
        }
    }
    let mut unique: FxHashSet<&str> = FxHashSet::default();
    for id in &members {
        if !unique.insert(id.as_str()) {
            return Err(TopologyError::DuplicateMember { id: id.clone() }.into());
        }
    }

    for id in &dissolve {
        expand_one(graph, id)?;
    }

    let mut meta = Station::new(meta_id);
    meta.name = (!name.is_empty()).then(|| name.to_owned());
    meta.group_type = group_type;
    meta.contains = members.clone();

    let mut all_positioned = true;
    let (mut lat_sum, mut lon_sum) = (0.0f64, 0.0f64);
    let mut all_invisible = true;
    for id in &members {
        let member = graph.station_by_id(id)?;
        meta.incoming.extend(member.incoming.iter().cloned());
        meta.outgoing.extend(member.outgoing.iter().cloned());
        meta.connections.extend(member.connections.iter().cloned());
        match (member.lat, member.lon) {
            (Some(lat), Some(lon)) => {
                lat_sum += lat;
                lon_sum += lon;
            }
            _ => all_positioned = false,
        }
        meta.outbreak |= member.outbreak;
        meta.cross_contamination |= member.cross_contamination;
        meta.kill_contamination |= member.kill_contamination;
        meta.selected |= member.selected;
        all_invisible &= member.invisible;
    }
    if all_positioned {
        let n = members.len() as f64;
        meta.lat = Some(lat_sum / n);
        meta.lon = Some(lon_sum / n);
    }
    meta.invisible = all_invisible;

    for id in &members {
        let member = graph.station_by_id_mut(id)?;
        member.contained = true;
        member.observed = ObservedType::None;
    }
    let member_set: FxHashSet<&str> = members.iter().map(String::as_str).collect();
    for delivery in graph.deliveries_mut() {
        if member_set.contains(delivery.source.as_str()) {
            delivery.source = meta_id.to_owned();
        }
        if member_set.contains(delivery.target.as_str()) {
            delivery.target = meta_id.to_owned();
        }
    }
    graph.insert_station(meta)?;

    info!(meta = %meta_id, members = members.len(), "merged stations");
    Ok(())
}

/// Dissolve the given meta stations, restoring their members. Repeated
/// ids are expanded once.
pub fn expand_stations(graph: &mut TraceGraph, meta_ids: &[String]) -> EpitraceResult<()> {
    let mut unique: FxHashSet<&str> = FxHashSet::default();
    let mut order: Vec<&str> = Vec::new();
    for id in meta_ids {
        let station = graph.station_by_id(id)?;
        if !station.is_meta() {
            return Err(TopologyError::NotAMetaStation { id: id.clone() }.into());
        }
        if unique.insert(id.as_str()) {
            order.push(id.as_str());
        }
    }
    let order: Vec<String> = order.into_iter().map(str::to_owned).collect();
    for id in &order {
        expand_one(graph, id)?;
    }
    Ok(())
}

/// Remove one meta station and restore its members' state.
///
/// Members keep their own `connections` lists untouched, so the lot
/// partition survives a merge/expand round trip on its own.
fn expand_one(graph: &mut TraceGraph, meta_id: &str) -> EpitraceResult<()> {
    let members = graph.station_by_id(meta_id)?.contains.clone();
    for id in &members {
        graph.station_by_id_mut(id)?.contained = false;
    }
    for delivery in graph.deliveries_mut() {
        if delivery.source == meta_id {
            delivery.source = delivery.original_source.clone();
        }
        if delivery.target == meta_id {
            delivery.target = delivery.original_target.clone();
        }
    }
    graph.remove_station(meta_id)?;
    debug!(meta = %meta_id, members = members.len(), "expanded meta station");
    Ok(())
}

#[cfg(test)]
mod tests {
    use epitrace_core::model::Delivery;

    use super::*;

    /// A -> d1 -> B -> d2 -> C.
    fn chain() -> TraceGraph {
        let stations = vec![Station::new("A"), Station::new("B"), Station::new("C")];
        let deliveries = vec![Delivery::new("d1", "A", "B"), Delivery::new("d2", "B", "C")];
        let mut graph = TraceGraph::new();
        graph.load(stations, deliveries).unwrap();
        graph
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn merge_rewrites_endpoints_and_contains_members() {
        let mut graph = chain();
        let meta_id = merge_stations(&mut graph, &ids(&["B", "C"]), "BC", None).unwrap();

        assert!(graph.station_by_id("B").unwrap().contained);
        assert!(graph.station_by_id("C").unwrap().contained);
        let meta = graph.station_by_id(&meta_id).unwrap();
        assert_eq!(meta.contains, ids(&["B", "C"]));
        assert_eq!(meta.name.as_deref(), Some("BC"));
        assert_eq!(meta.incoming, ids(&["d1", "d2"]));
        assert_eq!(meta.outgoing, ids(&["d2"]));
        assert_eq!(graph.delivery_by_id("d1").unwrap().target, meta_id);
        assert_eq!(graph.delivery_by_id("d2").unwrap().source, meta_id);
        assert_eq!(graph.delivery_by_id("d2").unwrap().target, meta_id);
        assert_eq!(graph.delivery_by_id("d1").unwrap().original_target, "B");
        graph.validate().unwrap();
    }

    #[test]
    fn expand_round_trips_to_the_pre_merge_graph() {
        let mut graph = chain();
        let meta_id = merge_stations(&mut graph, &ids(&["B", "C"]), "BC", None).unwrap();
        expand_stations(&mut graph, &[meta_id.clone()]).unwrap();

        assert!(!graph.contains_station(&meta_id));
        assert!(!graph.station_by_id("B").unwrap().contained);
        assert!(!graph.station_by_id("C").unwrap().contained);
        assert_eq!(graph.delivery_by_id("d1").unwrap().target, "B");
        assert_eq!(graph.delivery_by_id("d2").unwrap().source, "B");
        assert_eq!(graph.delivery_by_id("d2").unwrap().target, "C");
        graph.validate().unwrap();
    }

    #[test]
    fn merging_a_meta_member_dissolves_it_flat() {
        let mut graph = chain();
        let first = merge_stations(&mut graph, &ids(&["A", "B"]), "AB", None).unwrap();
        let second = merge_stations(&mut graph, &[first.clone(), "C".to_owned()], "ABC", None)
            .unwrap();

        assert!(!graph.contains_station(&first));
        let meta = graph.station_by_id(&second).unwrap();
        assert_eq!(meta.contains, ids(&["A", "B", "C"]));
        assert_eq!(graph.delivery_by_id("d1").unwrap().source, second);
        assert_eq!(graph.delivery_by_id("d2").unwrap().target, second);
        graph.validate().unwrap();
    }

    #[test]
    fn centroid_needs_every_member_positioned() {
        let mut graph = chain();
        {
            let b = graph.station_by_id_mut("B").unwrap();
            b.lat = Some(50.0);
            b.lon = Some(8.0);
        }
        {
            let c = graph.station_by_id_mut("C").unwrap();
            c.lat = Some(52.0);
            c.lon = Some(10.0);
        }
        let meta_id = merge_stations(&mut graph, &ids(&["B", "C"]), "", None).unwrap();
        let meta = graph.station_by_id(&meta_id).unwrap();
        assert_eq!(meta.lat, Some(51.0));
        assert_eq!(meta.lon, Some(9.0));
        assert_eq!(meta.name, None);

        expand_stations(&mut graph, &[meta_id]).unwrap();
        graph.station_by_id_mut("C").unwrap().lat = None;
        let meta_id = merge_stations(&mut graph, &ids(&["B", "C"]), "", None).unwrap();
        let meta = graph.station_by_id(&meta_id).unwrap();
        assert_eq!(meta.lat, None);
        assert_eq!(meta.lon, None);
    }

    #[test]
    fn merge_aggregates_flags_and_clears_observed() {
        let mut graph = chain();
        {
            let b = graph.station_by_id_mut("B").unwrap();
            b.outbreak = true;
            b.observed = ObservedType::Full;
            b.invisible = true;
        }
        graph.station_by_id_mut("C").unwrap().cross_contamination = true;

        let meta_id = merge_stations(&mut graph, &ids(&["B", "C"]), "BC", None).unwrap();
        let meta = graph.station_by_id(&meta_id).unwrap();
        assert!(meta.outbreak);
        assert!(meta.cross_contamination);
        assert!(!meta.invisible, "one visible member keeps the meta visible");
        assert_eq!(graph.station_by_id("B").unwrap().observed, ObservedType::None);
    }

    #[test]
    fn failed_merge_leaves_the_graph_untouched() {
        let mut graph = chain();
        merge_stations(&mut graph, &ids(&["B", "C"]), "BC", None).unwrap();

        // C is contained now; merging it again must fail atomically.
        let err = merge_stations(&mut graph, &ids(&["A", "C"]), "AC", None);
        assert!(err.is_err());
        assert!(!graph.station_by_id("A").unwrap().contained);
        assert_eq!(graph.delivery_by_id("d1").unwrap().source, "A");
        graph.validate().unwrap();
    }

    #[test]
    fn merge_rejects_duplicates_and_empty_sets() {
        let mut graph = chain();
        assert!(merge_stations(&mut graph, &[], "x", None).is_err());
        assert!(merge_stations(&mut graph, &ids(&["B", "B"]), "x", None).is_err());
        assert!(merge_stations(&mut graph, &ids(&["B", "missing"]), "x", None).is_err());
        graph.validate().unwrap();
    }

    #[test]
    fn expand_rejects_plain_stations() {
        let mut graph = chain();
        assert!(expand_stations(&mut graph, &ids(&["B"])).is_err());
    }

    #[test]
    fn merge_keeps_group_type() {
        let mut graph = chain();
        let meta_id = merge_stations(
            &mut graph,
            &ids(&["A", "B"]),
            "sources",
            Some(GroupType::SourceGroup),
        )
        .unwrap();
        assert_eq!(
            graph.station_by_id(&meta_id).unwrap().group_type,
            Some(GroupType::SourceGroup)
        );
    }
}
