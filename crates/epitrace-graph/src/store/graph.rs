//! The canonical station/delivery store.
//!
//! Records live in two arenas indexed by dense handles, with side id maps
//! for cross-operation lookup. Merge and expand rewrite endpoints in
//! place, so removal uses `swap_remove` with an index fixup instead of
//! tombstones.

use epitrace_core::collections::{FxHashMap, FxHashSet};
use epitrace_core::constants::{DELIVERY_ARENA_CAPACITY, META_ID_PREFIX, STATION_ARENA_CAPACITY};
use epitrace_core::errors::{EpitraceResult, GraphError};
use epitrace_core::model::{Delivery, ObservedType, Station};
use tracing::debug;

use super::handles::{DeliveryHandle, StationHandle};

/// In-memory trace graph with id-based lookup indices.
///
/// A load replaces all state wholesale. Input records carry pre-merge
/// endpoints; prior merges are re-applied from group settings by the
/// engine, never encoded directly in the records.
#[derive(Debug, Default)]
pub struct TraceGraph {
    stations: Vec<Station>,
    deliveries: Vec<Delivery>,
    station_index: FxHashMap<String, StationHandle>,
    delivery_index: FxHashMap<String, DeliveryHandle>,
    next_meta_seq: u64,
}

impl TraceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            stations: Vec::with_capacity(STATION_ARENA_CAPACITY),
            deliveries: Vec::with_capacity(DELIVERY_ARENA_CAPACITY),
            station_index: FxHashMap::default(),
            delivery_index: FxHashMap::default(),
            next_meta_seq: 0,
        }
    }

    /// Replace all state with the given records and rebuild the id
    /// indices in O(n).
    ///
    /// Validates unique ids, existing endpoints, no pre-encoded
    /// containment, and connection incidence. Adjacency lists are
    /// rebuilt from the delivery records; derived trace and score
    /// fields are reset. On error the store is left empty.
    pub fn load(
        &mut self,
        mut stations: Vec<Station>,
        mut deliveries: Vec<Delivery>,
    ) -> EpitraceResult<()> {
        self.stations = Vec::new();
        self.deliveries = Vec::new();
        self.station_index = FxHashMap::default();
        self.delivery_index = FxHashMap::default();
        self.next_meta_seq = 0;

        let mut station_index =
            FxHashMap::with_capacity_and_hasher(stations.len(), Default::default());
        let mut delivery_index =
            FxHashMap::with_capacity_and_hasher(deliveries.len(), Default::default());

        for (i, station) in stations.iter().enumerate() {
            if station.contained || station.is_meta() {
                return Err(GraphError::Inconsistency {
                    details: format!(
                        "station {} carries merged state; merges must be rehydrated through group settings",
                        station.id
                    ),
                }
                .into());
            }
            if station_index
                .insert(station.id.clone(), StationHandle::new(i))
                .is_some()
            {
                return Err(GraphError::DuplicateStation {
                    id: station.id.clone(),
                }
                .into());
            }
        }

        for (i, delivery) in deliveries.iter().enumerate() {
            if delivery_index
                .insert(delivery.id.clone(), DeliveryHandle::new(i))
                .is_some()
            {
                return Err(GraphError::DuplicateDelivery {
                    id: delivery.id.clone(),
                }
                .into());
            }
            if !station_index.contains_key(delivery.source.as_str()) {
                return Err(GraphError::DanglingEndpoint {
                    delivery: delivery.id.clone(),
                    station: delivery.source.clone(),
                }
                .into());
            }
            if !station_index.contains_key(delivery.target.as_str()) {
                return Err(GraphError::DanglingEndpoint {
                    delivery: delivery.id.clone(),
                    station: delivery.target.clone(),
                }
                .into());
            }
        }

        // Reset engine-owned fields and rebuild adjacency from deliveries;
        // importer-supplied lists are treated as derived data.
        for station in stations.iter_mut() {
            station.incoming.clear();
            station.outgoing.clear();
            station.observed = ObservedType::None;
            station.forward = false;
            station.backward = false;
            station.score = 0.0;
            station.common_link = false;
        }
        for delivery in deliveries.iter_mut() {
            delivery.original_source = delivery.source.clone();
            delivery.original_target = delivery.target.clone();
            delivery.observed = ObservedType::None;
            delivery.forward = false;
            delivery.backward = false;
            delivery.cross_contamination = false;
            delivery.score = 0.0;
            delivery.common_link = false;
        }
        for delivery in deliveries.iter() {
            let source = station_index[delivery.source.as_str()];
            stations[source.index()].outgoing.push(delivery.id.clone());
            let target = station_index[delivery.target.as_str()];
            stations[target.index()].incoming.push(delivery.id.clone());
        }

        for station in stations.iter() {
            let incoming: FxHashSet<&str> =
                station.incoming.iter().map(String::as_str).collect();
            let outgoing: FxHashSet<&str> =
                station.outgoing.iter().map(String::as_str).collect();
            for relation in &station.connections {
                if !incoming.contains(relation.source.as_str()) {
                    return Err(GraphError::InvalidConnection {
                        station: station.id.clone(),
                        delivery: relation.source.clone(),
                    }
                    .into());
                }
                if !outgoing.contains(relation.target.as_str()) {
                    return Err(GraphError::InvalidConnection {
                        station: station.id.clone(),
                        delivery: relation.target.clone(),
                    }
                    .into());
                }
            }
        }

        let mut next_meta_seq = 0;
        for id in stations
            .iter()
            .map(|s| s.id.as_str())
            .chain(deliveries.iter().map(|d| d.id.as_str()))
        {
            next_meta_seq = next_meta_seq.max(meta_seed_from(id));
        }

        debug!(
            stations = stations.len(),
            deliveries = deliveries.len(),
            "loaded graph store"
        );

        self.stations = stations;
        self.deliveries = deliveries;
        self.station_index = station_index;
        self.delivery_index = delivery_index;
        self.next_meta_seq = next_meta_seq;
        Ok(())
    }

    /// Allocate a meta station id unique across stations and deliveries.
    pub fn allocate_meta_id(&mut self) -> String {
        loop {
            let id = format!("{}{}", META_ID_PREFIX, self.next_meta_seq);
            self.next_meta_seq = self.next_meta_seq.saturating_add(1);
            if !self.contains_station(&id) && !self.contains_delivery(&id) {
                return id;
            }
        }
    }

    /// Insert a new station, failing on a duplicate id.
    pub fn insert_station(&mut self, station: Station) -> EpitraceResult<StationHandle> {
        if self.station_index.contains_key(&station.id) {
            return Err(GraphError::DuplicateStation { id: station.id }.into());
        }
        let handle = StationHandle::new(self.stations.len());
        self.station_index.insert(station.id.clone(), handle);
        // Keep the allocator ahead of explicitly supplied meta ids.
        let seed = meta_seed_from(&station.id);
        self.next_meta_seq = self.next_meta_seq.max(seed);
        self.stations.push(station);
        Ok(handle)
    }

    /// Remove a station and return its record. Invalidates handles.
    pub fn remove_station(&mut self, id: &str) -> EpitraceResult<Station> {
        let handle = self.station_handle(id)?;
        self.station_index.remove(id);
        let removed = self.stations.swap_remove(handle.index());
        if handle.index() < self.stations.len() {
            let moved_id = self.stations[handle.index()].id.clone();
            self.station_index.insert(moved_id, handle);
        }
        Ok(removed)
    }

    pub fn find_station(&self, id: &str) -> Option<StationHandle> {
        self.station_index.get(id).copied()
    }

    pub fn find_delivery(&self, id: &str) -> Option<DeliveryHandle> {
        self.delivery_index.get(id).copied()
    }

    /// Resolve a station id, failing with `NotFound` for unknown ids.
    pub fn station_handle(&self, id: &str) -> EpitraceResult<StationHandle> {
        self.find_station(id)
            .ok_or_else(|| GraphError::StationNotFound { id: id.to_string() }.into())
    }

    /// Resolve a delivery id, failing with `NotFound` for unknown ids.
    pub fn delivery_handle(&self, id: &str) -> EpitraceResult<DeliveryHandle> {
        self.find_delivery(id)
            .ok_or_else(|| GraphError::DeliveryNotFound { id: id.to_string() }.into())
    }

    pub fn station(&self, handle: StationHandle) -> &Station {
        &self.stations[handle.index()]
    }

    pub fn station_mut(&mut self, handle: StationHandle) -> &mut Station {
        &mut self.stations[handle.index()]
    }

    pub fn delivery(&self, handle: DeliveryHandle) -> &Delivery {
        &self.deliveries[handle.index()]
    }

    pub fn delivery_mut(&mut self, handle: DeliveryHandle) -> &mut Delivery {
        &mut self.deliveries[handle.index()]
    }

    pub fn station_by_id(&self, id: &str) -> EpitraceResult<&Station> {
        Ok(self.station(self.station_handle(id)?))
    }

    pub fn station_by_id_mut(&mut self, id: &str) -> EpitraceResult<&mut Station> {
        let handle = self.station_handle(id)?;
        Ok(self.station_mut(handle))
    }

    pub fn delivery_by_id(&self, id: &str) -> EpitraceResult<&Delivery> {
        Ok(self.delivery(self.delivery_handle(id)?))
    }

    pub fn delivery_by_id_mut(&mut self, id: &str) -> EpitraceResult<&mut Delivery> {
        let handle = self.delivery_handle(id)?;
        Ok(self.delivery_mut(handle))
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub fn deliveries(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter()
    }

    pub fn stations_mut(&mut self) -> impl Iterator<Item = &mut Station> {
        self.stations.iter_mut()
    }

    pub fn deliveries_mut(&mut self) -> impl Iterator<Item = &mut Delivery> {
        self.deliveries.iter_mut()
    }

    pub fn station_handles(&self) -> impl Iterator<Item = StationHandle> {
        (0..self.stations.len()).map(StationHandle::new)
    }

    pub fn delivery_handles(&self) -> impl Iterator<Item = DeliveryHandle> {
        (0..self.deliveries.len()).map(DeliveryHandle::new)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }

    pub fn contains_station(&self, id: &str) -> bool {
        self.station_index.contains_key(id)
    }

    pub fn contains_delivery(&self, id: &str) -> bool {
        self.delivery_index.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() && self.deliveries.is_empty()
    }

    /// Check every structural invariant of the graph.
    ///
    /// Used by tests and debug assertions after public operations;
    /// violations indicate an engine bug, not bad input.
    pub fn validate(&self) -> EpitraceResult<()> {
        for (i, station) in self.stations.iter().enumerate() {
            if self.station_index.get(&station.id).copied() != Some(StationHandle::new(i)) {
                return Err(inconsistency(format!(
                    "station index out of sync for {}",
                    station.id
                )));
            }
        }
        for (i, delivery) in self.deliveries.iter().enumerate() {
            if self.delivery_index.get(&delivery.id).copied() != Some(DeliveryHandle::new(i)) {
                return Err(inconsistency(format!(
                    "delivery index out of sync for {}",
                    delivery.id
                )));
            }
        }

        // Containment: contained iff listed in exactly one meta; metas are
        // never nested.
        let mut container: FxHashMap<&str, &str> = FxHashMap::default();
        for station in &self.stations {
            for member in &station.contains {
                if container.insert(member.as_str(), station.id.as_str()).is_some() {
                    return Err(inconsistency(format!(
                        "station {member} contained in more than one meta station"
                    )));
                }
            }
        }
        for station in &self.stations {
            if station.contained != container.contains_key(station.id.as_str()) {
                return Err(inconsistency(format!(
                    "containment flag out of sync for {}",
                    station.id
                )));
            }
            if station.is_meta() && station.contained {
                return Err(inconsistency(format!(
                    "meta station {} is itself contained",
                    station.id
                )));
            }
            for member in &station.contains {
                match self.find_station(member) {
                    Some(handle) => {
                        if self.station(handle).is_meta() {
                            return Err(inconsistency(format!(
                                "meta station {} contains another meta {member}",
                                station.id
                            )));
                        }
                    }
                    None => {
                        return Err(inconsistency(format!(
                            "meta station {} contains unknown member {member}",
                            station.id
                        )));
                    }
                }
            }
        }

        // Endpoints: both current and original stations exist; a rewritten
        // endpoint always points at the meta containing the original.
        for delivery in &self.deliveries {
            for endpoint in [
                &delivery.source,
                &delivery.target,
                &delivery.original_source,
                &delivery.original_target,
            ] {
                if !self.contains_station(endpoint) {
                    return Err(inconsistency(format!(
                        "delivery {} references unknown station {endpoint}",
                        delivery.id
                    )));
                }
            }
            for (current, original) in [
                (&delivery.source, &delivery.original_source),
                (&delivery.target, &delivery.original_target),
            ] {
                if current != original && container.get(original.as_str()) != Some(&current.as_str())
                {
                    return Err(inconsistency(format!(
                        "delivery {} endpoint {current} does not contain original {original}",
                        delivery.id
                    )));
                }
            }
        }

        // Adjacency: lists reference existing deliveries with matching
        // endpoints, and every delivery is listed at its endpoints.
        // Contained members keep their pre-merge lists frozen.
        for station in &self.stations {
            for id in &station.outgoing {
                let delivery = match self.find_delivery(id) {
                    Some(handle) => self.delivery(handle),
                    None => {
                        return Err(inconsistency(format!(
                            "station {} lists unknown outgoing delivery {id}",
                            station.id
                        )));
                    }
                };
                let expected = if station.contained {
                    &delivery.original_source
                } else {
                    &delivery.source
                };
                if *expected != station.id {
                    return Err(inconsistency(format!(
                        "delivery {id} listed as outgoing of {} but departs from {expected}",
                        station.id
                    )));
                }
            }
            for id in &station.incoming {
                let delivery = match self.find_delivery(id) {
                    Some(handle) => self.delivery(handle),
                    None => {
                        return Err(inconsistency(format!(
                            "station {} lists unknown incoming delivery {id}",
                            station.id
                        )));
                    }
                };
                let expected = if station.contained {
                    &delivery.original_target
                } else {
                    &delivery.target
                };
                if *expected != station.id {
                    return Err(inconsistency(format!(
                        "delivery {id} listed as incoming of {} but arrives at {expected}",
                        station.id
                    )));
                }
            }
            for relation in &station.connections {
                if !station.incoming.contains(&relation.source) {
                    return Err(inconsistency(format!(
                        "connection at {} references non-incoming delivery {}",
                        station.id, relation.source
                    )));
                }
                if !station.outgoing.contains(&relation.target) {
                    return Err(inconsistency(format!(
                        "connection at {} references non-outgoing delivery {}",
                        station.id, relation.target
                    )));
                }
            }
        }
        for delivery in &self.deliveries {
            let source = self.station_by_id(&delivery.source)?;
            if !source.outgoing.contains(&delivery.id) {
                return Err(inconsistency(format!(
                    "delivery {} missing from outgoing list of {}",
                    delivery.id, delivery.source
                )));
            }
            let target = self.station_by_id(&delivery.target)?;
            if !target.incoming.contains(&delivery.id) {
                return Err(inconsistency(format!(
                    "delivery {} missing from incoming list of {}",
                    delivery.id, delivery.target
                )));
            }
        }

        // A single focused trace at most.
        let observed: Vec<&str> = self
            .stations
            .iter()
            .filter(|s| s.observed.is_observed())
            .map(|s| s.id.as_str())
            .chain(
                self.deliveries
                    .iter()
                    .filter(|d| d.observed.is_observed())
                    .map(|d| d.id.as_str()),
            )
            .collect();
        if observed.len() > 1 {
            return Err(inconsistency(format!(
                "multiple observed elements: {observed:?}"
            )));
        }

        // Scores are normalized fractions.
        for (id, score) in self
            .stations
            .iter()
            .map(|s| (s.id.as_str(), s.score))
            .chain(self.deliveries.iter().map(|d| (d.id.as_str(), d.score)))
        {
            if !(0.0..=1.0).contains(&score) {
                return Err(inconsistency(format!(
                    "score out of range for {id}: {score}"
                )));
            }
        }

        Ok(())
    }
}

fn inconsistency(details: String) -> epitrace_core::errors::EpitraceError {
    GraphError::Inconsistency { details }.into()
}

/// Seed value the meta id allocator must stay ahead of for a given id.
fn meta_seed_from(id: &str) -> u64 {
    let digits = id.strip_prefix(META_ID_PREFIX).unwrap_or(id);
    match digits.parse::<u64>() {
        Ok(n) => n.saturating_add(1),
        Err(_) => 0,
    }
}
