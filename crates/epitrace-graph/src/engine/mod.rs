//! The per-dataset tracing engine.
//!
//! One `TracingEngine` per loaded dataset; there is no ambient state.
//! Every mutating operation re-derives the active trace and the
//! outbreak scores before returning, so the derived flags read by the
//! rendering side are never stale. The engine is single-threaded;
//! hosts with concurrent callers should serialize access behind one
//! lock rather than attempt finer-grained sharing.

use epitrace_core::errors::{EpitraceResult, SettingsError};
use epitrace_core::model::{
    DataSet, Delivery, DeliveryTracingSettings, GroupMode, GroupSetting, GroupType, Station,
    StationTracingSettings, TraceDirection, TracingSettings,
};
use tracing::{debug, info};

use crate::scoring;
use crate::store::TraceGraph;
use crate::topology::{self, GroupProposal};
use crate::trace::{self, FocusElement, TraceFocus};
use crate::visibility;

/// Trace graph engine holding one dataset session.
#[derive(Debug, Default)]
pub struct TracingEngine {
    graph: TraceGraph,
    focus: Option<TraceFocus>,
    max_score: f64,
}

impl TracingEngine {
    /// Create an engine with an empty graph.
    pub fn new() -> Self {
        Self {
            graph: TraceGraph::new(),
            focus: None,
            max_score: 0.0,
        }
    }

    /// Create an engine from a dataset.
    pub fn from_dataset(dataset: DataSet) -> EpitraceResult<Self> {
        let mut engine = Self::new();
        engine.load(dataset)?;
        Ok(engine)
    }

    /// Replace the session with the given dataset.
    ///
    /// Applies group settings in order through the merge machinery,
    /// restores tracing flags and the focused trace, and recomputes
    /// scores once. On any error the engine is left empty rather than
    /// half-loaded.
    pub fn load(&mut self, dataset: DataSet) -> EpitraceResult<()> {
        if let Err(error) = self.load_dataset(dataset) {
            self.graph = TraceGraph::new();
            self.focus = None;
            self.max_score = 0.0;
            return Err(error);
        }
        Ok(())
    }

    fn load_dataset(&mut self, dataset: DataSet) -> EpitraceResult<()> {
        self.focus = None;
        self.max_score = 0.0;
        self.graph.load(dataset.stations, dataset.deliveries)?;

        for setting in &dataset.group_settings {
            for member in &setting.members {
                if !self.graph.contains_station(member) {
                    return Err(SettingsError::UnknownStation {
                        group: setting.id.clone(),
                        station: member.clone(),
                    }
                    .into());
                }
            }
            topology::merge_stations_with_id(
                &mut self.graph,
                &setting.id,
                &setting.members,
                &setting.name,
                setting.group_type,
            )?;
        }

        self.apply_tracing_settings(&dataset.tracing_settings)?;
        self.update_trace()?;
        self.recompute_scores();

        info!(
            stations = self.graph.station_count(),
            deliveries = self.graph.delivery_count(),
            focused = self.focus.is_some(),
            "dataset loaded"
        );
        Ok(())
    }

    fn apply_tracing_settings(&mut self, settings: &TracingSettings) -> EpitraceResult<()> {
        let mut focus: Option<TraceFocus> = None;
        for entry in &settings.stations {
            let handle = self.graph.find_station(&entry.id).ok_or_else(|| {
                SettingsError::UnknownTracedStation {
                    id: entry.id.clone(),
                }
            })?;
            let station = self.graph.station_mut(handle);
            station.outbreak = entry.outbreak;
            station.cross_contamination = entry.cross_contamination;
            station.kill_contamination = entry.kill_contamination;
            if let Some(direction) = entry.observed.direction() {
                if let Some(existing) = &focus {
                    return Err(SettingsError::MultipleObserved {
                        first: existing.id().to_owned(),
                        second: entry.id.clone(),
                    }
                    .into());
                }
                focus = Some(TraceFocus::station(entry.id.clone(), direction));
            }
        }
        for entry in &settings.deliveries {
            if !self.graph.contains_delivery(&entry.id) {
                return Err(SettingsError::UnknownTracedDelivery {
                    id: entry.id.clone(),
                }
                .into());
            }
            if let Some(direction) = entry.observed.direction() {
                if let Some(existing) = &focus {
                    return Err(SettingsError::MultipleObserved {
                        first: existing.id().to_owned(),
                        second: entry.id.clone(),
                    }
                    .into());
                }
                focus = Some(TraceFocus::delivery(entry.id.clone(), direction));
            }
        }
        self.focus = focus;
        Ok(())
    }

    /// Snapshot the session as a dataset that reloads to the same state.
    ///
    /// Meta stations are reduced to group settings and member records
    /// are exported visible; delivery endpoints are the pre-merge
    /// originals. Tracing flags and the focused trace go into the
    /// tracing settings.
    pub fn to_dataset(&self) -> DataSet {
        let mut stations = Vec::new();
        let mut group_settings = Vec::new();
        for station in self.graph.stations() {
            if station.is_meta() {
                group_settings.push(GroupSetting {
                    id: station.id.clone(),
                    name: station.name.clone().unwrap_or_default(),
                    group_type: station.group_type,
                    members: station.contains.clone(),
                });
                continue;
            }
            let mut record = station.clone();
            record.contained = false;
            stations.push(record);
        }

        let deliveries: Vec<Delivery> = self
            .graph
            .deliveries()
            .map(|delivery| {
                let mut record = delivery.clone();
                record.source = record.original_source.clone();
                record.target = record.original_target.clone();
                record
            })
            .collect();

        let mut tracing_settings = TracingSettings::default();
        for station in self.graph.stations() {
            if station.outbreak
                || station.cross_contamination
                || station.kill_contamination
                || station.observed.is_observed()
            {
                tracing_settings.stations.push(StationTracingSettings {
                    id: station.id.clone(),
                    outbreak: station.outbreak,
                    cross_contamination: station.cross_contamination,
                    kill_contamination: station.kill_contamination,
                    observed: station.observed,
                });
            }
        }
        for delivery in self.graph.deliveries() {
            if delivery.observed.is_observed() {
                tracing_settings.deliveries.push(DeliveryTracingSettings {
                    id: delivery.id.clone(),
                    observed: delivery.observed,
                });
            }
        }

        DataSet {
            stations,
            deliveries,
            group_settings,
            tracing_settings,
        }
    }

    /// Focus a trace on a station, replacing any active trace.
    pub fn trace_station(&mut self, id: &str, direction: TraceDirection) -> EpitraceResult<()> {
        let took = trace::trace_station(&mut self.graph, id, direction)?;
        self.focus = took.then(|| TraceFocus::station(id, direction));
        Ok(())
    }

    /// Focus a trace on a delivery, replacing any active trace.
    pub fn trace_delivery(&mut self, id: &str, direction: TraceDirection) -> EpitraceResult<()> {
        let took = trace::trace_delivery(&mut self.graph, id, direction)?;
        self.focus = took.then(|| TraceFocus::delivery(id, direction));
        Ok(())
    }

    /// Drop the active trace and its markers.
    pub fn clear_trace(&mut self) {
        trace::clear(&mut self.graph);
        self.focus = None;
    }

    /// Re-derive the active trace against the current graph.
    ///
    /// A focus whose element was merged away, hidden, or contained in
    /// the meantime resolves to a cleared trace, not an error.
    pub fn update_trace(&mut self) -> EpitraceResult<()> {
        let focus = match self.focus.clone() {
            Some(focus) => focus,
            None => {
                trace::clear(&mut self.graph);
                return Ok(());
            }
        };
        let took = match &focus.element {
            FocusElement::Station(id) => {
                if !self.graph.contains_station(id) {
                    debug!(station = %id, "focused station no longer exists; trace cleared");
                    trace::clear(&mut self.graph);
                    self.focus = None;
                    return Ok(());
                }
                trace::trace_station(&mut self.graph, id, focus.direction)?
            }
            FocusElement::Delivery(id) => {
                if !self.graph.contains_delivery(id) {
                    debug!(delivery = %id, "focused delivery no longer exists; trace cleared");
                    trace::clear(&mut self.graph);
                    self.focus = None;
                    return Ok(());
                }
                trace::trace_delivery(&mut self.graph, id, focus.direction)?
            }
        };
        if !took {
            self.focus = None;
        }
        Ok(())
    }

    /// Recompute all outbreak scores; returns the maximum station score.
    pub fn recompute_scores(&mut self) -> f64 {
        self.max_score = scoring::recompute(&mut self.graph);
        self.max_score
    }

    /// Maximum station score of the last recompute.
    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Merge stations into a new meta station and return its id.
    pub fn merge_stations(
        &mut self,
        member_ids: &[String],
        name: &str,
        group_type: Option<GroupType>,
    ) -> EpitraceResult<String> {
        let meta_id = topology::merge_stations(&mut self.graph, member_ids, name, group_type)?;
        self.refresh()?;
        Ok(meta_id)
    }

    /// Dissolve the given meta stations.
    pub fn expand_stations(&mut self, meta_ids: &[String]) -> EpitraceResult<()> {
        topology::expand_stations(&mut self.graph, meta_ids)?;
        self.refresh()
    }

    /// Propose merges of pure source stations sharing a target and key.
    pub fn group_source_stations(
        &self,
        mode: GroupMode,
        previous: &[GroupSetting],
    ) -> Vec<GroupProposal> {
        topology::group_source_stations(&self.graph, mode, previous)
    }

    /// Propose merges of pure sink stations sharing a source and key.
    pub fn group_target_stations(
        &self,
        mode: GroupMode,
        previous: &[GroupSetting],
    ) -> Vec<GroupProposal> {
        topology::group_target_stations(&self.graph, mode, previous)
    }

    /// Propose maximal degree-one station runs.
    pub fn find_simple_chains(&self) -> Vec<GroupProposal> {
        topology::find_simple_chains(&self.graph)
    }

    /// Propose outbreak-free weakly connected components.
    pub fn find_isolated_clouds(&self) -> Vec<GroupProposal> {
        topology::find_isolated_clouds(&self.graph)
    }

    /// Select or deselect a station or delivery. Selection never
    /// affects reachability, so no recompute happens.
    pub fn set_selected(&mut self, id: &str, selected: bool) -> EpitraceResult<()> {
        visibility::set_selected(&mut self.graph, id, selected)
    }

    /// Hide stations and their incident deliveries.
    pub fn make_stations_invisible(&mut self, ids: &[String]) -> EpitraceResult<()> {
        visibility::make_stations_invisible(&mut self.graph, ids)?;
        self.refresh()
    }

    /// Restore visibility everywhere.
    pub fn clear_invisibility(&mut self) -> EpitraceResult<()> {
        visibility::clear_invisibility(&mut self.graph);
        self.refresh()
    }

    /// Mark or unmark outbreak sources.
    pub fn mark_stations_as_outbreak(
        &mut self,
        ids: &[String],
        outbreak: bool,
    ) -> EpitraceResult<()> {
        visibility::mark_stations_as_outbreak(&mut self.graph, ids, outbreak)?;
        self.refresh()
    }

    /// Set the cross-contamination flag on stations.
    pub fn set_cross_contamination_of_stations(
        &mut self,
        ids: &[String],
        cross_contamination: bool,
    ) -> EpitraceResult<()> {
        visibility::set_cross_contamination_of_stations(&mut self.graph, ids, cross_contamination)?;
        self.refresh()
    }

    /// Set the kill-contamination flag on stations.
    pub fn set_kill_contamination_of_stations(
        &mut self,
        ids: &[String],
        kill_contamination: bool,
    ) -> EpitraceResult<()> {
        visibility::set_kill_contamination_of_stations(&mut self.graph, ids, kill_contamination)?;
        self.refresh()
    }

    /// The underlying graph, for rendering and inspection.
    pub fn graph(&self) -> &TraceGraph {
        &self.graph
    }

    /// The active trace focus, if one took.
    pub fn focus(&self) -> Option<&TraceFocus> {
        self.focus.as_ref()
    }

    /// Station record by id.
    pub fn station(&self, id: &str) -> EpitraceResult<&Station> {
        self.graph.station_by_id(id)
    }

    /// Delivery record by id.
    pub fn delivery(&self, id: &str) -> EpitraceResult<&Delivery> {
        self.graph.delivery_by_id(id)
    }

    fn refresh(&mut self) -> EpitraceResult<()> {
        self.update_trace()?;
        self.recompute_scores();
        Ok(())
    }
}
