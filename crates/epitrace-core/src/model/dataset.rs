//! Dataset and settings records handed over by the import collaborator.

use serde::{Deserialize, Serialize};

use super::base::{GroupType, ObservedType};
use super::delivery::Delivery;
use super::station::Station;

/// A complete dataset: the raw graph plus settings that rehydrate a
/// previously merged and scored session without re-deriving it.
///
/// The importer guarantees well-formed records (unique ids, existing
/// endpoints); the delivery endpoints are pre-merge, with any merges
/// re-applied from `group_settings` on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(default)]
    pub deliveries: Vec<Delivery>,
    /// Prior meta station definitions, applied in order on load.
    #[serde(default)]
    pub group_settings: Vec<GroupSetting>,
    /// Prior per-element tracing flags and the focused trace, if any.
    #[serde(default)]
    pub tracing_settings: TracingSettings,
}

/// A prior meta station, replayed through the merge machinery with its
/// original id so external references stay valid across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSetting {
    /// Meta station id to recreate.
    pub id: String,
    /// Display name of the meta station.
    #[serde(default)]
    pub name: String,
    /// How the group was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<GroupType>,
    /// Member station ids.
    pub members: Vec<String>,
}

/// Prior tracing flags per element id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracingSettings {
    #[serde(default)]
    pub stations: Vec<StationTracingSettings>,
    #[serde(default)]
    pub deliveries: Vec<DeliveryTracingSettings>,
}

/// Saved tracing flags of one station. At most one element graph-wide may
/// carry a non-`None` `observed` marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationTracingSettings {
    pub id: String,
    #[serde(default)]
    pub outbreak: bool,
    #[serde(default)]
    pub cross_contamination: bool,
    #[serde(default)]
    pub kill_contamination: bool,
    #[serde(default)]
    pub observed: ObservedType,
}

/// Saved tracing flags of one delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTracingSettings {
    pub id: String,
    #[serde(default)]
    pub observed: ObservedType,
}
