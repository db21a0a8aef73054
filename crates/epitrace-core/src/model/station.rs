//! Station records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::{DeliveryRelation, GroupType, ObservedType};

/// A node in the supply chain (producer, processor, retailer), or a
/// synthetic meta station representing a merged group of members.
///
/// `incoming`/`outgoing` are rebuilt from the delivery records on load;
/// they are treated as derived data on input. The trace flags (`observed`,
/// `forward`, `backward`) and the score fields are engine-owned and
/// recomputed, never set by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Unique id.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Latitude, if geocoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude, if geocoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Ids of deliveries arriving here.
    #[serde(default)]
    pub incoming: Vec<String>,
    /// Ids of deliveries departing here.
    #[serde(default)]
    pub outgoing: Vec<String>,
    /// Lot-level links between incoming and outgoing deliveries.
    #[serde(default)]
    pub connections: Vec<DeliveryRelation>,
    /// Hidden from traversal, scoring, and rendering.
    #[serde(default)]
    pub invisible: bool,
    /// True while absorbed into a meta station.
    #[serde(default)]
    pub contained: bool,
    /// Member ids if this is a meta station, else empty.
    #[serde(default)]
    pub contains: Vec<String>,
    /// How this meta station was grouped, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<GroupType>,
    /// UI selection flag.
    #[serde(default)]
    pub selected: bool,
    /// Focus marker of the active trace.
    #[serde(default)]
    pub observed: ObservedType,
    /// Reached downstream of the active trace focus.
    #[serde(default)]
    pub forward: bool,
    /// Reached upstream of the active trace focus.
    #[serde(default)]
    pub backward: bool,
    /// Confirmed contamination source marker.
    #[serde(default)]
    pub outbreak: bool,
    /// Treat all outgoing/incoming deliveries as contaminated regardless
    /// of explicit connections, gated by delivery dates.
    #[serde(default)]
    pub cross_contamination: bool,
    /// Contamination is eliminated here; propagation marks this station
    /// but never continues through it.
    #[serde(default)]
    pub kill_contamination: bool,
    /// Fraction of outbreak sources that reach this station.
    #[serde(default)]
    pub score: f64,
    /// Reached by every marked outbreak source.
    #[serde(default)]
    pub common_link: bool,
    /// Free-form importer properties, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Station {
    /// Create a bare station with the given id and all flags at rest.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            lat: None,
            lon: None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            connections: Vec::new(),
            invisible: false,
            contained: false,
            contains: Vec::new(),
            group_type: None,
            selected: false,
            observed: ObservedType::None,
            forward: false,
            backward: false,
            outbreak: false,
            cross_contamination: false,
            kill_contamination: false,
            score: 0.0,
            common_link: false,
            properties: Map::new(),
        }
    }

    /// Whether this station is a merged group of members.
    pub fn is_meta(&self) -> bool {
        !self.contains.is_empty()
    }

    /// Whether traversal and scoring may pass through or mark this station.
    pub fn is_traceable(&self) -> bool {
        !self.invisible && !self.contained
    }
}
