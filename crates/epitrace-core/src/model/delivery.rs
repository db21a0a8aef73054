//! Delivery records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base::ObservedType;

/// A directed edge representing a shipment between two stations.
///
/// `source`/`target` are the current endpoints and may be rewritten while
/// a merge is in effect; `original_source`/`original_target` always hold
/// the pre-merge endpoints and never change after load. Expanding a meta
/// station restores the current endpoints from the originals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// Unique id.
    pub id: String,
    /// Current source station id.
    pub source: String,
    /// Current target station id.
    pub target: String,
    /// Pre-merge source station id, fixed at load.
    #[serde(default)]
    pub original_source: String,
    /// Pre-merge target station id, fixed at load.
    #[serde(default)]
    pub original_target: String,
    /// Shipment date, used for temporal cross-contamination gating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Lot identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot: Option<String>,
    /// Hidden from traversal, scoring, and rendering.
    #[serde(default)]
    pub invisible: bool,
    /// UI selection flag.
    #[serde(default)]
    pub selected: bool,
    /// Focus marker of the active trace.
    #[serde(default)]
    pub observed: ObservedType,
    /// On a downstream path of the active trace focus.
    #[serde(default)]
    pub forward: bool,
    /// On an upstream path of the active trace focus.
    #[serde(default)]
    pub backward: bool,
    /// Entered the active trace through date-gated widening rather than
    /// an explicit connection.
    #[serde(default)]
    pub cross_contamination: bool,
    /// Fraction of outbreak sources that reach this delivery.
    #[serde(default)]
    pub score: f64,
    /// Reached by every marked outbreak source.
    #[serde(default)]
    pub common_link: bool,
    /// Free-form importer properties, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Delivery {
    /// Create a delivery between two stations with all flags at rest.
    /// The original endpoints are fixed to the given ones.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: id.into(),
            original_source: source.clone(),
            original_target: target.clone(),
            source,
            target,
            date: None,
            name: None,
            lot: None,
            invisible: false,
            selected: false,
            observed: ObservedType::None,
            forward: false,
            backward: false,
            cross_contamination: false,
            score: 0.0,
            common_link: false,
            properties: Map::new(),
        }
    }

    /// Shorthand for setting the shipment date during construction.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}
