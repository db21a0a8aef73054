//! Data model of the trace graph: stations, deliveries, and the dataset
//! contract shared with the import and rendering collaborators.

mod base;
mod dataset;
mod delivery;
mod station;

pub use base::{DeliveryRelation, GroupMode, GroupType, ObservedType, TraceDirection};
pub use dataset::{
    DataSet, DeliveryTracingSettings, GroupSetting, StationTracingSettings, TracingSettings,
};
pub use delivery::Delivery;
pub use station::Station;
