//! # epitrace-core
//!
//! Foundation crate for the epitrace supply-chain tracing engine.
//! Defines the station/delivery data model, dataset and settings records,
//! the error taxonomy, shared collections, and logging setup.
//! The graph engine crate depends on this.

pub mod collections;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod model;

// Re-export the most commonly used types at the crate root.
pub use errors::{EpitraceError, EpitraceResult, GraphError, SettingsError, TopologyError};
pub use model::{
    DataSet, Delivery, DeliveryRelation, GroupMode, GroupSetting, GroupType, ObservedType,
    Station, TraceDirection, TracingSettings,
};
