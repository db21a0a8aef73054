//! Graph store: arenas, handles, and id indices.

mod graph;
mod handles;

pub use graph::TraceGraph;
pub use handles::{DeliveryHandle, StationHandle};
