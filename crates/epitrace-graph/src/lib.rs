//! epitrace-graph: Supply chain trace graph engine
//!
//! This crate provides the in-memory tracing core for Epitrace:
//! - Store: Arena-backed station/delivery graph with id indices
//! - Trace: Forward/backward reachability over lot-level connections
//! - Scoring: Per-outbreak-source spread scores and common links
//! - Topology: Station merge/expand and grouping heuristics
//! - Visibility: Selection, invisibility, and contamination flags
//! - Engine: Per-dataset facade keeping trace and scores consistent

pub mod engine;
pub mod scoring;
pub mod store;
pub mod topology;
pub mod trace;
pub mod visibility;

// Re-exports for convenience
pub use engine::TracingEngine;
pub use store::{DeliveryHandle, StationHandle, TraceGraph};
pub use topology::GroupProposal;
pub use trace::{FocusElement, TraceFocus};
