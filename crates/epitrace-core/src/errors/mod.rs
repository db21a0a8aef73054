//! Error taxonomy for the tracing engine.
//!
//! Two classes of failure exist: an operation referenced an id absent from
//! the store (a caller error, ids are pre-validated by the importer), and a
//! mutation would violate a structural invariant (merging an already
//! contained station, expanding a non-meta). Both abort the operation
//! before any state is committed.

mod graph_error;
mod settings_error;
mod topology_error;

pub use graph_error::GraphError;
pub use settings_error::SettingsError;
pub use topology_error::TopologyError;

/// Umbrella error for every public engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EpitraceError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result alias used across the workspace.
pub type EpitraceResult<T> = Result<T, EpitraceError>;
