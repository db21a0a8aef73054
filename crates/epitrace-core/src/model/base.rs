//! Shared enums and relation records of the trace graph model.

use serde::{Deserialize, Serialize};

/// The single currently-focused trace direction of an element,
/// used for UI highlighting. At most one element graph-wide carries
/// a non-`None` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservedType {
    #[default]
    None,
    Full,
    Forward,
    Backward,
}

impl ObservedType {
    /// Whether this element is the focus of the active trace.
    pub fn is_observed(self) -> bool {
        self != ObservedType::None
    }

    /// The trace direction a rehydrated `observed` marker restores, if any.
    pub fn direction(self) -> Option<TraceDirection> {
        match self {
            ObservedType::None => None,
            ObservedType::Forward => Some(TraceDirection::Forward),
            ObservedType::Backward => Some(TraceDirection::Backward),
            ObservedType::Full => Some(TraceDirection::Full),
        }
    }
}

/// Direction of a trace run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceDirection {
    Forward,
    Backward,
    Full,
}

impl TraceDirection {
    /// The `observed` marker a focal element receives for this direction.
    pub fn observed(self) -> ObservedType {
        match self {
            TraceDirection::Forward => ObservedType::Forward,
            TraceDirection::Backward => ObservedType::Backward,
            TraceDirection::Full => ObservedType::Full,
        }
    }
}

/// Kind of grouping a meta station was created by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupType {
    SimpleChain,
    SourceGroup,
    TargetGroup,
    IsolatedGroup,
}

/// Bucketing key used by source/target station grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    /// Bucket by the outbreak flag only.
    Outbreak,
    /// Bucket by outbreak flag and the set of shipped product names.
    OutbreakAndProduct,
    /// Bucket by outbreak flag and the set of shipped lots.
    OutbreakAndLot,
}

/// A recorded link between an incoming and an outgoing delivery at one
/// station, expressing lot-level provenance: exactly which incoming
/// delivery feeds which outgoing delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRelation {
    /// Id of the incoming delivery.
    pub source: String,
    /// Id of the outgoing delivery it feeds.
    pub target: String,
}

impl DeliveryRelation {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
