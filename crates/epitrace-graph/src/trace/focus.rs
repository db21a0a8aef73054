//! Active trace focus bookkeeping.

use epitrace_core::model::TraceDirection;

/// The graph element a trace is anchored on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusElement {
    Station(String),
    Delivery(String),
}

/// A single active trace focus.
///
/// At most one focus is live at a time; re-focusing replaces the
/// previous trace wholesale. The engine keeps the focus around so it
/// can re-derive trace flags after topology or visibility edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFocus {
    pub element: FocusElement,
    pub direction: TraceDirection,
}

impl TraceFocus {
    pub fn station(id: impl Into<String>, direction: TraceDirection) -> Self {
        Self {
            element: FocusElement::Station(id.into()),
            direction,
        }
    }

    pub fn delivery(id: impl Into<String>, direction: TraceDirection) -> Self {
        Self {
            element: FocusElement::Delivery(id.into()),
            direction,
        }
    }

    /// Id of the focused element.
    pub fn id(&self) -> &str {
        match &self.element {
            FocusElement::Station(id) | FocusElement::Delivery(id) => id,
        }
    }
}
