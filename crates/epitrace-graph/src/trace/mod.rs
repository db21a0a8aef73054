//! Trace focus bookkeeping and forward/backward propagation.

mod focus;
mod propagation;

pub use focus::{FocusElement, TraceFocus};
pub use propagation::{
    backward_deliveries, clear, forward_deliveries, trace_delivery, trace_station,
};
