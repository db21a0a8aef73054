//! Dense arena handles for stations and deliveries.
//!
//! Each handle wraps an index into the owning arena. Handles prevent
//! cross-type confusion: a `StationHandle` cannot be used where a
//! `DeliveryHandle` is expected. They stay valid only until the next
//! structural edit; the id maps are the canonical cross-operation
//! reference.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Create a handle for an arena slot.
            pub(crate) fn new(index: usize) -> Self {
                Self(index)
            }

            /// The arena slot this handle points at.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

define_handle!(
    /// Handle into the station arena.
    StationHandle
);

define_handle!(
    /// Handle into the delivery arena.
    DeliveryHandle
);
