//! Typed id wrappers for graph nodes, vehicles, and passengers.
//!
//! Ids are allocated by the component that owns the entity — the route model
//! for nodes, the vehicle manager for vehicles, the passenger queue for
//! passengers — and increase monotonically within one run. The inner integer
//! is `pub` so owners can index their tables directly; callers should prefer
//! the `.index()` helper.

use std::fmt;

macro_rules! entity_id {
    ($(#[$attr:meta])* $name:ident, $label:literal) => {
        $(#[$attr])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Cast to `usize` for indexing into the owner's table.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "{}"), self.0)
            }
        }
    };
}

entity_id! {
    /// Index of a vertex in the route model's node table.
    NodeId, "n"
}

entity_id! {
    /// Identity of a vehicle, assigned by the vehicle manager at creation.
    VehicleId, "v"
}

entity_id! {
    /// Identity of a passenger, assigned by the passenger queue at creation.
    PassengerId, "p"
}
