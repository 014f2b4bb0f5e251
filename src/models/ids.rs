//! Identifier newtypes.
//!
//! Every collaborator object the scheduler refers to is addressed by a small
//! copyable id. Liveness is always checked against the owner (job arena,
//! colony, ledger), never assumed.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Raw numeric value.
            #[inline]
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Stable key of a job in the manager's arena.
    JobId(u64),
    "job#"
);
id_type!(
    /// Worker (NPC) identifier.
    NpcId(u32),
    "npc#"
);
id_type!(
    /// Any map entity: item, plant, construction, creature.
    EntityId(u32),
    "entity#"
);
id_type!(
    /// Stockpile identifier.
    StockpileId(u32),
    "stockpile#"
);
id_type!(
    /// Container item identifier.
    ContainerId(u32),
    "container#"
);
id_type!(
    /// Map marker handle returned by the ledger.
    MarkerId(u32),
    "marker#"
);
id_type!(
    /// Item category (e.g. "Bucket", "Axe").
    ItemCategory(u16),
    "category#"
);
id_type!(
    /// Concrete item type (e.g. "Wooden bucket").
    ItemType(u16),
    "type#"
);
