//! Job scheduling domain models.
//!
//! Plain data types shared by the rest of the crate. Nothing here talks to
//! the colony except through the `Colony` trait passed into a call.
//!
//! # Domain Mappings
//!
//! | u-jobs | Colony simulation |
//! |--------|-------------------|
//! | Job | Order ("fell this tree", "stockpile this log") |
//! | Task | One step of an order (move, take, put in) |
//! | NpcId | Worker (menial or expert) |
//! | JobArena | Every order the scheduler currently knows |

mod arena;
mod coordinate;
mod ids;
mod job;
mod task;

pub use arena::JobArena;
pub use coordinate::Coordinate;
pub use ids::{ContainerId, EntityId, ItemCategory, ItemType, JobId, MarkerId, NpcId, StockpileId};
pub use job::{
    Job, JobCompletion, JobPriority, JobRecord, SpotRecord, DEFAULT_ATTEMPT_LIMIT, PRIORITY_COUNT,
};
pub use task::{Action, Task, TaskResult};
