//! Error type for job submission, reservation and snapshot restore.
//!
//! Tick operations (`update`, `assign_jobs`) never fail; problems there are
//! routed through the fail list instead.

use crate::models::{Coordinate, EntityId, JobId, StockpileId};

/// Errors returned where a caller can act on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// A job with this id is already known to the manager.
    #[error("duplicate job id: {0}")]
    DuplicateJob(JobId),

    /// The id does not refer to a live job.
    #[error("unknown job id: {0}")]
    UnknownJob(JobId),

    /// Another job already holds the entity.
    #[error("entity {0} is already reserved")]
    EntityReserved(EntityId),

    /// Another job already holds the stockpile cell.
    #[error("stockpile {stockpile} spot {location} is already reserved")]
    SpotReserved {
        stockpile: StockpileId,
        location: Coordinate,
    },

    /// The map cell is already marked by another job.
    #[error("ground at {0} is already marked")]
    GroundMarked(Coordinate),

    /// The snapshot is structurally unusable.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
