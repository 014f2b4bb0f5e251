//! Collaborator seam.
//!
//! The scheduler does not own the map, the NPCs or the items. Everything it
//! needs from them goes through the `Colony` trait: a handful of queries plus
//! the two worker notifications.
//!
//! `SandboxColony` is a small in-memory implementation for tests and tools.

mod sandbox;

pub use sandbox::{SandboxColony, SandboxNpc};

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, EntityId, ItemCategory, Job, JobId, NpcId};

/// Worker skill class. Partitions both idle pools and assignment batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerClass {
    Menial,
    Expert,
}

impl WorkerClass {
    /// Class a worker belongs to.
    pub fn of_worker(expert: bool) -> Self {
        if expert {
            WorkerClass::Expert
        } else {
            WorkerClass::Menial
        }
    }

    /// Class a job is meant for.
    pub fn of_job(job: &Job) -> Self {
        if job.is_menial() {
            WorkerClass::Menial
        } else {
            WorkerClass::Expert
        }
    }
}

/// Everything the scheduler consumes from the simulation.
pub trait Colony {
    // ---- map ----

    /// Whether the cell lies on the map.
    fn is_inside(&self, at: Coordinate) -> bool;

    /// Whether the cell is claimed colony territory.
    fn is_territory(&self, at: Coordinate) -> bool;

    /// Whether the cell is currently burning.
    fn on_fire(&self, at: Coordinate) -> bool;

    /// Position of a live entity.
    fn entity_position(&self, entity: EntityId) -> Option<Coordinate>;

    // ---- workers ----

    /// Position of a live worker; `None` if the worker no longer exists.
    fn npc_position(&self, npc: NpcId) -> Option<Coordinate>;

    /// Whether the worker is an expert (otherwise menial).
    fn npc_is_expert(&self, npc: NpcId) -> bool;

    /// Whether the worker currently wields an item of `category`.
    fn npc_wields(&self, npc: NpcId, category: ItemCategory) -> bool;

    // ---- items ----

    /// Number of unreserved tools of a category in the colony.
    fn available_tools(&self, category: ItemCategory) -> usize;

    // ---- notifications ----

    /// The worker has been given `job` and should start its task sequence.
    fn start_job(&mut self, npc: NpcId, job: &Job);

    /// The worker's current job was invalidated; it should abandon it.
    fn abort_job(&mut self, npc: NpcId, job: JobId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_class() {
        assert_eq!(WorkerClass::of_worker(true), WorkerClass::Expert);
        assert_eq!(WorkerClass::of_worker(false), WorkerClass::Menial);

        let menial = Job::new(JobId(1), "Haul");
        let expert = Job::new(JobId(2), "Smith").expert();
        assert_eq!(WorkerClass::of_job(&menial), WorkerClass::Menial);
        assert_eq!(WorkerClass::of_job(&expert), WorkerClass::Expert);
    }
}
