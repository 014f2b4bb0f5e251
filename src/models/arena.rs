//! Job arena.
//!
//! Owns every live job, keyed by `JobId`. Dependency links between jobs are
//! plain ids resolved against the arena, so a link to a job that has been
//! dropped simply resolves to `None` ("expired").

use std::collections::BTreeMap;

use super::{Job, JobId};
use crate::error::JobError;

/// Ordered collection of live jobs.
#[derive(Debug, Default)]
pub struct JobArena {
    jobs: BTreeMap<JobId, Job>,
}

impl JobArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a job. Refuses ids already present.
    pub fn insert(&mut self, job: Job) -> Result<JobId, JobError> {
        let id = job.id();
        if self.jobs.contains_key(&id) {
            return Err(JobError::DuplicateJob(id));
        }
        self.jobs.insert(id, job);
        Ok(id)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    /// Removes and returns a job. Dropping the result releases its claims.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        self.jobs.remove(&id)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.contains_key(&id)
    }

    /// Whether `id` is gone or has reached a terminal completion.
    pub fn is_settled(&self, id: JobId) -> bool {
        self.jobs.get(&id).map_or(true, |job| job.completed())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Largest id in use.
    pub fn max_id(&self) -> Option<JobId> {
        self.jobs.keys().next_back().copied()
    }
}
