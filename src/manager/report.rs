//! Outcome of one `assign_jobs` call.

use serde::{Deserialize, Serialize};

use crate::colony::WorkerClass;
use crate::models::{JobId, JobPriority, NpcId};

/// A committed worker-to-job pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Worker given the job.
    pub npc: NpcId,
    /// Job handed out.
    pub job: JobId,
    /// Priority level the batch was drawn from.
    pub priority: JobPriority,
    /// Worker class of the batch.
    pub class: WorkerClass,
    /// Matrix score of the pairing.
    pub score: i64,
}

/// What happened during one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Pairings in commit order.
    pub assignments: Vec<Assignment>,
    /// Tool jobs left out for lack of a tool.
    pub starved: Vec<JobId>,
    /// Idle workers the colony no longer knows.
    pub dropped_workers: Vec<NpcId>,
}

impl DispatchReport {
    /// Whether nothing was assigned, starved or dropped.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.starved.is_empty() && self.dropped_workers.is_empty()
    }

    /// Job given to `npc` in this pass.
    pub fn job_for(&self, npc: NpcId) -> Option<JobId> {
        self.assignments.iter().find(|a| a.npc == npc).map(|a| a.job)
    }

    /// Sum of committed scores.
    pub fn total_score(&self) -> i64 {
        self.assignments.iter().map(|a| a.score).sum()
    }

    /// Assignments drawn from one priority level.
    pub fn at_priority(&self, priority: JobPriority) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(move |a| a.priority == priority)
    }
}
