//! Job manager: queues, tick update and worker dispatch.
//!
//! # Queues
//!
//! Every live job sits in the arena and in exactly one of:
//!
//! | Queue | Holds |
//! |-------|-------|
//! | `available[priority]` | schedulable jobs (prerequisites settled) |
//! | `waiting` | blocked or cancelled jobs, `paused` while blocked |
//! | `fail_list` | jobs rejected at submission, failed on the next `update` |
//!
//! # Tick Protocol
//!
//! ```text
//! npc_waiting(..)*  →  update(colony)  →  assign_jobs(colony)
//! ```
//!
//! `update` moves jobs between queues and drops finished ones; `assign_jobs`
//! pairs idle workers with available jobs, one priority level at a time.

mod assign;
mod report;
mod snapshot;

pub use report::{Assignment, DispatchReport};
pub use snapshot::{JobManagerSnapshot, LegacySnapshot, SnapshotV1};

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info, warn};

use crate::colony::{Colony, WorkerClass};
use crate::config::DispatchConfig;
use crate::dispatching::{AssignmentScorer, ProximityScorer};
use crate::error::JobError;
use crate::models::{
    Action, Coordinate, ItemCategory, Job, JobArena, JobId, JobPriority, NpcId, TaskResult,
    PRIORITY_COUNT,
};
use crate::reservation::ReservationLedger;

/// The scheduler.
///
/// Owns every submitted job. Collaborators refer to jobs by `JobId` and
/// reach them through `job` / `job_mut`.
#[derive(Debug)]
pub struct JobManager {
    arena: JobArena,
    available: [VecDeque<JobId>; PRIORITY_COUNT],
    waiting: VecDeque<JobId>,
    fail_list: VecDeque<JobId>,
    idle_menial: Vec<NpcId>,
    idle_expert: Vec<NpcId>,
    tool_jobs: BTreeMap<ItemCategory, Vec<JobId>>,
    next_id: u64,
    ledger: ReservationLedger,
    config: DispatchConfig,
    scorer: Box<dyn AssignmentScorer>,
}

impl JobManager {
    /// Creates an empty manager using `ledger` for job reservations.
    pub fn new(ledger: ReservationLedger) -> Self {
        let config = DispatchConfig::default();
        Self {
            arena: JobArena::new(),
            available: Default::default(),
            waiting: VecDeque::new(),
            fail_list: VecDeque::new(),
            idle_menial: Vec::new(),
            idle_expert: Vec::new(),
            tool_jobs: BTreeMap::new(),
            next_id: 1,
            ledger,
            scorer: Box::new(ProximityScorer::from_config(&config)),
            config,
        }
    }

    /// Replaces the configuration. Also resets the scorer to a
    /// `ProximityScorer` built from it.
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.scorer = Box::new(ProximityScorer::from_config(&config));
        self.config = config;
        self
    }

    /// Replaces the scorer.
    pub fn with_scorer<S: AssignmentScorer + 'static>(mut self, scorer: S) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    // ======================== Accessors ========================

    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn scorer(&self) -> &dyn AssignmentScorer {
        self.scorer.as_ref()
    }

    pub fn arena(&self) -> &JobArena {
        &self.arena
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.arena.get(id)
    }

    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.arena.get_mut(id)
    }

    /// Jobs queued at one priority level, in insertion order.
    pub fn available_jobs(&self, priority: JobPriority) -> impl Iterator<Item = JobId> + '_ {
        self.available[priority.index()].iter().copied()
    }

    pub fn waiting_jobs(&self) -> impl Iterator<Item = JobId> + '_ {
        self.waiting.iter().copied()
    }

    /// Jobs rejected at submission and not yet failed.
    pub fn pending_failures(&self) -> impl Iterator<Item = JobId> + '_ {
        self.fail_list.iter().copied()
    }

    pub fn idle_workers(&self, class: WorkerClass) -> &[NpcId] {
        match class {
            WorkerClass::Menial => &self.idle_menial,
            WorkerClass::Expert => &self.idle_expert,
        }
    }

    /// Assigned jobs currently holding a tool of `category`.
    pub fn tool_jobs(&self, category: ItemCategory) -> &[JobId] {
        self.tool_jobs
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The unfinished job `npc` is working on, if any.
    pub fn job_held_by(&self, npc: NpcId) -> Option<JobId> {
        self.arena
            .iter()
            .find(|job| job.assigned() == Some(npc) && !job.completed())
            .map(Job::id)
    }

    /// Allocates a fresh job id.
    ///
    /// Ids are needed before submission so that jobs can name each other as
    /// parent or prerequisite.
    pub fn next_job_id(&mut self) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Jobs in the available buckets plus the waiting list.
    pub fn job_amount(&self) -> usize {
        self.available.iter().map(VecDeque::len).sum::<usize>() + self.waiting.len()
    }

    /// The `index`-th job when enumerating available buckets in priority
    /// order, then the waiting list.
    pub fn get_job_by_list_index(&self, index: usize) -> Option<JobId> {
        self.available
            .iter()
            .flatten()
            .chain(self.waiting.iter())
            .nth(index)
            .copied()
    }

    // ======================== Submission ========================

    /// Submits a job.
    ///
    /// The job lands in the fail list when it is out of attempts, targets a
    /// cell outside territory or a burning cell (subject to its flags). Otherwise
    /// it becomes available, or waits paused until its prerequisites settle.
    pub fn add_job(&mut self, job: Job, colony: &dyn Colony) -> Result<JobId, JobError> {
        let id = self.arena.insert(job)?;
        self.next_id = self.next_id.max(id.get() + 1);
        self.enqueue(id, colony);
        Ok(id)
    }

    /// Queues an arena job by the submission rules. Consumes one attempt.
    fn enqueue(&mut self, id: JobId, colony: &dyn Colony) {
        let attempt_ok = match self.arena.get_mut(id) {
            Some(job) => job.attempt(),
            None => return,
        };
        let Some(job) = self.arena.get(id) else {
            return;
        };

        if !attempt_ok || job.outside_territory(colony) || job.invalid_fire_allowance(colony) {
            debug!(
                job_id = %id,
                attempts = job.attempts(),
                attempts_exhausted = !attempt_ok,
                "job unschedulable, queued for failure"
            );
            if !self.fail_list.contains(&id) {
                self.fail_list.push_back(id);
            }
            return;
        }

        let priority = job.priority();
        if job.prerequisites_completed(&self.arena) {
            self.available[priority.index()].push_back(id);
            debug!(job_id = %id, ?priority, "job available");
        } else {
            if let Some(job) = self.arena.get_mut(id) {
                job.set_paused(true);
            }
            self.waiting.push_back(id);
            debug!(job_id = %id, "job waiting on prerequisites");
        }
    }

    // ======================== Cancellation ========================

    /// Takes a job away from its worker and parks it in the waiting list.
    ///
    /// The job keeps its reservations and is re-submitted by a later
    /// `update` once nothing blocks it. Jobs already rejected at
    /// submission stay in the fail list.
    pub fn cancel_job(
        &mut self,
        id: JobId,
        reason: &str,
        result: TaskResult,
    ) -> Result<(), JobError> {
        let job = self.arena.get_mut(id).ok_or(JobError::UnknownJob(id))?;
        let priority = job.priority();
        if priority <= self.config.announce_priority {
            info!(job_id = %id, name = %job.name, reason, ?result, "job canceled");
        } else {
            debug!(job_id = %id, name = %job.name, reason, ?result, "job canceled");
        }

        job.assign(None);
        job.set_paused(true);
        self.forget_tool_job(id);
        if self.fail_list.contains(&id) {
            return Ok(());
        }
        for bucket in &mut self.available {
            bucket.retain(|queued| *queued != id);
        }
        if !self.waiting.contains(&id) {
            self.waiting.push_back(id);
        }
        Ok(())
    }

    /// Removes a job from every queue and drops it, releasing its claims.
    ///
    /// An assigned worker is told to abort.
    pub fn remove_job(&mut self, id: JobId, colony: &mut dyn Colony) -> Result<(), JobError> {
        let job = self.detach(id).ok_or(JobError::UnknownJob(id))?;
        if let Some(npc) = job.assigned() {
            colony.abort_job(npc, id);
        }
        debug!(job_id = %id, name = %job.name, "job removed");
        Ok(())
    }

    /// Invalidates every queued or waiting job with a task doing `action`
    /// at `location`.
    ///
    /// Assigned jobs have their worker told to abort; unassigned ones are
    /// erased outright. Returns the number of jobs affected.
    pub fn remove_jobs_at(
        &mut self,
        action: Action,
        location: Coordinate,
        colony: &mut dyn Colony,
    ) -> usize {
        let matching: Vec<JobId> = self
            .available
            .iter()
            .flatten()
            .chain(self.waiting.iter())
            .copied()
            .filter(|&id| {
                self.arena
                    .get(id)
                    .is_some_and(|job| job.tasks.iter().any(|t| t.matches(action, location)))
            })
            .collect();

        for &id in &matching {
            match self.arena.get(id).and_then(Job::assigned) {
                Some(npc) => colony.abort_job(npc, id),
                None => {
                    self.detach(id);
                }
            }
        }
        if !matching.is_empty() {
            debug!(?action, %location, count = matching.len(), "jobs invalidated at location");
        }
        matching.len()
    }

    /// Pulls a job out of all bookkeeping and the arena.
    fn detach(&mut self, id: JobId) -> Option<Job> {
        for bucket in &mut self.available {
            bucket.retain(|queued| *queued != id);
        }
        self.waiting.retain(|queued| *queued != id);
        self.fail_list.retain(|queued| *queued != id);
        self.forget_tool_job(id);
        self.arena.remove(id)
    }

    fn forget_tool_job(&mut self, id: JobId) {
        for jobs in self.tool_jobs.values_mut() {
            jobs.retain(|held| *held != id);
        }
        self.tool_jobs.retain(|_, jobs| !jobs.is_empty());
    }

    // ======================== Worker reports ========================

    /// Marks a job successful. It leaves the queues on the next `update`.
    pub fn complete_job(&mut self, id: JobId) -> Result<(), JobError> {
        let job = self.arena.get_mut(id).ok_or(JobError::UnknownJob(id))?;
        job.complete();
        debug!(job_id = %id, name = %job.name, "job completed");
        self.forget_tool_job(id);
        Ok(())
    }

    /// Fails a job and its whole parent chain.
    pub fn fail_job(&mut self, id: JobId) -> Result<(), JobError> {
        if !self.arena.contains(id) {
            return Err(JobError::UnknownJob(id));
        }
        let mut visited = BTreeSet::new();
        let mut next = Some(id);
        while let Some(current) = next {
            if !visited.insert(current) {
                warn!(job_id = %current, "parent chain loops back, stopping cascade");
                break;
            }
            let Some(job) = self.arena.get_mut(current) else {
                break;
            };
            next = job.fail();
            debug!(job_id = %current, name = %job.name, "job failed");
            self.forget_tool_job(current);
        }
        Ok(())
    }

    // ======================== Idle workers ========================

    /// Registers an idle worker. Idempotent.
    ///
    /// A worker still holding an unfinished job is not idle and is ignored.
    pub fn npc_waiting(&mut self, npc: NpcId, colony: &dyn Colony) {
        self.npc_not_waiting(npc);
        if let Some(held) = self.job_held_by(npc) {
            debug!(npc = %npc, job_id = %held, "worker still holds a job, not idle");
            return;
        }
        match WorkerClass::of_worker(colony.npc_is_expert(npc)) {
            WorkerClass::Menial => self.idle_menial.push(npc),
            WorkerClass::Expert => self.idle_expert.push(npc),
        }
    }

    /// Unregisters a worker from both idle pools. Idempotent.
    pub fn npc_not_waiting(&mut self, npc: NpcId) {
        self.idle_menial.retain(|n| *n != npc);
        self.idle_expert.retain(|n| *n != npc);
    }

    pub fn clear_waiting_npcs(&mut self) {
        self.idle_menial.clear();
        self.idle_expert.clear();
    }

    // ======================== Tick ========================

    /// Per-tick queue maintenance.
    ///
    /// 1. Waiting sweep: drop removable jobs, re-submit unblocked ones, nudge
    ///    the prerequisites of blocked ones.
    /// 2. Available sweep: drop finished jobs.
    /// 3. Tool-job sweep: forget jobs that no longer exist.
    /// 4. Fail every job in the fail list and drop it.
    pub fn update(&mut self, colony: &dyn Colony) {
        self.sweep_waiting(colony);
        self.sweep_available();
        self.tool_jobs.retain(|_, jobs| {
            jobs.retain(|id| self.arena.contains(*id));
            !jobs.is_empty()
        });
        self.drain_fail_list();
    }

    fn sweep_waiting(&mut self, colony: &dyn Colony) {
        let pending: Vec<JobId> = self.waiting.drain(..).collect();
        for id in pending {
            let Some(job) = self.arena.get(id) else {
                continue;
            };
            if job.removable(&self.arena) {
                self.forget_tool_job(id);
                self.arena.remove(id);
                debug!(job_id = %id, "removable job dropped from waiting list");
                continue;
            }

            let ready = job.prerequisites_completed(&self.arena);
            let has_prerequisites = !job.prerequisites().is_empty();
            let has_parent = job.parent().is_some_and(|p| self.arena.contains(p));
            let unpause = ready && (has_prerequisites || !job.paused());

            if unpause {
                if let Some(job) = self.arena.get_mut(id) {
                    job.set_paused(false);
                }
                self.enqueue(id, colony);
                continue;
            }

            if !ready {
                let nudged: Vec<JobId> = job
                    .prerequisites()
                    .iter()
                    .copied()
                    .filter(|&p| {
                        self.arena
                            .get(p)
                            .is_some_and(|pre| !pre.completed() && pre.prerequisites_completed(&self.arena))
                    })
                    .collect();
                if let Some(job) = self.arena.get_mut(id) {
                    job.set_paused(true);
                }
                for p in nudged {
                    if let Some(pre) = self.arena.get_mut(p) {
                        pre.set_paused(false);
                    }
                }
            } else if !has_parent {
                // Standalone and parked by a cancel: retry on the next sweep.
                if let Some(job) = self.arena.get_mut(id) {
                    job.set_paused(false);
                }
            }
            self.waiting.push_back(id);
        }
    }

    fn sweep_available(&mut self) {
        let mut finished = Vec::new();
        for bucket in &mut self.available {
            bucket.retain(|&id| match self.arena.get(id) {
                None => false,
                Some(job) if job.completed() && job.prerequisites_completed(&self.arena) => {
                    finished.push(id);
                    false
                }
                Some(_) => true,
            });
        }
        for id in finished {
            self.arena.remove(id);
            debug!(job_id = %id, "finished job dropped");
        }
    }

    fn drain_fail_list(&mut self) {
        let failed: Vec<JobId> = self.fail_list.drain(..).collect();
        for id in failed {
            if self.fail_job(id).is_ok() {
                if let Some(job) = self.detach(id) {
                    warn!(job_id = %id, name = %job.name, attempts = job.attempts(), "job could not be scheduled");
                }
            }
        }
    }
}
