//! Batch assignment of idle workers to available jobs.
//!
//! # Algorithm
//!
//! For each priority level, highest first, while idle workers remain:
//!
//! 1. Tool budget per category: tools available in the colony minus jobs
//!    already holding one.
//! 2. Admit up to `batch_cap` open jobs per worker class from the bucket; a
//!    tool job is admitted only while its budget is positive.
//! 3. Per class, score every (idle worker, admitted job) pair into a square
//!    matrix padded with the fallback score.
//! 4. Solve each matrix with Kuhn-Munkres and commit the real pairs.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{Assignment, DispatchReport, JobManager};
use crate::colony::{Colony, WorkerClass};
use crate::dispatching::score_matrix;
use crate::matching::find_best_matching;
use crate::models::{ItemCategory, Job, JobId, JobPriority, NpcId};

/// Remaining admissions per tool category for one priority level.
#[derive(Debug, Default)]
struct ToolBudget {
    remaining: HashMap<ItemCategory, i64>,
}

impl ToolBudget {
    /// Takes one unit of `category`. Returns `false` when none is left.
    fn take(&mut self, category: ItemCategory, manager: &JobManager, colony: &dyn Colony) -> bool {
        let left = self.remaining.entry(category).or_insert_with(|| {
            colony.available_tools(category) as i64 - manager.tool_jobs(category).len() as i64
        });
        if *left > 0 {
            *left -= 1;
            true
        } else {
            false
        }
    }
}

impl JobManager {
    /// Pairs idle workers with available jobs for this tick.
    ///
    /// Assigned workers leave the idle pools and are notified through
    /// `Colony::start_job`. Workers the colony no longer knows are dropped
    /// from the pools without assignment.
    pub fn assign_jobs(&mut self, colony: &mut dyn Colony) -> DispatchReport {
        let mut report = DispatchReport::default();
        self.drop_unknown_workers(&*colony, &mut report);
        self.drop_busy_workers();

        for priority in JobPriority::ALL {
            if self.idle_menial.is_empty() && self.idle_expert.is_empty() {
                break;
            }

            let (menial, expert) = self.collect_batch(priority, &*colony, &mut report);
            if menial.is_empty() && expert.is_empty() {
                continue;
            }
            debug!(?priority, menial = menial.len(), expert = expert.len(), "batch admitted");

            self.dispatch_class(WorkerClass::Menial, priority, &menial, colony, &mut report);
            self.dispatch_class(WorkerClass::Expert, priority, &expert, colony, &mut report);
        }

        if !report.is_empty() {
            info!(
                assigned = report.assignments.len(),
                starved = report.starved.len(),
                "jobs assigned"
            );
        }
        report
    }

    /// First open job for the worker's class across priority levels.
    ///
    /// Assigns it on the spot and takes the worker out of the idle pools.
    /// This is the one-off path; the batch path is `assign_jobs`. A worker
    /// already holding an unfinished job gets nothing.
    pub fn get_job(&mut self, npc: NpcId, colony: &dyn Colony) -> Option<JobId> {
        if let Some(held) = self.job_held_by(npc) {
            debug!(npc = %npc, job_id = %held, "worker already holds a job");
            return None;
        }
        let class = WorkerClass::of_worker(colony.npc_is_expert(npc));
        let found = self
            .available
            .iter()
            .flatten()
            .copied()
            .find(|&id| {
                self.arena
                    .get(id)
                    .is_some_and(|job| WorkerClass::of_job(job) == class && self.is_open(job))
            })?;

        self.commit(npc, found);
        debug!(npc = %npc, job_id = %found, "job handed out directly");
        Some(found)
    }

    fn is_open(&self, job: &Job) -> bool {
        job.assigned().is_none() && !job.completed() && !job.removable(&self.arena)
    }

    fn drop_unknown_workers(&mut self, colony: &dyn Colony, report: &mut DispatchReport) {
        for pool in [&mut self.idle_menial, &mut self.idle_expert] {
            pool.retain(|&npc| {
                let known = colony.npc_position(npc).is_some();
                if !known {
                    warn!(npc = %npc, "idle worker no longer exists, dropped");
                    report.dropped_workers.push(npc);
                }
                known
            });
        }
    }

    /// Takes workers out of the idle pools once they hold a job again.
    fn drop_busy_workers(&mut self) {
        let busy: Vec<NpcId> = self
            .idle_menial
            .iter()
            .chain(self.idle_expert.iter())
            .copied()
            .filter(|&npc| self.job_held_by(npc).is_some())
            .collect();
        for npc in busy {
            debug!(npc = %npc, "busy worker left the idle pool");
            self.npc_not_waiting(npc);
        }
    }

    /// Admits open jobs of one priority level, split by worker class.
    fn collect_batch(
        &self,
        priority: JobPriority,
        colony: &dyn Colony,
        report: &mut DispatchReport,
    ) -> (Vec<JobId>, Vec<JobId>) {
        let cap = self.config.batch_cap;
        let mut budget = ToolBudget::default();
        let mut menial = Vec::new();
        let mut expert = Vec::new();

        for &id in &self.available[priority.index()] {
            if menial.len() >= cap && expert.len() >= cap {
                break;
            }
            let Some(job) = self.arena.get(id) else {
                continue;
            };
            if !self.is_open(job) {
                continue;
            }
            let batch = match WorkerClass::of_job(job) {
                WorkerClass::Menial => &mut menial,
                WorkerClass::Expert => &mut expert,
            };
            if batch.len() >= cap {
                continue;
            }
            if let Some(category) = job.required_tool() {
                if !budget.take(category, self, colony) {
                    debug!(job_id = %id, %category, "no tool available, job starved");
                    report.starved.push(id);
                    continue;
                }
            }
            batch.push(id);
        }
        (menial, expert)
    }

    fn dispatch_class(
        &mut self,
        class: WorkerClass,
        priority: JobPriority,
        jobs: &[JobId],
        colony: &mut dyn Colony,
        report: &mut DispatchReport,
    ) {
        let workers = self.idle_workers(class).to_vec();
        if workers.is_empty() || jobs.is_empty() {
            return;
        }

        let pairs: Vec<(NpcId, JobId, i64)> = {
            let batch: Vec<&Job> = jobs.iter().filter_map(|&id| self.arena.get(id)).collect();
            let matrix = score_matrix(
                self.scorer.as_ref(),
                &workers,
                &batch,
                &*colony,
                self.config.fallback_score,
            );
            find_best_matching(&matrix)
                .into_iter()
                .enumerate()
                .filter(|&(row, col)| row < workers.len() && col < batch.len())
                .map(|(row, col)| (workers[row], batch[col].id(), matrix.get(row, col)))
                .collect()
        };

        for (npc, job_id, score) in pairs {
            self.commit(npc, job_id);
            if let Some(job) = self.arena.get(job_id) {
                colony.start_job(npc, job);
            }
            debug!(npc = %npc, job_id = %job_id, score, "worker assigned");
            report.assignments.push(Assignment {
                npc,
                job: job_id,
                priority,
                class,
                score,
            });
        }
    }

    /// Records `npc` as the worker of `id`.
    fn commit(&mut self, npc: NpcId, id: JobId) {
        let Some(job) = self.arena.get_mut(id) else {
            return;
        };
        job.assign(Some(npc));
        if let Some(category) = job.required_tool() {
            self.tool_jobs.entry(category).or_default().push(id);
        }
        self.npc_not_waiting(npc);
    }
}
