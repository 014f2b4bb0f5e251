//! Versioned persistence of the manager's state.
//!
//! The snapshot is plain serde data; the host picks the encoding. Version 0
//! is the legacy layout with a fixed three-bucket priority array
//! (High, Med, Low) and no fail list or tool-job map. It upgrades into the
//! current layout on restore.
//!
//! Restoring re-claims every job's reservations on the supplied ledger and
//! validates the result, so a snapshot that does not describe a consistent
//! manager is refused.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::JobManager;
use crate::error::JobError;
use crate::models::{ItemCategory, Job, JobId, JobPriority, JobRecord, NpcId, PRIORITY_COUNT};
use crate::reservation::ReservationLedger;
use crate::validation::validate_manager;

/// Any supported snapshot layout, tagged by `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum JobManagerSnapshot {
    #[serde(rename = "0")]
    Legacy(LegacySnapshot),
    #[serde(rename = "1")]
    V1(SnapshotV1),
}

/// Layout with three priority buckets: High, Med, Low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySnapshot {
    pub jobs: Vec<JobRecord>,
    pub buckets: [Vec<JobId>; 3],
    pub waiting: Vec<JobId>,
    #[serde(default)]
    pub idle_menial: Vec<NpcId>,
    #[serde(default)]
    pub idle_expert: Vec<NpcId>,
}

/// Current layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    pub jobs: Vec<JobRecord>,
    /// One list per priority level, highest first. Missing levels are
    /// empty; levels past `Low` fold into `Low`.
    pub buckets: Vec<Vec<JobId>>,
    pub waiting: Vec<JobId>,
    #[serde(default)]
    pub fail_list: Vec<JobId>,
    #[serde(default)]
    pub idle_menial: Vec<NpcId>,
    #[serde(default)]
    pub idle_expert: Vec<NpcId>,
    #[serde(default)]
    pub tool_jobs: Vec<(ItemCategory, Vec<JobId>)>,
    #[serde(default)]
    pub next_id: u64,
}

impl LegacySnapshot {
    /// Converts into the current layout. `VeryHigh` starts empty and the
    /// tool-job map is rebuilt from assigned tool jobs.
    pub fn upgrade(self) -> SnapshotV1 {
        let [high, med, low] = self.buckets;

        let mut tool_jobs: BTreeMap<ItemCategory, Vec<JobId>> = BTreeMap::new();
        for record in &self.jobs {
            if let (Some(category), Some(_)) = (record.required_tool, record.assigned) {
                tool_jobs.entry(category).or_default().push(record.id);
            }
        }
        let next_id = self.jobs.iter().map(|r| r.id.get() + 1).max().unwrap_or(1);

        SnapshotV1 {
            jobs: self.jobs,
            buckets: vec![Vec::new(), high, med, low],
            waiting: self.waiting,
            fail_list: Vec::new(),
            idle_menial: self.idle_menial,
            idle_expert: self.idle_expert,
            tool_jobs: tool_jobs.into_iter().collect(),
            next_id,
        }
    }
}

impl SnapshotV1 {
    /// Maps stored buckets onto the current priority levels.
    fn priority_buckets(buckets: Vec<Vec<JobId>>) -> [VecDeque<JobId>; PRIORITY_COUNT] {
        let mut out: [VecDeque<JobId>; PRIORITY_COUNT] = Default::default();
        for (index, bucket) in buckets.into_iter().enumerate() {
            out[JobPriority::from_index(index).index()].extend(bucket);
        }
        out
    }
}

impl From<SnapshotV1> for JobManagerSnapshot {
    fn from(snapshot: SnapshotV1) -> Self {
        JobManagerSnapshot::V1(snapshot)
    }
}

impl From<LegacySnapshot> for JobManagerSnapshot {
    fn from(snapshot: LegacySnapshot) -> Self {
        JobManagerSnapshot::Legacy(snapshot)
    }
}

impl JobManager {
    /// Captures jobs, queues, idle pools and the tool-job map.
    ///
    /// Configuration and scorer are not part of the snapshot.
    pub fn snapshot(&self) -> JobManagerSnapshot {
        JobManagerSnapshot::V1(SnapshotV1 {
            jobs: self.arena.iter().map(Job::to_record).collect(),
            buckets: self
                .available
                .iter()
                .map(|bucket| bucket.iter().copied().collect())
                .collect(),
            waiting: self.waiting.iter().copied().collect(),
            fail_list: self.fail_list.iter().copied().collect(),
            idle_menial: self.idle_menial.clone(),
            idle_expert: self.idle_expert.clone(),
            tool_jobs: self
                .tool_jobs
                .iter()
                .map(|(category, jobs)| (*category, jobs.clone()))
                .collect(),
            next_id: self.next_id,
        })
    }

    /// Rebuilds a manager from a snapshot of any supported version.
    ///
    /// Reservations are re-claimed on `ledger`. Fails when a claim collides,
    /// a job id repeats or the restored queues do not validate; nothing stays
    /// claimed in that case.
    pub fn restore(
        snapshot: JobManagerSnapshot,
        ledger: ReservationLedger,
    ) -> Result<Self, JobError> {
        let data = match snapshot {
            JobManagerSnapshot::Legacy(legacy) => legacy.upgrade(),
            JobManagerSnapshot::V1(current) => current,
        };

        let mut manager = JobManager::new(ledger);
        for record in data.jobs {
            let job = Job::from_record(record, &manager.ledger)?;
            manager.arena.insert(job)?;
        }

        manager.available = SnapshotV1::priority_buckets(data.buckets);
        manager.waiting = data.waiting.into();
        manager.fail_list = data.fail_list.into();
        manager.idle_menial = data.idle_menial;
        manager.idle_expert = data.idle_expert;
        manager.tool_jobs = data
            .tool_jobs
            .into_iter()
            .filter(|(_, jobs)| !jobs.is_empty())
            .collect();
        let after_max = manager.arena.max_id().map_or(1, |id| id.get() + 1);
        manager.next_id = data.next_id.max(after_max);

        validate_manager(&manager).map_err(|errors| {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            JobError::InvalidSnapshot(messages.join("; "))
        })?;

        info!(
            jobs = manager.arena.len(),
            queued = manager.job_amount(),
            "job manager restored"
        );
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::{SandboxColony, WorkerClass};
    use crate::models::{Action, ContainerId, Coordinate, EntityId, StockpileId, Task};
    use crate::reservation::MapMarker;

    fn haul(id: u64, x: i32, y: i32) -> Job {
        Job::new(JobId(id), format!("Haul {id}"))
            .with_task(Task::new(Action::Move, Coordinate::new(x, y)))
    }

    #[test]
    fn test_restore_preserves_queues_and_claims() {
        let mut colony = SandboxColony::new(32, 32)
            .with_menial(NpcId(1), Coordinate::new(1, 1))
            .with_menial(NpcId(2), Coordinate::new(30, 30))
            .with_tools(ItemCategory(4), 1);
        let ledger = ReservationLedger::new();
        let mut jm = JobManager::new(ledger.clone());

        let mut fill = haul(1, 2, 2).with_required_tool(ItemCategory(4));
        fill.reserve_entity(&ledger, EntityId(9)).unwrap();
        fill.reserve_space(&ledger, ContainerId(3), 2);
        fill.add_map_marker(&ledger, MapMarker::new(Coordinate::new(2, 2), "fill"));
        let fill = jm.add_job(fill, &colony).unwrap();

        let mut stock = haul(2, 20, 20).with_priority(JobPriority::Low);
        stock
            .reserve_spot(&ledger, StockpileId(1), Coordinate::new(5, 5), None)
            .unwrap();
        let stock = jm.add_job(stock, &colony).unwrap();
        let blocked = jm.add_job(haul(3, 4, 4).with_prerequisite(stock), &colony).unwrap();

        jm.npc_waiting(NpcId(1), &colony);
        jm.assign_jobs(&mut colony);
        jm.npc_waiting(NpcId(2), &colony);

        let json = serde_json::to_string(&jm.snapshot()).unwrap();
        assert!(json.contains(r#""version":"1""#));
        drop(jm);
        assert!(ledger.is_idle());

        let snapshot: JobManagerSnapshot = serde_json::from_str(&json).unwrap();
        let restored_ledger = ReservationLedger::new();
        let restored = JobManager::restore(snapshot, restored_ledger.clone()).unwrap();

        assert_eq!(restored.available_jobs(JobPriority::Med).collect::<Vec<_>>(), vec![fill]);
        assert_eq!(restored.available_jobs(JobPriority::Low).collect::<Vec<_>>(), vec![stock]);
        assert_eq!(restored.waiting_jobs().collect::<Vec<_>>(), vec![blocked]);
        assert_eq!(restored.idle_workers(WorkerClass::Menial), &[NpcId(2)]);
        assert_eq!(restored.tool_jobs(ItemCategory(4)), &[fill]);
        assert_eq!(restored.job(fill).unwrap().assigned(), Some(NpcId(1)));

        assert!(restored_ledger.is_entity_reserved(EntityId(9)));
        assert_eq!(restored_ledger.reserved_space(ContainerId(3)), 2);
        assert!(restored_ledger.is_spot_reserved(StockpileId(1), Coordinate::new(5, 5)));
        assert_eq!(restored_ledger.marker_count(), 1);

        let mut restored = restored;
        assert_eq!(restored.next_job_id(), JobId(4));
    }

    #[test]
    fn test_legacy_snapshot_upgrades() {
        let high = haul(1, 1, 1).with_priority(JobPriority::High).to_record();
        let med = haul(2, 2, 2).to_record();
        let mut low = haul(3, 3, 3)
            .with_priority(JobPriority::Low)
            .with_required_tool(ItemCategory(2))
            .to_record();
        low.assigned = Some(NpcId(8));
        let waiting = haul(4, 4, 4).with_prerequisite(JobId(2)).to_record();

        let legacy = LegacySnapshot {
            jobs: vec![high, med, low, waiting],
            buckets: [vec![JobId(1)], vec![JobId(2)], vec![JobId(3)]],
            waiting: vec![JobId(4)],
            idle_menial: vec![NpcId(5)],
            idle_expert: Vec::new(),
        };
        let json = serde_json::to_string(&JobManagerSnapshot::from(legacy)).unwrap();
        assert!(json.contains(r#""version":"0""#));

        let snapshot: JobManagerSnapshot = serde_json::from_str(&json).unwrap();
        let jm = JobManager::restore(snapshot, ReservationLedger::new()).unwrap();

        assert_eq!(jm.available_jobs(JobPriority::VeryHigh).count(), 0);
        assert_eq!(jm.available_jobs(JobPriority::High).collect::<Vec<_>>(), vec![JobId(1)]);
        assert_eq!(jm.available_jobs(JobPriority::Med).collect::<Vec<_>>(), vec![JobId(2)]);
        assert_eq!(jm.available_jobs(JobPriority::Low).collect::<Vec<_>>(), vec![JobId(3)]);
        assert_eq!(jm.waiting_jobs().collect::<Vec<_>>(), vec![JobId(4)]);
        assert_eq!(jm.tool_jobs(ItemCategory(2)), &[JobId(3)]);
        assert_eq!(jm.idle_workers(WorkerClass::Menial), &[NpcId(5)]);
        assert_eq!(jm.job_amount(), 4);
    }

    #[test]
    fn test_extra_buckets_fold_into_low() {
        let snapshot = SnapshotV1 {
            jobs: vec![haul(1, 1, 1).to_record(), haul(2, 2, 2).to_record()],
            buckets: vec![vec![], vec![], vec![], vec![JobId(1)], vec![JobId(2)]],
            waiting: Vec::new(),
            fail_list: Vec::new(),
            idle_menial: Vec::new(),
            idle_expert: Vec::new(),
            tool_jobs: Vec::new(),
            next_id: 0,
        };
        let jm = JobManager::restore(snapshot.into(), ReservationLedger::new()).unwrap();
        assert_eq!(
            jm.available_jobs(JobPriority::Low).collect::<Vec<_>>(),
            vec![JobId(1), JobId(2)]
        );
    }

    #[test]
    fn test_dangling_queue_entry_refused() {
        let snapshot = SnapshotV1 {
            jobs: Vec::new(),
            buckets: Vec::new(),
            waiting: vec![JobId(99)],
            fail_list: Vec::new(),
            idle_menial: Vec::new(),
            idle_expert: Vec::new(),
            tool_jobs: Vec::new(),
            next_id: 1,
        };
        let err = JobManager::restore(snapshot.into(), ReservationLedger::new()).unwrap_err();
        assert!(matches!(err, JobError::InvalidSnapshot(msg) if msg.contains("job#99")));
    }

    #[test]
    fn test_colliding_claims_refused_and_released() {
        let ledger = ReservationLedger::new();
        let mut a = haul(1, 1, 1).to_record();
        a.reserved_entities = vec![EntityId(5), EntityId(6)];
        let mut b = haul(2, 2, 2).to_record();
        b.reserved_entities = vec![EntityId(6)];

        let snapshot = SnapshotV1 {
            jobs: vec![a, b],
            buckets: vec![vec![], vec![], vec![JobId(1), JobId(2)]],
            waiting: Vec::new(),
            fail_list: Vec::new(),
            idle_menial: Vec::new(),
            idle_expert: Vec::new(),
            tool_jobs: Vec::new(),
            next_id: 3,
        };
        let err = JobManager::restore(snapshot.into(), ledger.clone()).unwrap_err();
        assert_eq!(err, JobError::EntityReserved(EntityId(6)));
        assert!(ledger.is_idle());
    }
}
