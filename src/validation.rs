//! Structural checks over the job graph and the manager's queues.
//!
//! Detects:
//! - Jobs naming themselves as prerequisite or parent
//! - Circular prerequisite dependencies (DAG validation)
//! - Circular parent chains
//! - Queue entries pointing at jobs that do not exist
//! - Jobs queued twice, or not queued at all
//! - Available jobs whose prerequisites have not settled
//! - Assignments outside the available buckets, and workers holding two jobs
//!
//! Used after `JobManager::restore` and by tests; the tick path does not
//! validate.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::manager::JobManager;
use crate::models::{JobArena, JobId, JobPriority, NpcId};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A job lists itself as prerequisite or parent.
    SelfReference,
    /// Prerequisite graph contains a cycle.
    CyclicDependency,
    /// Following parent links returns to a job already visited.
    CyclicParentChain,
    /// A queue holds an id with no job behind it.
    DanglingQueueEntry,
    /// A job appears in more than one queue slot.
    DuplicateQueueEntry,
    /// A live job is in no queue at all.
    UnqueuedJob,
    /// An available job still has unsettled prerequisites.
    UnmetPrerequisites,
    /// A job is assigned while not available and ongoing.
    StrayAssignment,
    /// Two jobs hold the same worker.
    DoubleAssignment,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the dependency structure of a set of jobs.
///
/// Checks:
/// 1. No job references itself
/// 2. No circular prerequisite dependencies
/// 3. No circular parent chains
///
/// Links to ids missing from the arena are expired, not errors.
pub fn validate_jobs(arena: &JobArena) -> ValidationResult {
    let mut errors = Vec::new();

    for job in arena.iter() {
        if job.prerequisites().contains(&job.id()) || job.parent() == Some(job.id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::SelfReference,
                format!("Job {} references itself", job.id()),
            ));
        }
    }

    if let Some(cycle_err) = detect_cycles(arena) {
        errors.push(cycle_err);
    }

    for job in arena.iter() {
        if let Some(err) = detect_parent_loop(arena, job.id()) {
            errors.push(err);
            break;
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a manager: the job graph plus queue consistency.
///
/// Checks, on top of `validate_jobs`:
/// 1. Every queued id has a live job
/// 2. Every live job sits in exactly one queue slot
/// 3. Available jobs have settled prerequisites
/// 4. Only available, ongoing jobs are assigned
/// 5. No worker holds two jobs
pub fn validate_manager(manager: &JobManager) -> ValidationResult {
    let arena = manager.arena();
    let mut errors = validate_jobs(arena).err().unwrap_or_default();

    let mut seen: HashMap<JobId, usize> = HashMap::new();
    let mut available: HashSet<JobId> = HashSet::new();
    let queued = JobPriority::ALL
        .iter()
        .flat_map(|&p| manager.available_jobs(p).map(move |id| (id, Some(p))))
        .chain(manager.waiting_jobs().map(|id| (id, None)))
        .chain(manager.pending_failures().map(|id| (id, None)));

    for (id, priority) in queued {
        *seen.entry(id).or_insert(0) += 1;
        let Some(job) = arena.get(id) else {
            errors.push(ValidationError::new(
                ValidationErrorKind::DanglingQueueEntry,
                format!("Queue entry {id} has no job"),
            ));
            continue;
        };
        if priority.is_some() {
            available.insert(id);
            if !job.prerequisites_completed(arena) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnmetPrerequisites,
                    format!("Job {id} is available before its prerequisites settled"),
                ));
            }
        }
    }

    for (id, count) in &seen {
        if *count > 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateQueueEntry,
                format!("Job {id} is queued {count} times"),
            ));
        }
    }

    let mut holders: HashMap<NpcId, JobId> = HashMap::new();
    for job in arena.iter() {
        if !seen.contains_key(&job.id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnqueuedJob,
                format!("Job {} is in no queue", job.id()),
            ));
        }
        let Some(npc) = job.assigned() else {
            continue;
        };
        if job.completed() || !available.contains(&job.id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::StrayAssignment,
                format!("Job {} is assigned to {npc} outside the available queues", job.id()),
            ));
        }
        if let Some(other) = holders.insert(npc, job.id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DoubleAssignment,
                format!("{npc} holds both {other} and {}", job.id()),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the prerequisite graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(arena: &JobArena) -> Option<ValidationError> {
    // job → prerequisites still alive
    let adj: HashMap<JobId, Vec<JobId>> = arena
        .iter()
        .map(|job| {
            let live = job
                .prerequisites()
                .iter()
                .copied()
                .filter(|&p| p != job.id() && arena.contains(p))
                .collect();
            (job.id(), live)
        })
        .collect();

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for job in arena.iter() {
        let node = job.id();
        if !visited.contains(&node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular prerequisite dependency detected involving job {node}"),
            ));
        }
    }

    None
}

fn has_cycle_dfs(
    node: JobId,
    adj: &HashMap<JobId, Vec<JobId>>,
    visited: &mut HashSet<JobId>,
    in_stack: &mut HashSet<JobId>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if in_stack.contains(&next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(&next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}

fn detect_parent_loop(arena: &JobArena, start: JobId) -> Option<ValidationError> {
    let mut visited = HashSet::new();
    let mut current = Some(start);
    while let Some(id) = current {
        if !visited.insert(id) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicParentChain,
                format!("Parent chain starting at job {start} loops at job {id}"),
            ));
        }
        current = arena.get(id).and_then(|job| job.parent()).filter(|&p| p != id);
    }
    None
}
