//! Score matrix construction.

use super::AssignmentScorer;
use crate::colony::Colony;
use crate::matching::CostMatrix;
use crate::models::{Job, NpcId};

/// Builds the square matrix for one worker class.
///
/// Rows are `workers`, columns are `jobs`; the side is the larger of the two
/// and the cells outside the real block hold `padding`.
pub fn score_matrix(
    scorer: &dyn AssignmentScorer,
    workers: &[NpcId],
    jobs: &[&Job],
    colony: &dyn Colony,
    padding: i64,
) -> CostMatrix {
    let size = workers.len().max(jobs.len());
    let mut matrix = CostMatrix::filled(size, padding);
    for (row, &npc) in workers.iter().enumerate() {
        for (col, job) in jobs.iter().enumerate() {
            matrix.set(row, col, scorer.score(npc, job, colony));
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::SandboxColony;
    use crate::dispatching::ProximityScorer;
    use crate::models::{Action, Coordinate, JobId, Task};

    #[test]
    fn test_padding_for_more_jobs() {
        let colony = SandboxColony::new(20, 20).with_menial(NpcId(1), Coordinate::new(1, 1));
        let a = Job::new(JobId(1), "a").with_task(Task::new(Action::Move, Coordinate::new(1, 2)));
        let b = Job::new(JobId(2), "b").with_task(Task::new(Action::Move, Coordinate::new(4, 4)));

        let m = score_matrix(&ProximityScorer::default(), &[NpcId(1)], &[&a, &b], &colony, 1);
        assert_eq!(m.size(), 2);
        assert_eq!(m.row(0), &[9_999, 9_994]);
        assert_eq!(m.row(1), &[1, 1]);
    }

    #[test]
    fn test_padding_for_more_workers() {
        let colony = SandboxColony::new(20, 20)
            .with_menial(NpcId(1), Coordinate::new(1, 1))
            .with_menial(NpcId(2), Coordinate::new(3, 3));
        let a = Job::new(JobId(1), "a").with_task(Task::new(Action::Move, Coordinate::new(3, 4)));

        let m = score_matrix(&ProximityScorer::default(), &[NpcId(1), NpcId(2)], &[&a], &colony, 1);
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(0, 0), 9_995);
        assert_eq!(m.get(1, 0), 9_999);
        assert_eq!(m.get(0, 1), 1);
        assert_eq!(m.get(1, 1), 1);
    }
}
