//! Built-in scorers.

use super::{AssignmentScore, AssignmentScorer, MIN_SCORE};
use crate::colony::Colony;
use crate::config::DispatchConfig;
use crate::models::{Job, NpcId};

/// Closer is better.
///
/// `base − distance(worker, first task target)`, minus `tool_penalty` when
/// the job needs a tool category the worker is not wielding. Jobs without a
/// locatable first task and workers the colony no longer knows get the
/// fallback score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityScorer {
    pub base: i64,
    pub tool_penalty: i64,
    pub fallback: i64,
}

impl ProximityScorer {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            base: config.base_score,
            tool_penalty: config.tool_penalty,
            fallback: config.fallback_score.max(MIN_SCORE),
        }
    }
}

impl Default for ProximityScorer {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl AssignmentScorer for ProximityScorer {
    fn name(&self) -> &'static str {
        "PROXIMITY"
    }

    fn score(&self, npc: NpcId, job: &Job, colony: &dyn Colony) -> AssignmentScore {
        let Some(task) = job.first_task() else {
            return self.fallback;
        };
        if task.target.is_sentinel() {
            return self.fallback;
        }
        let Some(position) = colony.npc_position(npc) else {
            return self.fallback;
        };

        let mut score = self.base - position.distance(task.target);
        if let Some(category) = job.required_tool() {
            if !colony.npc_wields(npc, category) {
                score -= self.tool_penalty;
            }
        }
        score.max(MIN_SCORE)
    }

    fn description(&self) -> &'static str {
        "Proximity to first task, tool-aware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::SandboxColony;
    use crate::models::{Action, Coordinate, ItemCategory, JobId, Task};

    fn job_at(x: i32, y: i32) -> Job {
        Job::new(JobId(1), "Haul").with_task(Task::new(Action::Move, Coordinate::new(x, y)))
    }

    #[test]
    fn test_distance_score() {
        let colony = SandboxColony::new(20, 20).with_menial(NpcId(1), Coordinate::new(2, 3));
        let scorer = ProximityScorer::default();
        assert_eq!(scorer.score(NpcId(1), &job_at(5, 5), &colony), 10_000 - 5);
    }

    #[test]
    fn test_fallbacks() {
        let colony = SandboxColony::new(20, 20).with_menial(NpcId(1), Coordinate::new(2, 3));
        let scorer = ProximityScorer::default();

        let empty = Job::new(JobId(2), "Nothing");
        assert_eq!(scorer.score(NpcId(1), &empty, &colony), 1);
        assert_eq!(scorer.score(NpcId(1), &job_at(0, 0), &colony), 1);
        assert_eq!(scorer.score(NpcId(1), &job_at(-1, -1), &colony), 1);
        assert_eq!(scorer.score(NpcId(9), &job_at(5, 5), &colony), 1);
    }

    #[test]
    fn test_tool_penalty() {
        let mut colony = SandboxColony::new(20, 20)
            .with_menial(NpcId(1), Coordinate::new(5, 5))
            .with_menial(NpcId(2), Coordinate::new(5, 5));
        colony.wield(NpcId(2), ItemCategory(3));
        let job = job_at(5, 6).with_required_tool(ItemCategory(3));
        let scorer = ProximityScorer::default();

        assert_eq!(scorer.score(NpcId(1), &job, &colony), 10_000 - 1 - 2_000);
        assert_eq!(scorer.score(NpcId(2), &job, &colony), 10_000 - 1);
    }

    #[test]
    fn test_clamped_to_minimum() {
        let colony = SandboxColony::new(20, 20).with_menial(NpcId(1), Coordinate::new(1, 1));
        let scorer = ProximityScorer::from_config(&DispatchConfig::new().with_base_score(3));
        assert_eq!(scorer.score(NpcId(1), &job_at(10, 10), &colony), MIN_SCORE);
    }
}
