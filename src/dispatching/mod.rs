//! Worker/job scoring for assignment batches.
//!
//! An `AssignmentScorer` rates how well a worker fits a job; the manager
//! fills one score matrix per worker class with it and hands the matrix to
//! the matcher, which maximises the total.
//!
//! # Usage
//!
//! ```
//! use u_jobs::dispatching::{AssignmentScorer, ProximityScorer};
//! use u_jobs::DispatchConfig;
//!
//! let scorer = ProximityScorer::from_config(&DispatchConfig::default());
//! assert_eq!(scorer.name(), "PROXIMITY");
//! ```
//!
//! # Score Convention
//! **Higher score = better fit.** Scores are strictly positive so that a
//! real pairing never loses to a padding cell.

mod batch;
mod scorer;

pub use batch::score_matrix;
pub use scorer::ProximityScorer;

use crate::colony::Colony;
use crate::models::{Job, NpcId};
use std::fmt::Debug;

/// Score returned by an assignment scorer.
pub type AssignmentScore = i64;

/// Lowest score a real worker/job cell may carry.
pub const MIN_SCORE: AssignmentScore = 1;

/// Rates a worker for a job.
pub trait AssignmentScorer: Debug {
    /// Scorer name (e.g., "PROXIMITY").
    fn name(&self) -> &'static str;

    /// Scores `npc` for `job`. Must be at least `MIN_SCORE`.
    fn score(&self, npc: NpcId, job: &Job, colony: &dyn Colony) -> AssignmentScore;

    /// Scorer description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
