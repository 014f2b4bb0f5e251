//! Maximum-weight bipartite matching.
//!
//! Assigns every row of a square score matrix to a distinct column so that
//! the total score is maximal. Rows are workers, columns are jobs; the
//! manager pads the smaller side so the matrix is always square.
//!
//! # Algorithm
//!
//! Kuhn-Munkres (Hungarian method) in its O(n³) labelling form: feasible
//! vertex labels `lx`, `ly` with `lx[x] + ly[y] >= w(x, y)`, BFS over the
//! equality subgraph for an augmenting path, and slack tightening when the
//! search stalls.
//!
//! # References
//!
//! - Kuhn (1955), "The Hungarian Method for the Assignment Problem"
//! - Munkres (1957), "Algorithms for the Assignment and Transportation Problems"

mod hungarian;
mod matrix;

pub use hungarian::{find_best_matching, total_score};
pub use matrix::CostMatrix;
