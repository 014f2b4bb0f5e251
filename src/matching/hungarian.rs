//! Kuhn-Munkres labelling algorithm.

use std::collections::VecDeque;

use super::CostMatrix;

/// Alternating tree grown from one free row during a search phase.
struct Tree {
    in_s: Vec<bool>,
    in_t: Vec<bool>,
    /// Row that discovered each row; `None` for the root.
    prev: Vec<Option<usize>>,
    /// `min over x in S of lx[x] + ly[y] - w(x, y)` for every column.
    slack: Vec<i64>,
    /// Row achieving `slack[y]`.
    slackx: Vec<usize>,
    queue: VecDeque<usize>,
}

impl Tree {
    fn new(n: usize, root: usize) -> Self {
        Self {
            in_s: vec![false; n],
            in_t: vec![false; n],
            prev: vec![None; n],
            slack: vec![i64::MAX; n],
            slackx: vec![root; n],
            queue: VecDeque::with_capacity(n),
        }
    }

    fn add_row(&mut self, x: usize, parent: Option<usize>, m: &CostMatrix, lx: &[i64], ly: &[i64]) {
        self.in_s[x] = true;
        self.prev[x] = parent;
        self.queue.push_back(x);
        for y in 0..m.size() {
            let s = lx[x] + ly[y] - m.get(x, y);
            if s < self.slack[y] {
                self.slack[y] = s;
                self.slackx[y] = x;
            }
        }
    }
}

/// Finds the assignment maximising `Σ matrix[i][assignment[i]]`.
///
/// Returns a permutation: `assignment[row]` is the column given to `row`.
/// Deterministic for a given matrix; ties resolve in scan order.
///
/// # Complexity
/// O(n³) time, O(n) extra memory besides the result.
pub fn find_best_matching(matrix: &CostMatrix) -> Vec<usize> {
    let n = matrix.size();
    if n == 0 {
        return Vec::new();
    }

    // Feasible start: each row label is its best score, columns at zero.
    let mut lx: Vec<i64> = (0..n)
        .map(|x| matrix.row(x).iter().copied().max().unwrap_or(0))
        .collect();
    let mut ly = vec![0i64; n];
    let mut xy: Vec<Option<usize>> = vec![None; n];
    let mut yx: Vec<Option<usize>> = vec![None; n];

    for _ in 0..n {
        let Some(root) = (0..n).find(|&x| xy[x].is_none()) else {
            break;
        };
        let mut tree = Tree::new(n, root);
        tree.add_row(root, None, matrix, &lx, &ly);

        let (end_x, end_y) = 'search: loop {
            while let Some(x) = tree.queue.pop_front() {
                for y in 0..n {
                    if tree.in_t[y] || lx[x] + ly[y] != matrix.get(x, y) {
                        continue;
                    }
                    match yx[y] {
                        None => break 'search (x, y),
                        Some(mate) => {
                            tree.in_t[y] = true;
                            tree.add_row(mate, Some(x), matrix, &lx, &ly);
                        }
                    }
                }
            }

            // Stalled: tighten labels by the smallest slack outside T.
            let delta = (0..n)
                .filter(|&y| !tree.in_t[y])
                .map(|y| tree.slack[y])
                .min()
                .unwrap_or(0);
            for x in 0..n {
                if tree.in_s[x] {
                    lx[x] -= delta;
                }
            }
            for y in 0..n {
                if tree.in_t[y] {
                    ly[y] += delta;
                } else {
                    tree.slack[y] -= delta;
                }
            }

            // Columns that just entered the equality subgraph.
            for y in 0..n {
                if tree.in_t[y] || tree.slack[y] != 0 {
                    continue;
                }
                match yx[y] {
                    None => break 'search (tree.slackx[y], y),
                    Some(mate) => {
                        tree.in_t[y] = true;
                        if !tree.in_s[mate] {
                            let parent = tree.slackx[y];
                            tree.add_row(mate, Some(parent), matrix, &lx, &ly);
                        }
                    }
                }
            }
        };

        // Flip matched/unmatched edges along the path back to the root.
        let (mut cx, mut cy) = (end_x, end_y);
        loop {
            let old = xy[cx];
            yx[cy] = Some(cx);
            xy[cx] = Some(cy);
            match (tree.prev[cx], old) {
                (Some(px), Some(py)) => {
                    cx = px;
                    cy = py;
                }
                _ => break,
            }
        }
    }

    xy.into_iter()
        .enumerate()
        .map(|(x, y)| y.unwrap_or(x))
        .collect()
}

/// Sum of the cells selected by `assignment`.
pub fn total_score(matrix: &CostMatrix, assignment: &[usize]) -> i64 {
    assignment
        .iter()
        .enumerate()
        .map(|(row, &col)| matrix.get(row, col))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(matrix: &CostMatrix) -> i64 {
        fn walk(m: &CostMatrix, row: usize, used: &mut Vec<bool>, acc: i64, best: &mut i64) {
            if row == m.size() {
                *best = (*best).max(acc);
                return;
            }
            for col in 0..m.size() {
                if !used[col] {
                    used[col] = true;
                    walk(m, row + 1, used, acc + m.get(row, col), best);
                    used[col] = false;
                }
            }
        }
        let mut best = i64::MIN;
        walk(matrix, 0, &mut vec![false; matrix.size()], 0, &mut best);
        best
    }

    fn is_permutation(assignment: &[usize]) -> bool {
        let mut seen = vec![false; assignment.len()];
        assignment.iter().all(|&c| c < seen.len() && !std::mem::replace(&mut seen[c], true))
    }

    #[test]
    fn test_empty_matrix() {
        assert!(find_best_matching(&CostMatrix::filled(0, 0)).is_empty());
    }

    #[test]
    fn test_single_cell() {
        let m = CostMatrix::filled(1, 7);
        assert_eq!(find_best_matching(&m), vec![0]);
        assert_eq!(total_score(&m, &[0]), 7);
    }

    #[test]
    fn test_prefers_diagonal_total() {
        // Greedy on row 0 would take column 0 (10) and leave 1; optimum is 9 + 9.
        let m = CostMatrix::from_rows(&[vec![10, 9], vec![9, 1]]).unwrap();
        let a = find_best_matching(&m);
        assert_eq!(a, vec![1, 0]);
        assert_eq!(total_score(&m, &a), 18);
    }

    #[test]
    fn test_classic_three_by_three() {
        let m = CostMatrix::from_rows(&[vec![7, 4, 3], vec![3, 1, 2], vec![3, 0, 0]]).unwrap();
        let a = find_best_matching(&m);
        assert!(is_permutation(&a));
        assert_eq!(total_score(&m, &a), brute_force(&m));
    }

    #[test]
    fn test_all_ties_is_permutation() {
        let m = CostMatrix::filled(5, 1);
        let a = find_best_matching(&m);
        assert!(is_permutation(&a));
        assert_eq!(total_score(&m, &a), 5);
        // deterministic
        assert_eq!(a, find_best_matching(&m));
    }

    #[test]
    fn test_negative_scores() {
        let m = CostMatrix::from_rows(&[vec![-5, -1], vec![-2, -8]]).unwrap();
        let a = find_best_matching(&m);
        assert_eq!(a, vec![1, 0]);
        assert_eq!(total_score(&m, &a), -3);
    }

    #[test]
    fn test_matches_brute_force_on_random_matrices() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 1..=8 {
            for _ in 0..20 {
                let mut m = CostMatrix::filled(n, 0);
                for r in 0..n {
                    for c in 0..n {
                        m.set(r, c, rng.random_range(1..=10_000));
                    }
                }
                let a = find_best_matching(&m);
                assert!(is_permutation(&a), "not a permutation for n={n}: {a:?}");
                assert_eq!(total_score(&m, &a), brute_force(&m), "n={n}");
            }
        }
    }

    #[test]
    fn test_padded_matrix_like_dispatch() {
        // Two workers, three jobs: padding row of ones.
        let m = CostMatrix::from_rows(&[
            vec![9_998, 9_982, 9_990],
            vec![9_982, 9_998, 9_985],
            vec![1, 1, 1],
        ])
        .unwrap();
        let a = find_best_matching(&m);
        assert_eq!(a[0], 0);
        assert_eq!(a[1], 1);
        assert_eq!(a[2], 2);
    }
}
