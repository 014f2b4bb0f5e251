//! Dense square score matrix.

/// Row-major `n × n` matrix of `i64` scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    size: usize,
    cells: Vec<i64>,
}

impl CostMatrix {
    /// Creates an `n × n` matrix with every cell set to `value`.
    pub fn filled(size: usize, value: i64) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    /// Builds a matrix from rows. Returns `None` unless the rows form a square.
    pub fn from_rows(rows: &[Vec<i64>]) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }
        Some(Self {
            size,
            cells: rows.iter().flatten().copied().collect(),
        })
    }

    /// Side length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.size + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        self.cells[row * self.size + col] = value;
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[i64] {
        &self.cells[row * self.size..(row + 1) * self.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_and_set() {
        let mut m = CostMatrix::filled(3, 1);
        assert_eq!(m.size(), 3);
        assert_eq!(m.get(2, 2), 1);

        m.set(1, 2, 42);
        assert_eq!(m.get(1, 2), 42);
        assert_eq!(m.row(1), &[1, 1, 42]);
    }

    #[test]
    fn test_from_rows() {
        let m = CostMatrix::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(m.get(1, 0), 3);
        assert!(CostMatrix::from_rows(&[vec![1, 2], vec![3]]).is_none());
        assert!(CostMatrix::from_rows(&[]).unwrap().is_empty());
    }
}
