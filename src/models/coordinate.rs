//! Map coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    /// The map origin. Also used as the "no target" sentinel by job producers.
    pub const ORIGIN: Coordinate = Coordinate { x: 0, y: 0 };
    /// Explicitly undefined location.
    pub const UNDEFINED: Coordinate = Coordinate { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`.
    #[inline]
    pub fn distance(self, other: Coordinate) -> i64 {
        i64::from((self.x - other.x).abs()) + i64::from((self.y - other.y).abs())
    }

    /// Whether this is one of the sentinel values rather than a real target.
    #[inline]
    pub fn is_sentinel(self) -> bool {
        self == Self::ORIGIN || self == Self::UNDEFINED
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl From<(i32, i32)> for Coordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        let a = Coordinate::new(0, 0);
        let b = Coordinate::new(3, -4);
        assert_eq!(a.distance(b), 7);
        assert_eq!(b.distance(a), 7);
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn test_sentinels() {
        assert!(Coordinate::ORIGIN.is_sentinel());
        assert!(Coordinate::UNDEFINED.is_sentinel());
        assert!(!Coordinate::new(1, 1).is_sentinel());
        assert_eq!(Coordinate::default(), Coordinate::UNDEFINED);
    }

    #[test]
    fn test_display() {
        assert_eq!(Coordinate::from((2, 5)).to_string(), "(2, 5)");
    }
}
