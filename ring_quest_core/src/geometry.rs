//! Distance functions on the grid.

use crate::Position;

/// Manhattan (von Neumann) distance: `|dx| + |dy|`.
///
/// Widened to `u64` so coordinates anywhere in `i32` never overflow.
#[inline]
pub fn manhattan(a: Position, b: Position) -> u64 {
    u64::from(a.x.abs_diff(b.x)) + u64::from(a.y.abs_diff(b.y))
}

/// Chebyshev (Moore) distance: `max(|dx|, |dy|)`.
#[inline]
pub fn chebyshev(a: Position, b: Position) -> u64 {
    u64::from(a.x.abs_diff(b.x).max(a.y.abs_diff(b.y)))
}

/// Returns the distance between `a` and `b` if they share a row or a column,
/// `None` otherwise.
#[inline]
pub fn axis_distance(a: Position, b: Position) -> Option<u64> {
    match (a.x.abs_diff(b.x), a.y.abs_diff(b.y)) {
        (0, d) | (d, 0) => Some(u64::from(d)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_on_a_diagonal() {
        let a = Position::new(2, 3);
        let b = Position::new(5, 7);
        assert_eq!(manhattan(a, b), 7);
        assert_eq!(chebyshev(a, b), 4);
        assert_eq!(axis_distance(a, b), None);
    }

    #[test]
    fn distances_are_symmetric() {
        let a = Position::new(0, 12);
        let b = Position::new(12, 0);
        assert_eq!(manhattan(a, b), manhattan(b, a));
        assert_eq!(chebyshev(a, b), chebyshev(b, a));
    }

    #[test]
    fn axis_distance_only_on_shared_lines() {
        let c = Position::new(6, 6);
        assert_eq!(axis_distance(c, Position::new(6, 9)), Some(3));
        assert_eq!(axis_distance(c, Position::new(3, 6)), Some(3));
        assert_eq!(axis_distance(c, c), Some(0));
        assert_eq!(axis_distance(c, Position::new(7, 9)), None);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let low = Position::new(i32::MIN, i32::MIN);
        let high = Position::new(i32::MAX, i32::MAX);
        assert_eq!(manhattan(low, high), 2 * u64::from(u32::MAX));
        assert_eq!(chebyshev(low, Position::ORIGIN), 1 << 31);
        assert_eq!(
            axis_distance(Position::new(i32::MIN, 0), Position::new(i32::MAX, 0)),
            Some(u64::from(u32::MAX))
        );
    }
}
