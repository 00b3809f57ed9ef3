use std::ops::Index;

use crate::{BOARD_SIZE, Position};

/// A fixed 13x13 board of cells.
///
/// Stores elements of type `T` in a flat vector using row-major order
/// (row index is `y`). Access by [`Position`]; anything off the board is
/// reported as `None` rather than wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board<T> {
    cells: Vec<T>,
}

impl<T> Board<T> {
    /// Creates a board whose cells are produced by `f` for every position.
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        Board {
            cells: positions().map(&mut f).collect(),
        }
    }

    #[inline]
    fn index_of(pos: Position) -> Option<usize> {
        if pos.in_bounds() {
            Some((pos.y * BOARD_SIZE + pos.x) as usize)
        } else {
            None
        }
    }

    /// Gets the cell at `pos`, or `None` off the board.
    pub fn get(&self, pos: Position) -> Option<&T> {
        Self::index_of(pos).and_then(|i| self.cells.get(i))
    }

    /// Returns the rows of the board, top (`y = 0`) first.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(BOARD_SIZE as usize)
    }
}

/// Every on-board position in row-major order.
pub fn positions() -> impl Iterator<Item = Position> {
    (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Position { x, y }))
}

impl<T> Index<Position> for Board<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &Self::Output {
        match Self::index_of(pos) {
            Some(idx) => &self.cells[idx],
            None => panic!("Board index {pos} out of bounds"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_board_access_is_rejected() {
        let board = Board::from_fn(|_| true);
        assert!(board.get(Position::new(-1, 0)).is_none());
        assert!(board.get(Position::new(0, BOARD_SIZE)).is_none());
        assert_eq!(board.get(Position::new(12, 12)), Some(&true));
    }

    #[test]
    fn rows_are_row_major() {
        let board = Board::from_fn(|p| p.y * BOARD_SIZE + p.x);
        let rows: Vec<&[i32]> = board.rows().collect();
        assert_eq!(rows.len(), BOARD_SIZE as usize);
        assert_eq!(rows[0][0], 0);
        assert_eq!(rows[1][0], 13);
        assert_eq!(board[Position::new(12, 12)], 168);
        assert_eq!(positions().nth(13), Some(Position::new(0, 1)));
    }
}
