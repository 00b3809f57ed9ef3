use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod geometry;
pub mod map;
pub mod protocol;
pub mod search;
pub mod session;
pub mod state;
pub mod world;

/// Side length of the square board.
pub const BOARD_SIZE: i32 = 13;

/// Number of distinct agent states the search can ever visit
/// (every cell times both equipment bits).
pub const STATE_SPACE_SIZE: usize = (BOARD_SIZE * BOARD_SIZE * 4) as usize;

/// Represents a 2D coordinate on the board.
///
/// Coordinates are signed so that a step off the edge is still a value the
/// safety predicate can reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell every episode starts from.
    pub const ORIGIN: Position = Position::new(0, 0);

    /// Returns true if the position lies on the 13x13 board.
    #[inline]
    pub fn in_bounds(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }

    /// Returns the position shifted by `(dx, dy)`, which may be off the board.
    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The two protective items the agent can carry.
///
/// The ring can be put on and taken off at will; the coat is picked up by
/// walking onto its cell and is never removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Equipment {
    pub ring: bool,
    pub coat: bool,
}

impl Equipment {
    pub const NONE: Equipment = Equipment {
        ring: false,
        coat: false,
    };

    pub const fn new(ring: bool, coat: bool) -> Self {
        Self { ring, coat }
    }

    /// All four equipment combinations, ring-major.
    pub const ALL: [Equipment; 4] = [
        Equipment::new(false, false),
        Equipment::new(false, true),
        Equipment::new(true, false),
        Equipment::new(true, true),
    ];
}
