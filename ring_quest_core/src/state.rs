use serde::{Deserialize, Serialize};

use crate::{Equipment, Position, world::WorldModel};

/// Cost of every transition, moves and ring toggles alike.
pub const STEP_COST: u32 = 1;

/// Move directions in generation order: (0,+1), (0,-1), (+1,0), (-1,0).
pub const MOVE_DIRECTIONS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Position plus equipment. Two states are the same search node only if all
/// three parts match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub equipment: Equipment,
}

impl AgentState {
    pub const fn new(position: Position, equipment: Equipment) -> Self {
        Self {
            position,
            equipment,
        }
    }

    /// The state every episode starts in: the origin, nothing equipped.
    pub const fn start() -> Self {
        Self::new(Position::ORIGIN, Equipment::NONE)
    }

    /// Moves by `(dx, dy)`, picking up the coat if the destination is its
    /// known cell. The result may be off the board.
    pub fn moved(&self, dx: i32, dy: i32, coat: Option<Position>) -> AgentState {
        let position = self.position.offset(dx, dy);
        let picks_up_coat = coat == Some(position);
        AgentState {
            position,
            equipment: Equipment {
                ring: self.equipment.ring,
                coat: self.equipment.coat || picks_up_coat,
            },
        }
    }

    /// Flips the ring in place.
    pub fn ring_toggled(&self) -> AgentState {
        AgentState {
            position: self.position,
            equipment: Equipment {
                ring: !self.equipment.ring,
                coat: self.equipment.coat,
            },
        }
    }

    /// Yields every safe successor in fixed order: the four moves, then the
    /// ring toggle.
    pub fn successors<'w>(&self, world: &'w WorldModel) -> impl Iterator<Item = AgentState> + 'w {
        let coat = world.coat_location();
        let current = *self;
        MOVE_DIRECTIONS
            .into_iter()
            .map(move |(dx, dy)| current.moved(dx, dy, coat))
            .chain(std::iter::once(current.ring_toggled()))
            .filter(move |next| world.is_safe(next.position, next.equipment))
    }
}

/// The kind of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Step to the given absolute cell.
    Move(Position),
    /// Put the ring on (`true`) or take it off (`false`).
    ToggleRing(bool),
}

/// One turn of the agent together with the state it leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub resulting: AgentState,
}

impl Action {
    /// Recovers the action that turns `from` into `to`, which must be one
    /// transition apart.
    pub fn between(from: AgentState, to: AgentState) -> Option<Action> {
        let kind = if from.position != to.position {
            ActionKind::Move(to.position)
        } else if from.equipment.ring != to.equipment.ring {
            ActionKind::ToggleRing(to.equipment.ring)
        } else {
            return None;
        };
        Some(Action {
            kind,
            resulting: to,
        })
    }
}
