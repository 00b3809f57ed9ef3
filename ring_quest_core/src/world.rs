use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    Equipment, Position,
    geometry::{axis_distance, chebyshev, manhattan},
};

/// The kinds of hostile entities whose surroundings the agent must avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatKind {
    Orc,
    Uruk,
    Nazgul,
    /// A watchtower. Static, but sees further when the ring is worn.
    Tower,
}

impl ThreatKind {
    pub const ALL: [ThreatKind; 4] = [
        ThreatKind::Orc,
        ThreatKind::Uruk,
        ThreatKind::Nazgul,
        ThreatKind::Tower,
    ];

    /// Returns true if a threat of this kind standing at `threat` makes `pos`
    /// deadly for an agent wearing `equipment`.
    ///
    /// The ring shrinks the Orc, Uruk and Nazgul shapes but widens the Tower
    /// shape with the four cells at axis distance 3. The coat beats the ring
    /// against Nazgul and has no effect on towers.
    pub fn endangers(self, threat: Position, pos: Position, equipment: Equipment) -> bool {
        let protected = equipment.ring || equipment.coat;
        match self {
            ThreatKind::Orc => manhattan(threat, pos) <= if protected { 0 } else { 1 },
            ThreatKind::Uruk => manhattan(threat, pos) <= if protected { 1 } else { 2 },
            ThreatKind::Tower => {
                chebyshev(threat, pos) <= 2
                    || (equipment.ring && axis_distance(threat, pos) == Some(3))
            }
            ThreatKind::Nazgul => {
                if equipment.coat {
                    chebyshev(threat, pos) <= 1
                } else if equipment.ring {
                    chebyshev(threat, pos) <= 2 || axis_distance(threat, pos) == Some(3)
                } else {
                    chebyshev(threat, pos) <= 1 || axis_distance(threat, pos) == Some(2)
                }
            }
        }
    }
}

/// What a single perception entry reports about a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SightingKind {
    Threat(ThreatKind),
    /// A cell that must never be entered, whatever the agent wears.
    DangerZone,
    Coat,
    FirstTarget,
    SecondTarget,
}

impl SightingKind {
    /// Decodes the single-letter type code used on the wire.
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'O' => SightingKind::Threat(ThreatKind::Orc),
            'U' => SightingKind::Threat(ThreatKind::Uruk),
            'N' => SightingKind::Threat(ThreatKind::Nazgul),
            'W' => SightingKind::Threat(ThreatKind::Tower),
            'P' => SightingKind::DangerZone,
            'C' => SightingKind::Coat,
            'G' => SightingKind::FirstTarget,
            'M' => SightingKind::SecondTarget,
            _ => return None,
        })
    }

    pub fn code(self) -> char {
        match self {
            SightingKind::Threat(ThreatKind::Orc) => 'O',
            SightingKind::Threat(ThreatKind::Uruk) => 'U',
            SightingKind::Threat(ThreatKind::Nazgul) => 'N',
            SightingKind::Threat(ThreatKind::Tower) => 'W',
            SightingKind::DangerZone => 'P',
            SightingKind::Coat => 'C',
            SightingKind::FirstTarget => 'G',
            SightingKind::SecondTarget => 'M',
        }
    }
}

/// One `(x, y, code)` entry of a perception block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sighting {
    pub position: Position,
    pub kind: SightingKind,
}

impl Sighting {
    pub fn new(position: Position, kind: SightingKind) -> Self {
        Self { position, kind }
    }
}

/// Everything the agent has ever perceived about the board.
///
/// Knowledge only grows: a threat seen once stays recorded for the rest of
/// the episode, even if it has since moved away.
#[derive(Debug, Clone, Default)]
pub struct WorldModel {
    threats: HashMap<ThreatKind, HashSet<Position>>,
    danger_zone: HashSet<Position>,
    coat: Option<Position>,
    first_target: Option<Position>,
    second_target: Option<Position>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a perception block into the model. Nothing is ever removed.
    pub fn update<I>(&mut self, sightings: I)
    where
        I: IntoIterator<Item = Sighting>,
    {
        for Sighting { position, kind } in sightings {
            trace!(%position, code = %kind.code(), "sighting");
            match kind {
                SightingKind::Threat(threat) => {
                    self.threats.entry(threat).or_default().insert(position);
                }
                SightingKind::DangerZone => {
                    self.danger_zone.insert(position);
                }
                SightingKind::Coat => self.coat = Some(position),
                SightingKind::FirstTarget => self.first_target = Some(position),
                SightingKind::SecondTarget => self.second_target = Some(position),
            }
        }
    }

    /// Returns the coat's cell once it has been perceived.
    pub fn coat_location(&self) -> Option<Position> {
        self.coat
    }

    /// Returns the last reported position of a landmark, if any.
    pub fn landmark(&self, kind: SightingKind) -> Option<Position> {
        match kind {
            SightingKind::Coat => self.coat,
            SightingKind::FirstTarget => self.first_target,
            SightingKind::SecondTarget => self.second_target,
            SightingKind::Threat(_) | SightingKind::DangerZone => None,
        }
    }

    /// Returns the known positions of one kind of threat.
    pub fn threats(&self, kind: ThreatKind) -> impl Iterator<Item = Position> + '_ {
        self.threats.get(&kind).into_iter().flatten().copied()
    }

    pub fn danger_zone(&self) -> &HashSet<Position> {
        &self.danger_zone
    }

    /// Decides whether an agent wearing `equipment` may stand on `pos`.
    ///
    /// Bounds come first, then the forbidden zone, then every known threat.
    pub fn is_safe(&self, pos: Position, equipment: Equipment) -> bool {
        if !pos.in_bounds() {
            return false;
        }
        if self.danger_zone.contains(&pos) {
            return false;
        }
        !self.threats.iter().any(|(kind, positions)| {
            positions
                .iter()
                .any(|threat| kind.endangers(*threat, pos, equipment))
        })
    }
}
