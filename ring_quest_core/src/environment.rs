use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    BOARD_SIZE, Equipment, Position,
    agent::{Agent, Planner},
    geometry::manhattan,
    map::{Board, positions},
    protocol::Command,
    search::SearchConfig,
    state::MOVE_DIRECTIONS,
    world::{Sighting, SightingKind, ThreatKind},
};

/// Commands an episode may take before it is cut off.
pub const DEFAULT_COMMAND_LIMIT: u32 = 1000;

/// Represents errors in map definitions and suites.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("position ({x}, {y}) of {what} is off the board")]
    OffBoard { what: &'static str, x: i32, y: i32 },
    #[error("unknown enemy kind '{0}'")]
    UnknownEnemy(String),
    #[error("unknown map code '{code}' at ({x}, {y})")]
    UnknownCode { code: String, x: usize, y: usize },
    #[error("map must have {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("map rows must have {expected} cells, row {row} has {found}")]
    BadShape {
        expected: usize,
        row: usize,
        found: usize,
    },
    #[error("map has no '{0}'")]
    MissingItem(char),
    #[error("map has more than one '{0}'")]
    DuplicateItem(char),
    #[error("perception variant must be 1 or 2, got {0}")]
    BadVariant(u8),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A hostile entity placed on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Enemy {
    pub kind: ThreatKind,
    pub position: Position,
}

impl Enemy {
    pub fn code(&self) -> char {
        SightingKind::Threat(self.kind).code()
    }
}

/// The ground truth of one puzzle: where everything really is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMap", into = "RawMap")]
pub struct MapDefinition {
    pub first_target: Position,
    pub second_target: Position,
    pub coat: Position,
    pub enemies: Vec<Enemy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEnemy {
    kind: String,
    x: i32,
    y: i32,
}

/// On-disk layout: `{"g": [x, y], "m": [x, y], "c": [x, y], "enemies": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMap {
    g: [i32; 2],
    m: [i32; 2],
    c: [i32; 2],
    enemies: Vec<RawEnemy>,
}

fn on_board(what: &'static str, [x, y]: [i32; 2]) -> Result<Position, MapError> {
    let pos = Position::new(x, y);
    if pos.in_bounds() {
        Ok(pos)
    } else {
        Err(MapError::OffBoard { what, x, y })
    }
}

fn threat_from_code(code: &str) -> Option<ThreatKind> {
    let mut chars = code.chars();
    match (chars.next().and_then(SightingKind::from_code), chars.next()) {
        (Some(SightingKind::Threat(kind)), None) => Some(kind),
        _ => None,
    }
}

impl TryFrom<RawMap> for MapDefinition {
    type Error = MapError;

    fn try_from(raw: RawMap) -> Result<Self, Self::Error> {
        let enemies = raw
            .enemies
            .into_iter()
            .map(|e| -> Result<Enemy, MapError> {
                let kind = threat_from_code(&e.kind).ok_or(MapError::UnknownEnemy(e.kind))?;
                Ok(Enemy {
                    kind,
                    position: on_board("enemy", [e.x, e.y])?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MapDefinition {
            first_target: on_board("first target", raw.g)?,
            second_target: on_board("second target", raw.m)?,
            coat: on_board("coat", raw.c)?,
            enemies,
        })
    }
}

impl From<MapDefinition> for RawMap {
    fn from(map: MapDefinition) -> Self {
        let pair = |p: Position| [p.x, p.y];
        RawMap {
            g: pair(map.first_target),
            m: pair(map.second_target),
            c: pair(map.coat),
            enemies: map
                .enemies
                .iter()
                .map(|e| RawEnemy {
                    kind: e.code().to_string(),
                    x: e.position.x,
                    y: e.position.y,
                })
                .collect(),
        }
    }
}

impl MapDefinition {
    pub fn enemy_at(&self, pos: Position) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.position == pos)
    }

    /// Generates a random puzzle whose start cell is safe without gear.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> MapDefinition {
        loop {
            let mut taken: HashSet<Position> = HashSet::from([Position::ORIGIN]);
            let mut free_cell = |rng: &mut R| loop {
                let pos = Position::new(
                    rng.random_range(0..BOARD_SIZE),
                    rng.random_range(0..BOARD_SIZE),
                );
                if taken.insert(pos) {
                    return pos;
                }
            };
            let enemy_count = rng.random_range(2..=6);
            let enemies: Vec<Enemy> = (0..enemy_count)
                .map(|_| Enemy {
                    kind: ThreatKind::ALL[rng.random_range(0..ThreatKind::ALL.len())],
                    position: free_cell(rng),
                })
                .collect();
            let map = MapDefinition {
                first_target: free_cell(rng),
                second_target: free_cell(rng),
                coat: free_cell(rng),
                enemies,
            };
            if !HazardMasks::new(&map).is_hazard(Position::ORIGIN, Equipment::NONE) {
                return map;
            }
        }
    }
}

/// Perception radius setting announced in the first line of an episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Variant {
    /// Sees the 8 surrounding cells.
    #[default]
    Near,
    /// Sees every cell within Chebyshev distance 2.
    Far,
}

impl Variant {
    pub fn radius(self) -> i32 {
        match self {
            Variant::Near => 1,
            Variant::Far => 2,
        }
    }
}

impl TryFrom<u8> for Variant {
    type Error = MapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Variant::Near),
            2 => Ok(Variant::Far),
            other => Err(MapError::BadVariant(other)),
        }
    }
}

impl From<Variant> for u8 {
    fn from(variant: Variant) -> Self {
        variant.radius() as u8
    }
}

/// One entry of a test suite file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub variant: Variant,
    pub map: MapDefinition,
}

/// Parses a suite: either a JSON array of cases or one JSON object per line.
pub fn load_suite(text: &str) -> Result<Vec<TestCase>, MapError> {
    let text = text.trim();
    if text.starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(MapError::from))
        .collect()
}

/// Loads a map from 13 rows of 13 whitespace separated tokens. Row index is
/// `y`, token index is `x`.
///
/// `.` is empty ground (`S` may mark the start at the origin), `O U N W` are
/// enemies and `G C M` the first target, the coat and the second target.
pub fn load_map_from_string(map_string: &str) -> Result<MapDefinition, MapError> {
    let size = BOARD_SIZE as usize;
    let rows: Vec<Vec<&str>> = map_string
        .trim()
        .lines()
        .map(|line| line.split_whitespace().collect())
        .collect();
    if rows.len() != size {
        return Err(MapError::RowCount {
            expected: size,
            found: rows.len(),
        });
    }

    let mut first_target = None;
    let mut second_target = None;
    let mut coat = None;
    let mut enemies = Vec::new();
    for (y, row) in rows.iter().enumerate() {
        if row.len() != size {
            return Err(MapError::BadShape {
                expected: size,
                row: y,
                found: row.len(),
            });
        }
        for (x, token) in row.iter().enumerate() {
            let pos = Position::new(x as i32, y as i32);
            let slot = match *token {
                "." => None,
                "S" if pos == Position::ORIGIN => None,
                "G" => Some(&mut first_target),
                "M" => Some(&mut second_target),
                "C" => Some(&mut coat),
                code => {
                    let kind = threat_from_code(code).ok_or_else(|| MapError::UnknownCode {
                        code: code.to_string(),
                        x,
                        y,
                    })?;
                    enemies.push(Enemy {
                        kind,
                        position: pos,
                    });
                    None
                }
            };
            if let Some(slot) = slot {
                if slot.replace(pos).is_some() {
                    return Err(MapError::DuplicateItem(token.chars().next().unwrap_or('?')));
                }
            }
        }
    }

    Ok(MapDefinition {
        first_target: first_target.ok_or(MapError::MissingItem('G'))?,
        second_target: second_target.ok_or(MapError::MissingItem('M'))?,
        coat: coat.ok_or(MapError::MissingItem('C'))?,
        enemies,
    })
}

/// Renders a map as text with an optional hazard overlay (`*`).
pub fn render_ascii(map: &MapDefinition, hazards: Option<&Board<bool>>) -> String {
    let board = Board::from_fn(|pos| {
        if pos == Position::ORIGIN {
            'S'
        } else if let Some(enemy) = map.enemy_at(pos) {
            enemy.code()
        } else if pos == map.first_target {
            'G'
        } else if pos == map.coat {
            'C'
        } else if pos == map.second_target {
            'M'
        } else if hazards.is_some_and(|h| h[pos]) {
            '*'
        } else {
            '.'
        }
    });
    let mut out = String::from("   ");
    for x in 0..BOARD_SIZE {
        out.push_str(&format!("{x:>3}"));
    }
    for (y, row) in board.rows().enumerate() {
        out.push_str(&format!("\n{y:>2} "));
        for cell in row {
            out.push_str(&format!("{cell:>3}"));
        }
    }
    out
}

/// Deadly cells of a map for each equipment combination.
#[derive(Debug, Clone)]
pub struct HazardMasks {
    masks: [Board<bool>; 4],
}

impl HazardMasks {
    pub fn new(map: &MapDefinition) -> Self {
        let mask = |equipment: Equipment| {
            Board::from_fn(|pos| {
                map.enemies.iter().any(|enemy| {
                    enemy.position == pos || enemy.kind.endangers(enemy.position, pos, equipment)
                })
            })
        };
        Self {
            masks: Equipment::ALL.map(mask),
        }
    }

    fn slot(equipment: Equipment) -> usize {
        usize::from(equipment.ring) * 2 + usize::from(equipment.coat)
    }

    pub fn mask(&self, equipment: Equipment) -> &Board<bool> {
        &self.masks[Self::slot(equipment)]
    }

    /// True for deadly or off-board cells.
    pub fn is_hazard(&self, pos: Position, equipment: Equipment) -> bool {
        self.mask(equipment).get(pos).copied().unwrap_or(true)
    }
}

/// Shortest route lengths found by the reference solver, counted in moves.
/// Ring toggles are free for the reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDistances {
    pub to_first: Option<u32>,
    pub to_second: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SolverState {
    position: Position,
    equipment: Equipment,
    met_first: bool,
}

/// Solves the map with full knowledge (0-1 BFS over position, equipment and
/// whether the first target has been met).
pub fn reference_distances(map: &MapDefinition, hazards: &HazardMasks) -> ReferenceDistances {
    let start = SolverState {
        position: Position::ORIGIN,
        equipment: Equipment::NONE,
        met_first: false,
    };
    let mut dist: HashMap<SolverState, u32> = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([start]);

    while let Some(state) = queue.pop_front() {
        let moves = dist[&state];

        let toggled = SolverState {
            equipment: Equipment {
                ring: !state.equipment.ring,
                ..state.equipment
            },
            ..state
        };
        if !hazards.is_hazard(toggled.position, toggled.equipment)
            && dist.get(&toggled).is_none_or(|&d| moves < d)
        {
            dist.insert(toggled, moves);
            queue.push_front(toggled);
        }

        for (dx, dy) in MOVE_DIRECTIONS {
            let position = state.position.offset(dx, dy);
            let equipment = Equipment {
                coat: state.equipment.coat || position == map.coat,
                ..state.equipment
            };
            if hazards.is_hazard(position, equipment) {
                continue;
            }
            let next = SolverState {
                position,
                equipment,
                met_first: state.met_first || position == map.first_target,
            };
            if dist.get(&next).is_none_or(|&d| moves + 1 < d) {
                dist.insert(next, moves + 1);
                queue.push_back(next);
            }
        }
    }

    let best = |target: Position| {
        dist.iter()
            .filter(|(s, _)| s.met_first && s.position == target)
            .map(|(_, &d)| d)
            .min()
    };
    ReferenceDistances {
        to_first: best(map.first_target),
        to_second: best(map.second_target),
    }
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    InvalidCommand,
    MoveOutOfBounds,
    NonAdjacentMove,
    SteppedIntoHazard,
    RingAlreadyOn,
    RingAlreadyOff,
    ToggleIntoHazard,
    FalseUnsolvable,
    EndedWithoutGoal,
    WrongLength,
    StepLimit,
    AgentError,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Ok => "ok",
            Outcome::InvalidCommand => "invalid_command",
            Outcome::MoveOutOfBounds => "move_out_of_bounds",
            Outcome::NonAdjacentMove => "non_adjacent_move",
            Outcome::SteppedIntoHazard => "stepped_into_hazard",
            Outcome::RingAlreadyOn => "ring_already_on",
            Outcome::RingAlreadyOff => "ring_already_off",
            Outcome::ToggleIntoHazard => "toggle_into_hazard",
            Outcome::FalseUnsolvable => "false_unsolvable",
            Outcome::EndedWithoutGoal => "ended_without_goal",
            Outcome::WrongLength => "wrong_length",
            Outcome::StepLimit => "step_limit",
            Outcome::AgentError => "agent_error",
        };
        f.write_str(name)
    }
}

/// Summary of a finished episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub success: bool,
    pub outcome: Outcome,
    pub moves: u32,
    pub toggles: u32,
    /// The `n` of a final `e n` line, if the agent sent a non-negative one.
    pub reported_length: Option<u32>,
    pub claimed_unsolvable: bool,
    pub solvable: bool,
    pub reference: ReferenceDistances,
    /// Every line the agent sent.
    pub log: Vec<String>,
}

/// Briefing sent before the first turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Briefing {
    pub variant: Variant,
    pub first_target: Position,
    pub sightings: Vec<Sighting>,
}

/// Represents the result of processing one agent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// The turn was legal; here is what the agent sees now, plus the second
    /// target if the agent just met the first one.
    Perception {
        sightings: Vec<Sighting>,
        revealed: Option<Position>,
    },
    /// The episode is over.
    Over(RunReport),
}

/// The interactor: holds the true map, validates the agent's commands and
/// answers each legal one with fresh perception.
pub struct Environment {
    map: MapDefinition,
    variant: Variant,
    hazards: HazardMasks,
    reference: ReferenceDistances,
    position: Position,
    equipment: Equipment,
    first_met: bool,
    coat_taken: bool,
    moves: u32,
    toggles: u32,
    command_limit: u32,
    log: Vec<String>,
    report: Option<RunReport>,
}

impl Environment {
    /// Creates an environment with the agent at the origin, nothing equipped.
    pub fn new(map: MapDefinition, variant: Variant) -> Self {
        let hazards = HazardMasks::new(&map);
        let reference = reference_distances(&map, &hazards);
        Environment {
            map,
            variant,
            hazards,
            reference,
            position: Position::ORIGIN,
            equipment: Equipment::NONE,
            first_met: false,
            coat_taken: false,
            moves: 0,
            toggles: 0,
            command_limit: DEFAULT_COMMAND_LIMIT,
            log: Vec::new(),
            report: None,
        }
    }

    pub fn with_command_limit(mut self, limit: u32) -> Self {
        self.command_limit = limit;
        self
    }

    pub fn map(&self) -> &MapDefinition {
        &self.map
    }
    pub fn hazards(&self) -> &HazardMasks {
        &self.hazards
    }
    pub fn reference(&self) -> ReferenceDistances {
        self.reference
    }
    pub fn position(&self) -> Position {
        self.position
    }
    pub fn equipment(&self) -> Equipment {
        self.equipment
    }
    pub fn first_met(&self) -> bool {
        self.first_met
    }
    pub fn coat_taken(&self) -> bool {
        self.coat_taken
    }
    pub fn commands(&self) -> u32 {
        self.moves + self.toggles
    }
    pub fn log(&self) -> &[String] {
        &self.log
    }
    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    pub fn briefing(&self) -> Briefing {
        Briefing {
            variant: self.variant,
            first_target: self.map.first_target,
            sightings: self.perception(),
        }
    }

    /// What the agent sees from where it stands: every cell within the
    /// variant's radius except its own, reporting an enemy, else an item
    /// still in play, else `P` if deadly under the current equipment.
    pub fn perception(&self) -> Vec<Sighting> {
        let radius = self.variant.radius();
        let mut items = Vec::with_capacity(3);
        if !self.first_met {
            items.push((self.map.first_target, SightingKind::FirstTarget));
        }
        if !self.coat_taken {
            items.push((self.map.coat, SightingKind::Coat));
        }
        if self.first_met {
            items.push((self.map.second_target, SightingKind::SecondTarget));
        }

        let mut sightings = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let pos = self.position.offset(dx, dy);
                if (dx, dy) == (0, 0) || !pos.in_bounds() {
                    continue;
                }
                let kind = if let Some(enemy) = self.map.enemy_at(pos) {
                    Some(SightingKind::Threat(enemy.kind))
                } else if let Some(&(_, kind)) = items.iter().find(|(p, _)| *p == pos) {
                    Some(kind)
                } else if self.hazards.is_hazard(pos, self.equipment) {
                    Some(SightingKind::DangerZone)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    sightings.push(Sighting::new(pos, kind));
                }
            }
        }
        sightings.sort();
        sightings
    }

    fn finish(
        &mut self,
        outcome: Outcome,
        reported_length: Option<u32>,
        claimed_unsolvable: bool,
    ) -> StepResult {
        let solvable = self.reference.to_second.is_some();
        let report = RunReport {
            success: outcome == Outcome::Ok,
            outcome,
            moves: self.moves,
            toggles: self.toggles,
            reported_length,
            claimed_unsolvable,
            solvable,
            reference: self.reference,
            log: self.log.clone(),
        };
        info!(%outcome, moves = self.moves, toggles = self.toggles, "episode over");
        self.report = Some(report.clone());
        StepResult::Over(report)
    }

    fn perceive(&self, revealed: Option<Position>) -> StepResult {
        StepResult::Perception {
            sightings: self.perception(),
            revealed,
        }
    }

    /// Processes one raw line from the agent.
    pub fn process_line(&mut self, line: &str) -> StepResult {
        match line.parse::<Command>() {
            Ok(command) => self.process_command(command),
            Err(err) => {
                debug!(%err, "unreadable command");
                self.log.push(line.trim().to_string());
                self.finish(Outcome::InvalidCommand, None, false)
            }
        }
    }

    /// Processes a single command from the agent.
    pub fn process_command(&mut self, command: Command) -> StepResult {
        if let Some(report) = &self.report {
            return StepResult::Over(report.clone());
        }
        self.log.push(command.to_string());
        debug!(%command, position = %self.position, "agent command");

        match command {
            Command::Move(target) => {
                if !target.in_bounds() {
                    return self.finish(Outcome::MoveOutOfBounds, None, false);
                }
                if manhattan(self.position, target) != 1 {
                    return self.finish(Outcome::NonAdjacentMove, None, false);
                }
                let equipment = Equipment {
                    coat: self.equipment.coat || target == self.map.coat,
                    ..self.equipment
                };
                if self.hazards.is_hazard(target, equipment) {
                    return self.finish(Outcome::SteppedIntoHazard, None, false);
                }
                self.position = target;
                self.equipment = equipment;
                self.moves += 1;
                if !self.coat_taken && target == self.map.coat {
                    self.coat_taken = true;
                }
                let mut revealed = None;
                if !self.first_met && target == self.map.first_target {
                    self.first_met = true;
                    revealed = Some(self.map.second_target);
                }
                self.check_limit().unwrap_or_else(|| self.perceive(revealed))
            }
            Command::RingOn | Command::RingOff => {
                let wear = command == Command::RingOn;
                if self.equipment.ring == wear {
                    let outcome = if wear {
                        Outcome::RingAlreadyOn
                    } else {
                        Outcome::RingAlreadyOff
                    };
                    return self.finish(outcome, None, false);
                }
                let equipment = Equipment {
                    ring: wear,
                    ..self.equipment
                };
                if self.hazards.is_hazard(self.position, equipment) {
                    return self.finish(Outcome::ToggleIntoHazard, None, false);
                }
                self.equipment = equipment;
                self.toggles += 1;
                self.check_limit().unwrap_or_else(|| self.perceive(None))
            }
            Command::GiveUp => {
                let outcome = if self.reference.to_second.is_some() {
                    Outcome::FalseUnsolvable
                } else {
                    Outcome::Ok
                };
                self.finish(outcome, None, true)
            }
            Command::Finish(reported) => {
                let outcome = if !(self.first_met && self.position == self.map.second_target) {
                    Outcome::EndedWithoutGoal
                } else {
                    // graded against the full-knowledge optimum, ring toggles free
                    match self.reference.to_second {
                        Some(optimum) if reported != optimum => {
                            debug!(
                                reported,
                                optimum,
                                commands = self.commands(),
                                "not the optimal length"
                            );
                            Outcome::WrongLength
                        }
                        _ => Outcome::Ok,
                    }
                };
                self.finish(outcome, Some(reported), false)
            }
        }
    }

    fn check_limit(&mut self) -> Option<StepResult> {
        (self.commands() >= self.command_limit).then(|| self.finish(Outcome::StepLimit, None, false))
    }

    /// Asks the agent for one command and feeds it the answer. Returns the
    /// report once the episode is over.
    pub fn step<A: Agent + ?Sized>(&mut self, agent: &mut A) -> Option<&RunReport> {
        if self.report.is_none() {
            let command = agent.next_command();
            if let StepResult::Perception {
                sightings,
                revealed,
            } = self.process_command(command)
            {
                let delivered = agent.observe(&sightings).and_then(|()| match revealed {
                    Some(target) => agent.reveal_second_target(target),
                    None => Ok(()),
                });
                if let Err(err) = delivered {
                    debug!(%err, "agent rejected perception");
                    self.finish(Outcome::AgentError, None, false);
                }
            }
        }
        self.report.as_ref()
    }

    /// Runs the episode to the end. The agent must already have been briefed.
    pub fn run_episode<A: Agent + ?Sized>(&mut self, agent: &mut A) -> RunReport {
        loop {
            if let Some(report) = self.step(agent) {
                return report.clone();
            }
        }
    }
}

/// Builds a briefed [`Planner`] for an environment.
pub fn briefed_planner(environment: &Environment, config: SearchConfig) -> Planner {
    let briefing = environment.briefing();
    let mut planner = Planner::new(briefing.first_target, config);
    // A fresh planner is idle, so the initial block is always accepted.
    let _ = planner.observe(&briefing.sightings);
    planner
}

/// Plays one map with the built-in planner.
pub fn simulate(map: &MapDefinition, variant: Variant, config: SearchConfig) -> RunReport {
    let mut environment = Environment::new(map.clone(), variant);
    let mut planner = briefed_planner(&environment, config);
    environment.run_episode(&mut planner)
}

/// Every on-board cell that is deadly under `equipment`.
pub fn hazard_cells(hazards: &HazardMasks, equipment: Equipment) -> impl Iterator<Item = Position> + '_ {
    positions().filter(move |&p| hazards.is_hazard(p, equipment))
}
