//! Per-turn search over agent states.
//!
//! One engine, two frontier disciplines: a best-first queue ordered by
//! `f = g + h` and a plain FIFO queue. Both share the transition generator of
//! [`AgentState::successors`] and the safety filter behind it, and both stop
//! as soon as a state standing on the target is taken off the frontier.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Position, STATE_SPACE_SIZE,
    geometry::manhattan,
    state::{Action, AgentState, STEP_COST},
    world::WorldModel,
};

/// Which frontier discipline to search with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Best-first by `g + manhattan(position, target)`.
    #[default]
    AStar,
    /// First-in first-out with a visited set.
    BreadthFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}', expected 'astar' or 'bfs'")]
pub struct UnknownStrategy(String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "astar" | "a-star" | "a*" => Ok(Strategy::AStar),
            "bfs" | "breadth-first" => Ok(Strategy::BreadthFirst),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::AStar => f.write_str("astar"),
            Strategy::BreadthFirst => f.write_str("bfs"),
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub strategy: Strategy,
    /// Upper bound on frontier insertions per search. A search that hits it
    /// gives up and reports no path.
    pub max_frontier_pushes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_frontier_pushes: 4 * STATE_SPACE_SIZE,
        }
    }
}

impl SearchConfig {
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

/// The answer to "what should I do this turn?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// First step of a shortest route to the target.
    Next(Action),
    /// The start state already stands on the target.
    AtTarget,
    /// No safe route exists with what is currently known.
    NoPath,
}

/// A complete route from the start state to a state on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Visited states, start first, target last.
    pub states: Vec<AgentState>,
}

impl Plan {
    /// Number of transitions along the route.
    pub fn len(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The action leading out of the start state, if the route has one.
    pub fn first_action(&self) -> Option<Action> {
        match self.states.as_slice() {
            [start, next, ..] => Action::between(*start, *next),
            _ => None,
        }
    }

    /// All actions along the route.
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.states
            .windows(2)
            .filter_map(|pair| Action::between(pair[0], pair[1]))
    }
}

type NodeId = usize;

/// A node of the search tree. The parent link is an index into the arena of
/// the search that created it, so the structure cannot form a cycle.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    state: AgentState,
    g: u32,
    h: Option<u32>,
    parent: Option<NodeId>,
}

impl SearchNode {
    fn f(&self) -> u32 {
        self.g.saturating_add(self.h.unwrap_or(0))
    }
}

/// Ordering and deduplication policy of a search.
trait Frontier {
    /// Heuristic estimate attached to new nodes, if the discipline uses one.
    fn estimate(&self, position: Position, target: Position) -> Option<u32>;

    /// Records that `state` was reached at cost `g`. Returns false if the
    /// node should not be queued.
    fn admit(&mut self, state: AgentState, g: u32) -> bool;

    fn push(&mut self, id: NodeId, node: &SearchNode);

    fn pop(&mut self) -> Option<NodeId>;

    /// True if a popped node has been superseded by a cheaper one.
    fn is_stale(&self, _node: &SearchNode) -> bool {
        false
    }
}

#[derive(Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    tie: u64,
    id: NodeId,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        (other.f, other.tie).cmp(&(self.f, self.tie))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct BestFirst {
    open: BinaryHeap<OpenEntry>,
    best_g: HashMap<AgentState, u32>,
    tie: u64,
}

impl Frontier for BestFirst {
    fn estimate(&self, position: Position, target: Position) -> Option<u32> {
        Some(u32::try_from(manhattan(position, target)).unwrap_or(u32::MAX))
    }

    fn admit(&mut self, state: AgentState, g: u32) -> bool {
        match self.best_g.get(&state) {
            Some(&best) if g >= best => false,
            _ => {
                self.best_g.insert(state, g);
                true
            }
        }
    }

    fn push(&mut self, id: NodeId, node: &SearchNode) {
        self.open.push(OpenEntry {
            f: node.f(),
            tie: self.tie,
            id,
        });
        self.tie += 1;
    }

    fn pop(&mut self) -> Option<NodeId> {
        self.open.pop().map(|entry| entry.id)
    }

    fn is_stale(&self, node: &SearchNode) -> bool {
        self.best_g
            .get(&node.state)
            .is_some_and(|&best| best < node.g)
    }
}

#[derive(Debug, Default)]
struct Fifo {
    queue: VecDeque<NodeId>,
    visited: HashSet<AgentState>,
}

impl Frontier for Fifo {
    fn estimate(&self, _position: Position, _target: Position) -> Option<u32> {
        None
    }

    fn admit(&mut self, state: AgentState, _g: u32) -> bool {
        self.visited.insert(state)
    }

    fn push(&mut self, id: NodeId, _node: &SearchNode) {
        self.queue.push_back(id);
    }

    fn pop(&mut self) -> Option<NodeId> {
        self.queue.pop_front()
    }
}

/// Search engine bound to one snapshot of the world model.
#[derive(Debug, Clone, Copy)]
pub struct Search<'w> {
    world: &'w WorldModel,
    config: SearchConfig,
}

impl<'w> Search<'w> {
    pub fn new(world: &'w WorldModel, config: SearchConfig) -> Self {
        Self { world, config }
    }

    /// Returns the first action of a shortest safe route from `start` to
    /// `target`. Equipment does not matter for the goal test.
    pub fn find_next_action(&self, start: AgentState, target: Position) -> SearchOutcome {
        match self.find_plan(start, target) {
            Some(plan) => match plan.first_action() {
                Some(action) => SearchOutcome::Next(action),
                None => SearchOutcome::AtTarget,
            },
            None => SearchOutcome::NoPath,
        }
    }

    /// Computes a full shortest route from `start` to `target`.
    pub fn find_plan(&self, start: AgentState, target: Position) -> Option<Plan> {
        match self.config.strategy {
            Strategy::AStar => self.run(start, target, BestFirst::default()),
            Strategy::BreadthFirst => self.run(start, target, Fifo::default()),
        }
    }

    fn run<F: Frontier>(&self, start: AgentState, target: Position, mut frontier: F) -> Option<Plan> {
        let mut arena: Vec<SearchNode> = Vec::with_capacity(STATE_SPACE_SIZE);
        let root = SearchNode {
            state: start,
            g: 0,
            h: frontier.estimate(start.position, target),
            parent: None,
        };
        frontier.admit(start, 0);
        frontier.push(0, &root);
        arena.push(root);

        let mut expanded = 0usize;
        while let Some(id) = frontier.pop() {
            let node = arena[id];
            if node.state.position == target {
                debug!(
                    strategy = %self.config.strategy,
                    expanded,
                    generated = arena.len(),
                    cost = node.g,
                    "route found"
                );
                return Some(reconstruct(&arena, id));
            }
            if frontier.is_stale(&node) {
                continue;
            }
            expanded += 1;

            for next in node.state.successors(self.world) {
                let g = node.g + STEP_COST;
                if !frontier.admit(next, g) {
                    continue;
                }
                if arena.len() >= self.config.max_frontier_pushes {
                    warn!(
                        limit = self.config.max_frontier_pushes,
                        "frontier limit reached, giving up"
                    );
                    return None;
                }
                let child = SearchNode {
                    state: next,
                    g,
                    h: frontier.estimate(next.position, target),
                    parent: Some(id),
                };
                let child_id = arena.len();
                frontier.push(child_id, &child);
                arena.push(child);
            }
        }

        debug!(
            strategy = %self.config.strategy,
            expanded,
            generated = arena.len(),
            "frontier exhausted"
        );
        None
    }
}

fn reconstruct(arena: &[SearchNode], goal: NodeId) -> Plan {
    let mut states = vec![arena[goal].state];
    let mut current = arena[goal].parent;
    while let Some(id) = current {
        states.push(arena[id].state);
        current = arena[id].parent;
    }
    states.reverse();
    Plan { states }
}

/// Convenience wrapper around [`Search::find_next_action`].
pub fn find_next_action(
    world: &WorldModel,
    start: AgentState,
    target: Position,
    strategy: Strategy,
) -> SearchOutcome {
    Search::new(world, SearchConfig::with_strategy(strategy)).find_next_action(start, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Equipment,
        state::ActionKind,
        world::{Sighting, SightingKind, ThreatKind},
    };

    const STRATEGIES: [Strategy; 2] = [Strategy::AStar, Strategy::BreadthFirst];

    fn plan_len(world: &WorldModel, start: AgentState, target: Position, s: Strategy) -> Option<usize> {
        Search::new(world, SearchConfig::with_strategy(s))
            .find_plan(start, target)
            .map(|p| p.len())
    }

    #[test]
    fn straight_line_on_empty_board() {
        let world = WorldModel::new();
        for strategy in STRATEGIES {
            let outcome =
                find_next_action(&world, AgentState::start(), Position::new(0, 3), strategy);
            let SearchOutcome::Next(action) = outcome else {
                panic!("expected an action, got {outcome:?}");
            };
            assert_eq!(action.kind, ActionKind::Move(Position::new(0, 1)));
            assert_eq!(
                plan_len(&world, AgentState::start(), Position::new(0, 3), strategy),
                Some(3)
            );
        }
    }

    #[test]
    fn standing_on_target() {
        let world = WorldModel::new();
        for strategy in STRATEGIES {
            assert_eq!(
                find_next_action(&world, AgentState::start(), Position::ORIGIN, strategy),
                SearchOutcome::AtTarget
            );
        }
    }

    #[test]
    fn forbidden_target_has_no_path() {
        let mut world = WorldModel::new();
        world.update([Sighting::new(Position::new(4, 4), SightingKind::DangerZone)]);
        for strategy in STRATEGIES {
            assert_eq!(
                find_next_action(&world, AgentState::start(), Position::new(4, 4), strategy),
                SearchOutcome::NoPath
            );
        }
    }

    #[test]
    fn ring_is_worn_to_slip_past_an_uruk() {
        // Column x = 1 is forbidden, so the agent must walk up x = 0, where
        // (0, 2) sits at Manhattan distance 2 from the uruk.
        let mut world = WorldModel::new();
        let mut sightings = vec![Sighting::new(
            Position::new(2, 2),
            SightingKind::Threat(ThreatKind::Uruk),
        )];
        sightings.extend((0..13).map(|y| Sighting::new(Position::new(1, y), SightingKind::DangerZone)));
        world.update(sightings);

        for strategy in STRATEGIES {
            let plan = Search::new(&world, SearchConfig::with_strategy(strategy))
                .find_plan(AgentState::start(), Position::new(0, 4))
                .expect("route exists with the ring");
            assert_eq!(plan.len(), 5);
            assert!(
                plan.states
                    .iter()
                    .any(|s| s.position == Position::new(0, 2) && s.equipment.ring)
            );
        }
    }

    #[test]
    fn both_strategies_agree_on_length_around_threats() {
        let mut world = WorldModel::new();
        world.update([
            Sighting::new(Position::new(3, 3), SightingKind::Threat(ThreatKind::Orc)),
            Sighting::new(Position::new(8, 2), SightingKind::Threat(ThreatKind::Uruk)),
            Sighting::new(Position::new(6, 9), SightingKind::Threat(ThreatKind::Nazgul)),
            Sighting::new(Position::new(10, 6), SightingKind::Threat(ThreatKind::Tower)),
        ]);
        let start = AgentState::start();
        for target in [Position::new(12, 12), Position::new(0, 12), Position::new(12, 0)] {
            let a = plan_len(&world, start, target, Strategy::AStar);
            let b = plan_len(&world, start, target, Strategy::BreadthFirst);
            assert_eq!(a, b, "target {target}");
        }
    }

    #[test]
    fn plan_actions_replay_to_the_target() {
        let mut world = WorldModel::new();
        world.update([Sighting::new(
            Position::new(2, 1),
            SightingKind::Threat(ThreatKind::Orc),
        )]);
        let plan = Search::new(&world, SearchConfig::default())
            .find_plan(AgentState::start(), Position::new(4, 4))
            .expect("route exists");
        let last = plan.actions().last().expect("non-empty route");
        assert_eq!(last.resulting.position, Position::new(4, 4));
        assert_eq!(plan.actions().count(), plan.len());
        assert!(plan.states.iter().all(|s| world.is_safe(s.position, s.equipment)));
    }

    #[test]
    fn tiny_frontier_limit_gives_up() {
        let world = WorldModel::new();
        let config = SearchConfig {
            strategy: Strategy::BreadthFirst,
            max_frontier_pushes: 3,
        };
        assert_eq!(
            Search::new(&world, config).find_next_action(AgentState::start(), Position::new(12, 12)),
            SearchOutcome::NoPath
        );
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("astar".parse::<Strategy>(), Ok(Strategy::AStar));
        assert_eq!("BFS".parse::<Strategy>(), Ok(Strategy::BreadthFirst));
        assert!("dfs".parse::<Strategy>().is_err());
        assert_eq!(Strategy::BreadthFirst.to_string(), "bfs");
    }

    #[test]
    fn start_equipment_is_carried_into_the_action() {
        let world = WorldModel::new();
        let start = AgentState::new(Position::ORIGIN, Equipment::new(true, true));
        let SearchOutcome::Next(action) =
            find_next_action(&world, start, Position::new(2, 0), Strategy::AStar)
        else {
            panic!("expected an action");
        };
        assert_eq!(action.resulting.equipment, Equipment::new(true, true));
    }
}
