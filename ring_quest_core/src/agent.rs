use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    Position,
    protocol::Command,
    search::{Plan, Search, SearchConfig, SearchOutcome},
    state::{Action, AgentState},
    world::{Sighting, WorldModel},
};

/// Trait defining the behavior of an agent.
/// The interactor feeds it perception and asks it for one command per turn.
pub trait Agent {
    /// Folds one perception block into the agent's knowledge.
    fn observe(&mut self, sightings: &[Sighting]) -> Result<(), PlannerError>;

    /// Tells the agent where the second target is. Sent once, right after the
    /// perception block that follows the arrival on the first target.
    fn reveal_second_target(&mut self, target: Position) -> Result<(), PlannerError>;

    /// Decides the next line to send. Never fails: any internal error is
    /// reported as [`Command::GiveUp`].
    fn next_command(&mut self) -> Command;
}

/// Where the planner is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Ready to decide.
    Idle,
    /// Searching.
    Planning,
    /// An action was adopted; the driver has not confirmed sending it.
    ActionEmitted,
    /// The command is out; the next perception block is due.
    AwaitingPerception,
    /// Perception arrived but the second target's coordinates have not.
    AwaitingReveal,
    /// The episode is over, successfully or not.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    #[error("cannot {operation} while {phase:?}")]
    OutOfTurn {
        operation: &'static str,
        phase: TurnPhase,
    },
    #[error("second target revealed before the first one was reached")]
    UnexpectedReveal,
    #[error("first target reached but the second target was never revealed")]
    MissingSecondTarget,
}

/// What the planner wants to do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Act(Action),
    /// Standing on the second target after this many turns.
    Finished(u32),
    /// No safe route exists.
    GiveUp,
}

/// Everything one turn's search depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnContext {
    pub state: AgentState,
    pub target: Position,
}

impl TurnContext {
    pub fn plan(&self, world: &WorldModel, config: SearchConfig) -> SearchOutcome {
        Search::new(world, config).find_next_action(self.state, self.target)
    }
}

/// The two-stage agent: reach the first target, learn the second, reach it.
///
/// Owns everything that survives between turns: accumulated knowledge, the
/// current state and the step counter. Every turn plans from scratch.
#[derive(Debug, Clone)]
pub struct Planner {
    world: WorldModel,
    state: AgentState,
    first_target: Position,
    second_target: Option<Position>,
    first_reached: bool,
    awaiting_reveal: bool,
    steps: u32,
    phase: TurnPhase,
    config: SearchConfig,
}

impl Planner {
    pub fn new(first_target: Position, config: SearchConfig) -> Self {
        Self {
            world: WorldModel::new(),
            state: AgentState::start(),
            first_target,
            second_target: None,
            first_reached: false,
            awaiting_reveal: false,
            steps: 0,
            phase: TurnPhase::Idle,
            config,
        }
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn first_target(&self) -> Position {
        self.first_target
    }

    pub fn second_target(&self) -> Option<Position> {
        self.second_target
    }

    pub fn first_target_reached(&self) -> bool {
        self.first_reached
    }

    /// True once the driver must read the second target's coordinates.
    pub fn needs_second_target(&self) -> bool {
        self.awaiting_reveal
    }

    /// The target currently being walked to, if known.
    pub fn current_target(&self) -> Option<Position> {
        if self.first_reached {
            self.second_target
        } else {
            Some(self.first_target)
        }
    }

    /// The full route the planner would follow right now, for display.
    pub fn planned_route(&self) -> Option<Plan> {
        let target = self.current_target()?;
        Search::new(&self.world, self.config).find_plan(self.state, target)
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[TurnPhase]) -> Result<(), PlannerError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(PlannerError::OutOfTurn {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Plans this turn and adopts the resulting state.
    pub fn decide(&mut self) -> Result<Decision, PlannerError> {
        self.expect_phase("decide", &[TurnPhase::Idle])?;
        let target = self
            .current_target()
            .ok_or(PlannerError::MissingSecondTarget)?;

        if self.first_reached && self.state.position == target {
            info!(steps = self.steps, "second target reached");
            self.phase = TurnPhase::Done;
            return Ok(Decision::Finished(self.steps));
        }

        self.phase = TurnPhase::Planning;
        let context = TurnContext {
            state: self.state,
            target,
        };
        match context.plan(&self.world, self.config) {
            SearchOutcome::Next(action) => {
                debug!(kind = ?action.kind, %target, step = self.steps + 1, "acting");
                self.state = action.resulting;
                self.steps += 1;
                if !self.first_reached && self.state.position == self.first_target {
                    info!(steps = self.steps, "first target reached");
                    self.first_reached = true;
                    self.awaiting_reveal = true;
                }
                self.phase = TurnPhase::ActionEmitted;
                Ok(Decision::Act(action))
            }
            SearchOutcome::AtTarget => {
                warn!(%target, "standing on the first target without having walked to it");
                self.phase = TurnPhase::Done;
                Ok(Decision::GiveUp)
            }
            SearchOutcome::NoPath => {
                warn!(%target, position = %self.state.position, "no safe route");
                self.phase = TurnPhase::Done;
                Ok(Decision::GiveUp)
            }
        }
    }

    /// Confirms that the command from the last [`Planner::decide`] went out.
    pub fn command_sent(&mut self) -> Result<(), PlannerError> {
        self.expect_phase("confirm a command", &[TurnPhase::ActionEmitted])?;
        self.phase = TurnPhase::AwaitingPerception;
        Ok(())
    }
}

impl Agent for Planner {
    fn observe(&mut self, sightings: &[Sighting]) -> Result<(), PlannerError> {
        self.expect_phase("observe", &[TurnPhase::Idle, TurnPhase::AwaitingPerception])?;
        self.world.update(sightings.iter().copied());
        self.phase = if self.awaiting_reveal {
            TurnPhase::AwaitingReveal
        } else {
            TurnPhase::Idle
        };
        Ok(())
    }

    fn reveal_second_target(&mut self, target: Position) -> Result<(), PlannerError> {
        if !self.awaiting_reveal {
            return Err(PlannerError::UnexpectedReveal);
        }
        self.expect_phase("learn the second target", &[TurnPhase::AwaitingReveal])?;
        info!(%target, "second target revealed");
        self.second_target = Some(target);
        self.awaiting_reveal = false;
        self.phase = TurnPhase::Idle;
        Ok(())
    }

    fn next_command(&mut self) -> Command {
        let decision = self.decide().and_then(|decision| {
            if let Decision::Act(_) = decision {
                self.command_sent()?;
            }
            Ok(decision)
        });
        match decision {
            Ok(Decision::Act(action)) => Command::from(action.kind),
            Ok(Decision::Finished(steps)) => Command::Finish(steps),
            Ok(Decision::GiveUp) => Command::GiveUp,
            Err(err) => {
                error!(%err, "planner failure");
                self.phase = TurnPhase::Done;
                Command::GiveUp
            }
        }
    }
}
