//! Drives a [`Planner`] over a text stream pair, one protocol turn at a time.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    agent::{Agent, Decision, Planner, PlannerError},
    protocol::{Command, ProtocolError, TokenReader, write_command},
    search::SearchConfig,
};

/// Session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub search: SearchConfig,
    /// Expect the perception-variant integer before the first target.
    pub variant_header: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            variant_header: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Protocol(ProtocolError::Io(err))
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionReport {
    /// The final `e` line that was written.
    pub command: Command,
    /// Turns taken before the end.
    pub steps: u32,
    /// Set when the session ended because of bad input or misuse rather than
    /// a search dead end.
    pub error: Option<SessionError>,
}

impl SessionReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.command, Command::Finish(_))
    }
}

/// Plays one full episode: reads the briefing, answers every perception
/// block with one command and finishes with `e <steps>` or `e -1`.
///
/// Only a failure to write the final line is returned as an error; anything
/// else ends the episode with `e -1` and is described in the report.
pub fn run_session<R, W>(input: R, mut output: W, config: SessionConfig) -> io::Result<SessionReport>
where
    R: BufRead,
    W: Write,
{
    let mut reader = TokenReader::new(input);
    let mut planner = None;
    let result = drive(&mut reader, &mut output, config, &mut planner);
    let steps = planner.as_ref().map_or(0, Planner::steps);

    let (command, error) = match result {
        Ok(command) => (command, None),
        Err(err) => {
            error!(%err, steps, "session aborted");
            (Command::GiveUp, Some(err))
        }
    };
    write_command(&mut output, command)?;
    Ok(SessionReport {
        command,
        steps,
        error,
    })
}

fn drive<R, W>(
    reader: &mut TokenReader<R>,
    output: &mut W,
    config: SessionConfig,
    slot: &mut Option<Planner>,
) -> Result<Command, SessionError>
where
    R: BufRead,
    W: Write,
{
    if config.variant_header {
        let variant = reader.next_int("perception variant")?;
        debug!(variant, "briefing");
    }
    let first_target = reader.next_position("first target")?;
    let planner = slot.insert(Planner::new(first_target, config.search));
    planner.observe(&reader.read_perception()?)?;

    loop {
        match planner.decide()? {
            Decision::Act(action) => {
                write_command(output, Command::from(action.kind))?;
                planner.command_sent()?;
                planner.observe(&reader.read_perception()?)?;
                if planner.needs_second_target() {
                    let target = reader.read_revealed_target()?;
                    planner.reveal_second_target(target)?;
                }
            }
            Decision::Finished(steps) => return Ok(Command::Finish(steps)),
            Decision::GiveUp => return Ok(Command::GiveUp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(input: &str, config: SessionConfig) -> (SessionReport, String) {
        let mut out = Vec::new();
        let report = run_session(input.as_bytes(), &mut out, config).expect("write to vec");
        (report, String::from_utf8(out).expect("utf-8 output"))
    }

    #[test]
    fn short_episode_on_empty_board() {
        let input = "1\n0 1\n0\n0\n1 1\n0\n";
        let (report, out) = play(input, SessionConfig::default());
        assert_eq!(out, "m 0 1\nm 1 1\ne 2\n");
        assert!(report.succeeded());
        assert_eq!(report.steps, 2);
        assert!(report.error.is_none());
    }

    #[test]
    fn without_variant_header() {
        let config = SessionConfig {
            variant_header: false,
            ..SessionConfig::default()
        };
        let input = "1 0\n0\n0\nsecond: 2 0\n0\n";
        let (report, out) = play(input, config);
        assert_eq!(out, "m 1 0\nm 2 0\ne 2\n");
        assert!(report.succeeded());
    }

    #[test]
    fn target_in_forbidden_zone() {
        let input = "2\n0 2\n1\n0 2 P\n";
        let (report, out) = play(input, SessionConfig::default());
        assert_eq!(out, "e -1\n");
        assert!(!report.succeeded());
        assert!(report.error.is_none());
    }

    #[test]
    fn truncated_input_ends_with_failure() {
        let input = "1\n0 3\n0\n";
        let (report, out) = play(input, SessionConfig::default());
        assert_eq!(out, "m 0 1\ne -1\n");
        assert!(matches!(
            report.error,
            Some(SessionError::Protocol(ProtocolError::UnexpectedEof(_)))
        ));
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn garbage_ends_with_failure() {
        let (report, out) = play("1\nhello\n", SessionConfig::default());
        assert_eq!(out, "e -1\n");
        assert!(report.error.is_some());
    }

    #[test]
    fn extreme_coordinates_end_cleanly() {
        let (report, out) = play("1\n0 3\n1\n-2147483648 0 O\n", SessionConfig::default());
        assert_eq!(out, "m 0 1\ne -1\n");
        assert!(matches!(
            report.error,
            Some(SessionError::Protocol(ProtocolError::UnexpectedEof(_)))
        ));

        let (report, out) = play("1\n2147483647 0\n0\n", SessionConfig::default());
        assert_eq!(out, "e -1\n");
        assert!(!report.succeeded());
        assert!(report.error.is_none());
    }
}
