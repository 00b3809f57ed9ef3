//! Line-oriented text protocol spoken with the interactor.
//!
//! Input is a stream of whitespace separated tokens (target coordinates and
//! perception blocks) with one exception: the second target arrives on its
//! own line and may be wrapped in arbitrary non-numeric noise.

use std::{
    collections::VecDeque,
    fmt,
    io::{self, BufRead, Write},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    state::ActionKind,
    world::{Sighting, SightingKind},
};

/// Represents errors raised while reading or writing the protocol.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("input ended while expecting {0}")]
    UnexpectedEof(&'static str),
    #[error("expected an integer, found '{0}'")]
    InvalidInteger(String),
    #[error("negative perception count {0}")]
    NegativeCount(i64),
    #[error("unknown perception code '{0}'")]
    UnknownCode(String),
    #[error("malformed command '{0}'")]
    InvalidCommand(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A single line the agent sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// `m x y`: step to an adjacent absolute cell.
    Move(Position),
    /// `r`
    RingOn,
    /// `rr`
    RingOff,
    /// `e n`: reached the second target after `n` turns.
    Finish(u32),
    /// `e -1`
    GiveUp,
}

impl From<ActionKind> for Command {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Move(to) => Command::Move(to),
            ActionKind::ToggleRing(true) => Command::RingOn,
            ActionKind::ToggleRing(false) => Command::RingOff,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move(p) => write!(f, "m {} {}", p.x, p.y),
            Command::RingOn => f.write_str("r"),
            Command::RingOff => f.write_str("rr"),
            Command::Finish(steps) => write!(f, "e {steps}"),
            Command::GiveUp => f.write_str("e -1"),
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidCommand(line.trim().to_string());
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["m", x, y] => Ok(Command::Move(Position::new(
                x.parse().map_err(|_| invalid())?,
                y.parse().map_err(|_| invalid())?,
            ))),
            ["r"] => Ok(Command::RingOn),
            ["rr"] => Ok(Command::RingOff),
            ["e", "-1"] => Ok(Command::GiveUp),
            ["e", n] => n.parse().map(Command::Finish).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

/// Writes one command line and flushes.
pub fn write_command<W: Write>(out: &mut W, command: Command) -> io::Result<()> {
    writeln!(out, "{command}")?;
    out.flush()
}

/// Writes a perception block: the count, then one `x y code` line per entry.
pub fn write_perception<W: Write>(out: &mut W, sightings: &[Sighting]) -> io::Result<()> {
    writeln!(out, "{}", sightings.len())?;
    for s in sightings {
        writeln!(out, "{} {} {}", s.position.x, s.position.y, s.kind.code())?;
    }
    out.flush()
}

/// Whitespace tokenizer over a buffered reader that can also hand out the
/// remainder of the current line.
pub struct TokenReader<R> {
    inner: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, ProtocolError> {
        let mut line = String::new();
        if self.inner.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Returns the next token, reading further lines as needed.
    pub fn next_token(&mut self, expecting: &'static str) -> Result<String, ProtocolError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            let line = self
                .read_line()?
                .ok_or(ProtocolError::UnexpectedEof(expecting))?;
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
    }

    pub fn next_int(&mut self, expecting: &'static str) -> Result<i64, ProtocolError> {
        let token = self.next_token(expecting)?;
        token
            .parse()
            .map_err(|_| ProtocolError::InvalidInteger(token))
    }

    pub fn next_coordinate(&mut self, expecting: &'static str) -> Result<i32, ProtocolError> {
        let token = self.next_token(expecting)?;
        token
            .parse()
            .map_err(|_| ProtocolError::InvalidInteger(token))
    }

    pub fn next_position(&mut self, expecting: &'static str) -> Result<Position, ProtocolError> {
        let x = self.next_coordinate(expecting)?;
        let y = self.next_coordinate(expecting)?;
        Ok(Position::new(x, y))
    }

    /// Returns the unread rest of the current line if it has any tokens,
    /// otherwise the next line that is not blank.
    pub fn next_nonblank_line(&mut self, expecting: &'static str) -> Result<String, ProtocolError> {
        if !self.pending.is_empty() {
            let rest: Vec<String> = self.pending.drain(..).collect();
            return Ok(rest.join(" "));
        }
        loop {
            let line = self
                .read_line()?
                .ok_or(ProtocolError::UnexpectedEof(expecting))?;
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
    }

    /// Reads a perception block: a count followed by that many
    /// `x y code` triples.
    pub fn read_perception(&mut self) -> Result<Vec<Sighting>, ProtocolError> {
        let count = self.next_int("perception count")?;
        let count = usize::try_from(count).map_err(|_| ProtocolError::NegativeCount(count))?;
        let mut sightings = Vec::with_capacity(count);
        for _ in 0..count {
            let position = self.next_position("perception coordinates")?;
            let code = self.next_token("perception code")?;
            let kind = single_char(&code)
                .and_then(SightingKind::from_code)
                .ok_or(ProtocolError::UnknownCode(code))?;
            sightings.push(Sighting::new(position, kind));
        }
        Ok(sightings)
    }

    /// Reads the coordinates of the second target.
    ///
    /// Everything on the line except digits and spaces is treated as noise,
    /// so `Mount Doom: (7, 9)` yields `(7, 9)`. If the line holds fewer than
    /// two numbers the remaining ones are taken from the following tokens.
    pub fn read_revealed_target(&mut self) -> Result<Position, ProtocolError> {
        let line = self.next_nonblank_line("second target")?;
        let mut numbers = extract_numbers(&line).into_iter();
        let x = match numbers.next() {
            Some(x) => x,
            None => self.next_coordinate("second target")?,
        };
        let y = match numbers.next() {
            Some(y) => y,
            None => self.next_coordinate("second target")?,
        };
        Ok(Position::new(x, y))
    }
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn extract_numbers(line: &str) -> Vec<i32> {
    let cleaned: String = line
        .chars()
        .map(|c| if c.is_ascii_digit() || c == ' ' { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter_map(|t| t.parse().ok())
        .collect()
}
