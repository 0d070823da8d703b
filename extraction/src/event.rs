//! The typed event stream produced by a demo decoder.
//!
//! A decoder turns a recording into a sequence of [`Event`]s and keeps a
//! [`GameState`] that reflects the match at the moment the most recent event
//! was handed out.

use std::time::Duration;

use crate::weapon::Weapon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Terrorists,
    CounterTerrorists,
    /// Spectators and unassigned players
    Other,
}

impl Team {
    /// Maps the engine's team number (2 = T, 3 = CT).
    pub fn from_number(number: u32) -> Self {
        match number {
            2 => Self::Terrorists,
            3 => Self::CounterTerrorists,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A player taking part in a kill.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub name: String,
    pub team: Team,
    pub position: Position,
    pub place: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kill {
    pub weapon: Weapon,
    /// `None` when nobody can be credited, e.g. for bomb kills
    pub killer: Option<Combatant>,
    /// Carries the victim's last position while alive
    pub victim: Combatant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RoundStart,
    Kill(Kill),
    RoundEnd { winner: Option<Team> },
}

/// A living member of a team.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub position: Position,
    pub place: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamState {
    pub equipment_value: i32,
    pub living: Vec<Member>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameState {
    pub tick: i32,
    pub elapsed: Duration,
    pub ct: TeamState,
    pub t: TeamState,
}

impl GameState {
    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The state of the given side, `None` for [`Team::Other`].
    pub fn team(&self, team: Team) -> Option<&TeamState> {
        match team {
            Team::CounterTerrorists => Some(&self.ct),
            Team::Terrorists => Some(&self.t),
            Team::Other => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("reading demo: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed demo: {0}")]
    Malformed(String),
}

/// A stream of events bound to one opened input.
///
/// Any resources held by the source are released when it is dropped.
pub trait EventSource {
    /// Returns the next event in demo order, `Ok(None)` once the input is
    /// exhausted.
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError>;

    /// The game state as of the last event returned by [`next_event`](Self::next_event).
    fn state(&self) -> &GameState;
}

/// Opens inputs and binds an [`EventSource`] to them.
pub trait Decoder: Send + Sync {
    type Source: EventSource;

    fn open(&self, path: &std::path::Path) -> Result<Self::Source, DecodeError>;
}
