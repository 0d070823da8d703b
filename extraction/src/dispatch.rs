use std::io::Write;

use crate::event::{DecodeError, Event, EventSource, GameState, Kill, Team};
use crate::row::{KillRow, ROUND_SEPARATOR};
use crate::state::{Config, RoundState};

/// Receives the events of one demo in order.
pub trait EventHandler {
    type Error;

    fn round_start(&mut self, game: &GameState) -> Result<(), Self::Error>;

    fn kill(&mut self, kill: &Kill, game: &GameState) -> Result<(), Self::Error>;

    fn round_end(&mut self, winner: Option<Team>, game: &GameState) -> Result<(), Self::Error>;
}

/// Routes a single event to the matching handler method.
pub fn dispatch<H>(handler: &mut H, event: &Event, game: &GameState) -> Result<(), H::Error>
where
    H: EventHandler,
{
    match event {
        Event::RoundStart => handler.round_start(game),
        Event::Kill(kill) => handler.kill(kill, game),
        Event::RoundEnd { winner } => handler.round_end(*winner, game),
    }
}

#[derive(Debug)]
pub enum DrainError<E> {
    Decode(DecodeError),
    Handler(E),
}

/// Feeds every event of the source to the handler until the source is
/// exhausted or either side fails.
pub fn drain<S, H>(source: &mut S, handler: &mut H) -> Result<usize, DrainError<H::Error>>
where
    S: EventSource + ?Sized,
    H: EventHandler,
{
    let mut count = 0;
    while let Some(event) = source.next_event().map_err(DrainError::Decode)? {
        dispatch(handler, &event, source.state()).map_err(DrainError::Handler)?;
        count += 1;
    }
    Ok(count)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub rounds: usize,
    pub kills: usize,
}

/// Tracks the round state of one demo and writes a row per kill plus a
/// separator per round end.
pub struct Extractor<W> {
    config: Config,
    state: RoundState,
    out: W,
    stats: Stats,
}

impl<W> Extractor<W>
where
    W: Write,
{
    pub fn new(config: Config, out: W) -> Self {
        Self {
            config,
            state: RoundState::new(),
            out,
            stats: Stats::default(),
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W> EventHandler for Extractor<W>
where
    W: Write,
{
    type Error = std::io::Error;

    fn round_start(&mut self, game: &GameState) -> Result<(), Self::Error> {
        self.state.start_round(self.config.winner_mode);
        self.stats.rounds += 1;

        tracing::trace!(round = self.state.round, tick = game.tick(), "Round start");

        Ok(())
    }

    fn kill(&mut self, kill: &Kill, game: &GameState) -> Result<(), Self::Error> {
        self.state.record_kill(kill, game);
        self.stats.kills += 1;

        if let Some(row) = KillRow::new(&self.state) {
            write!(self.out, "{}", row)?;
        }

        Ok(())
    }

    fn round_end(&mut self, winner: Option<Team>, game: &GameState) -> Result<(), Self::Error> {
        self.state.end_round(winner);

        tracing::trace!(round = self.state.round, ?winner, tick = game.tick(), "Round end");

        self.out.write_all(ROUND_SEPARATOR.as_bytes())
    }
}
