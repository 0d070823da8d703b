use crate::event::{DecodeError, Event, EventSource, GameState};

/// A fully decoded demo, kept in memory as events paired with the game state
/// observed when each of them fired.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: std::collections::VecDeque<(Event, GameState)>,
    current: GameState,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event, state: GameState) {
        self.entries.push_back((event, state));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Event, GameState)> for Timeline {
    fn from_iter<T: IntoIterator<Item = (Event, GameState)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            current: GameState::default(),
        }
    }
}

impl EventSource for Timeline {
    fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        match self.entries.pop_front() {
            Some((event, state)) => {
                self.current = state;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    fn state(&self) -> &GameState {
        &self.current
    }
}
