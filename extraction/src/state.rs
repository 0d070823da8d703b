//! Per-file round state, mutated as events arrive.

use std::time::Duration;

use crate::event::{Combatant, GameState, Kill, Member, Team};
use crate::weapon::Weapon;

/// Players per side at the start of a round.
pub const TEAM_SIZE: usize = 5;

/// Elapsed times are bucketed to this granularity so rows group stably.
pub const TIME_BUCKET: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundWinner {
    #[default]
    Unknown,
    Terrorists,
    CounterTerrorists,
}

impl RoundWinner {
    pub fn value(&self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Terrorists => -1,
            Self::CounterTerrorists => 1,
        }
    }
}

impl From<Option<Team>> for RoundWinner {
    fn from(value: Option<Team>) -> Self {
        match value {
            Some(Team::Terrorists) => Self::Terrorists,
            Some(Team::CounterTerrorists) => Self::CounterTerrorists,
            _ => Self::Unknown,
        }
    }
}

/// How the round winner behaves between round start and round end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WinnerMode {
    /// Keep the previous round's winner until the current round ends.
    #[default]
    Carry,
    /// Clear the winner whenever a new round starts.
    ResetOnRoundStart,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub winner_mode: WinnerMode,
}

/// A player as written into a row, coordinates truncated to whole units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub place: String,
}

impl From<&Combatant> for Slot {
    fn from(value: &Combatant) -> Self {
        Self {
            name: value.name.clone(),
            x: value.position.x as i32,
            y: value.position.y as i32,
            place: value.place.clone(),
        }
    }
}

impl From<&Member> for Slot {
    fn from(value: &Member) -> Self {
        Self {
            name: value.name.clone(),
            x: value.position.x as i32,
            y: value.position.y as i32,
            place: value.place.clone(),
        }
    }
}

/// Up to [`TEAM_SIZE`] living members of one side, in the order reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    slots: [Option<Slot>; TEAM_SIZE],
}

impl Roster {
    pub fn from_living(team: Team, living: &[Member]) -> Self {
        if living.len() > TEAM_SIZE {
            tracing::warn!(
                ?team,
                living = living.len(),
                "More living members than slots, extra members are dropped"
            );
        }

        let mut slots: [Option<Slot>; TEAM_SIZE] = Default::default();
        for (slot, member) in slots.iter_mut().zip(living.iter()) {
            *slot = Some(Slot::from(member));
        }

        Self { slots }
    }

    pub fn slots(&self) -> &[Option<Slot>; TEAM_SIZE] {
        &self.slots
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// The most recent kill, as it will be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillRecord {
    pub tick: i32,
    /// Already bucketed to [`TIME_BUCKET`]
    pub elapsed: Duration,
    pub weapon: Weapon,
    pub killer: Option<Slot>,
    pub victim: Slot,
    pub ct: Roster,
    pub t: Roster,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub round: u32,
    pub ct_alive: u8,
    pub t_alive: u8,
    pub ct_equipment: i32,
    pub t_equipment: i32,
    pub winner: RoundWinner,
    pub last_kill: Option<KillRecord>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            round: 0,
            ct_alive: TEAM_SIZE as u8,
            t_alive: TEAM_SIZE as u8,
            ct_equipment: 0,
            t_equipment: 0,
            winner: RoundWinner::Unknown,
            last_kill: None,
        }
    }

    pub fn player_diff(&self) -> i32 {
        self.ct_alive as i32 - self.t_alive as i32
    }

    pub fn equipment_diff(&self) -> i32 {
        self.ct_equipment - self.t_equipment
    }

    pub fn start_round(&mut self, mode: WinnerMode) {
        self.round += 1;
        self.ct_alive = TEAM_SIZE as u8;
        self.t_alive = TEAM_SIZE as u8;

        if mode == WinnerMode::ResetOnRoundStart {
            self.winner = RoundWinner::Unknown;
        }
    }

    pub fn end_round(&mut self, winner: Option<Team>) {
        match RoundWinner::from(winner) {
            // A draw or unknown side leaves the previous value in place
            RoundWinner::Unknown => {}
            other => self.winner = other,
        }
    }

    /// Applies a kill and captures everything needed to write its row.
    pub fn record_kill(&mut self, kill: &Kill, game: &GameState) -> &KillRecord {
        match kill.victim.team {
            Team::CounterTerrorists => self.ct_alive = self.ct_alive.saturating_sub(1),
            Team::Terrorists => self.t_alive = self.t_alive.saturating_sub(1),
            Team::Other => {}
        };

        self.ct_equipment = game.ct.equipment_value;
        self.t_equipment = game.t.equipment_value;

        let killer = if kill.weapon.is_bomb() {
            None
        } else {
            kill.killer.as_ref().map(Slot::from)
        };

        let victim_name = kill.victim.name.as_str();
        let living = |members: &[Member]| -> Vec<Member> {
            members
                .iter()
                .filter(|m| m.name != victim_name)
                .cloned()
                .collect()
        };

        self.last_kill.insert(KillRecord {
            tick: game.tick(),
            elapsed: bucket(game.elapsed()),
            weapon: kill.weapon,
            killer,
            victim: Slot::from(&kill.victim),
            ct: Roster::from_living(Team::CounterTerrorists, &living(&game.ct.living)),
            t: Roster::from_living(Team::Terrorists, &living(&game.t.living)),
        })
    }
}

/// Rounds to the nearest [`TIME_BUCKET`], halfway values rounding up.
pub fn bucket(elapsed: Duration) -> Duration {
    let bucket_ms = TIME_BUCKET.as_millis();
    let rounded = (elapsed.as_millis() + bucket_ms / 2) / bucket_ms * bucket_ms;
    Duration::from_millis(rounded as u64)
}
