//! CS2 demos decoded with `csdemo`.
//!
//! The whole demo is parsed up front and turned into a [`Timeline`]: game
//! events give the kills, entity states give round boundaries and the
//! per-player positions, places and equipment values.

use std::collections::HashMap;

use crate::event::{
    Combatant, DecodeError, Decoder, Event, GameState, Kill, Member, Position, Team, TeamState,
};
use crate::timeline::Timeline;
use crate::weapon::Weapon;

pub const TICK_RATE: f32 = 64.0;

const CELL_SIZE: f32 = (1 << 9) as f32;
const MAX_COORD: f32 = (1 << 14) as f32;

// https://github.com/markus-wa/demoinfocs-golang/blob/205b0bb25e9f3e96e1d306d154199b4a6292940e/pkg/demoinfocs/events/events.go#L53
pub static ROUND_WINNER: phf::Map<i32, Team> = phf::phf_map! {
    1_i32 => Team::Terrorists,
    2_i32 => Team::CounterTerrorists,
    3_i32 => Team::Terrorists,
    4_i32 => Team::Terrorists,
    5_i32 => Team::CounterTerrorists,
    6_i32 => Team::CounterTerrorists,
    7_i32 => Team::CounterTerrorists,
    8_i32 => Team::CounterTerrorists,
    9_i32 => Team::Terrorists,
    11_i32 => Team::CounterTerrorists,
    12_i32 => Team::CounterTerrorists,
    13_i32 => Team::Terrorists,
    14_i32 => Team::CounterTerrorists,
    15_i32 => Team::Terrorists,
    17_i32 => Team::CounterTerrorists,
    18_i32 => Team::Terrorists,
    19_i32 => Team::Terrorists,
    20_i32 => Team::CounterTerrorists,
};

/// Opens `.dem` files by memory mapping them.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsDemoDecoder;

impl Decoder for CsDemoDecoder {
    type Source = Timeline;

    fn open(&self, path: &std::path::Path) -> Result<Self::Source, DecodeError> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };

        parse(&mmap)
    }
}

pub fn parse(buf: &[u8]) -> Result<Timeline, DecodeError> {
    let tmp = csdemo::Container::parse(buf)
        .map_err(|_| DecodeError::Malformed("invalid demo container".to_owned()))?;
    let output = csdemo::parser::parse(
        csdemo::FrameIterator::parse(tmp.inner),
        csdemo::parser::EntityFilter::all(),
    )
    .map_err(|_| DecodeError::Malformed("decoding demo frames".to_owned()))?;

    let pawn_ids: HashMap<i32, csdemo::UserId> = output
        .events
        .iter()
        .filter_map(|event| match event {
            csdemo::DemoEvent::GameEvent(ge) => match ge.as_ref() {
                csdemo::game_event::GameEvent::PlayerSpawn(pspawn) => match pspawn.userid_pawn {
                    Some(csdemo::RawValue::I32(v)) => pspawn.userid.map(|u| (v, u)),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect();

    let mut builder = TimelineBuilder::new(&pawn_ids, &output.player_info);

    let mut ticks = output.entity_states.ticks.iter().peekable();
    for event in output.events.iter() {
        match event {
            csdemo::DemoEvent::Tick(tick) => {
                let current_tick = tick.tick();
                builder.begin_tick(current_tick);
                while let Some(tick_state) = ticks.next_if(|t| t.tick <= current_tick) {
                    builder.apply_tick(tick_state);
                }
            }
            csdemo::DemoEvent::GameEvent(ge) => {
                if let csdemo::game_event::GameEvent::PlayerDeath(death) = ge.as_ref() {
                    builder.player_death(death);
                }
            }
            _ => {}
        };
    }
    for tick_state in ticks {
        builder.begin_tick(tick_state.tick);
        builder.apply_tick(tick_state);
    }

    Ok(builder.finish())
}

/// World coordinates of an entity from its cell and the offset inside it.
pub fn world_position(cell: (u32, u32), offset: (f32, f32)) -> Position {
    Position::new(
        cell.0 as f32 * CELL_SIZE - MAX_COORD + offset.0,
        cell.1 as f32 * CELL_SIZE - MAX_COORD + offset.1,
    )
}

/// The side a round win reason credits, `None` for draws and unknown reasons.
pub fn round_winner(reason: Option<i32>) -> Option<Team> {
    reason.and_then(|reason| ROUND_WINNER.get(&reason).copied())
}

/// Edge detection on one of the game rules' round counters.
///
/// The counters already read 1 before the first round, so a count of `n`
/// means `n - 1` rounds have passed.
#[derive(Debug, Default)]
struct RoundCounter {
    seen: u32,
}

impl RoundCounter {
    /// `true` if `count` moved past every count seen so far.
    fn advance(&mut self, count: u32) -> bool {
        let rounds = count.saturating_sub(1);
        if rounds > self.seen {
            self.seen = rounds;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct Pawn {
    user: Option<csdemo::UserId>,
    team: Option<Team>,
    cell: (u32, u32),
    offset: (f32, f32),
    alive: bool,
    last_alive: Position,
    place: String,
    equipment: i32,
    /// Sequence number of the last update, the newest pawn of a user wins
    updated: u64,
}

impl Pawn {
    fn position(&self) -> Position {
        world_position(self.cell, self.offset)
    }
}

/// The properties of a player pawn that changed in one tick.
#[derive(Debug, Default)]
struct PawnUpdate {
    pawn_id: Option<u32>,
    team: Option<u32>,
    cell_x: Option<u32>,
    cell_y: Option<u32>,
    vec_x: Option<f32>,
    vec_y: Option<f32>,
    lifestate: Option<u32>,
    equipment: Option<u32>,
    place: Option<String>,
}

impl PawnUpdate {
    fn read<'s, F>(prop: F) -> Self
    where
        F: Fn(&str) -> Option<&'s csdemo::parser::Variant>,
    {
        let prop_u32 = |name: &str| prop(name).and_then(|v| v.as_u32());
        let prop_f32 = |name: &str| prop(name).and_then(|v| v.as_f32());

        Self {
            pawn_id: prop_u32("CCSPlayerPawn.m_nEntityId"),
            team: prop("CCSPlayerPawn.m_iTeamNum")
                .and_then(|v| v.as_u32().or_else(|| v.as_i32().map(|t| t as u32))),
            cell_x: prop_u32("CCSPlayerPawn.CBodyComponentBaseAnimGraph.m_cellX"),
            cell_y: prop_u32("CCSPlayerPawn.CBodyComponentBaseAnimGraph.m_cellY"),
            vec_x: prop_f32("CCSPlayerPawn.CBodyComponentBaseAnimGraph.m_vecX"),
            vec_y: prop_f32("CCSPlayerPawn.CBodyComponentBaseAnimGraph.m_vecY"),
            lifestate: prop_u32("CCSPlayerPawn.m_lifeState"),
            equipment: prop_u32("CCSPlayerPawn.m_unCurrentEquipmentValue"),
            place: prop("CCSPlayerPawn.m_szLastPlaceName").and_then(|v| match v {
                csdemo::parser::Variant::String(s) => Some(s.clone()),
                _ => None,
            }),
        }
    }
}

/// The game rules properties that changed in one tick.
#[derive(Debug, Default)]
struct RulesUpdate {
    start_count: Option<u32>,
    end_count: Option<u32>,
    win_reason: Option<i32>,
}

impl RulesUpdate {
    fn read<'s, F>(prop: F) -> Self
    where
        F: Fn(&str) -> Option<&'s csdemo::parser::Variant>,
    {
        Self {
            start_count: prop("CCSGameRulesProxy.CCSGameRules.m_nRoundStartCount")
                .and_then(|v| v.as_u32()),
            end_count: prop("CCSGameRulesProxy.CCSGameRules.m_nRoundEndCount")
                .and_then(|v| v.as_u32()),
            win_reason: prop("CCSGameRulesProxy.CCSGameRules.m_eRoundWinReason")
                .and_then(|v| v.as_i32()),
        }
    }
}

struct TimelineBuilder<'o> {
    pawn_ids: &'o HashMap<i32, csdemo::UserId>,
    players: &'o HashMap<csdemo::UserId, csdemo::parser::Player>,
    pawns: HashMap<i32, Pawn>,
    round_starts: RoundCounter,
    round_ends: RoundCounter,
    win_reason: Option<i32>,
    tick: u32,
    sequence: u64,
    /// Round boundaries of the current tick, pushed after its kills
    pending: Vec<Event>,
    timeline: Timeline,
}

impl<'o> TimelineBuilder<'o> {
    fn new(
        pawn_ids: &'o HashMap<i32, csdemo::UserId>,
        players: &'o HashMap<csdemo::UserId, csdemo::parser::Player>,
    ) -> Self {
        Self {
            pawn_ids,
            players,
            pawns: HashMap::new(),
            round_starts: RoundCounter::default(),
            round_ends: RoundCounter::default(),
            win_reason: None,
            tick: 0,
            sequence: 0,
            pending: Vec::new(),
            timeline: Timeline::new(),
        }
    }

    /// Moves on to `tick`. Everything that happened on the previous tick,
    /// kills included, is in the timeline before its round boundaries.
    fn begin_tick(&mut self, tick: u32) {
        self.flush_boundaries();
        self.tick = tick;
    }

    fn finish(mut self) -> Timeline {
        self.flush_boundaries();
        self.timeline
    }

    fn flush_boundaries(&mut self) {
        for event in std::mem::take(&mut self.pending) {
            self.push(event);
        }
    }

    fn apply_tick(&mut self, tick_state: &csdemo::parser::EntityTickStates) {
        let _tracing_guard = tracing::trace_span!("Tick", tick = ?tick_state.tick).entered();

        for state in tick_state.states.iter() {
            let prop = |name: &str| state.get_prop(name).map(|p| &p.value);

            if state.class.as_ref() == "CCSPlayerPawn" {
                self.apply_pawn(state.id, PawnUpdate::read(prop));
            } else if state.class.as_ref() == "CCSGameRulesProxy" {
                self.apply_rules(RulesUpdate::read(prop));
            }
        }
    }

    fn apply_rules(&mut self, update: RulesUpdate) {
        if let Some(reason) = update.win_reason.filter(|reason| *reason != 0) {
            self.win_reason = Some(reason);
        }

        if let Some(count) = update.end_count {
            if self.round_ends.advance(count) {
                let winner = round_winner(self.win_reason.take());
                self.pending.push(Event::RoundEnd { winner });
            }
        }
        if let Some(count) = update.start_count {
            if self.round_starts.advance(count) {
                self.pending.push(Event::RoundStart);
            }
        }
    }

    fn apply_pawn(&mut self, entity_id: i32, update: PawnUpdate) {
        self.sequence += 1;
        let sequence = self.sequence;
        let pawn_ids = self.pawn_ids;
        let pawn = self.pawns.entry(entity_id).or_default();

        // Entity ids are reused, the pawn id names the current owner
        if let Some(pawn_id) = update.pawn_id {
            let user = pawn_ids.get(&(pawn_id as i32)).copied();
            if pawn.user.is_some() && pawn.user != user {
                tracing::debug!(entity_id, ?user, "Entity changed owner");
                *pawn = Pawn::default();
            }
            pawn.user = user;
        }
        pawn.updated = sequence;

        if let Some(team) = update.team {
            pawn.team = Some(Team::from_number(team));
        }
        if let Some(x) = update.cell_x {
            pawn.cell.0 = x;
        }
        if let Some(y) = update.cell_y {
            pawn.cell.1 = y;
        }
        if let Some(x) = update.vec_x {
            pawn.offset.0 = x;
        }
        if let Some(y) = update.vec_y {
            pawn.offset.1 = y;
        }
        // 0 means alive
        if let Some(lifestate) = update.lifestate {
            pawn.alive = lifestate == 0;
        }
        if let Some(value) = update.equipment {
            pawn.equipment = value as i32;
        }
        if let Some(place) = update.place {
            pawn.place = place;
        }

        if pawn.alive {
            pawn.last_alive = pawn.position();
        }
    }

    fn player_death(&mut self, death: &csdemo::game_event::PlayerDeath) {
        let victim = match death.userid {
            Some(v) => v,
            None => return,
        };

        let weapon = match &death.weapon {
            Some(csdemo::RawValue::String(code)) => Weapon::from_code(code),
            _ => Weapon::Unknown,
        };

        self.kill(victim, death.attacker, weapon);
    }

    fn kill(
        &mut self,
        victim_id: csdemo::UserId,
        attacker: Option<csdemo::UserId>,
        weapon: Weapon,
    ) {
        let victim = match self.combatant(victim_id, true) {
            Some(v) => v,
            None => {
                tracing::debug!(?victim_id, "Kill of an unknown player");
                return;
            }
        };
        let killer = attacker
            .filter(|attacker| *attacker != victim_id)
            .filter(|_| !weapon.is_bomb())
            .and_then(|attacker| self.combatant(attacker, false));

        for pawn in self.pawns.values_mut().filter(|p| p.user == Some(victim_id)) {
            pawn.alive = false;
        }

        self.push(Event::Kill(Kill {
            weapon,
            killer,
            victim,
        }));
    }

    /// The most recently updated pawn of `user`. Older ones belong to
    /// earlier connections of the same player.
    fn pawn_of(&self, user: csdemo::UserId) -> Option<&Pawn> {
        self.pawns
            .values()
            .filter(|p| p.user == Some(user))
            .max_by_key(|p| p.updated)
    }

    fn current_pawns(&self) -> HashMap<csdemo::UserId, &Pawn> {
        let mut current: HashMap<csdemo::UserId, &Pawn> = HashMap::new();
        for pawn in self.pawns.values() {
            if let Some(user) = pawn.user {
                let entry = current.entry(user).or_insert(pawn);
                if pawn.updated > entry.updated {
                    *entry = pawn;
                }
            }
        }
        current
    }

    fn team_of(&self, pawn: &Pawn) -> Team {
        match pawn.team {
            Some(team) => team,
            None => pawn
                .user
                .and_then(|u| self.players.get(&u))
                .map(|p| Team::from_number(p.team as u32))
                .unwrap_or(Team::Other),
        }
    }

    fn name_of(&self, user: csdemo::UserId) -> String {
        self.players
            .get(&user)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn combatant(&self, user: csdemo::UserId, last_alive: bool) -> Option<Combatant> {
        let pawn = self.pawn_of(user)?;

        Some(Combatant {
            name: self.name_of(user),
            team: self.team_of(pawn),
            position: if last_alive {
                pawn.last_alive
            } else {
                pawn.position()
            },
            place: pawn.place.clone(),
        })
    }

    fn team_state(&self, team: Team) -> TeamState {
        let mut members: Vec<(csdemo::UserId, &Pawn)> = self
            .current_pawns()
            .into_iter()
            .filter(|(_, pawn)| self.team_of(pawn) == team)
            .collect();
        members.sort_unstable_by_key(|(user, _)| user.0);

        TeamState {
            equipment_value: members.iter().map(|(_, pawn)| pawn.equipment).sum(),
            living: members
                .iter()
                .filter(|(_, pawn)| pawn.alive)
                .map(|(user, pawn)| Member {
                    name: self.name_of(*user),
                    position: pawn.position(),
                    place: pawn.place.clone(),
                })
                .collect(),
        }
    }

    fn push(&mut self, event: Event) {
        let state = GameState {
            tick: self.tick as i32,
            elapsed: std::time::Duration::from_secs_f32(self.tick as f32 / TICK_RATE),
            ct: self.team_state(Team::CounterTerrorists),
            t: self.team_state(Team::Terrorists),
        };

        self.timeline.push(event, state);
    }
}
