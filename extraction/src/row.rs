//! Formatting of rows. Nothing in here performs I/O.
//!
//! Text fields are written verbatim, embedded commas are not escaped.

use std::fmt::Write;
use std::time::Duration;

use crate::state::{KillRecord, Roster, RoundState, Slot, TEAM_SIZE};

pub const KILL_EVENT: &str = "Kill";

/// Columns preceding the per-team member columns.
pub const EVENT_COLUMNS: [&str; 20] = [
    "Event",
    "Tick",
    "Time",
    "Round",
    "RoundWinner",
    "CTsAlive",
    "TsAlive",
    "AliveDiff",
    "CTEquipValue",
    "TEquipValue",
    "EquipDiff",
    "Weapon",
    "KillerName",
    "KillerX",
    "KillerY",
    "KillerLocation",
    "VictimName",
    "VictimX",
    "VictimY",
    "VictimLocation",
];

const MEMBER_FIELDS: [&str; 4] = ["Name", "X", "Y", "Location"];

/// All column names in output order.
pub fn columns() -> Vec<String> {
    let mut columns: Vec<String> = EVENT_COLUMNS.iter().map(|c| c.to_string()).collect();
    for side in ["CT", "T"] {
        for member in 1..=TEAM_SIZE {
            for field in MEMBER_FIELDS {
                columns.push(format!("{}{}{}", side, member, field));
            }
        }
    }
    columns
}

/// The header line, including the trailing newline.
pub fn header() -> String {
    let mut line = columns().join(",");
    line.push('\n');
    line
}

/// Separator written at every round end.
pub const ROUND_SEPARATOR: &str = "\n";

/// One kill row, rendered from the state right after the kill was recorded.
pub struct KillRow<'s> {
    state: &'s RoundState,
    kill: &'s KillRecord,
}

impl<'s> KillRow<'s> {
    /// `None` if no kill has been recorded yet.
    pub fn new(state: &'s RoundState) -> Option<Self> {
        state.last_kill.as_ref().map(|kill| Self { state, kill })
    }
}

impl core::fmt::Display for KillRow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state;
        let kill = self.kill;

        write!(
            f,
            "{},{},{},{},{},{},{},{},{},{},{},{},",
            KILL_EVENT,
            kill.tick,
            format_elapsed(kill.elapsed),
            state.round,
            state.winner.value(),
            state.ct_alive,
            state.t_alive,
            state.player_diff(),
            state.ct_equipment,
            state.t_equipment,
            state.equipment_diff(),
            kill.weapon,
        )?;

        write_slot(f, kill.killer.as_ref())?;
        f.write_char(',')?;
        write_slot(f, Some(&kill.victim))?;
        write_roster(f, &kill.ct)?;
        write_roster(f, &kill.t)?;

        writeln!(f)
    }
}

fn write_slot(f: &mut std::fmt::Formatter<'_>, slot: Option<&Slot>) -> std::fmt::Result {
    match slot {
        Some(slot) => write!(f, "{},{},{},{}", slot.name, slot.x, slot.y, slot.place),
        None => f.write_str(",,,"),
    }
}

fn write_roster(f: &mut std::fmt::Formatter<'_>, roster: &Roster) -> std::fmt::Result {
    for slot in roster.slots() {
        f.write_char(',')?;
        write_slot(f, slot.as_ref())?;
    }
    Ok(())
}

/// Formats a duration the way Go's `time.Duration` prints whole seconds,
/// e.g. `0s`, `42s`, `1m30s` or `1h2m0s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h{}m", hours, minutes);
    } else if minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    let _ = write!(out, "{}s", seconds);
    out
}
