#![allow(dead_code)]

use std::path::Path;

use extraction::event::{Combatant, Kill, Team};
use extraction::weapon::Weapon;
use extraction::{DecodeError, Decoder, Event, GameState, Timeline};

/// Reads plain text inputs: every `kill` line is one kill in a single round,
/// anything containing `corrupt` fails to open.
pub struct TextDecoder;

impl Decoder for TextDecoder {
    type Source = Timeline;

    fn open(&self, path: &Path) -> Result<Self::Source, DecodeError> {
        let content = std::fs::read_to_string(path)?;
        if content.contains("corrupt") {
            return Err(DecodeError::Malformed("corrupt test input".to_owned()));
        }

        let kills = content.lines().filter(|l| l.trim() == "kill").count();

        let mut timeline = Timeline::new();
        timeline.push(Event::RoundStart, GameState::default());
        for n in 0..kills {
            timeline.push(
                Event::Kill(Kill {
                    weapon: Weapon::from_code("ak47"),
                    killer: None,
                    victim: Combatant {
                        name: format!("victim{}", n),
                        team: Team::Terrorists,
                        position: Default::default(),
                        place: String::new(),
                    },
                }),
                GameState {
                    tick: n as i32,
                    ..Default::default()
                },
            );
        }
        timeline.push(
            Event::RoundEnd {
                winner: Some(Team::CounterTerrorists),
            },
            GameState::default(),
        );

        Ok(timeline)
    }
}

pub fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}
