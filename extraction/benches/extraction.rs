use std::time::Duration;

use extraction::dispatch::{drain, Extractor};
use extraction::event::{Combatant, Event, GameState, Kill, Member, Position, Team, TeamState};
use extraction::weapon::Weapon;
use extraction::{Config, Timeline};

fn main() {
    divan::main();
}

fn synthetic_match(rounds: usize) -> Timeline {
    let living = |side: &str| -> Vec<Member> {
        (0..5)
            .map(|i| Member {
                name: format!("{}{}", side, i),
                position: Position::new(i as f32 * 100.0, -(i as f32) * 50.0),
                place: "BombsiteB".to_owned(),
            })
            .collect()
    };
    let state = |tick: i32| GameState {
        tick,
        elapsed: Duration::from_secs_f32(tick as f32 / 64.0),
        ct: TeamState {
            equipment_value: 21500,
            living: living("ct"),
        },
        t: TeamState {
            equipment_value: 18750,
            living: living("t"),
        },
    };

    let mut timeline = Timeline::new();
    let mut tick = 0;
    for _ in 0..rounds {
        timeline.push(Event::RoundStart, state(tick));
        for k in 0..8 {
            tick += 320;
            let victim_team = if k % 2 == 0 {
                Team::Terrorists
            } else {
                Team::CounterTerrorists
            };
            let kill = Kill {
                weapon: Weapon::from_code("ak47"),
                killer: Some(Combatant {
                    name: "killer".to_owned(),
                    team: Team::CounterTerrorists,
                    position: Position::new(10.0, 20.0),
                    place: "Middle".to_owned(),
                }),
                victim: Combatant {
                    name: "victim".to_owned(),
                    team: victim_team,
                    position: Position::new(30.0, 40.0),
                    place: "Middle".to_owned(),
                },
            };
            timeline.push(Event::Kill(kill), state(tick));
        }
        timeline.push(
            Event::RoundEnd {
                winner: Some(Team::Terrorists),
            },
            state(tick),
        );
    }
    timeline
}

#[divan::bench(args = [12, 24, 30])]
fn extract(bencher: divan::Bencher, rounds: usize) {
    let timeline = synthetic_match(rounds);

    bencher.bench(|| {
        let mut source = timeline.clone();
        let mut extractor = Extractor::new(Config::default(), Vec::with_capacity(64 * 1024));
        drain(divan::black_box(&mut source), &mut extractor).unwrap();
        extractor.into_inner()
    });
}
