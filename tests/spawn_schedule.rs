use notefall::chart::Note;
use notefall::config::Tuning;
use notefall::event::Event;
use notefall::scheduler::{EventMerger, body_spawns, spawn_delay_ms, tail_spawns};
use notefall::scoring::lcg_hash;

fn random_chart(seed: u64, len: usize) -> Vec<Note> {
    let mut h = seed;
    let mut next = move || {
        h = lcg_hash(h);
        h as f64 / (1u64 << 31) as f64
    };
    (0..len)
        .map(|_| {
            let start = next() * 20.0;
            let duration = next() * 3.0;
            Note {
                user_played: next() < 0.6,
                instrument_name: "piano".into(),
                velocity: next() as f32,
                pitch: 40 + (next() * 40.0) as i32,
                start,
                end: start + duration,
            }
        })
        .collect()
}

#[test]
fn every_note_maps_to_at_most_one_spawn() {
    for seed in 0..40 {
        let notes = random_chart(seed, 60);
        let short = notes.iter().filter(|n| n.end - n.start <= 1.0).count();
        let played_long = notes
            .iter()
            .filter(|n| n.user_played && n.end - n.start > 1.0)
            .count();

        assert_eq!(body_spawns(&notes).count(), short, "seed {seed}");
        assert_eq!(tail_spawns(&notes).count(), played_long, "seed {seed}");

        for (_, ev) in body_spawns(&notes).chain(tail_spawns(&notes)) {
            let note = match ev {
                Event::BodySpawn(n) | Event::TailSpawn(n) => n,
                other => panic!("unexpected {other:?}"),
            };
            assert!(
                note.user_played || note.end - note.start <= 1.0,
                "background long note spawned"
            );
        }
    }
}

#[test]
fn merger_delivers_each_spawn_once_in_time_order() {
    let notes = random_chart(7, 80);
    let expected = body_spawns(&notes).count() + tail_spawns(&notes).count();
    let mut merger = EventMerger::new(&notes, Tuning::default());

    let mut delivered = 0;
    let mut last_tick = None;
    let mut now = 0;
    while !merger.spawns_exhausted() {
        now += 37;
        for ev in merger.drain_due(now) {
            match ev {
                Event::BodySpawn(n) | Event::TailSpawn(n) => {
                    assert!(spawn_delay_ms(&n) <= now);
                    delivered += 1;
                }
                Event::Tick { elapsed } => {
                    if let Some(prev) = last_tick {
                        assert_eq!(elapsed, prev + 1);
                    }
                    last_tick = Some(elapsed);
                }
                Event::KeyPress { .. } => unreachable!("no keys were pressed"),
            }
        }
    }
    assert_eq!(delivered, expected);
}

#[test]
fn spawn_delay_is_onset_in_milliseconds() {
    let note = Note {
        user_played: true,
        instrument_name: "violin".into(),
        velocity: 1.0,
        pitch: 60,
        start: 2.345,
        end: 2.5,
    };
    assert_eq!(spawn_delay_ms(&note), 2345);
}
