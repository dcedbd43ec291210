use super::*;
use std::time::{Duration, Instant};

use crate::foundation::config::{EngineConfig, WorkerMode};
use crate::foundation::core::{PixelSize, Rgb};
use crate::player::kind::{PlayerEventKind, RenderMode};
use crate::player::loader::{LoadParams, PlayerOptions};
use crate::worker::testing::{stub_factory, stub_payload};

struct NoTheme;

impl ThemeSource for NoTheme {
    fn resolve(&self, _name: &str) -> Option<Rgb> {
        None
    }
}

fn microphone() -> IconSpec {
    IconSpec::new(
        "microphone",
        vec![
            IconPart::new("muted-to-unmuted", 10, 20),
            IconPart::new("unmuted-to-muted", 20, 10),
            IconPart::new("hand", 30, 35),
        ],
        |state, prev| match (prev, state) {
            (Some("muted"), "unmuted") => Some("muted-to-unmuted".into()),
            (Some("unmuted"), "muted") => Some("unmuted-to-muted".into()),
            (_, "hand") => Some("hand".into()),
            _ => None,
        },
    )
}

fn loaded_player(players: &mut PlayerRegistry, now: Instant) -> PlayerId {
    let options = PlayerOptions {
        autoplay: false,
        ..PlayerOptions::default()
    };
    let id = players
        .load(
            LoadParams {
                name: Some("microphone".into()),
                payload: stub_payload(40, 60),
                size: PixelSize::new(4, 4),
                targets: 1,
                mode: RenderMode::Canvas,
                self_driven: true,
                options: &options,
            },
            &NoTheme,
        )
        .unwrap();
    players.pump(now);
    players.take_events();
    id
}

fn registry() -> PlayerRegistry {
    let config = EngineConfig {
        workers: 1,
        worker_mode: WorkerMode::Inline,
        ..EngineConfig::default()
    };
    PlayerRegistry::new(&config, stub_factory()).unwrap()
}

fn painted(players: &mut PlayerRegistry, mut now: Instant, steps: usize) -> Vec<u32> {
    let mut frames = Vec::new();
    for _ in 0..steps {
        now += Duration::from_millis(20);
        players.pump(now);
        frames.extend(players.take_events().into_iter().filter_map(|e| match e.kind {
            PlayerEventKind::EnterFrame(f) => Some(f),
            _ => None,
        }));
    }
    frames
}

#[test]
fn part_tables_are_validated() {
    let mut composer = IconComposer::new();
    let empty = IconSpec::new("empty", Vec::new(), |_, _| None);
    assert!(matches!(composer.add(empty), Err(PlaybackError::Validation(_))));

    let twice = IconSpec::new(
        "twice",
        vec![IconPart::new("a", 0, 1), IconPart::new("a", 2, 3)],
        |_, _| None,
    );
    assert!(composer.add(twice).is_err());
    assert!(!composer.contains("twice"));
}

#[test]
fn parts_resolve_by_name_or_index() {
    let mut composer = IconComposer::new();
    composer.add(microphone()).unwrap();
    assert_eq!(
        composer.get_part("microphone", PartRef::Name("hand")),
        Some(&IconPart::new("hand", 30, 35))
    );
    assert_eq!(
        composer
            .get_part("microphone", PartRef::Index(1))
            .map(|p| p.name.as_str()),
        Some("unmuted-to-muted")
    );
    assert!(composer.get_part("microphone", PartRef::Index(3)).is_none());
    assert!(composer.get_part("speaker", PartRef::Index(0)).is_none());
}

#[test]
fn state_change_plays_the_transition_once() {
    let mut composer = IconComposer::new();
    composer.add(microphone()).unwrap();
    let mut players = registry();
    let now = Instant::now();
    let id = loaded_player(&mut players, now);

    let part = composer
        .set_state("microphone", id, "unmuted", Some("muted"), &mut players, &NoTheme)
        .unwrap();
    assert_eq!(part.name, "muted-to-unmuted");
    assert_eq!(painted(&mut players, now, 20), (10..=20).collect::<Vec<_>>());
    assert!(players.is_paused(id));

    composer
        .set_state("microphone", id, "muted", Some("unmuted"), &mut players, &NoTheme)
        .unwrap();
    assert_eq!(
        painted(&mut players, now + Duration::from_secs(1), 20),
        (10..=20).rev().collect::<Vec<_>>()
    );
}

#[test]
fn unknown_transitions_are_rejected() {
    let mut composer = IconComposer::new();
    composer.add(microphone()).unwrap();
    let mut players = registry();
    let id = loaded_player(&mut players, Instant::now());

    let err = composer
        .set_state("microphone", id, "muted", None, &mut players, &NoTheme)
        .unwrap_err();
    assert!(matches!(err, PlaybackError::Validation(_)));
    assert!(
        composer
            .set_state("speaker", id, "hand", None, &mut players, &NoTheme)
            .is_err()
    );
    assert!(players.is_paused(id));
}

#[test]
fn state_colors_tint_the_player() {
    let mut composer = IconComposer::new();
    composer
        .add(microphone().with_colors(|state| {
            (state == "hand").then(|| Tint::Fixed(Rgb::new(255, 0, 0)))
        }))
        .unwrap();
    let mut players = registry();
    let now = Instant::now();
    let id = loaded_player(&mut players, now);

    composer
        .set_state("microphone", id, "hand", None, &mut players, &NoTheme)
        .unwrap();
    assert_eq!(painted(&mut players, now, 10), (30..=35).collect::<Vec<_>>());
    let canvas = players.canvas(id, 0).unwrap();
    assert_eq!(canvas.get_pixel(0, 0).0, [255, 0, 0, 255]);
}
