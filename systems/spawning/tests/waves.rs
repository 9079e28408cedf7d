use std::collections::BTreeMap;

use bulwark_core::{
    EnemyTypeId, SimRng, Spawnpoint, SpawnpointTagId, TileCoord, Wave, WaveDefinition,
};
use bulwark_system_spawning::{EnemySpawner, SpawnOrder, WaveStart};

fn spawnpoints() -> Vec<Spawnpoint> {
    vec![
        Spawnpoint {
            location: TileCoord::new(9, 0),
            tags: vec![SpawnpointTagId::new("north")],
        },
        Spawnpoint {
            location: TileCoord::new(9, 9),
            tags: Vec::new(),
        },
    ]
}

fn basic_wave(number: i32) -> Wave {
    Wave {
        wave_number: number,
        frequency: 1,
        enemies: BTreeMap::from([(EnemyTypeId::new("basic"), 1.0)]),
        ..Wave::default()
    }
}

fn schedule(waves: Vec<Wave>) -> WaveDefinition {
    WaveDefinition {
        final_wave: 3,
        wave_interval: 5.0,
        base_amount: 3.0,
        base_wave_reward: 50.0,
        level_scaling_rate: 0.0,
        amount_scaling_rate: 0.0,
        reward_scaling_rate: 0.0,
        waves,
    }
}

/// Steps until a wave starts, returning the step count, the start and the orders of that step.
fn until_wave(
    spawner: &mut EnemySpawner,
    definition: &WaveDefinition,
    rng: &mut SimRng,
) -> (u32, WaveStart, Vec<SpawnOrder>) {
    let spawnpoints = spawnpoints();
    for step in 1..=10_000 {
        let mut orders = Vec::new();
        if let Some(start) = spawner.handle(definition, &spawnpoints, rng, &mut orders) {
            return (step, start, orders);
        }
    }
    panic!("no wave started");
}

#[test]
fn first_wave_starts_after_the_quiet_period() {
    let definition = schedule(vec![basic_wave(1)]);
    let mut spawner = EnemySpawner::new();
    let mut rng = SimRng::seed_from(7);

    let (steps, start, orders) = until_wave(&mut spawner, &definition, &mut rng);

    assert!((199..=201).contains(&steps), "started after {steps} steps");
    assert_eq!(start, WaveStart { wave: 1, reward: 50 });
    assert_eq!(spawner.wave_number(), 1);
    assert_eq!(orders.len(), 3);
    assert!(orders
        .iter()
        .all(|order| order.enemy_type == EnemyTypeId::new("basic") && order.level == 1));
    assert!(spawner.queued().is_empty());
}

#[test]
fn delayed_enemies_wait_in_the_queue() {
    let definition = schedule(vec![Wave {
        spawn_delay: 1.0,
        ..basic_wave(1)
    }]);
    let mut spawner = EnemySpawner::new();
    let mut rng = SimRng::seed_from(7);
    let spawnpoints = spawnpoints();

    let (_, _, orders) = until_wave(&mut spawner, &definition, &mut rng);
    assert!(orders.is_empty());
    assert_eq!(spawner.queued().len(), 3);

    let mut released = Vec::new();
    let mut steps = 0;
    while released.is_empty() {
        steps += 1;
        assert!(spawner
            .handle(&definition, &spawnpoints, &mut rng, &mut released)
            .is_none());
    }
    assert!((19..=21).contains(&steps), "released after {steps} steps");
    assert_eq!(released.len(), 3);
    assert!(spawner.queued().is_empty());
}

#[test]
fn tagged_waves_only_use_matching_spawnpoints() {
    let definition = schedule(vec![Wave {
        spawnpoint_tags: vec![SpawnpointTagId::new("north")],
        ..basic_wave(1)
    }]);
    let mut spawner = EnemySpawner::new();
    let mut rng = SimRng::seed_from(11);

    let (_, _, orders) = until_wave(&mut spawner, &definition, &mut rng);
    assert_eq!(orders.len(), 3);
    assert!(orders
        .iter()
        .all(|order| order.location == TileCoord::new(9, 0)));
}

#[test]
fn special_waves_field_a_single_enemy_type() {
    let definition = WaveDefinition {
        base_amount: 12.0,
        ..schedule(vec![Wave {
            is_special_wave: true,
            enemies: BTreeMap::from([
                (EnemyTypeId::new("basic"), 1.0),
                (EnemyTypeId::new("fast"), 1.0),
            ]),
            ..basic_wave(1)
        }])
    };
    let mut spawner = EnemySpawner::new();
    let mut rng = SimRng::seed_from(3);

    let (_, _, orders) = until_wave(&mut spawner, &definition, &mut rng);
    assert_eq!(orders.len(), 12);
    assert!(orders
        .iter()
        .all(|order| order.enemy_type == orders[0].enemy_type));
}

#[test]
fn child_waves_are_released_alongside_their_parent() {
    let definition = schedule(vec![Wave {
        child_waves: vec![Wave {
            amount_multiplier: 2.0,
            enemies: BTreeMap::from([(EnemyTypeId::new("tank"), 1.0)]),
            ..Wave::default()
        }],
        ..basic_wave(1)
    }]);
    let mut spawner = EnemySpawner::new();
    let mut rng = SimRng::seed_from(5);

    let (_, _, orders) = until_wave(&mut spawner, &definition, &mut rng);
    let tanks = orders
        .iter()
        .filter(|order| order.enemy_type == EnemyTypeId::new("tank"))
        .count();
    assert_eq!(orders.len(), 9);
    assert_eq!(tanks, 6);
}

#[test]
fn no_wave_starts_after_the_final_one() {
    let definition = WaveDefinition {
        final_wave: 2,
        ..schedule(vec![basic_wave(1)])
    };
    let mut spawner = EnemySpawner::new();
    let mut rng = SimRng::seed_from(9);

    let (_, first, _) = until_wave(&mut spawner, &definition, &mut rng);
    let (steps, second, _) = until_wave(&mut spawner, &definition, &mut rng);
    assert_eq!(first.wave, 1);
    assert_eq!(second.wave, 2);
    assert!((99..=101).contains(&steps), "second wave after {steps} steps");
    assert!(spawner.is_final_wave(&definition));

    let spawnpoints = spawnpoints();
    let mut orders = Vec::new();
    for _ in 0..1_000 {
        assert!(spawner
            .handle(&definition, &spawnpoints, &mut rng, &mut orders)
            .is_none());
    }
    assert_eq!(spawner.wave_number(), 2);
}

#[test]
fn equal_seeds_schedule_identical_waves() {
    let definition = schedule(vec![Wave {
        spawn_duration: 4.0,
        enemies: BTreeMap::from([
            (EnemyTypeId::new("basic"), 3.0),
            (EnemyTypeId::new("fast"), 1.0),
        ]),
        ..basic_wave(1)
    }]);
    let run = || {
        let mut spawner = EnemySpawner::new();
        let mut rng = SimRng::seed_from(2345);
        let _ = until_wave(&mut spawner, &definition, &mut rng);
        spawner.queued().to_vec()
    };

    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
    assert!(first
        .windows(2)
        .all(|pair| pair[0].spawn_time >= pair[1].spawn_time));
}
