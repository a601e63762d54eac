//! Deterministic churn: random spawns, despawns, edits and migrations
//! checked against a plain model after every round.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slilib_ecs::{Component, EcsConfig, EntityBuilder, EntityId, World};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct Health(u32);
impl Component for Health {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct Team(u32);
impl Component for Team {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Expected {
    health: u32,
    team: Option<u32>,
}

fn verify(world: &mut World, model: &HashMap<EntityId, Expected>) {
    for (id, expected) in model {
        assert!(world.is_alive(*id));
        assert_eq!(world.get::<Health>(*id), Ok(&Health(expected.health)));
        match expected.team {
            Some(team) => assert_eq!(world.get::<Team>(*id), Ok(&Team(team))),
            None => assert!(world.get::<Team>(*id).is_err()),
        }
    }

    let health = world.mask_builder().with::<Health>().build().unwrap();
    let both = world
        .mask_builder()
        .with::<Health>()
        .with::<Team>()
        .build()
        .unwrap();

    let query = world.query(&health);
    assert_eq!(query.entity_count(world.archetypes()), model.len());

    let query = world.query(&both);
    let with_team = model.values().filter(|e| e.team.is_some()).count();
    assert_eq!(query.entity_count(world.archetypes()), with_team);

    assert_eq!(world.entity_count(), model.len());
    assert_eq!(world.archetypes().entity_count(), model.len());
}

fn run(seed: u64, removal_batch_size: usize) {
    let config = EcsConfig {
        block_capacity: 16,
        initial_blocks: 2,
        entity_blocks: 1,
        removal_batch_size,
        ..EcsConfig::compact()
    };
    let mut world = World::new(config).unwrap();
    world.register::<Health>().unwrap();
    world.register::<Team>().unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut model: HashMap<EntityId, Expected> = HashMap::new();
    let mut alive: Vec<EntityId> = Vec::new();

    for round in 0..40 {
        for _ in 0..50 {
            let roll = rng.gen_range(0..100);
            if alive.is_empty() || roll < 40 {
                let health = rng.gen_range(1..1000);
                let team = rng.gen_bool(0.5).then(|| rng.gen_range(0..8));
                let mut builder = EntityBuilder::new().with(Health(health));
                if let Some(team) = team {
                    builder = builder.with(Team(team));
                }
                let id = world.spawn(builder).unwrap();
                assert!(model.insert(id, Expected { health, team }).is_none());
                alive.push(id);
                continue;
            }

            let index = rng.gen_range(0..alive.len());
            let id = alive[index];
            match roll {
                40..=64 => {
                    world.despawn(id).unwrap();
                    model.remove(&id);
                    alive.swap_remove(index);
                }
                65..=79 => {
                    let health = rng.gen_range(1..1000);
                    world.set(id, Health(health)).unwrap();
                    if let Some(expected) = model.get_mut(&id) {
                        expected.health = health;
                    }
                }
                80..=89 => {
                    let team = rng.gen_range(0..8);
                    world.add_component(id, Team(team)).unwrap();
                    if let Some(expected) = model.get_mut(&id) {
                        expected.team = Some(team);
                    }
                }
                _ => {
                    let had_team = model.get(&id).is_some_and(|e| e.team.is_some());
                    let result = world.remove_component::<Team>(id);
                    assert_eq!(result.is_ok(), had_team, "round {round}");
                    if let Some(expected) = model.get_mut(&id) {
                        expected.team = None;
                    }
                }
            }
        }

        verify(&mut world, &model);
    }
}

#[test]
fn test_churn_immediate_removal() {
    run(0x5EED, 0);
}

#[test]
fn test_churn_batched_removal() {
    run(0xBADC0DE, 7);
}
