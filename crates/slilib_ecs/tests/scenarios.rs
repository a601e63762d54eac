//! End-to-end scenarios: movement update, mask-filtered queries and
//! entity-id registry growth.

use std::collections::HashSet;

use bytemuck::{Pod, Zeroable};
use slilib_ecs::{
    Component, EcsConfig, EntityBuilder, EntityId, EntityIdState, EntityRegistry, World,
    IDS_PER_BLOCK,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Velocity {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(transparent)]
struct TagA(u8);
impl Component for TagA {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(transparent)]
struct TagB(u8);
impl Component for TagB {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(transparent)]
struct TagC(u8);
impl Component for TagC {}

fn movement(world: &mut World) {
    let mask = world
        .mask_builder()
        .with::<Position>()
        .with::<Velocity>()
        .build()
        .unwrap();
    let query = world.query(&mask);
    query.for_each_chunk_mut(world.archetypes_mut(), |chunk| {
        let (positions, velocities) = chunk.pair_mut::<Position, Velocity>().unwrap();
        for (p, v) in positions.iter_mut().zip(velocities.iter()) {
            p.x += v.x;
            p.y += v.y;
            p.z += v.z;
        }
    });
}

#[test]
fn test_velocity_moves_position() {
    let mut world = World::new(EcsConfig::default()).unwrap();
    world.register::<Position>().unwrap();
    world.register::<Velocity>().unwrap();

    let entity = world
        .spawn(
            EntityBuilder::new()
                .with(Position { x: 0.0, y: 0.0, z: 0.0 })
                .with(Velocity { x: 1.0, y: 2.0, z: 3.0 }),
        )
        .unwrap();

    movement(&mut world);

    assert_eq!(
        world.get::<Position>(entity),
        Ok(&Position { x: 1.0, y: 2.0, z: 3.0 })
    );
    assert_eq!(
        world.get::<Velocity>(entity),
        Ok(&Velocity { x: 1.0, y: 2.0, z: 3.0 })
    );
}

#[test]
fn test_query_filters_by_mask() {
    let mut world = World::new(EcsConfig::compact()).unwrap();
    world.register::<TagA>().unwrap();
    world.register::<TagB>().unwrap();
    world.register::<TagC>().unwrap();
    world.register::<Position>().unwrap();

    let mut spawned = HashSet::new();
    for i in 0..500u16 {
        let id = world
            .spawn(
                EntityBuilder::new()
                    .with(Position { x: f32::from(i), y: 0.0, z: 0.0 })
                    .with(TagA(1)),
            )
            .unwrap();
        spawned.insert(id);
    }

    let position = world.mask_builder().with::<Position>().build().unwrap();
    let query = world.query(&position);
    assert_eq!(query.entity_count(world.archetypes()), 500);

    let mut seen = HashSet::new();
    query.for_each_chunk(world.archetypes(), |chunk| {
        for (local, id) in chunk.occupied() {
            let pos = chunk.get::<Position>(local).unwrap();
            assert_eq!(world.get::<Position>(id), Ok(pos));
            seen.insert(id);
        }
    });
    assert_eq!(seen, spawned);

    let position_b = world
        .mask_builder()
        .with::<Position>()
        .with::<TagB>()
        .build()
        .unwrap();
    let query = world.query(&position_b);
    assert_eq!(query.entity_count(world.archetypes()), 0);
    assert!(query.archetype_ids().is_empty());
}

#[test]
fn test_new_archetypes_join_refreshed_query() {
    let mut world = World::new(EcsConfig::compact()).unwrap();
    world.register::<Position>().unwrap();
    world.register::<TagB>().unwrap();
    world.register::<TagC>().unwrap();

    let position = world.mask_builder().with::<Position>().build().unwrap();
    let mut query = world.query(&position);
    assert_eq!(query.entity_count(world.archetypes()), 0);

    world
        .spawn_bundle((Position::default(), TagB(1)))
        .unwrap();
    world
        .spawn_bundle((Position::default(), TagC(2)))
        .unwrap();
    world.refresh(&mut query);

    assert_eq!(query.archetype_ids().len(), 2);
    assert_eq!(query.entity_count(world.archetypes()), 2);
}

#[test]
fn test_entity_registry_grows() {
    let mut ids = EntityRegistry::new(16, true);
    assert_eq!(16 * IDS_PER_BLOCK, 8192);

    let created: Vec<EntityId> = (0..10_000).map(|_| ids.create().unwrap()).collect();
    let distinct: HashSet<_> = created.iter().copied().collect();

    assert_eq!(distinct.len(), 10_000);
    assert!(ids.block_count() >= 20);
    assert!(ids.capacity() >= ids.block_count());
    assert!(created.iter().all(|id| ids.is_alive(*id)));
    assert_eq!(ids.count(), 10_000);
}

#[test]
fn test_destroyed_id_is_inactive_not_unallocated() {
    let mut ids = EntityRegistry::new(2, false);
    let id = ids.create().unwrap();
    assert!(ids.destroy(id));

    assert_eq!(ids.check_id_state(id), EntityIdState::Inactive);
    let beyond = EntityId::new((ids.block_count() * IDS_PER_BLOCK) as u32);
    assert_eq!(ids.check_id_state(beyond), EntityIdState::Unallocated);
}
